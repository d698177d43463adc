//! `cart` subcommands backed by the local storage file.

use std::fmt::Write as _;
use std::path::Path;

use clap::Subcommand;
use lumen_core::{
    Cart, CartLine, CartStore, Catalog, FileStore, KeyValueStore, SessionStore, Wattage,
};

use crate::catalog::find_product;

/// Sub-commands available under `cart`.
#[derive(Debug, Subcommand)]
pub enum CartCommands {
    /// Add a product to the cart
    Add {
        slug: String,
        /// Wattage variant; defaults to the lowest option
        #[arg(long)]
        wattage: Option<Wattage>,
        #[arg(long, default_value = "1")]
        quantity: u32,
    },
    /// Show cart contents and subtotal
    Show,
    /// Remove a product; without `--wattage` every variant is removed
    Remove {
        slug: String,
        #[arg(long)]
        wattage: Option<Wattage>,
    },
    /// Empty the cart
    Clear,
}

/// Opens the storage file, dropping any plaintext account list left by
/// older clients.
///
/// # Errors
///
/// Returns an error if the storage file cannot be read or written.
pub(crate) fn open_store(path: &Path) -> anyhow::Result<FileStore> {
    let mut session = SessionStore::new(FileStore::new(path));
    if session.purge_legacy_users()? {
        tracing::warn!(path = %path.display(), "removed legacy plaintext user list from storage");
    }
    Ok(session.into_inner())
}

/// Runs a `cart` sub-command and renders its output.
///
/// # Errors
///
/// Returns an error if a named product does not exist, does not offer the
/// requested wattage, or storage fails.
pub(crate) fn run_cart<S: KeyValueStore>(
    carts: &mut CartStore<S>,
    catalog: &Catalog,
    command: &CartCommands,
) -> anyhow::Result<String> {
    let mut out = String::new();

    match command {
        CartCommands::Add {
            slug,
            wattage,
            quantity,
        } => {
            let product = find_product(catalog, slug)?;
            let line = CartLine::from_product(product, *wattage)?;
            let label = describe(&line.name, line.wattage);
            let price = line.price;
            let cart = carts.update(|c| c.add_many(line, *quantity))?;
            writeln!(
                out,
                "added {quantity} x {label} at {price}; cart has {} item(s)",
                cart.count()
            )?;
        }
        CartCommands::Show => {
            let cart = carts.load()?;
            render_cart(&mut out, &cart)?;
        }
        CartCommands::Remove { slug, wattage } => {
            let product = find_product(catalog, slug)?;
            let mut removed = false;
            carts.update(|c| {
                removed = match wattage {
                    Some(w) => c.remove(&product.id, Some(*w)),
                    None => {
                        let before = c.items.len();
                        c.items.retain(|i| i.id != product.id);
                        c.items.len() != before
                    }
                };
            })?;
            if removed {
                writeln!(out, "removed {}", describe(&product.name, *wattage))?;
            } else {
                writeln!(out, "{} is not in the cart", describe(&product.name, *wattage))?;
            }
        }
        CartCommands::Clear => {
            carts.update(Cart::clear)?;
            writeln!(out, "cart cleared")?;
        }
    }
    Ok(out)
}

fn describe(name: &str, wattage: Option<Wattage>) -> String {
    match wattage {
        Some(w) => format!("{name} ({w}W)"),
        None => name.to_string(),
    }
}

fn render_cart(out: &mut String, cart: &Cart) -> std::fmt::Result {
    if cart.is_empty() {
        return writeln!(out, "cart is empty");
    }
    writeln!(out, "{:<36}{:>5}{:>10}{:>10}", "ITEM", "QTY", "PRICE", "TOTAL")?;
    for item in &cart.items {
        writeln!(
            out,
            "{:<36}{:>5}{:>10}{:>10}",
            describe(&item.name, item.wattage),
            item.quantity,
            item.price,
            item.price.saturating_mul(i64::from(item.quantity))
        )?;
    }
    writeln!(out, "{} item(s), subtotal {}", cart.count(), cart.subtotal())
}
