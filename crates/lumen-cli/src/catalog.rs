use std::fmt::Write as _;

use clap::Subcommand;
use lumen_core::{Catalog, Product, Wattage};

/// Sub-commands available under `catalog`.
#[derive(Debug, Subcommand)]
pub enum CatalogCommands {
    /// List products, optionally limited to one category
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Show a product with its wattage options
    Show { slug: String },
    /// Price a wattage variant of a product
    Quote {
        slug: String,
        /// Wattage to price; defaults to the lowest option
        #[arg(long)]
        wattage: Option<Wattage>,
    },
}

pub(crate) fn find_product<'a>(catalog: &'a Catalog, slug: &str) -> anyhow::Result<&'a Product> {
    catalog
        .by_slug(slug)
        .ok_or_else(|| anyhow::anyhow!("product '{slug}' not found in catalog"))
}

pub(crate) fn fmt_wattages(options: &[Wattage]) -> String {
    if options.is_empty() {
        return "\u{2014}".to_string();
    }
    options
        .iter()
        .map(|w| format!("{w}W"))
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Renders the output of a `catalog` sub-command.
///
/// # Errors
///
/// Returns an error if a named product does not exist or does not offer the
/// requested wattage.
pub(crate) fn run_catalog(catalog: &Catalog, command: &CatalogCommands) -> anyhow::Result<String> {
    let mut out = String::new();
    match command {
        CatalogCommands::List { category } => {
            let products: Vec<&Product> = match category {
                Some(c) => catalog.by_category(c),
                None => catalog.products.iter().collect(),
            };
            if products.is_empty() {
                writeln!(
                    out,
                    "no products found; categories: {}",
                    catalog.categories().join(", ")
                )?;
                return Ok(out);
            }
            writeln!(
                out,
                "{:<32}{:<22}{:>8}  WATTAGE",
                "SLUG", "CATEGORY", "PRICE"
            )?;
            for p in products {
                writeln!(
                    out,
                    "{:<32}{:<22}{:>8}  {}",
                    p.slug,
                    p.category,
                    p.price,
                    fmt_wattages(&p.wattage_options())
                )?;
            }
        }
        CatalogCommands::Show { slug } => {
            let p = find_product(catalog, slug)?;
            writeln!(out, "{} ({})", p.name, p.slug)?;
            writeln!(out, "category: {}", p.category)?;
            match p.original_price {
                Some(original) if p.on_sale => {
                    writeln!(out, "price:    {} (was {original})", p.price)?;
                }
                _ => writeln!(out, "price:    {}", p.price)?,
            }
            writeln!(out, "wattage:  {}", fmt_wattages(&p.wattage_options()))?;
            if let Some(description) = &p.description {
                writeln!(out, "\n{description}")?;
            }
        }
        CatalogCommands::Quote { slug, wattage } => {
            let p = find_product(catalog, slug)?;
            let quote = p.quote(*wattage)?;
            match quote.selected_wattage {
                Some(w) => writeln!(out, "{} @ {w}W: {}", p.name, quote.price)?,
                None => writeln!(out, "{}: {}", p.name, quote.price)?,
            }
        }
    }
    Ok(out)
}
