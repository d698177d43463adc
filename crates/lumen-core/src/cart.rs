//! Client-side cart and session state.
//!
//! State lives in a string key/value store (the browser's local storage, or
//! a JSON file for the CLI). Every payload the store reads back is decoded
//! against a versioned schema:
//!
//! - `"cart"` holds `{"version": 1, "items": [...]}`. A bare JSON array is
//!   the legacy version 0 layout and is migrated on load.
//! - `"currentUser"` holds a [`PublicUser`].
//! - `"users"` is a legacy key that held plaintext credentials. It is never
//!   written and [`SessionStore::purge_legacy_users`] removes it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accounts::PublicUser;
use crate::catalog::Product;
use crate::ValidationError;
use crate::wattage::Wattage;

pub const CART_KEY: &str = "cart";
pub const USERS_KEY: &str = "users";
pub const CURRENT_USER_KEY: &str = "currentUser";
pub const STORAGE_KEYS: [&str; 3] = [CART_KEY, USERS_KEY, CURRENT_USER_KEY];

pub const CART_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stored value under '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored value under '{key}' has unsupported schema version {version}")]
    UnsupportedVersion { key: String, version: u64 },
}

// ---------------------------------------------------------------------------
// Storage backends
// ---------------------------------------------------------------------------

/// String key/value storage with local-storage semantics.
pub trait KeyValueStore {
    /// # Errors
    ///
    /// Returns [`CartError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, CartError>;

    /// # Errors
    ///
    /// Returns [`CartError`] if the backend cannot be written.
    fn set(&mut self, key: &str, value: String) -> Result<(), CartError>;

    /// # Errors
    ///
    /// Returns [`CartError`] if the backend cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), CartError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CartError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), CartError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), CartError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A JSON object file mapping keys to string values. Missing file reads as
/// empty; parent directories are created on first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, CartError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_str(&content).map_err(|e| CartError::Corrupt {
            key: self.path.display().to_string(),
            source: e,
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), CartError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let body = serde_json::to_string_pretty(entries).map_err(|e| CartError::Corrupt {
            key: self.path.display().to_string(),
            source: e,
        })?;
        std::fs::write(&self.path, body).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: std::io::Error) -> CartError {
        CartError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CartError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), CartError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_owned(), value);
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), CartError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cart model
// ---------------------------------------------------------------------------

/// A product variant about to be added to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub image: String,
    pub wattage: Option<Wattage>,
}

impl CartLine {
    /// Builds a line for `product` priced at the chosen wattage (or the
    /// product's default wattage when `None`).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedWattage`] when the product does
    /// not offer `wattage`.
    pub fn from_product(
        product: &Product,
        wattage: Option<Wattage>,
    ) -> Result<Self, ValidationError> {
        let quote = product.quote(wattage)?;
        Ok(Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: quote.price,
            image: product.image.clone(),
            wattage: quote.selected_wattage,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub image: String,
    pub quantity: u32,
    #[serde(default)]
    pub wattage: Option<Wattage>,
}

impl CartItem {
    fn matches(&self, id: &str, wattage: Option<Wattage>) -> bool {
        self.id == id && self.wattage == wattage
    }
}

/// Cart lines keyed by `(product id, wattage)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Adds one unit of `line`, merging with an existing line for the same
    /// product and wattage.
    pub fn add(&mut self, line: CartLine) {
        self.add_many(line, 1);
    }

    /// Adds `quantity` units of `line`. A zero quantity is a no-op.
    pub fn add_many(&mut self, line: CartLine, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.matches(&line.id, line.wattage))
        {
            item.quantity = item.quantity.saturating_add(quantity);
            return;
        }
        self.items.push(CartItem {
            id: line.id,
            name: line.name,
            price: line.price,
            image: line.image,
            quantity,
            wattage: line.wattage,
        });
    }

    pub fn replace(&mut self, items: Vec<CartItem>) {
        self.items = items;
    }

    /// Removes a line. Returns `true` if something was removed.
    pub fn remove(&mut self, id: &str, wattage: Option<Wattage>) -> bool {
        let before = self.items.len();
        self.items.retain(|i| !i.matches(id, wattage));
        self.items.len() != before
    }

    /// Sets a line's quantity; zero removes the line. Returns `false` when
    /// no such line exists.
    pub fn set_quantity(&mut self, id: &str, wattage: Option<Wattage>, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(id, wattage);
        }
        match self.items.iter_mut().find(|i| i.matches(id, wattage)) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total units across all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    #[must_use]
    pub fn subtotal(&self) -> i64 {
        self.items
            .iter()
            .map(|i| i.price.saturating_mul(i64::from(i.quantity)))
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CartEnvelope {
    version: u32,
    items: Vec<CartItem>,
}

/// Decodes a stored cart payload, migrating older layouts.
///
/// Returns the cart and whether a migration happened.
fn decode_cart(raw: &str) -> Result<(Cart, bool), CartError> {
    let corrupt = |source| CartError::Corrupt {
        key: CART_KEY.to_string(),
        source,
    };

    let value: serde_json::Value = serde_json::from_str(raw).map_err(corrupt)?;

    if value.is_array() {
        let items: Vec<CartItem> = serde_json::from_value(value).map_err(corrupt)?;
        return Ok((Cart { items }, true));
    }

    let version = value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);
    if version != u64::from(CART_SCHEMA_VERSION) {
        return Err(CartError::UnsupportedVersion {
            key: CART_KEY.to_string(),
            version,
        });
    }

    let envelope: CartEnvelope = serde_json::from_value(value).map_err(corrupt)?;
    Ok((
        Cart {
            items: envelope.items,
        },
        false,
    ))
}

fn encode_cart(cart: &Cart) -> Result<String, CartError> {
    serde_json::to_string(&CartEnvelope {
        version: CART_SCHEMA_VERSION,
        items: cart.items.clone(),
    })
    .map_err(|source| CartError::Corrupt {
        key: CART_KEY.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Persists the cart under [`CART_KEY`].
#[derive(Debug)]
pub struct CartStore<S> {
    store: S,
}

impl<S: KeyValueStore> CartStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads the cart. An absent key is an empty cart. A legacy payload is
    /// migrated and written back in the current layout.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if the payload is corrupt, has an unknown
    /// version, or the backend fails.
    pub fn load(&mut self) -> Result<Cart, CartError> {
        let Some(raw) = self.store.get(CART_KEY)? else {
            return Ok(Cart::default());
        };
        let (cart, migrated) = decode_cart(&raw)?;
        if migrated {
            self.save(&cart)?;
        }
        Ok(cart)
    }

    /// # Errors
    ///
    /// Returns [`CartError`] if the backend fails.
    pub fn save(&mut self, cart: &Cart) -> Result<(), CartError> {
        let encoded = encode_cart(cart)?;
        self.store.set(CART_KEY, encoded)
    }

    /// Loads, applies `f`, saves, and returns the updated cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if loading or saving fails.
    pub fn update<F>(&mut self, f: F) -> Result<Cart, CartError>
    where
        F: FnOnce(&mut Cart),
    {
        let mut cart = self.load()?;
        f(&mut cart);
        self.save(&cart)?;
        Ok(cart)
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

/// Persists the signed-in user under [`CURRENT_USER_KEY`].
#[derive(Debug)]
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns [`CartError`] if the stored user is corrupt or the backend fails.
    pub fn current_user(&self) -> Result<Option<PublicUser>, CartError> {
        let Some(raw) = self.store.get(CURRENT_USER_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| CartError::Corrupt {
                key: CURRENT_USER_KEY.to_string(),
                source,
            })
    }

    /// # Errors
    ///
    /// Returns [`CartError`] if the backend fails.
    pub fn set_current_user(&mut self, user: &PublicUser) -> Result<(), CartError> {
        let raw = serde_json::to_string(user).map_err(|source| CartError::Corrupt {
            key: CURRENT_USER_KEY.to_string(),
            source,
        })?;
        self.store.set(CURRENT_USER_KEY, raw)
    }

    /// # Errors
    ///
    /// Returns [`CartError`] if the backend fails.
    pub fn sign_out(&mut self) -> Result<(), CartError> {
        self.store.remove(CURRENT_USER_KEY)
    }

    /// Removes the legacy plaintext user list. Returns `true` if one existed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if the backend fails.
    pub fn purge_legacy_users(&mut self) -> Result<bool, CartError> {
        let existed = self.store.get(USERS_KEY)?.is_some();
        if existed {
            self.store.remove(USERS_KEY)?;
        }
        Ok(existed)
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

#[cfg(test)]
#[path = "cart_test.rs"]
mod tests;
