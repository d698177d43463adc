use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::wattage::{extract_wattage_options, PriceQuote, Wattage};
use crate::{ConfigError, ValidationError};

/// A product listed in the storefront catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub slug: String,
    /// Base price in the store currency, for the lowest wattage variant.
    pub price: i64,
    #[serde(default)]
    pub original_price: Option<i64>,
    pub image: String,
    pub category: String,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl Product {
    /// Wattage variants advertised in the description, ascending.
    #[must_use]
    pub fn wattage_options(&self) -> Vec<Wattage> {
        extract_wattage_options(self.description.as_deref().unwrap_or_default())
    }

    /// Price quote for `selected`, or for the lowest wattage when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedWattage`] when `selected` is not
    /// one of [`Product::wattage_options`]. A product without options accepts
    /// only `None`.
    pub fn quote(&self, selected: Option<Wattage>) -> Result<PriceQuote, ValidationError> {
        let options = self.wattage_options();
        if let Some(wattage) = selected {
            if !options.contains(&wattage) {
                return Err(ValidationError::UnsupportedWattage { wattage });
            }
        }
        Ok(PriceQuote::for_options(self.price, &options, selected))
    }

    /// Quote at the default wattage. Always succeeds.
    #[must_use]
    pub fn default_quote(&self) -> PriceQuote {
        PriceQuote::for_options(self.price, &self.wattage_options(), None)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Catalog {
    pub products: Vec<Product>,
}

impl Catalog {
    #[must_use]
    pub fn by_slug(&self, slug: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.slug == slug)
    }

    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.category == category)
            .collect()
    }

    /// Distinct categories in first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.products
            .iter()
            .map(|p| p.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Case-insensitive substring match on product names.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&Product> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.products.iter().collect();
        }
        self.products
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .collect()
    }
}

/// Load and validate the product catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<Catalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalog(&content)
}

/// Parse and validate a catalog from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_catalog(content: &str) -> Result<Catalog, ConfigError> {
    let catalog: Catalog = serde_yaml::from_str(content).map_err(ConfigError::CatalogFileParse)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &Catalog) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for product in &catalog.products {
        if product.id.trim().is_empty() || product.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "product id and name must be non-empty".to_string(),
            ));
        }

        if !is_url_safe_slug(&product.slug) {
            return Err(ConfigError::Validation(format!(
                "product '{}' has invalid slug '{}'; use lowercase letters, digits, and dashes",
                product.id, product.slug
            )));
        }

        if product.price <= 0 {
            return Err(ConfigError::Validation(format!(
                "product '{}' has non-positive price {}",
                product.slug, product.price
            )));
        }

        if let Some(original) = product.original_price {
            if original < product.price {
                return Err(ConfigError::Validation(format!(
                    "product '{}' original price {original} is below its price {}",
                    product.slug, product.price
                )));
            }
        }

        if !seen_ids.insert(product.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate product id: '{}'",
                product.id
            )));
        }

        if !seen_slugs.insert(product.slug.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate product slug: '{}'",
                product.slug
            )));
        }
    }

    Ok(())
}

fn is_url_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
