pub mod accounts;
pub mod app_config;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod reviews;
pub mod wattage;

pub use accounts::{
    hash_password, verify_password, AccountError, Credentials, LoginRequest, NewAccount,
    PublicUser, Role, SignupRequest,
};
pub use app_config::{AppConfig, Environment};
pub use cart::{
    Cart, CartError, CartItem, CartLine, CartStore, FileStore, KeyValueStore, MemoryStore,
    SessionStore,
};
pub use catalog::{load_catalog, parse_catalog, Catalog, Product};
pub use config::{load_app_config, load_app_config_from_env};
pub use reviews::{NewReview, ReviewQuery, ReviewSubmission, ReviewSummary};
pub use wattage::{
    compute_price, default_selection, extract_wattage_options, PriceQuote, Wattage,
    PRICE_PER_WATT_UNIT,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[source] serde_yaml::Error),
    #[error("catalog validation failed: {0}")]
    Validation(String),
}

/// Input rejected by a domain rule. The display text is safe to return to
/// API clients verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingReviewFields,
    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange(i64),
    #[error("Rating must be a whole number between 1 and 5")]
    RatingNotWholeNumber,
    #[error("Product ID or slug is required")]
    MissingProductFilter,
    #[error("Name is required and must be a valid string")]
    NameRequired,
    #[error("Email is required and must be a valid string")]
    EmailRequired,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("Email and password are required")]
    CredentialsRequired,
    #[error("{wattage}W is not an available option for this product")]
    UnsupportedWattage { wattage: u32 },
}
