//! Customer accounts: signup/login validation, password hashing, and the
//! sanitized user record handed back to clients.
//!
//! Privilege comes from the `role` stored with the account. There are no
//! built-in credentials; an admin is an ordinary account whose role is
//! [`Role::Admin`], checked only after the password has been verified.

use std::sync::LazyLock;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            other => Err(AccountError::UnknownRole(other.to_string())),
        }
    }
}

/// User record safe to return to a client: no password material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl PublicUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A validated signup: trimmed name, normalized email, raw password.
#[derive(Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl SignupRequest {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, checking name, email,
    /// then password.
    pub fn validate(&self) -> Result<NewAccount, ValidationError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::NameRequired)?;

        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::EmailRequired)?;

        if !EMAIL_RE.is_match(email) {
            return Err(ValidationError::InvalidEmail);
        }

        let password = self
            .password
            .as_deref()
            .ok_or(ValidationError::PasswordRequired)?;

        // Counted in UTF-16 code units, as browsers measure `minlength`.
        if password.encode_utf16().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }

        Ok(NewAccount {
            name: name.to_owned(),
            email: normalize_email(email),
            password: password.to_owned(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl LoginRequest {
    /// # Errors
    ///
    /// Returns [`ValidationError::CredentialsRequired`] if either field is
    /// missing or blank.
    pub fn validate(&self) -> Result<Credentials, ValidationError> {
        let email = self
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|s| !s.is_empty());
        let password = self.password.as_deref().filter(|s| !s.is_empty());

        match (email, password) {
            (Some(email), Some(password)) => Ok(Credentials {
                email,
                password: password.to_owned(),
            }),
            _ => Err(ValidationError::CredentialsRequired),
        }
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hashes a password into an argon2 PHC string with a fresh random salt.
///
/// # Errors
///
/// Returns [`AccountError::Hash`] if argon2 rejects the input.
pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hash(e.to_string()))
}

/// Checks `password` against a stored PHC string. A malformed hash never
/// verifies.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
