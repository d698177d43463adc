//! `db` subcommands: connectivity, migrations, and admin seeding.

use clap::Subcommand;
use lumen_core::{hash_password, Role, SignupRequest};

#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Create or promote the admin account from `LUMEN_ADMIN_*` variables
    Seed,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SeedOutcome {
    Created,
    Promoted,
}

pub(crate) async fn run_db_ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    lumen_db::ping(pool).await?;
    println!("database ok");
    Ok(())
}

pub(crate) async fn run_db_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = lumen_db::run_migrations(pool).await?;
    tracing::info!(applied, "migrations complete");
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Seeds the admin account described by `LUMEN_ADMIN_EMAIL`,
/// `LUMEN_ADMIN_PASSWORD` and the optional `LUMEN_ADMIN_NAME`.
///
/// # Errors
///
/// Returns an error if a required variable is missing, the values fail
/// signup validation, or the database write fails.
pub(crate) async fn run_db_seed(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let request = admin_request_from_env(|key| std::env::var(key).ok())?;
    let email = request.email.clone().unwrap_or_default();
    match seed_admin(pool, &request).await? {
        SeedOutcome::Created => println!("created admin account {email}"),
        SeedOutcome::Promoted => println!("promoted existing account {email} to admin"),
    }
    Ok(())
}

pub(crate) fn admin_request_from_env<F>(lookup: F) -> anyhow::Result<SignupRequest>
where
    F: Fn(&str) -> Option<String>,
{
    let require = |key: &str| {
        lookup(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required environment variable: {key}"))
    };

    Ok(SignupRequest {
        name: Some(lookup("LUMEN_ADMIN_NAME").unwrap_or_else(|| "Admin".to_string())),
        email: Some(require("LUMEN_ADMIN_EMAIL")?),
        password: Some(require("LUMEN_ADMIN_PASSWORD")?),
    })
}

/// Creates the admin account, or promotes it when the email is already
/// registered. The stored password of an existing account is left alone.
pub(crate) async fn seed_admin(
    pool: &sqlx::PgPool,
    request: &SignupRequest,
) -> anyhow::Result<SeedOutcome> {
    let account = request.validate()?;

    if lumen_db::find_user_by_email(pool, &account.email)
        .await?
        .is_some()
    {
        lumen_db::set_user_role(pool, &account.email, Role::Admin).await?;
        tracing::info!(email = %account.email, "existing account promoted to admin");
        return Ok(SeedOutcome::Promoted);
    }

    let password_hash = hash_password(&account.password)?;
    lumen_db::create_user(pool, &account.name, &account.email, &password_hash, Role::Admin)
        .await?;
    tracing::info!(email = %account.email, "admin account created");
    Ok(SeedOutcome::Created)
}
