//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod returns;
pub mod token;

use secrecy::SecretString;
use sqlx::PgPool;

/// Read the admin database URL, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns the name of the missing variable if neither is set.
pub fn database_url() -> Result<SecretString, &'static str> {
    dotenvy::dotenv().ok();

    std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "ADMIN_DATABASE_URL")
}

/// Connect to the admin database.
///
/// # Errors
///
/// Returns an error if the URL is missing or the connection fails.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let database_url =
        database_url().map_err(|var| format!("Missing environment variable: {var}"))?;

    tracing::info!("Connecting to admin database...");
    Ok(returndesk_admin::db::create_pool(&database_url).await?)
}
