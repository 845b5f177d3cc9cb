//! Database operations for the return desk.
//!
//! # Schema: `admin`
//!
//! ## Tables
//!
//! - `admin_user` - Back-office staff who review returns
//! - `customer` - Customers who own orders
//! - `customer_order` - Order snapshot used for eligibility and refund defaults
//! - `return_request` - One row per order, versioned for conditional writes
//! - `api_token` - SHA-256 digests of bearer tokens
//! - `refund_request` - Refund hand-off outbox keyed by idempotency key
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p returndesk-cli -- migrate
//! ```

pub mod admin_users;
pub mod api_tokens;
pub mod memory;
pub mod returns;
pub mod store;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use api_tokens::{ApiTokenRepository, PgPrincipalStore};
pub use memory::MemoryStore;
pub use returns::PgReturnStore;
pub use store::{PrincipalStore, ReturnStore, StoredReturn};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
