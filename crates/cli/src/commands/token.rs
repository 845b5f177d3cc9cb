//! API token commands.
//!
//! Tokens are shown once when issued; only their digest is stored.
//!
//! # Usage
//!
//! ```bash
//! rd-cli token issue --admin-email admin@example.com --label laptop
//! rd-cli token issue --customer-id 42 --label "mobile app"
//! rd-cli token list --admin-email admin@example.com
//! rd-cli token revoke 7
//! ```

use returndesk_admin::db::api_tokens::TokenOwner;
use returndesk_admin::db::{AdminUserRepository, ApiTokenRepository, RepositoryError};
use returndesk_admin::services::IssuedToken;
use returndesk_core::{ApiTokenId, CustomerId};
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No admin user has this email.
    #[error("No admin user with email: {0}")]
    UnknownAdmin(String),

    /// Neither an admin nor a customer was named.
    #[error("Pass --admin-email or --customer-id")]
    MissingOwner,

    /// No active token has this ID.
    #[error("No active token with ID {0}")]
    UnknownToken(ApiTokenId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),
}

/// Resolve `--admin-email` / `--customer-id` to a token owner.
///
/// # Errors
///
/// Returns `TokenError::UnknownAdmin` if the email is not an admin, or
/// `TokenError::MissingOwner` if neither option is given.
pub async fn owner(
    pool: &PgPool,
    admin_email: Option<&str>,
    customer_id: Option<i32>,
) -> Result<TokenOwner, TokenError> {
    match (admin_email, customer_id) {
        (Some(email), _) => AdminUserRepository::new(pool)
            .get_by_email(email)
            .await?
            .map(|admin| TokenOwner::Admin(admin.id))
            .ok_or_else(|| TokenError::UnknownAdmin(email.to_owned())),
        (None, Some(id)) => Ok(TokenOwner::Customer(CustomerId::new(id))),
        (None, None) => Err(TokenError::MissingOwner),
    }
}

/// Issue a new token and log it once.
///
/// # Errors
///
/// Returns an error if the database write fails.
pub async fn issue(pool: &PgPool, owner: TokenOwner, label: &str) -> Result<(), TokenError> {
    let issued = IssuedToken::generate();
    let id = ApiTokenRepository::new(pool)
        .create(&issued.hash, label, owner)
        .await?;

    tracing::info!("Token {} issued for {:?} ({})", id, owner, label);
    tracing::info!("Bearer token (shown once): {}", issued.token);
    Ok(())
}

/// Log the active tokens of an owner.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list(pool: &PgPool, owner: TokenOwner) -> Result<(), TokenError> {
    let tokens = ApiTokenRepository::new(pool).list_for(owner).await?;

    if tokens.is_empty() {
        tracing::info!("No active tokens for {:?}", owner);
    }
    for (id, label, last_used_at) in tokens {
        let last_used = last_used_at.map_or_else(|| "never".to_owned(), |t| t.to_rfc3339());
        tracing::info!("{:>5}  {:<24} last used {}", id, label, last_used);
    }
    Ok(())
}

/// Revoke a token.
///
/// # Errors
///
/// Returns `TokenError::UnknownToken` if no active token has this ID.
pub async fn revoke(pool: &PgPool, id: i32) -> Result<(), TokenError> {
    let id = ApiTokenId::new(id);
    ApiTokenRepository::new(pool)
        .revoke(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => TokenError::UnknownToken(id),
            other => TokenError::Database(other),
        })?;

    tracing::info!("Token {} revoked", id);
    Ok(())
}
