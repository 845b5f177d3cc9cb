//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! rd-cli admin create -e admin@example.com -n "Admin Name" -r super_admin
//! rd-cli admin list
//! ```

use returndesk_admin::db::{AdminUserRepository, RepositoryError};
use returndesk_core::AdminRole;
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// User already exists.
    #[error("Admin user already exists with email: {0}")]
    UserExists(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),
}

/// Create a new admin user.
///
/// # Returns
///
/// The ID of the created admin user.
///
/// # Errors
///
/// Returns an error for an invalid role or email, a duplicate email, or a
/// database failure.
pub async fn create_user(
    pool: &sqlx::PgPool,
    email: &str,
    name: &str,
    role: &str,
) -> Result<i32, AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;

    // Basic email validation
    if !email.contains('@') || !email.contains('.') {
        return Err(AdminError::InvalidEmail(email.to_owned()));
    }

    tracing::info!("Creating admin user: {} ({})", email, role);

    let user = AdminUserRepository::new(pool)
        .create(email, name, role)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_owned()),
            other => AdminError::Database(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    tracing::info!("Issue an API token with: rd-cli token issue --admin-email {email}");

    Ok(user.id.as_i32())
}

/// Log every admin user.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_users(pool: &sqlx::PgPool) -> Result<(), AdminError> {
    let users = AdminUserRepository::new(pool).list_all().await?;

    if users.is_empty() {
        tracing::info!("No admin users");
    }
    for user in users {
        tracing::info!(
            "{:>5}  {:<12} {:<32} {}",
            user.id,
            user.role.to_string(),
            user.email,
            user.name
        );
    }
    Ok(())
}
