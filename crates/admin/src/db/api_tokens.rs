//! API token repository.
//!
//! Only SHA-256 digests of tokens are stored. A token belongs to exactly one
//! admin user or one customer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use returndesk_core::{AdminUserId, ApiTokenId, CustomerId};

use super::RepositoryError;
use super::store::PrincipalStore;
use crate::models::{AdminRole, CurrentAdmin, CurrentCustomer, Principal};

/// Whom a new token is issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOwner {
    Admin(AdminUserId),
    Customer(CustomerId),
}

/// Internal row type joining a token to its owner.
#[derive(Debug, sqlx::FromRow)]
struct TokenOwnerRow {
    admin_user_id: Option<i32>,
    admin_name: Option<String>,
    admin_role: Option<AdminRole>,
    customer_id: Option<i32>,
}

impl TryFrom<TokenOwnerRow> for Principal {
    type Error = RepositoryError;

    fn try_from(row: TokenOwnerRow) -> Result<Self, Self::Error> {
        match row {
            TokenOwnerRow {
                admin_user_id: Some(id),
                admin_name: Some(name),
                admin_role: Some(role),
                customer_id: None,
            } => Ok(Self::Admin(CurrentAdmin {
                id: AdminUserId::new(id),
                name,
                role,
            })),
            TokenOwnerRow {
                admin_user_id: None,
                customer_id: Some(id),
                ..
            } => Ok(Self::Customer(CurrentCustomer {
                id: CustomerId::new(id),
            })),
            _ => Err(RepositoryError::DataCorruption(
                "api token has no single owner".to_string(),
            )),
        }
    }
}

/// Repository for API token operations.
pub struct ApiTokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ApiTokenRepository<'a> {
    /// Create a new API token repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store the digest of a freshly issued token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the digest already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        token_hash: &str,
        label: &str,
        owner: TokenOwner,
    ) -> Result<ApiTokenId, RepositoryError> {
        let (admin_user_id, customer_id) = match owner {
            TokenOwner::Admin(id) => (Some(id.as_i32()), None),
            TokenOwner::Customer(id) => (None, Some(id.as_i32())),
        };

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO admin.api_token (token_hash, label, admin_user_id, customer_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(token_hash)
        .bind(label)
        .bind(admin_user_id)
        .bind(customer_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("token already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(ApiTokenId::new(id))
    }

    /// Revoke a token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no active token has this ID.
    pub async fn revoke(&self, id: ApiTokenId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE admin.api_token
            SET revoked_at = NOW()
            WHERE id = $1 AND revoked_at IS NULL
            ",
        )
        .bind(id.as_i32())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Resolve an active token digest to its owner and note the use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the token has no single owner.
    pub async fn principal_for_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Principal>, RepositoryError> {
        let row: Option<TokenOwnerRow> = sqlx::query_as(
            r"
            UPDATE admin.api_token t
            SET last_used_at = NOW()
            WHERE t.token_hash = $1 AND t.revoked_at IS NULL
            RETURNING t.admin_user_id,
                      (SELECT a.name FROM admin.admin_user a WHERE a.id = t.admin_user_id) AS admin_name,
                      (SELECT a.role FROM admin.admin_user a WHERE a.id = t.admin_user_id) AS admin_role,
                      t.customer_id
            ",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Last time each active token of an owner was used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for(
        &self,
        owner: TokenOwner,
    ) -> Result<Vec<(ApiTokenId, String, Option<DateTime<Utc>>)>, RepositoryError> {
        let (admin_user_id, customer_id) = match owner {
            TokenOwner::Admin(id) => (Some(id.as_i32()), None),
            TokenOwner::Customer(id) => (None, Some(id.as_i32())),
        };

        let rows: Vec<(i32, String, Option<DateTime<Utc>>)> = sqlx::query_as(
            r"
            SELECT id, label, last_used_at
            FROM admin.api_token
            WHERE revoked_at IS NULL
              AND admin_user_id IS NOT DISTINCT FROM $1
              AND customer_id IS NOT DISTINCT FROM $2
            ORDER BY created_at DESC
            ",
        )
        .bind(admin_user_id)
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, label, last_used_at)| (ApiTokenId::new(id), label, last_used_at))
            .collect())
    }
}

/// [`PrincipalStore`] backed by `admin.api_token`.
#[derive(Debug, Clone)]
pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn principal_for_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<Principal>, RepositoryError> {
        ApiTokenRepository::new(&self.pool)
            .principal_for_hash(token_hash)
            .await
    }
}
