//! Storage seams for the return service.
//!
//! The service only talks to these traits, so the same rules run against
//! `PostgreSQL` in production and [`super::MemoryStore`] in tests.

use async_trait::async_trait;

use returndesk_core::{
    CustomerId, OrderId, OrderSnapshot, Page, ReturnQuery, ReturnRequest, StatusCounts,
};

use super::RepositoryError;
use crate::models::{CustomerSummary, Principal, RefundInstruction};

/// A return request as stored, with the data needed to act on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReturn {
    pub request: ReturnRequest,
    /// Incremented on every write; conditional writes compare against it.
    pub version: i64,
    pub order: OrderSnapshot,
    pub customer: Option<CustomerSummary>,
}

/// Persistence for return requests and the refund outbox.
///
/// Writes are conditional: `insert` fails if a row exists, `replace` and
/// `delete` fail if the version moved. A `false` return means another writer
/// got there first and the caller should reload.
#[async_trait]
pub trait ReturnStore: Send + Sync {
    /// Check the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Order snapshot, if the order exists.
    async fn order(&self, id: OrderId) -> Result<Option<OrderSnapshot>, RepositoryError>;

    /// The return request for an order, if any.
    async fn get(&self, id: OrderId) -> Result<Option<StoredReturn>, RepositoryError>;

    /// Store a new request. Returns `false` if the order already has one.
    async fn insert(&self, request: &ReturnRequest) -> Result<bool, RepositoryError>;

    /// Overwrite a request if its version is still `expected_version`.
    ///
    /// When `refund` is given it is recorded in the same write; an
    /// instruction whose idempotency key already exists is kept as is.
    async fn replace(
        &self,
        expected_version: i64,
        request: &ReturnRequest,
        refund: Option<&RefundInstruction>,
    ) -> Result<bool, RepositoryError>;

    /// Remove a request if its version is still `expected_version`.
    async fn delete(&self, id: OrderId, expected_version: i64) -> Result<bool, RepositoryError>;

    /// Requests matching `query`, newest first.
    async fn list(&self, query: &ReturnQuery) -> Result<Page<StoredReturn>, RepositoryError>;

    /// Number of requests per status, optionally for one customer.
    async fn count_by_status(
        &self,
        customer: Option<CustomerId>,
    ) -> Result<StatusCounts, RepositoryError>;
}

/// Resolves bearer tokens to callers.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Look up the caller for a SHA-256 hex digest of a token.
    ///
    /// Revoked and unknown tokens resolve to `None`.
    async fn principal_for_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<Principal>, RepositoryError>;
}
