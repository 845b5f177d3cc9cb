//! In-memory storage.
//!
//! Implements the same conditional-write contract as the `PostgreSQL`
//! store behind a single lock. Used by tests and local demos.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use returndesk_core::{
    CustomerId, OrderId, OrderSnapshot, Page, ReturnQuery, ReturnRequest, StatusCounts,
};

use super::RepositoryError;
use super::store::{PrincipalStore, ReturnStore, StoredReturn};
use crate::models::{CustomerSummary, Principal, RefundInstruction};
use crate::services::tokens::hash_token;

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<OrderId, OrderSnapshot>,
    customers: HashMap<CustomerId, CustomerSummary>,
    returns: HashMap<OrderId, (ReturnRequest, i64)>,
    refunds: BTreeMap<String, RefundInstruction>,
    tokens: HashMap<String, Principal>,
}

impl Tables {
    fn stored(&self, request: &ReturnRequest, version: i64) -> Result<StoredReturn, RepositoryError> {
        let order = self.orders.get(&request.order_id()).copied().ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "return request for unknown order #{}",
                request.order_id()
            ))
        })?;

        Ok(StoredReturn {
            request: request.clone(),
            version,
            customer: self.customers.get(&order.customer_id).cloned(),
            order,
        })
    }
}

/// Return and token storage held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order.
    #[must_use]
    pub fn with_order(mut self, order: OrderSnapshot) -> Self {
        self.tables.get_mut().orders.insert(order.id, order);
        self
    }

    /// Add a customer.
    #[must_use]
    pub fn with_customer(mut self, customer: CustomerSummary) -> Self {
        self.tables.get_mut().customers.insert(customer.id, customer);
        self
    }

    /// Accept `token` as a bearer token for `principal`.
    #[must_use]
    pub fn with_token(mut self, token: &str, principal: Principal) -> Self {
        self.tables
            .get_mut()
            .tokens
            .insert(hash_token(token), principal);
        self
    }

    /// Add or replace an order after construction.
    pub async fn put_order(&self, order: OrderSnapshot) {
        self.tables.lock().await.orders.insert(order.id, order);
    }

    /// Every refund instruction recorded so far, by idempotency key.
    pub async fn refunds(&self) -> Vec<RefundInstruction> {
        self.tables.lock().await.refunds.values().cloned().collect()
    }
}

#[async_trait]
impl ReturnStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<OrderSnapshot>, RepositoryError> {
        Ok(self.tables.lock().await.orders.get(&id).copied())
    }

    async fn get(&self, id: OrderId) -> Result<Option<StoredReturn>, RepositoryError> {
        let tables = self.tables.lock().await;
        tables
            .returns
            .get(&id)
            .map(|(request, version)| tables.stored(request, *version))
            .transpose()
    }

    async fn insert(&self, request: &ReturnRequest) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.returns.contains_key(&request.order_id()) {
            return Ok(false);
        }
        tables
            .returns
            .insert(request.order_id(), (request.clone(), 1));
        Ok(true)
    }

    async fn replace(
        &self,
        expected_version: i64,
        request: &ReturnRequest,
        refund: Option<&RefundInstruction>,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let Some((current, version)) = tables.returns.get_mut(&request.order_id()) else {
            return Ok(false);
        };
        if *version != expected_version {
            return Ok(false);
        }

        *current = request.clone();
        *version += 1;

        if let Some(refund) = refund {
            tables
                .refunds
                .entry(refund.idempotency_key.clone())
                .or_insert_with(|| refund.clone());
        }
        Ok(true)
    }

    async fn delete(&self, id: OrderId, expected_version: i64) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.lock().await;
        match tables.returns.get(&id) {
            Some((_, version)) if *version == expected_version => {
                tables.returns.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self, query: &ReturnQuery) -> Result<Page<StoredReturn>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<&(ReturnRequest, i64)> = tables
            .returns
            .values()
            .filter(|(request, _)| query.includes(request.customer_id(), request.status()))
            .collect();
        matching.sort_by(|a, b| ReturnRequest::newest_first(&a.0, &b.0));

        let stored = matching
            .into_iter()
            .map(|(request, version)| tables.stored(request, *version))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::from_sorted(stored, query.page))
    }

    async fn count_by_status(
        &self,
        customer: Option<CustomerId>,
    ) -> Result<StatusCounts, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .returns
            .values()
            .filter(|(request, _)| customer.is_none_or(|c| c == request.customer_id()))
            .map(|(request, _)| request.status())
            .collect())
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn principal_for_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<Principal>, RepositoryError> {
        Ok(self.tables.lock().await.tokens.get(token_hash).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use returndesk_core::{
        CurrencyCode, Money, OrderStatus, PageRequest, ReasonCategory, ReturnReason, ReturnStatus,
        StatusFilter, Submission,
    };

    fn order(id: i32) -> OrderSnapshot {
        OrderSnapshot {
            id: OrderId::new(id),
            customer_id: CustomerId::new(1),
            total: Money::new(Decimal::new(100, 0), CurrencyCode::INR),
            status: OrderStatus::Delivered,
        }
    }

    fn request(id: i32, day: u32) -> ReturnRequest {
        ReturnRequest::submit(
            None,
            &order(id),
            Submission {
                category: ReasonCategory::Other,
                reason: ReturnReason::parse("meh").unwrap(),
                images: Vec::new(),
            },
            5,
            Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_is_conditional() {
        let store = MemoryStore::new().with_order(order(1));
        assert!(store.insert(&request(1, 1)).await.unwrap());
        assert!(!store.insert(&request(1, 2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_checks_version() {
        let store = MemoryStore::new().with_order(order(1));
        store.insert(&request(1, 1)).await.unwrap();
        let stored = store.get(OrderId::new(1)).await.unwrap().unwrap();

        assert!(store.replace(stored.version, &stored.request, None).await.unwrap());
        assert!(!store.replace(stored.version, &stored.request, None).await.unwrap());
        assert!(!store.delete(OrderId::new(1), stored.version).await.unwrap());
        assert!(store.delete(OrderId::new(1), stored.version + 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_and_pages() {
        let mut store = MemoryStore::new();
        for id in 1..=5 {
            store = store.with_order(order(id));
        }
        for (id, day) in [(1, 3), (2, 1), (3, 3), (4, 2), (5, 5)] {
            store.insert(&request(id, day)).await.unwrap();
        }

        let query = ReturnQuery {
            status: StatusFilter::Only(ReturnStatus::Pending),
            customer: None,
            page: PageRequest::new(Some(1), Some(3)).unwrap(),
        };
        let page = store.list(&query).await.unwrap();
        let ids: Vec<i32> = page.items.iter().map(|s| s.request.order_id().as_i32()).collect();
        assert_eq!(ids, vec![5, 3, 1]);
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.pages, 2);

        let counts = store.count_by_status(None).await.unwrap();
        assert_eq!(counts.pending, 5);
    }
}
