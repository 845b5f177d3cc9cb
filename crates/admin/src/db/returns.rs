//! `PostgreSQL` storage for return requests.
//!
//! Each order has at most one row in `admin.return_request`. Rows carry a
//! `version` that every write increments, and every write is conditional on
//! the version the caller read, so two admins acting on the same request
//! cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use returndesk_core::{
    AdminUserId, CurrencyCode, CustomerId, Money, OrderId, OrderSnapshot, OrderStatus, Page,
    Pagination, ReasonCategory, ReturnQuery, ReturnRecord, ReturnRequest, ReturnStatus,
    StatusCounts,
};

use super::RepositoryError;
use super::store::{ReturnStore, StoredReturn};
use crate::models::{CustomerSummary, RefundInstruction};

// =============================================================================
// Internal Row Types
// =============================================================================

const SELECT_RETURN: &str = r"
    SELECT r.order_id, r.version, r.status, r.reason_category, r.reason, r.images,
           r.requested_at, r.admin_comment, r.refund_amount, r.reviewed_by,
           r.reviewed_at, r.completed_at,
           o.customer_id, o.total_amount, o.currency, o.status AS order_status,
           c.name AS customer_name, c.email AS customer_email
    FROM admin.return_request r
    JOIN admin.customer_order o ON o.id = r.order_id
    LEFT JOIN admin.customer c ON c.id = o.customer_id
";

/// Internal row type for return request queries.
#[derive(Debug, sqlx::FromRow)]
struct ReturnRow {
    order_id: i32,
    version: i64,
    status: ReturnStatus,
    reason_category: Option<ReasonCategory>,
    reason: Option<String>,
    images: Vec<String>,
    requested_at: DateTime<Utc>,
    admin_comment: Option<String>,
    refund_amount: Option<Decimal>,
    reviewed_by: Option<i32>,
    reviewed_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    customer_id: i32,
    total_amount: Decimal,
    currency: String,
    order_status: OrderStatus,
    customer_name: Option<String>,
    customer_email: Option<String>,
}

fn parse_currency(raw: &str) -> Result<CurrencyCode, RepositoryError> {
    raw.parse::<CurrencyCode>()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid currency in database: {e}")))
}

impl TryFrom<ReturnRow> for StoredReturn {
    type Error = RepositoryError;

    fn try_from(row: ReturnRow) -> Result<Self, Self::Error> {
        let currency = parse_currency(&row.currency)?;
        let order = OrderSnapshot {
            id: OrderId::new(row.order_id),
            customer_id: CustomerId::new(row.customer_id),
            total: Money::new(row.total_amount, currency),
            status: row.order_status,
        };

        let customer = match (row.customer_name, row.customer_email) {
            (Some(name), Some(email)) => Some(CustomerSummary {
                id: order.customer_id,
                name,
                email,
            }),
            _ => None,
        };

        let record = ReturnRecord {
            order_id: order.id,
            customer_id: order.customer_id,
            request_status: row.status,
            reason_category: row.reason_category,
            reason: row.reason,
            images: row.images,
            requested_at: row.requested_at,
            admin_comment: row.admin_comment,
            refund_amount: row.refund_amount,
            currency,
            reviewed_by: row.reviewed_by.map(AdminUserId::new),
            reviewed_at: row.reviewed_at,
            completed_at: row.completed_at,
        };

        let request = ReturnRequest::try_from(record).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid return request in database: {e}"))
        })?;

        Ok(Self {
            request,
            version: row.version,
            order,
            customer,
        })
    }
}

/// Internal row type for order snapshots.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    customer_id: i32,
    total_amount: Decimal,
    currency: String,
    status: OrderStatus,
}

impl TryFrom<OrderRow> for OrderSnapshot {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            total: Money::new(row.total_amount, parse_currency(&row.currency)?),
            status: row.status,
        })
    }
}

fn to_u64(n: i64) -> Result<u64, RepositoryError> {
    u64::try_from(n).map_err(|_| RepositoryError::DataCorruption(format!("negative count: {n}")))
}

// =============================================================================
// Repository
// =============================================================================

/// Return request storage backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgReturnStore {
    pool: PgPool,
}

impl PgReturnStore {
    /// Create a new return store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Borrow the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Refund instructions recorded for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn refunds_for(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<RefundInstruction>, RepositoryError> {
        let rows: Vec<(String, i32, Decimal, String, i32, DateTime<Utc>)> = sqlx::query_as(
            r"
            SELECT idempotency_key, order_id, amount, currency, requested_by, created_at
            FROM admin.refund_request
            WHERE order_id = $1
            ORDER BY created_at
            ",
        )
        .bind(order_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(key, order_id, amount, currency, requested_by, created_at)| {
                Ok(RefundInstruction {
                    idempotency_key: key,
                    order_id: OrderId::new(order_id),
                    amount: Money::new(amount, parse_currency(&currency)?),
                    requested_by: AdminUserId::new(requested_by),
                    created_at,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ReturnStore for PgReturnStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<OrderSnapshot>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r"
            SELECT id, customer_id, total_amount, currency, status
            FROM admin.customer_order
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get(&self, id: OrderId) -> Result<Option<StoredReturn>, RepositoryError> {
        let sql = format!("{SELECT_RETURN} WHERE r.order_id = $1");
        let row: Option<ReturnRow> = sqlx::query_as(&sql)
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert(&self, request: &ReturnRequest) -> Result<bool, RepositoryError> {
        let record = request.to_record();
        let result = sqlx::query(
            r"
            INSERT INTO admin.return_request (
                order_id, version, status, reason_category, reason, images,
                requested_at, admin_comment, refund_amount, reviewed_by,
                reviewed_at, completed_at
            )
            VALUES ($1, 1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (order_id) DO NOTHING
            ",
        )
        .bind(record.order_id.as_i32())
        .bind(record.request_status)
        .bind(record.reason_category)
        .bind(&record.reason)
        .bind(&record.images)
        .bind(record.requested_at)
        .bind(&record.admin_comment)
        .bind(record.refund_amount)
        .bind(record.reviewed_by.map(|id| id.as_i32()))
        .bind(record.reviewed_at)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn replace(
        &self,
        expected_version: i64,
        request: &ReturnRequest,
        refund: Option<&RefundInstruction>,
    ) -> Result<bool, RepositoryError> {
        let record = request.to_record();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE admin.return_request
            SET version = version + 1,
                status = $3,
                reason_category = $4,
                reason = $5,
                images = $6,
                admin_comment = $7,
                refund_amount = $8,
                reviewed_by = $9,
                reviewed_at = $10,
                completed_at = $11
            WHERE order_id = $1 AND version = $2
            ",
        )
        .bind(record.order_id.as_i32())
        .bind(expected_version)
        .bind(record.request_status)
        .bind(record.reason_category)
        .bind(&record.reason)
        .bind(&record.images)
        .bind(&record.admin_comment)
        .bind(record.refund_amount)
        .bind(record.reviewed_by.map(|id| id.as_i32()))
        .bind(record.reviewed_at)
        .bind(record.completed_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(refund) = refund {
            sqlx::query(
                r"
                INSERT INTO admin.refund_request (
                    idempotency_key, order_id, amount, currency, requested_by, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (idempotency_key) DO NOTHING
                ",
            )
            .bind(&refund.idempotency_key)
            .bind(refund.order_id.as_i32())
            .bind(refund.amount.amount)
            .bind(refund.amount.currency.code())
            .bind(refund.requested_by.as_i32())
            .bind(refund.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, id: OrderId, expected_version: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM admin.return_request
            WHERE order_id = $1 AND version = $2
            ",
        )
        .bind(id.as_i32())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, query: &ReturnQuery) -> Result<Page<StoredReturn>, RepositoryError> {
        let status = query.status.status();
        let customer = query.customer.map(|c| c.as_i32());

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM admin.return_request r
            JOIN admin.customer_order o ON o.id = r.order_id
            WHERE ($1::admin.return_status IS NULL OR r.status = $1)
              AND ($2::int IS NULL OR o.customer_id = $2)
            ",
        )
        .bind(status)
        .bind(customer)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "{SELECT_RETURN}
            WHERE ($1::admin.return_status IS NULL OR r.status = $1)
              AND ($2::int IS NULL OR o.customer_id = $2)
            ORDER BY r.requested_at DESC, r.order_id DESC
            LIMIT $3 OFFSET $4"
        );
        let offset = i64::try_from(query.page.offset()).unwrap_or(i64::MAX);
        let rows: Vec<ReturnRow> = sqlx::query_as(&sql)
            .bind(status)
            .bind(customer)
            .bind(i64::from(query.page.limit()))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            pagination: Pagination::new(query.page, to_u64(total)?),
        })
    }

    async fn count_by_status(
        &self,
        customer: Option<CustomerId>,
    ) -> Result<StatusCounts, RepositoryError> {
        let rows: Vec<(ReturnStatus, i64)> = sqlx::query_as(
            r"
            SELECT r.status, COUNT(*)
            FROM admin.return_request r
            JOIN admin.customer_order o ON o.id = r.order_id
            WHERE ($1::int IS NULL OR o.customer_id = $1)
            GROUP BY r.status
            ",
        )
        .bind(customer.map(|c| c.as_i32()))
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.add(status, to_u64(n)?);
        }
        Ok(counts)
    }
}
