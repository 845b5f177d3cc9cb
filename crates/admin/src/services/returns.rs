//! Return-request service.
//!
//! Applies the lifecycle rules from `returndesk_core` on top of a
//! [`ReturnStore`]. Every write is conditional on the version that was read,
//! so two admins acting on the same request cannot both succeed: the loser
//! reloads and re-checks the rules against the winner's result.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use returndesk_core::{
    AdminComment, Decision, OrderId, OrderSnapshot, Outcome, PageRequest, RefundPolicy,
    ReturnError, ReturnQuery, ReturnRequest, StatusCounts, StatusFilter, Submission,
};

use crate::db::{ReturnStore, StoredReturn};
use crate::error::AppError;
use crate::models::{
    CurrentAdmin, CurrentCustomer, Principal, RefundInstruction, ReturnListView,
    ReturnRequestView,
};

/// How many times a write is retried after losing a race.
const MAX_ATTEMPTS: usize = 3;

/// What a mutation wants done with the stored request.
enum Change {
    Replace(ReturnRequest, Option<RefundInstruction>),
    Delete,
    Unchanged,
}

/// Return-request operations for admins and customers.
#[derive(Clone)]
pub struct ReturnService {
    store: Arc<dyn ReturnStore>,
    policy: RefundPolicy,
    max_images: usize,
    image_base_url: String,
}

impl ReturnService {
    /// Create a new return service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ReturnStore>,
        policy: RefundPolicy,
        max_images: usize,
        image_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            policy,
            max_images,
            image_base_url: image_base_url.into(),
        }
    }

    /// Maximum number of images a request may carry.
    #[must_use]
    pub const fn max_images(&self) -> usize {
        self.max_images
    }

    fn view(&self, stored: &StoredReturn) -> ReturnRequestView {
        ReturnRequestView::new(
            &stored.request,
            &stored.order,
            stored.customer.clone(),
            &self.image_base_url,
        )
    }

    async fn load_order(&self, order_id: OrderId) -> Result<OrderSnapshot, AppError> {
        self.store
            .order(order_id)
            .await?
            .ok_or_else(|| ReturnError::NotFound(format!("order #{order_id} not found")).into())
    }

    async fn load(&self, order_id: OrderId) -> Result<StoredReturn, AppError> {
        self.store.get(order_id).await?.ok_or_else(|| {
            ReturnError::NotFound(format!("no return request for order #{order_id}")).into()
        })
    }

    /// Create a request, retrying if another writer creates or changes one
    /// first.
    async fn create<F>(&self, order: OrderSnapshot, mut build: F) -> Result<StoredReturn, AppError>
    where
        F: FnMut(Option<&StoredReturn>) -> Result<ReturnRequest, ReturnError> + Send,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            let existing = self.store.get(order.id).await?;
            let request = build(existing.as_ref())?;

            let written = match &existing {
                None => self.store.insert(&request).await?,
                Some(current) => self.store.replace(current.version, &request, None).await?,
            };
            if written {
                return self.load(order.id).await;
            }
            debug!(order_id = %order.id, attempt, "Return request changed concurrently, retrying");
        }

        warn!(order_id = %order.id, "Gave up after repeated concurrent writes");
        Err(ReturnError::Conflict(format!(
            "return request for order #{} is being modified; try again",
            order.id
        ))
        .into())
    }

    /// Apply `change` to an existing request under a version check.
    ///
    /// Returns the stored request after the write, or `None` if it was
    /// deleted.
    async fn mutate<F>(
        &self,
        order_id: OrderId,
        mut change: F,
    ) -> Result<Option<StoredReturn>, AppError>
    where
        F: FnMut(&StoredReturn) -> Result<Change, ReturnError> + Send,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            let current = self.load(order_id).await?;

            let written = match change(&current)? {
                Change::Unchanged => return Ok(Some(current)),
                Change::Delete => {
                    if self.store.delete(order_id, current.version).await? {
                        return Ok(None);
                    }
                    false
                }
                Change::Replace(next, refund) => {
                    self.store
                        .replace(current.version, &next, refund.as_ref())
                        .await?
                }
            };
            if written {
                return self.load(order_id).await.map(Some);
            }
            debug!(order_id = %order_id, attempt, "Return request changed concurrently, retrying");
        }

        warn!(order_id = %order_id, "Gave up after repeated concurrent writes");
        Err(ReturnError::Conflict(format!(
            "return request for order #{order_id} is being modified; try again"
        ))
        .into())
    }

    // =========================================================================
    // Customer operations
    // =========================================================================

    /// Submit a return for one of the customer's delivered orders.
    ///
    /// Also fills in a request an admin opened without details.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist
    /// - `Unauthorized` if the order belongs to someone else
    /// - any error from [`ReturnRequest::submit`]
    #[instrument(skip(self, submission), fields(customer_id = %customer.id, order_id = %order_id))]
    pub async fn submit(
        &self,
        customer: &CurrentCustomer,
        order_id: OrderId,
        submission: Submission,
    ) -> Result<ReturnRequestView, AppError> {
        let order = self.load_order(order_id).await?;
        customer.ensure_owns(order.customer_id)?;

        let max_images = self.max_images;
        let stored = self
            .create(order, |existing| {
                ReturnRequest::submit(
                    existing.map(|s| &s.request),
                    &order,
                    submission.clone(),
                    max_images,
                    Utc::now(),
                )
            })
            .await?;

        info!(category = %submission.category, "Return request submitted");
        Ok(self.view(&stored))
    }

    /// Withdraw the customer's pending request.
    ///
    /// # Errors
    ///
    /// - `NotFound` if there is no request
    /// - `Unauthorized` if the request belongs to someone else
    /// - `PreconditionFailed` if the request is no longer pending
    #[instrument(skip(self), fields(customer_id = %customer.id, order_id = %order_id))]
    pub async fn cancel(
        &self,
        customer: &CurrentCustomer,
        order_id: OrderId,
    ) -> Result<(), AppError> {
        self.mutate(order_id, |current| {
            customer.ensure_owns(current.request.customer_id())?;
            current.request.cancel()?;
            Ok(Change::Delete)
        })
        .await?;

        info!("Return request cancelled");
        Ok(())
    }

    /// The customer's own requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    #[instrument(skip(self), fields(customer_id = %customer.id))]
    pub async fn list_mine(
        &self,
        customer: &CurrentCustomer,
        status: StatusFilter,
        page: PageRequest,
    ) -> Result<ReturnListView, AppError> {
        self.list_query(ReturnQuery {
            status,
            customer: Some(customer.id),
            page,
        })
        .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A single request. Admins may read any; customers only their own.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order or request does not exist
    /// - `Unauthorized` if a customer asks for someone else's order
    #[instrument(skip(self, principal), fields(order_id = %order_id))]
    pub async fn get(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<ReturnRequestView, AppError> {
        if let Principal::Customer(customer) = principal {
            let order = self.load_order(order_id).await?;
            customer.ensure_owns(order.customer_id)?;
        }

        let stored = self.load(order_id).await?;
        Ok(self.view(&stored))
    }

    /// All requests matching `status`, newest first.
    ///
    /// Any admin role may list.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id, status = %status))]
    pub async fn list(
        &self,
        admin: &CurrentAdmin,
        status: StatusFilter,
        page: PageRequest,
    ) -> Result<ReturnListView, AppError> {
        self.list_query(ReturnQuery {
            status,
            customer: None,
            page,
        })
        .await
    }

    async fn list_query(&self, query: ReturnQuery) -> Result<ReturnListView, AppError> {
        let page = self.store.list(&query).await?.map(|stored| self.view(&stored));

        Ok(ReturnListView {
            return_requests: page.items,
            pagination: page.pagination,
        })
    }

    /// Number of requests in each status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn counts(&self, admin: &CurrentAdmin) -> Result<StatusCounts, AppError> {
        Ok(self.store.count_by_status(None).await?)
    }

    // =========================================================================
    // Admin operations
    // =========================================================================

    /// Open a request on a customer's behalf, without details.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for read-only roles
    /// - `NotFound` if the order does not exist
    /// - any error from [`ReturnRequest::initiate`]
    #[instrument(skip(self, admin), fields(admin_id = %admin.id, order_id = %order_id))]
    pub async fn initiate(
        &self,
        admin: &CurrentAdmin,
        order_id: OrderId,
    ) -> Result<ReturnRequestView, AppError> {
        admin.ensure_can_review()?;
        let order = self.load_order(order_id).await?;

        let stored = self
            .create(order, |existing| {
                ReturnRequest::initiate(existing.map(|s| &s.request), &order, Utc::now())
            })
            .await?;

        info!("Return request initiated");
        Ok(self.view(&stored))
    }

    /// Approve a pending request.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for read-only roles
    /// - `InvalidInput` for an empty comment or a refund the policy rejects
    /// - `NotFound` if there is no request
    /// - `PreconditionFailed` if the request is not pending or lacks details
    #[instrument(skip(self, admin, comment), fields(admin_id = %admin.id, order_id = %order_id))]
    pub async fn approve(
        &self,
        admin: &CurrentAdmin,
        order_id: OrderId,
        comment: &str,
        refund_amount: Option<Decimal>,
    ) -> Result<ReturnRequestView, AppError> {
        admin.ensure_can_review()?;
        let comment = AdminComment::parse(comment)?;

        let stored = self
            .mutate(order_id, |current| {
                let decision = Decision {
                    reviewer: admin.id,
                    comment: comment.clone(),
                    at: Utc::now(),
                };
                let next =
                    current
                        .request
                        .approve(decision, refund_amount, &self.policy, &current.order)?;
                Ok(Change::Replace(next, None))
            })
            .await?
            .ok_or_else(|| AppError::Internal("approved request disappeared".to_string()))?;

        info!(refund = ?stored.request.state().refund(), "Return request approved");
        Ok(self.view(&stored))
    }

    /// Reject a pending request.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for read-only roles
    /// - `InvalidInput` for an empty comment
    /// - `NotFound` if there is no request
    /// - `PreconditionFailed` if the request is not pending
    #[instrument(skip(self, admin, comment), fields(admin_id = %admin.id, order_id = %order_id))]
    pub async fn reject(
        &self,
        admin: &CurrentAdmin,
        order_id: OrderId,
        comment: &str,
    ) -> Result<ReturnRequestView, AppError> {
        admin.ensure_can_review()?;
        let comment = AdminComment::parse(comment)?;

        let stored = self
            .mutate(order_id, |current| {
                let decision = Decision {
                    reviewer: admin.id,
                    comment: comment.clone(),
                    at: Utc::now(),
                };
                Ok(Change::Replace(current.request.reject(decision)?, None))
            })
            .await?
            .ok_or_else(|| AppError::Internal("rejected request disappeared".to_string()))?;

        info!("Return request rejected");
        Ok(self.view(&stored))
    }

    /// Complete an approved request and record the refund hand-off.
    ///
    /// Completing twice is a no-op and records no second refund.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for read-only roles
    /// - `NotFound` if there is no request
    /// - `PreconditionFailed` if the request is pending or rejected
    #[instrument(skip(self, admin), fields(admin_id = %admin.id, order_id = %order_id))]
    pub async fn complete(
        &self,
        admin: &CurrentAdmin,
        order_id: OrderId,
    ) -> Result<ReturnRequestView, AppError> {
        admin.ensure_can_review()?;

        let stored = self
            .mutate(order_id, |current| {
                match current.request.complete(Utc::now())? {
                    Outcome::Applied(next) => {
                        let refund = RefundInstruction::for_completed(&next, admin.id);
                        Ok(Change::Replace(next, refund))
                    }
                    Outcome::Unchanged(_) => Ok(Change::Unchanged),
                }
            })
            .await?
            .ok_or_else(|| AppError::Internal("completed request disappeared".to_string()))?;

        info!("Return request completed");
        Ok(self.view(&stored))
    }
}
