//! Transition rules for return requests.
//!
//! Every operation takes the current request by reference and returns the
//! next value, so the caller can write it conditionally and re-run the
//! transition against fresher state if another admin got there first.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::error::ReturnError;
use super::model::{
    AdminComment, ImageRef, OrderSnapshot, ReasonCategory, ReturnDetails, ReturnReason,
    ReturnRequest, ReturnState, Review,
};
use super::refund::RefundPolicy;
use crate::types::{AdminUserId, ReturnStatus};

/// Operations that move a request through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    Submit,
    Initiate,
    Approve,
    Reject,
    Complete,
    Cancel,
}

impl TransitionAction {
    /// Status a request must be in for this action, if it must exist.
    #[must_use]
    pub const fn required_status(self) -> Option<ReturnStatus> {
        match self {
            Self::Submit | Self::Initiate => None,
            Self::Approve | Self::Reject | Self::Cancel => Some(ReturnStatus::Pending),
            Self::Complete => Some(ReturnStatus::Approved),
        }
    }

    const fn verb(self) -> &'static str {
        match self {
            Self::Submit => "submitted",
            Self::Initiate => "initiated",
            Self::Approve => "approved",
            Self::Reject => "rejected",
            Self::Complete => "completed",
            Self::Cancel => "cancelled",
        }
    }
}

/// Result of a transition that may legitimately have nothing to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The request moved to a new state.
    Applied(ReturnRequest),
    /// The request was already in the target state; nothing changed.
    Unchanged(ReturnRequest),
}

impl Outcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    #[must_use]
    pub const fn request(&self) -> &ReturnRequest {
        match self {
            Self::Applied(r) | Self::Unchanged(r) => r,
        }
    }

    #[must_use]
    pub fn into_request(self) -> ReturnRequest {
        match self {
            Self::Applied(r) | Self::Unchanged(r) => r,
        }
    }
}

/// Customer-supplied return details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub category: ReasonCategory,
    pub reason: ReturnReason,
    pub images: Vec<ImageRef>,
}

/// Who decided, when, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub reviewer: AdminUserId,
    pub comment: AdminComment,
    pub at: DateTime<Utc>,
}

impl Decision {
    fn into_review(self) -> Review {
        Review {
            reviewed_by: self.reviewer,
            reviewed_at: self.at,
            admin_comment: self.comment,
        }
    }
}

fn wrong_status(request: &ReturnRequest, action: TransitionAction) -> ReturnError {
    let required = action
        .required_status()
        .map_or("absent", ReturnStatus::as_str);
    ReturnError::PreconditionFailed(format!(
        "return request for order #{} is {}; only {required} requests can be {}",
        request.order_id,
        request.status(),
        action.verb()
    ))
}

fn ensure_returnable(order: &OrderSnapshot) -> Result<(), ReturnError> {
    if order.status.is_returnable() {
        Ok(())
    } else {
        Err(ReturnError::PreconditionFailed(format!(
            "order #{} is {}; only delivered orders can be returned",
            order.id, order.status
        )))
    }
}

fn ensure_image_limit(count: usize, max_images: usize) -> Result<(), ReturnError> {
    if count > max_images {
        return Err(ReturnError::InvalidInput(format!(
            "at most {max_images} images can be attached to a return request"
        )));
    }
    Ok(())
}

impl ReturnRequest {
    /// Customer submits (or finishes) a return for `order`.
    ///
    /// With no existing request a new `pending` one is created. A `pending`
    /// request that an admin opened without details is filled in: its
    /// `requested_at` is kept and the new images are appended.
    ///
    /// # Errors
    ///
    /// - `PreconditionFailed` if the order is not delivered
    /// - `Conflict` if a request with details, or a decided request, exists
    /// - `InvalidInput` if more than `max_images` images would be attached
    pub fn submit(
        existing: Option<&Self>,
        order: &OrderSnapshot,
        submission: Submission,
        max_images: usize,
        now: DateTime<Utc>,
    ) -> Result<Self, ReturnError> {
        ensure_returnable(order)?;

        let Submission {
            category,
            reason,
            images,
        } = submission;
        let details = ReturnDetails::Complete { category, reason };

        match existing {
            None => {
                ensure_image_limit(images.len(), max_images)?;
                Ok(Self {
                    order_id: order.id,
                    customer_id: order.customer_id,
                    currency: order.total.currency,
                    details,
                    images,
                    requested_at: now,
                    state: ReturnState::Pending,
                })
            }
            Some(current)
                if current.status() == ReturnStatus::Pending && !current.details.is_complete() =>
            {
                ensure_image_limit(current.images.len() + images.len(), max_images)?;
                let mut next = current.clone();
                next.details = details;
                next.images.extend(images);
                Ok(next)
            }
            Some(current) => Err(ReturnError::Conflict(format!(
                "a return request already exists for order #{} ({})",
                current.order_id,
                current.status()
            ))),
        }
    }

    /// Admin opens a `pending` request without details on behalf of the
    /// customer.
    ///
    /// # Errors
    ///
    /// - `PreconditionFailed` if the order is not delivered
    /// - `Conflict` if any request already exists for the order
    pub fn initiate(
        existing: Option<&Self>,
        order: &OrderSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Self, ReturnError> {
        ensure_returnable(order)?;

        if let Some(current) = existing {
            return Err(ReturnError::Conflict(format!(
                "a return request already exists for order #{} ({})",
                current.order_id,
                current.status()
            )));
        }

        Ok(Self {
            order_id: order.id,
            customer_id: order.customer_id,
            currency: order.total.currency,
            details: ReturnDetails::Incomplete,
            images: Vec::new(),
            requested_at: now,
            state: ReturnState::Pending,
        })
    }

    /// Approve a pending request with a refund.
    ///
    /// The refund defaults to the order total and is checked against
    /// `policy`.
    ///
    /// # Errors
    ///
    /// - `PreconditionFailed` if the request is not pending or has no
    ///   reason/category
    /// - `InvalidInput` if the refund amount violates `policy`
    pub fn approve(
        &self,
        decision: Decision,
        refund_amount: Option<Decimal>,
        policy: &RefundPolicy,
        order: &OrderSnapshot,
    ) -> Result<Self, ReturnError> {
        if self.status() != ReturnStatus::Pending {
            return Err(wrong_status(self, TransitionAction::Approve));
        }
        if !self.details.is_complete() {
            return Err(ReturnError::PreconditionFailed(format!(
                "return request for order #{} has no reason or reason category; it can only be rejected",
                self.order_id
            )));
        }

        let refund = policy.resolve(refund_amount, &order.total)?;

        let mut next = self.clone();
        next.state = ReturnState::Approved {
            review: decision.into_review(),
            refund,
        };
        Ok(next)
    }

    /// Reject a pending request. Works whether or not details are present.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` if the request is not pending.
    pub fn reject(&self, decision: Decision) -> Result<Self, ReturnError> {
        if self.status() != ReturnStatus::Pending {
            return Err(wrong_status(self, TransitionAction::Reject));
        }

        let mut next = self.clone();
        next.state = ReturnState::Rejected {
            review: decision.into_review(),
        };
        Ok(next)
    }

    /// Mark an approved request as completed.
    ///
    /// Completing an already completed request is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` if the request is pending or rejected.
    pub fn complete(&self, now: DateTime<Utc>) -> Result<Outcome, ReturnError> {
        match &self.state {
            ReturnState::Approved { review, refund } => {
                let mut next = self.clone();
                next.state = ReturnState::Completed {
                    review: review.clone(),
                    refund: *refund,
                    completed_at: now,
                };
                Ok(Outcome::Applied(next))
            }
            ReturnState::Completed { .. } => Ok(Outcome::Unchanged(self.clone())),
            ReturnState::Pending | ReturnState::Rejected { .. } => {
                Err(wrong_status(self, TransitionAction::Complete))
            }
        }
    }

    /// Check that the customer may withdraw this request.
    ///
    /// A withdrawn request is removed, so the order can be returned again.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` if the request is not pending.
    pub fn cancel(&self) -> Result<(), ReturnError> {
        if self.status() == ReturnStatus::Pending {
            Ok(())
        } else {
            Err(wrong_status(self, TransitionAction::Cancel))
        }
    }
}
