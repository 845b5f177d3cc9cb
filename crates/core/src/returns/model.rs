//! Return-request entity and its validated fields.

use core::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ReturnError;
use crate::types::{AdminUserId, CurrencyCode, CustomerId, Money, OrderId, OrderStatus, ReturnStatus};

/// Why the customer is sending the order back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "admin.return_reason_category", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    DamagedItem,
    WrongItem,
    NotAsDescribed,
    SizeIssue,
    QualityIssue,
    ChangedMind,
    Other,
}

impl ReasonCategory {
    /// Every category accepted on submission.
    pub const ALL: [Self; 7] = [
        Self::DamagedItem,
        Self::WrongItem,
        Self::NotAsDescribed,
        Self::SizeIssue,
        Self::QualityIssue,
        Self::ChangedMind,
        Self::Other,
    ];

    /// Wire name, e.g. `damaged_item`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DamagedItem => "damaged_item",
            Self::WrongItem => "wrong_item",
            Self::NotAsDescribed => "not_as_described",
            Self::SizeIssue => "size_issue",
            Self::QualityIssue => "quality_issue",
            Self::ChangedMind => "changed_mind",
            Self::Other => "other",
        }
    }

    /// Human label, e.g. `Damaged Item`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DamagedItem => "Damaged Item",
            Self::WrongItem => "Wrong Item",
            Self::NotAsDescribed => "Not As Described",
            Self::SizeIssue => "Size Issue",
            Self::QualityIssue => "Quality Issue",
            Self::ChangedMind => "Changed Mind",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ReasonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReasonCategory {
    type Err = ReturnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted.is_empty() {
            return Err(ReturnError::InvalidInput(
                "reason category is required".to_string(),
            ));
        }
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ReturnError::InvalidInput(format!("unknown reason category: {wanted}")))
    }
}

/// Trim `input` and check it is non-empty and within `max` characters.
fn validated_text(input: &str, field: &str, max: usize) -> Result<String, ReturnError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ReturnError::InvalidInput(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(ReturnError::InvalidInput(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

/// Customer's free-text justification for a return.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReturnReason(String);

impl ReturnReason {
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 2000;

    /// Parse a reason, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `ReturnError::InvalidInput` if the reason is blank or too long.
    pub fn parse(s: &str) -> Result<Self, ReturnError> {
        validated_text(s, "reason", Self::MAX_LENGTH).map(Self)
    }

    /// Returns the reason as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReturnReason {
    type Error = ReturnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReturnReason> for String {
    fn from(value: ReturnReason) -> Self {
        value.0
    }
}

/// Admin's note recorded with an approve or reject decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AdminComment(String);

impl AdminComment {
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 2000;

    /// Parse a comment, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `ReturnError::InvalidInput` if the comment is blank or too long.
    pub fn parse(s: &str) -> Result<Self, ReturnError> {
        validated_text(s, "admin comment", Self::MAX_LENGTH).map(Self)
    }

    /// Returns the comment as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AdminComment {
    type Error = ReturnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AdminComment> for String {
    fn from(value: AdminComment) -> Self {
        value.0
    }
}

/// Opaque reference to an uploaded evidence image.
///
/// References are server-relative paths such as
/// `/uploads/returns/42/3f0c….jpg`; they are resolved against the configured
/// image base URL only when shown to a person.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageRef(String);

impl ImageRef {
    /// Maximum length of a reference.
    pub const MAX_LENGTH: usize = 512;

    /// Parse a reference.
    ///
    /// # Errors
    ///
    /// Returns `ReturnError::InvalidInput` unless the reference is a
    /// non-empty absolute path without parent-directory segments.
    pub fn parse(s: &str) -> Result<Self, ReturnError> {
        if s.is_empty() || s.len() > Self::MAX_LENGTH {
            return Err(ReturnError::InvalidInput(
                "image reference must be 1-512 characters".to_string(),
            ));
        }
        if !s.starts_with('/') || s.split('/').any(|segment| segment == "..") {
            return Err(ReturnError::InvalidInput(format!(
                "invalid image reference: {s}"
            )));
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join the reference onto a base URL such as `https://cdn.example.com`.
    #[must_use]
    pub fn resolve(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl TryFrom<String> for ImageRef {
    type Error = ReturnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ImageRef> for String {
    fn from(value: ImageRef) -> Self {
        value.0
    }
}

/// Whether the customer has told us why they are returning the order.
///
/// A request opened by an admin before the customer fills in the form is
/// `Incomplete`; only a `Complete` request can be approved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnDetails {
    Incomplete,
    Complete {
        category: ReasonCategory,
        reason: ReturnReason,
    },
}

impl ReturnDetails {
    /// Build details from optional stored columns.
    ///
    /// Anything short of both fields is `Incomplete`.
    #[must_use]
    pub fn from_parts(category: Option<ReasonCategory>, reason: Option<ReturnReason>) -> Self {
        match (category, reason) {
            (Some(category), Some(reason)) => Self::Complete { category, reason },
            _ => Self::Incomplete,
        }
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    #[must_use]
    pub const fn category(&self) -> Option<ReasonCategory> {
        match self {
            Self::Complete { category, .. } => Some(*category),
            Self::Incomplete => None,
        }
    }

    #[must_use]
    pub const fn reason(&self) -> Option<&ReturnReason> {
        match self {
            Self::Complete { reason, .. } => Some(reason),
            Self::Incomplete => None,
        }
    }
}

/// An admin decision on a pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub reviewed_by: AdminUserId,
    pub reviewed_at: DateTime<Utc>,
    pub admin_comment: AdminComment,
}

/// Status together with the data that status implies.
///
/// Review data only exists once a decision was made, and a refund only
/// exists on the approved branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnState {
    Pending,
    Approved {
        review: Review,
        refund: Money,
    },
    Rejected {
        review: Review,
    },
    Completed {
        review: Review,
        refund: Money,
        completed_at: DateTime<Utc>,
    },
}

impl ReturnState {
    #[must_use]
    pub const fn status(&self) -> ReturnStatus {
        match self {
            Self::Pending => ReturnStatus::Pending,
            Self::Approved { .. } => ReturnStatus::Approved,
            Self::Rejected { .. } => ReturnStatus::Rejected,
            Self::Completed { .. } => ReturnStatus::Completed,
        }
    }

    #[must_use]
    pub const fn review(&self) -> Option<&Review> {
        match self {
            Self::Pending => None,
            Self::Approved { review, .. }
            | Self::Rejected { review }
            | Self::Completed { review, .. } => Some(review),
        }
    }

    #[must_use]
    pub const fn refund(&self) -> Option<&Money> {
        match self {
            Self::Approved { refund, .. } | Self::Completed { refund, .. } => Some(refund),
            Self::Pending | Self::Rejected { .. } => None,
        }
    }
}

/// What the return workflow needs to know about the parent order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub total: Money,
    pub status: OrderStatus,
}

/// A return request attached to one order.
///
/// Fields are private: requests are only created and changed through the
/// transitions in [`super::machine`], so every value of this type satisfies
/// the lifecycle invariants. The serialized form is the flat
/// [`ReturnRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ReturnRecord", try_from = "ReturnRecord")]
pub struct ReturnRequest {
    pub(super) order_id: OrderId,
    pub(super) customer_id: CustomerId,
    pub(super) currency: CurrencyCode,
    pub(super) details: ReturnDetails,
    pub(super) images: Vec<ImageRef>,
    pub(super) requested_at: DateTime<Utc>,
    pub(super) state: ReturnState,
}

impl ReturnRequest {
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.order_id
    }

    #[must_use]
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    #[must_use]
    pub const fn status(&self) -> ReturnStatus {
        self.state.status()
    }

    #[must_use]
    pub const fn state(&self) -> &ReturnState {
        &self.state
    }

    #[must_use]
    pub const fn details(&self) -> &ReturnDetails {
        &self.details
    }

    #[must_use]
    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    #[must_use]
    pub const fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    /// Listing order: most recent first, ties broken by order ID descending.
    #[must_use]
    pub fn newest_first(a: &Self, b: &Self) -> core::cmp::Ordering {
        b.requested_at
            .cmp(&a.requested_at)
            .then_with(|| b.order_id.cmp(&a.order_id))
    }

    /// Flatten into the storage/wire representation.
    #[must_use]
    pub fn to_record(&self) -> ReturnRecord {
        ReturnRecord::from(self.clone())
    }
}

/// Flat representation of a return request, used for storage rows and the
/// JSON API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRecord {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub request_status: ReturnStatus,
    pub reason_category: Option<ReasonCategory>,
    pub reason: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub requested_at: DateTime<Utc>,
    pub admin_comment: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub currency: CurrencyCode,
    pub reviewed_by: Option<AdminUserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ReturnRequest> for ReturnRecord {
    fn from(request: ReturnRequest) -> Self {
        let review = request.state.review().cloned();
        let refund = request.state.refund().map(|m| m.amount);
        let completed_at = match &request.state {
            ReturnState::Completed { completed_at, .. } => Some(*completed_at),
            _ => None,
        };

        Self {
            order_id: request.order_id,
            customer_id: request.customer_id,
            request_status: request.state.status(),
            reason_category: request.details.category(),
            reason: request.details.reason().map(|r| r.as_str().to_owned()),
            images: request.images.into_iter().map(String::from).collect(),
            requested_at: request.requested_at,
            admin_comment: review.as_ref().map(|r| r.admin_comment.as_str().to_owned()),
            refund_amount: refund,
            currency: request.currency,
            reviewed_by: review.as_ref().map(|r| r.reviewed_by),
            reviewed_at: review.as_ref().map(|r| r.reviewed_at),
            completed_at,
        }
    }
}

impl TryFrom<ReturnRecord> for ReturnRequest {
    type Error = ReturnError;

    fn try_from(record: ReturnRecord) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| {
            ReturnError::InvalidInput(format!(
                "return request for order #{} {what}",
                record.order_id
            ))
        };

        let reason = record.reason.as_deref().map(ReturnReason::parse).transpose()?;
        let details = ReturnDetails::from_parts(record.reason_category, reason);

        let images = record
            .images
            .iter()
            .map(|i| ImageRef::parse(i))
            .collect::<Result<Vec<_>, _>>()?;

        let review = match (record.reviewed_by, record.reviewed_at, &record.admin_comment) {
            (Some(reviewed_by), Some(reviewed_at), Some(comment)) => Some(Review {
                reviewed_by,
                reviewed_at,
                admin_comment: AdminComment::parse(comment)?,
            }),
            (None, None, None) => None,
            _ => return Err(corrupt("has a partial review")),
        };

        let refund = record
            .refund_amount
            .map(|amount| Money::new(amount, record.currency));

        let state = match (record.request_status, review, refund, record.completed_at) {
            (ReturnStatus::Pending, None, None, None) => ReturnState::Pending,
            (ReturnStatus::Approved, Some(review), Some(refund), None) => {
                ReturnState::Approved { review, refund }
            }
            (ReturnStatus::Rejected, Some(review), None, None) => ReturnState::Rejected { review },
            (ReturnStatus::Completed, Some(review), Some(refund), Some(completed_at)) => {
                ReturnState::Completed {
                    review,
                    refund,
                    completed_at,
                }
            }
            (status, ..) => {
                return Err(corrupt(&format!(
                    "has fields inconsistent with status {status}"
                )));
            }
        };

        Ok(Self {
            order_id: record.order_id,
            customer_id: record.customer_id,
            currency: record.currency,
            details,
            images,
            requested_at: record.requested_at,
            state,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn pending_record() -> ReturnRecord {
        ReturnRecord {
            order_id: OrderId::new(42),
            customer_id: CustomerId::new(7),
            request_status: ReturnStatus::Pending,
            reason_category: Some(ReasonCategory::DamagedItem),
            reason: Some("box damaged".to_string()),
            images: vec!["/uploads/returns/42/a.jpg".to_string()],
            requested_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            admin_comment: None,
            refund_amount: None,
            currency: CurrencyCode::INR,
            reviewed_by: None,
            reviewed_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_reason_is_trimmed_and_required() {
        assert_eq!(ReturnReason::parse("  box damaged ").unwrap().as_str(), "box damaged");
        assert!(matches!(
            ReturnReason::parse("   "),
            Err(ReturnError::InvalidInput(_))
        ));
        let long = "x".repeat(ReturnReason::MAX_LENGTH + 1);
        assert!(ReturnReason::parse(&long).is_err());
    }

    #[test]
    fn test_admin_comment_required() {
        assert!(AdminComment::parse("").is_err());
        assert_eq!(
            AdminComment::parse("confirmed damage").unwrap().as_str(),
            "confirmed damage"
        );
    }

    #[test]
    fn test_reason_category_parse() {
        assert_eq!(
            "wrong_item".parse::<ReasonCategory>().unwrap(),
            ReasonCategory::WrongItem
        );
        assert!(matches!(
            "".parse::<ReasonCategory>(),
            Err(ReturnError::InvalidInput(_))
        ));
        assert!("broken".parse::<ReasonCategory>().is_err());
        assert_eq!(ReasonCategory::NotAsDescribed.label(), "Not As Described");
    }

    #[test]
    fn test_image_ref_rejects_traversal_and_relative_paths() {
        assert!(ImageRef::parse("/uploads/returns/1/a.jpg").is_ok());
        assert!(ImageRef::parse("uploads/a.jpg").is_err());
        assert!(ImageRef::parse("/uploads/../etc/passwd").is_err());
        assert!(ImageRef::parse("").is_err());
    }

    #[test]
    fn test_image_ref_resolve() {
        let image = ImageRef::parse("/uploads/returns/1/a.jpg").unwrap();
        assert_eq!(
            image.resolve("https://cdn.example.com/"),
            "https://cdn.example.com/uploads/returns/1/a.jpg"
        );
    }

    #[test]
    fn test_details_from_parts_requires_both_fields() {
        let reason = ReturnReason::parse("wrong size").unwrap();
        assert!(ReturnDetails::from_parts(Some(ReasonCategory::SizeIssue), Some(reason.clone()))
            .is_complete());
        assert!(!ReturnDetails::from_parts(None, Some(reason)).is_complete());
        assert!(!ReturnDetails::from_parts(Some(ReasonCategory::SizeIssue), None).is_complete());
    }

    #[test]
    fn test_record_round_trip_preserves_request() {
        let request = ReturnRequest::try_from(pending_record()).unwrap();
        assert_eq!(request.status(), ReturnStatus::Pending);
        assert!(request.details().is_complete());
        assert_eq!(request.to_record(), pending_record());
    }

    #[test]
    fn test_record_with_review_while_pending_is_rejected() {
        let mut record = pending_record();
        record.admin_comment = Some("looks fine".to_string());
        record.reviewed_by = Some(AdminUserId::new(1));
        record.reviewed_at = Some(record.requested_at);
        assert!(ReturnRequest::try_from(record).is_err());
    }

    #[test]
    fn test_record_with_refund_on_rejected_is_rejected() {
        let mut record = pending_record();
        record.request_status = ReturnStatus::Rejected;
        record.admin_comment = Some("no".to_string());
        record.reviewed_by = Some(AdminUserId::new(1));
        record.reviewed_at = Some(record.requested_at);
        record.refund_amount = Some(Decimal::new(100, 0));
        assert!(ReturnRequest::try_from(record).is_err());
    }

    #[test]
    fn test_json_uses_flat_camel_case_record() {
        let request = ReturnRequest::try_from(pending_record()).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["orderId"], 42);
        assert_eq!(json["requestStatus"], "pending");
        assert_eq!(json["reasonCategory"], "damaged_item");
        assert!(json["adminComment"].is_null());

        let parsed: ReturnRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, request);
    }
}
