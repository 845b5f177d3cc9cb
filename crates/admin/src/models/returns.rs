//! Wire types for the return-request API.
//!
//! Every successful response is wrapped in [`ApiEnvelope`]; failures use
//! [`ApiErrorBody`] with a stable `error` code.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use returndesk_core::{
    AdminUserId, CurrencyCode, CustomerId, Money, OrderId, OrderSnapshot, OrderStatus, Pagination,
    ReturnRecord, ReturnRequest, ReturnState,
};

/// Successful response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    #[must_use]
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub success: bool,
    /// Stable machine-readable code, e.g. `precondition_failed`.
    pub error: String,
    pub message: String,
}

/// Customer details shown next to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
}

/// An order with its return request, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequestView {
    pub order_id: OrderId,
    pub total_amount: Decimal,
    pub currency: CurrencyCode,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub customer: Option<CustomerSummary>,
    pub return_request: ReturnRecord,
    /// Image references resolved to absolute URLs, in upload order.
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl ReturnRequestView {
    /// Build the view for a stored request.
    #[must_use]
    pub fn new(
        request: &ReturnRequest,
        order: &OrderSnapshot,
        customer: Option<CustomerSummary>,
        image_base_url: &str,
    ) -> Self {
        Self {
            order_id: order.id,
            total_amount: order.total.amount,
            currency: order.total.currency,
            order_status: order.status,
            customer,
            return_request: request.to_record(),
            image_urls: request
                .images()
                .iter()
                .map(|image| image.resolve(image_base_url))
                .collect(),
        }
    }

    /// Order total as money.
    #[must_use]
    pub const fn order_total(&self) -> Money {
        Money::new(self.total_amount, self.currency)
    }
}

/// A page of return requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnListView {
    pub return_requests: Vec<ReturnRequestView>,
    pub pagination: Pagination,
}

/// Body of `POST /orders/{id}/return-request/approve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveBody {
    pub admin_comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<Decimal>,
}

/// Body of `POST /orders/{id}/return-request/reject`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectBody {
    pub admin_comment: String,
}

/// A refund hand-off recorded when a return is completed.
///
/// The idempotency key is the order plus the target state, so recording the
/// same completion twice keeps a single instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundInstruction {
    pub idempotency_key: String,
    pub order_id: OrderId,
    pub amount: Money,
    pub requested_by: AdminUserId,
    pub created_at: DateTime<Utc>,
}

impl RefundInstruction {
    /// Instruction for a request that has just been completed.
    ///
    /// Returns `None` unless the request is completed.
    #[must_use]
    pub fn for_completed(request: &ReturnRequest, requested_by: AdminUserId) -> Option<Self> {
        let ReturnState::Completed {
            refund,
            completed_at,
            ..
        } = request.state()
        else {
            return None;
        };

        Some(Self {
            idempotency_key: format!("{}:completed", request.order_id()),
            order_id: request.order_id(),
            amount: *refund,
            requested_by,
            created_at: *completed_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use returndesk_core::ReturnStatus;

    fn approved_record() -> ReturnRecord {
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        ReturnRecord {
            order_id: OrderId::new(77),
            customer_id: CustomerId::new(3),
            request_status: ReturnStatus::Approved,
            reason_category: Some(returndesk_core::ReasonCategory::WrongItem),
            reason: Some("sent the blue one".to_string()),
            images: vec!["/uploads/returns/77/a.png".to_string()],
            requested_at: at,
            admin_comment: Some("ok".to_string()),
            refund_amount: Some(Decimal::new(1250, 2)),
            currency: CurrencyCode::INR,
            reviewed_by: Some(AdminUserId::new(1)),
            reviewed_at: Some(at),
            completed_at: None,
        }
    }

    fn order() -> OrderSnapshot {
        OrderSnapshot {
            id: OrderId::new(77),
            customer_id: CustomerId::new(3),
            total: Money::new(Decimal::new(1250, 2), CurrencyCode::INR),
            status: OrderStatus::Delivered,
        }
    }

    #[test]
    fn test_view_resolves_image_urls() {
        let request = ReturnRequest::try_from(approved_record()).unwrap();
        let view = ReturnRequestView::new(&request, &order(), None, "https://api.example.com/");
        assert_eq!(
            view.image_urls,
            vec!["https://api.example.com/uploads/returns/77/a.png".to_string()]
        );
        assert_eq!(view.order_total(), order().total);
    }

    #[test]
    fn test_view_json_shape() {
        let request = ReturnRequest::try_from(approved_record()).unwrap();
        let view = ReturnRequestView::new(&request, &order(), None, "http://localhost");
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["orderId"], 77);
        assert_eq!(json["returnRequest"]["requestStatus"], "approved");
        assert_eq!(json["returnRequest"]["refundAmount"], "12.50");
        assert_eq!(json["totalAmount"], "12.50");
    }

    #[test]
    fn test_refund_instruction_only_for_completed() {
        let approved = ReturnRequest::try_from(approved_record()).unwrap();
        assert!(RefundInstruction::for_completed(&approved, AdminUserId::new(1)).is_none());

        let completed = approved
            .complete(Utc.with_ymd_and_hms(2026, 6, 2, 9, 0, 0).unwrap())
            .unwrap()
            .into_request();
        let instruction = RefundInstruction::for_completed(&completed, AdminUserId::new(1)).unwrap();
        assert_eq!(instruction.idempotency_key, "77:completed");
        assert_eq!(instruction.amount.amount, Decimal::new(1250, 2));
    }

    #[test]
    fn test_approve_body_accepts_numeric_refund() {
        let body: ApproveBody =
            serde_json::from_str(r#"{"adminComment":"confirmed damage","refundAmount":499.00}"#)
                .unwrap();
        assert_eq!(body.refund_amount, Some(Decimal::new(499, 0)));

        let body: ApproveBody = serde_json::from_str(r#"{"adminComment":"ok"}"#).unwrap();
        assert!(body.refund_amount.is_none());
    }
}
