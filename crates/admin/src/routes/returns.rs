//! Return-request route handlers.

use axum::{
    Json, Router,
    extract::{
        FromRequestParts, Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use returndesk_core::{
    ImageRef, OrderId, PageRequest, ReasonCategory, ReturnError, ReturnReason, StatusCounts,
    StatusFilter, Submission,
};

use crate::{
    error::AppError,
    middleware::{RequireAdmin, RequireAuth, RequireCustomer},
    models::{ApiEnvelope, ApproveBody, RejectBody, ReturnListView, ReturnRequestView},
    services::UploadedImage,
    state::AppState,
};

/// Build the return-request router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/return-requests", get(list))
        .route("/orders/return-requests/counts", get(counts))
        .route("/orders/my-return-requests", get(list_mine))
        .route("/orders/{order_id}/return-request", get(show).post(submit))
        .route("/orders/{order_id}/return-request/initiate", post(initiate))
        .route("/orders/{order_id}/return-request/approve", post(approve))
        .route("/orders/{order_id}/return-request/reject", post(reject))
        .route("/orders/{order_id}/return-request/complete", post(complete))
        .route("/orders/{order_id}/return-request/cancel", post(cancel))
}

type ApiResult<T> = Result<Json<ApiEnvelope<T>>, AppError>;

/// Order ID from the path, rejected with the API error body when malformed.
pub struct OrderPath(pub OrderId);

impl<S> FromRequestParts<S> for OrderPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<OrderId>::from_request_parts(parts, state)
            .await
            .map_err(|e: PathRejection| AppError::from(e))?;
        Ok(Self(id))
    }
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    fn parse(self) -> Result<(StatusFilter, PageRequest), ReturnError> {
        let status = self.status.as_deref().unwrap_or_default().parse()?;
        let page = PageRequest::new(self.page, self.limit)?;
        Ok((status, page))
    }
}

// =============================================================================
// Reads
// =============================================================================

/// `GET /orders/return-requests` - all requests, for any admin role.
#[instrument(skip_all)]
pub async fn list(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<ReturnListView> {
    let Query(query) = query?;
    let (status, page) = query.parse()?;
    let view = state.returns().list(&admin, status, page).await?;
    Ok(Json(ApiEnvelope::ok(view)))
}

/// `GET /orders/return-requests/counts` - number of requests per status.
#[instrument(skip_all)]
pub async fn counts(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<StatusCounts> {
    let counts = state.returns().counts(&admin).await?;
    Ok(Json(ApiEnvelope::ok(counts)))
}

/// `GET /orders/my-return-requests` - the calling customer's requests.
#[instrument(skip_all)]
pub async fn list_mine(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<ReturnListView> {
    let Query(query) = query?;
    let (status, page) = query.parse()?;
    let view = state.returns().list_mine(&customer, status, page).await?;
    Ok(Json(ApiEnvelope::ok(view)))
}

/// `GET /orders/{order_id}/return-request`
#[instrument(skip_all, fields(order_id = %order_id))]
pub async fn show(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    OrderPath(order_id): OrderPath,
) -> ApiResult<ReturnRequestView> {
    let view = state.returns().get(&principal, order_id).await?;
    Ok(Json(ApiEnvelope::ok(view)))
}

// =============================================================================
// Customer writes
// =============================================================================

/// Text fields and files read from a submission form.
#[derive(Debug, Default)]
struct SubmissionForm {
    category: Option<String>,
    reason: Option<String>,
    images: Vec<UploadedImage>,
}

impl SubmissionForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            match field.name() {
                Some("reasonCategory") => form.category = Some(field.text().await?),
                Some("reason") => form.reason = Some(field.text().await?),
                Some("images") => {
                    let file_name = field.file_name().map(ToString::to_string);
                    let bytes = field.bytes().await?;
                    form.images.push(UploadedImage {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
                _ => {}
            }
        }
        Ok(form)
    }

    /// Validate the text fields and image count before anything is written.
    fn validate(&self, max_images: usize) -> Result<(ReasonCategory, ReturnReason), ReturnError> {
        let category = self.category.as_deref().unwrap_or_default().parse()?;
        let reason = ReturnReason::parse(self.reason.as_deref().unwrap_or_default())?;
        if self.images.len() > max_images {
            return Err(ReturnError::InvalidInput(format!(
                "at most {max_images} images can be attached to a return request"
            )));
        }
        Ok((category, reason))
    }
}

/// `POST /orders/{order_id}/return-request` - multipart submission.
///
/// Fields: `reasonCategory`, `reason`, and zero or more `images` files.
#[instrument(skip_all, fields(order_id = %order_id))]
pub async fn submit(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    OrderPath(order_id): OrderPath,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiEnvelope<ReturnRequestView>>), AppError> {
    let form = SubmissionForm::read(multipart?).await?;
    let (category, reason) = form.validate(state.returns().max_images())?;

    let images: Vec<ImageRef> = state.images().save_all(order_id, &form.images).await?;
    let submission = Submission {
        category,
        reason,
        images: images.clone(),
    };

    match state.returns().submit(&customer, order_id, submission).await {
        Ok(view) => Ok((
            StatusCode::CREATED,
            Json(ApiEnvelope::with_message(
                view,
                "Return request submitted successfully",
            )),
        )),
        Err(e) => {
            state.images().remove(&images).await;
            Err(e)
        }
    }
}

/// `POST /orders/{order_id}/return-request/cancel` - withdraw a pending request.
#[instrument(skip_all, fields(order_id = %order_id))]
pub async fn cancel(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    OrderPath(order_id): OrderPath,
) -> ApiResult<()> {
    state.returns().cancel(&customer, order_id).await?;
    Ok(Json(ApiEnvelope::with_message(
        (),
        "Return request cancelled",
    )))
}

// =============================================================================
// Admin writes
// =============================================================================

/// `POST /orders/{order_id}/return-request/initiate`
#[instrument(skip_all, fields(order_id = %order_id))]
pub async fn initiate(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    OrderPath(order_id): OrderPath,
) -> Result<(StatusCode, Json<ApiEnvelope<ReturnRequestView>>), AppError> {
    let view = state.returns().initiate(&admin, order_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::with_message(view, "Return request initiated")),
    ))
}

/// `POST /orders/{order_id}/return-request/approve`
#[instrument(skip_all, fields(order_id = %order_id))]
pub async fn approve(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    OrderPath(order_id): OrderPath,
    body: Result<Json<ApproveBody>, JsonRejection>,
) -> ApiResult<ReturnRequestView> {
    let Json(body) = body?;
    let view = state
        .returns()
        .approve(&admin, order_id, &body.admin_comment, body.refund_amount)
        .await?;
    Ok(Json(ApiEnvelope::with_message(
        view,
        "Return request approved",
    )))
}

/// `POST /orders/{order_id}/return-request/reject`
#[instrument(skip_all, fields(order_id = %order_id))]
pub async fn reject(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    OrderPath(order_id): OrderPath,
    body: Result<Json<RejectBody>, JsonRejection>,
) -> ApiResult<ReturnRequestView> {
    let Json(body) = body?;
    let view = state
        .returns()
        .reject(&admin, order_id, &body.admin_comment)
        .await?;
    Ok(Json(ApiEnvelope::with_message(
        view,
        "Return request rejected",
    )))
}

/// `POST /orders/{order_id}/return-request/complete`
#[instrument(skip_all, fields(order_id = %order_id))]
pub async fn complete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    OrderPath(order_id): OrderPath,
) -> ApiResult<ReturnRequestView> {
    let view = state.returns().complete(&admin, order_id).await?;
    Ok(Json(ApiEnvelope::with_message(
        view,
        "Return request completed",
    )))
}
