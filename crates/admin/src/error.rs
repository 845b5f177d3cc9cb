//! Unified error handling for the return-desk API.

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use returndesk_core::ReturnError;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::{ApiErrorBody, Principal};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// A return-request rule rejected the operation.
    #[error(transparent)]
    Returns(#[from] ReturnError),

    /// No valid credentials were presented.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Returns(err) => match err {
                ReturnError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ReturnError::PreconditionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ReturnError::Conflict(_) => StatusCode::CONFLICT,
                ReturnError::NotFound(_) => StatusCode::NOT_FOUND,
                ReturnError::Unauthorized(_) => StatusCode::FORBIDDEN,
            },
        }
    }

    /// Wire code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Database(_) | Self::Internal(_) => "internal",
            Self::Unauthorized(_) => "unauthenticated",
            Self::BadRequest(_) => "invalid_input",
            Self::Returns(err) => err.code(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Return desk request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Returns(err) => err.message().to_string(),
            Self::Unauthorized(m) | Self::BadRequest(m) => m.clone(),
        };

        let body = ApiErrorBody {
            success: false,
            error: self.code().to_string(),
            message,
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

/// Set the Sentry user context from the authenticated caller.
pub fn set_sentry_user(principal: &Principal) {
    let (id, username) = match principal {
        Principal::Admin(admin) => (format!("admin:{}", admin.id), Some(admin.name.clone())),
        Principal::Customer(customer) => (format!("customer:{}", customer.id), None),
    };

    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(id),
            username,
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");

        let err = AppError::Returns(ReturnError::Conflict("already exists".to_string()));
        assert_eq!(err.to_string(), "already exists");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(ReturnError::InvalidInput("x".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ReturnError::PreconditionFailed("x".to_string()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(ReturnError::Conflict("x".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ReturnError::NotFound("x".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ReturnError::Unauthorized("x".to_string()).into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::from(ReturnError::PreconditionFailed("x".to_string())).code(),
            "precondition_failed"
        );
        assert_eq!(AppError::Unauthorized("x".to_string()).code(), "unauthenticated");
        assert_eq!(AppError::Internal("x".to_string()).code(), "internal");
    }
}
