//! Bearer-token authentication extractors.
//!
//! Each request carries `Authorization: Bearer <token>`. The token is hashed
//! and resolved through the state's [`PrincipalStore`](crate::db::PrincipalStore).
//! A missing or unknown token is rejected with 401; a valid token of the
//! wrong kind (a customer calling an admin route) with 403.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use returndesk_core::ReturnError;

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentAdmin, CurrentCustomer, Principal};
use crate::services::hash_token;
use crate::state::AppState;

/// Extract the token from an `Authorization: Bearer` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Extractor for any authenticated caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(principal): RequireAuth) -> impl IntoResponse {
///     format!("{principal:?}")
/// }
/// ```
pub struct RequireAuth(pub Principal);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let principal = state
            .principals()
            .principal_for_token(&hash_token(token))
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid or revoked token".to_string()))?;

        set_sentry_user(&principal);
        Ok(Self(principal))
    }
}

/// Extractor that requires an admin token of any role.
///
/// Role checks for write operations happen in the service.
pub struct RequireAdmin(pub CurrentAdmin);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match RequireAuth::from_request_parts(parts, state).await?.0 {
            Principal::Admin(admin) => Ok(Self(admin)),
            Principal::Customer(_) => Err(ReturnError::Unauthorized(
                "this action is only available to admins".to_string(),
            )
            .into()),
        }
    }
}

/// Extractor that requires a customer token.
pub struct RequireCustomer(pub CurrentCustomer);

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match RequireAuth::from_request_parts(parts, state).await?.0 {
            Principal::Customer(customer) => Ok(Self(customer)),
            Principal::Admin(_) => Err(ReturnError::Unauthorized(
                "this action is only available to customers".to_string(),
            )
            .into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/orders/return-requests");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("bearer  abc "))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
