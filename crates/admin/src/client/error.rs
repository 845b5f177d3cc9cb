//! Client-side errors.

use reqwest::StatusCode;
use returndesk_core::ReturnError;
use thiserror::Error;

/// Errors returned by [`super::ReturnsClient`] and [`super::ReturnBoard`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error body.
    #[error("{message} ({code}, HTTP {status})")]
    Api {
        status: StatusCode,
        /// Wire code, e.g. `precondition_failed` or `unauthenticated`.
        code: String,
        message: String,
    },

    /// The request could not be sent or timed out.
    #[error("request failed: {0}")]
    Request(String),

    /// The response could not be decoded.
    #[error("unexpected response: {0}")]
    Response(String),

    /// Rejected locally before any request was made.
    #[error(transparent)]
    Invalid(#[from] ReturnError),
}

impl ClientError {
    /// The return-request error this corresponds to, if any.
    ///
    /// Server errors outside the taxonomy (`internal`, `unauthenticated`)
    /// return `None`.
    #[must_use]
    pub fn return_error(&self) -> Option<ReturnError> {
        match self {
            Self::Api { code, message, .. } => ReturnError::from_code(code, message.clone()),
            Self::Invalid(err) => Some(err.clone()),
            Self::Request(_) | Self::Response(_) => None,
        }
    }

    /// Whether retrying a read could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Api { status, .. } => status.is_server_error(),
            Self::Response(_) | Self::Invalid(_) => false,
        }
    }

    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Invalid(err) => err.message().to_string(),
            Self::Request(_) | Self::Response(_) => self.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Response(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_error_from_api() {
        let err = ClientError::Api {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "precondition_failed".to_string(),
            message: "nope".to_string(),
        };
        assert_eq!(
            err.return_error(),
            Some(ReturnError::PreconditionFailed("nope".to_string()))
        );
        assert!(!err.is_transient());
        assert_eq!(err.user_message(), "nope");
    }

    #[test]
    fn test_transient() {
        assert!(ClientError::Request("timeout".to_string()).is_transient());
        let err = ClientError::Api {
            status: StatusCode::BAD_GATEWAY,
            code: "internal".to_string(),
            message: "upstream".to_string(),
        };
        assert!(err.is_transient());
        assert_eq!(err.return_error(), None);
    }
}
