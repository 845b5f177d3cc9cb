//! Error taxonomy for return-request operations.

use thiserror::Error;

/// Errors surfaced by return-request operations.
///
/// Every variant carries a human-readable message meant to be shown to the
/// person who triggered the operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// The request is not in a state that allows the operation.
    #[error("{0}")]
    PreconditionFailed(String),

    /// An active or decided return already exists for the order.
    #[error("{0}")]
    Conflict(String),

    /// Unknown order or return request.
    #[error("{0}")]
    NotFound(String),

    /// The caller is not allowed to perform the operation.
    #[error("{0}")]
    Unauthorized(String),
}

impl ReturnError {
    /// Stable machine-readable code used on the wire.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
        }
    }

    /// Rebuild an error from its wire code and message.
    ///
    /// Returns `None` for codes outside the taxonomy.
    #[must_use]
    pub fn from_code(code: &str, message: impl Into<String>) -> Option<Self> {
        let message = message.into();
        match code {
            "invalid_input" => Some(Self::InvalidInput(message)),
            "precondition_failed" => Some(Self::PreconditionFailed(message)),
            "conflict" => Some(Self::Conflict(message)),
            "not_found" => Some(Self::NotFound(message)),
            "unauthorized" => Some(Self::Unauthorized(message)),
            _ => None,
        }
    }

    /// The message without the code.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(m)
            | Self::PreconditionFailed(m)
            | Self::Conflict(m)
            | Self::NotFound(m)
            | Self::Unauthorized(m) => m,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        let errors = [
            ReturnError::InvalidInput("a".into()),
            ReturnError::PreconditionFailed("b".into()),
            ReturnError::Conflict("c".into()),
            ReturnError::NotFound("d".into()),
            ReturnError::Unauthorized("e".into()),
        ];

        for err in errors {
            let rebuilt = ReturnError::from_code(err.code(), err.message()).unwrap();
            assert_eq!(rebuilt, err);
        }
    }

    #[test]
    fn test_unknown_code() {
        assert!(ReturnError::from_code("teapot", "short and stout").is_none());
    }

    #[test]
    fn test_display_is_message() {
        let err = ReturnError::Conflict("return already exists".into());
        assert_eq!(err.to_string(), "return already exists");
    }
}
