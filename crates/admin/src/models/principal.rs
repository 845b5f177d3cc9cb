//! Authenticated callers.

use serde::{Deserialize, Serialize};

use returndesk_core::{AdminUserId, CustomerId, ReturnError};

use super::admin_user::AdminRole;

/// Identity of an admin resolved from an API token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's database ID.
    pub id: AdminUserId,
    /// Admin's display name.
    pub name: String,
    /// Admin's role/permission level.
    pub role: AdminRole,
}

impl CurrentAdmin {
    /// Check that this admin may approve, reject, initiate, or complete returns.
    ///
    /// # Errors
    ///
    /// Returns `ReturnError::Unauthorized` for read-only roles.
    pub fn ensure_can_review(&self) -> Result<(), ReturnError> {
        if self.role.can_review_returns() {
            Ok(())
        } else {
            Err(ReturnError::Unauthorized(format!(
                "role {} cannot review return requests",
                self.role
            )))
        }
    }
}

/// Identity of a customer resolved from an API token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    pub id: CustomerId,
}

impl CurrentCustomer {
    /// Check that `owner` is this customer.
    ///
    /// # Errors
    ///
    /// Returns `ReturnError::Unauthorized` if the order belongs to someone else.
    pub fn ensure_owns(&self, owner: CustomerId) -> Result<(), ReturnError> {
        if self.id == owner {
            Ok(())
        } else {
            Err(ReturnError::Unauthorized(
                "this order belongs to another customer".to_string(),
            ))
        }
    }
}

/// Whoever presented the bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    Admin(CurrentAdmin),
    Customer(CurrentCustomer),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_cannot_review() {
        let viewer = CurrentAdmin {
            id: AdminUserId::new(1),
            name: "Vee".to_string(),
            role: AdminRole::Viewer,
        };
        assert!(matches!(
            viewer.ensure_can_review(),
            Err(ReturnError::Unauthorized(_))
        ));

        let admin = CurrentAdmin {
            role: AdminRole::Admin,
            ..viewer
        };
        assert!(admin.ensure_can_review().is_ok());
    }

    #[test]
    fn test_customer_ownership() {
        let customer = CurrentCustomer {
            id: CustomerId::new(5),
        };
        assert!(customer.ensure_owns(CustomerId::new(5)).is_ok());
        assert!(customer.ensure_owns(CustomerId::new(6)).is_err());
    }
}
