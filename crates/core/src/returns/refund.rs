//! Refund amount policy.
//!
//! The dashboard pre-fills the order total but lets an admin type any
//! amount, and nothing caps it server-side. Whether to cap is therefore a
//! deployment decision rather than a rule baked into the state machine.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ReturnError;
use crate::types::Money;

/// Upper bound applied to admin-entered refund amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundCap {
    /// Any non-negative amount is accepted.
    #[default]
    Unbounded,
    /// The refund may not exceed the order total.
    OrderTotal,
}

impl fmt::Display for RefundCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "none"),
            Self::OrderTotal => write!(f, "order_total"),
        }
    }
}

impl std::str::FromStr for RefundCap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" | "unbounded" => Ok(Self::Unbounded),
            "order_total" => Ok(Self::OrderTotal),
            other => Err(format!("invalid refund cap: {other} (expected none or order_total)")),
        }
    }
}

/// How the refund on approval is derived and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefundPolicy {
    pub cap: RefundCap,
}

impl RefundPolicy {
    #[must_use]
    pub const fn new(cap: RefundCap) -> Self {
        Self { cap }
    }

    /// Resolve the refund for an approval.
    ///
    /// A missing amount means "refund the order total".
    ///
    /// # Errors
    ///
    /// Returns `ReturnError::InvalidInput` if the amount is negative, has more
    /// decimal places than the currency allows, or exceeds the cap.
    pub fn resolve(
        &self,
        requested: Option<Decimal>,
        order_total: &Money,
    ) -> Result<Money, ReturnError> {
        let Some(amount) = requested else {
            return Ok(*order_total);
        };

        if amount < Decimal::ZERO {
            return Err(ReturnError::InvalidInput(
                "refund amount must not be negative".to_string(),
            ));
        }

        let digits = order_total.currency.minor_digits();
        if amount.normalize().scale() > digits {
            return Err(ReturnError::InvalidInput(format!(
                "refund amount must have at most {digits} decimal places"
            )));
        }

        if self.cap == RefundCap::OrderTotal && amount > order_total.amount {
            return Err(ReturnError::InvalidInput(format!(
                "refund amount {amount} exceeds the order total {}",
                order_total.amount
            )));
        }

        Ok(Money::new(amount, order_total.currency))
    }
}
