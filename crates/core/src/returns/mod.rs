//! Return-request lifecycle.
//!
//! A return request is a customer's claim against a delivered order. It is
//! created `pending`, decided by an admin (`approved` or `rejected`), and an
//! approved request is `completed` once the refund has been handed off.
//!
//! ```text
//!            submit            approve            complete
//!   (none) ─────────► pending ─────────► approved ─────────► completed
//!                      │  │
//!               cancel │  │ reject
//!                      ▼  ▼
//!               (removed)  rejected
//! ```
//!
//! # Modules
//!
//! - [`model`] - The entity, its details sum type, and validated text fields
//! - [`machine`] - Transition rules
//! - [`query`] - Status filters and pagination
//! - [`refund`] - Refund amount policy
//! - [`error`] - Error taxonomy shared by the service and its clients

pub mod error;
pub mod machine;
pub mod model;
pub mod query;
pub mod refund;

pub use error::ReturnError;
pub use machine::{Decision, Outcome, Submission, TransitionAction};
pub use model::{
    AdminComment, ImageRef, OrderSnapshot, ReasonCategory, ReturnDetails, ReturnReason,
    ReturnRecord, ReturnRequest, ReturnState, Review,
};
pub use query::{Page, PageRequest, Pagination, ReturnQuery, StatusCounts, StatusFilter};
pub use refund::{RefundCap, RefundPolicy};
