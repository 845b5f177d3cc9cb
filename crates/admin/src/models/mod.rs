//! Domain models and wire types for the return-desk API.

pub mod admin_user;
pub mod principal;
pub mod returns;

pub use admin_user::{AdminRole, AdminUser};
pub use principal::{CurrentAdmin, CurrentCustomer, Principal};
pub use returns::{
    ApiEnvelope, ApiErrorBody, ApproveBody, CustomerSummary, RefundInstruction, RejectBody,
    ReturnListView, ReturnRequestView,
};
