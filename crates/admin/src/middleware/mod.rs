//! HTTP middleware for the return-desk API.
//!
//! # Layer Order (outermost first, see `main.rs`)
//!
//! 1. Sentry hub and HTTP transaction
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Timeout
//! 4. Body limit for multipart uploads
//!
//! Authentication is done per handler by the extractors in [`auth`].

pub mod auth;

pub use auth::{RequireAdmin, RequireAuth, RequireCustomer};
