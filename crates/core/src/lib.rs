//! Return Desk Core - Shared types library.
//!
//! This crate provides the types used across all Return Desk components:
//! - `admin` - Return-request authority (HTTP API, storage, client)
//! - `cli` - Command-line tools for migrations and operator workflows
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The return-request state machine lives here so
//! that every transition rule can be exercised without a running service.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, and statuses
//! - [`returns`] - Return-request entity, transitions, queries, refund policy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod returns;
pub mod types;

pub use returns::{
    AdminComment, Decision, ImageRef, OrderSnapshot, Outcome, Page, PageRequest, Pagination,
    ReasonCategory, RefundCap, RefundPolicy, ReturnDetails, ReturnError, ReturnQuery,
    ReturnReason, ReturnRecord, ReturnRequest, ReturnState, Review, StatusCounts, StatusFilter,
    Submission,
};
pub use types::*;
