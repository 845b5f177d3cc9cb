//! Return Desk admin library.
//!
//! This crate is the single authority for return requests: it owns the
//! HTTP API, the storage layer, and the typed client used by dashboards
//! and the CLI.
//!
//! # Security
//!
//! Every route except the health checks requires a bearer token. Tokens are
//! stored only as SHA-256 digests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
