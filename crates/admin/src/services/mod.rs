//! Business logic services for the return desk.
//!
//! # Services
//!
//! - `returns` - Return-request operations with conditional writes
//! - `images` - Evidence image validation and storage
//! - `tokens` - Bearer token generation and hashing

pub mod images;
pub mod returns;
pub mod tokens;

pub use images::{ImageStore, UploadedImage};
pub use returns::ReturnService;
pub use tokens::{IssuedToken, hash_token};
