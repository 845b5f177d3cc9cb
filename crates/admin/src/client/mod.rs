//! Client side of the return-request API.
//!
//! [`ReturnsClient`] speaks HTTP; [`ReturnBoard`] is the review queue a
//! dashboard or the CLI drives on top of any [`ReturnsApi`].

pub mod api;
pub mod board;
pub mod error;

pub use api::{ClientOptions, ImageUpload, ReturnsApi, ReturnsClient};
pub use board::{ITEMS_PER_PAGE, Notice, NoticeKind, ReturnBoard, parse_refund_amount};
pub use error::ClientError;
