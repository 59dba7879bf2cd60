//! Data Transfer Objects for REST request/response serialization.
//!
//! Request bodies from the checkout widget use optional fields so missing
//! values surface as gateway errors rather than extractor rejections.

pub mod common_dto;
pub mod payment_dto;
pub mod shipping_dto;

pub use common_dto::*;
pub use payment_dto::*;
pub use shipping_dto::*;
