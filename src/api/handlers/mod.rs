//! REST endpoint handlers organized by resource.
//!
//! Each module exposes a `routes()` function; [`crate::api::build_router`]
//! decides where each group is mounted and which ones are rate limited.

pub mod payment;
pub mod shipping;
pub mod system;
pub mod webhook;
