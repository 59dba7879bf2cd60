//! # settlement-gateway
//!
//! Payment settlement gateway for a marketplace backend.
//!
//! Orders move from `pending` to a terminal status through two entry
//! points: Razorpay webhooks and the client-side checkout verification
//! call. Both are authenticated with HMAC-SHA256, both commit through the
//! same conditional update, and both are idempotent. A newly paid order
//! triggers inventory decrement and Shiprocket shipment creation, which
//! never affect the payment outcome.
//!
//! ## Architecture
//!
//! ```text
//! Clients (checkout widget, Razorpay)
//!     │
//!     ├── Rate limiter (rate_limit)
//!     ├── REST Handlers (api/)
//!     │
//!     ├── SettlementService ──► SideEffectOrchestrator (service/)
//!     ├── ShippingService
//!     ├── EventBus ──► audit log (domain/, service/)
//!     │
//!     ├── Razorpay / Shiprocket clients (providers/)
//!     │
//!     └── PostgreSQL or in-memory OrderStore (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod providers;
pub mod rate_limit;
pub mod service;
