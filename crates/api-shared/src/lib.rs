//! # API Shared
//!
//! Wire types shared by the hospital service's transports and core.
//!
//! Contains:
//! - The uniform `{success, message|error, data?}` response envelope
//! - Request bodies and query strings for every REST resource
//! - Shared services like `HealthService`
//! - Bearer-header parsing (usable by REST middleware and the WebSocket upgrade)
//!
//! Request types keep enum-like fields (`role`, `status`, ...) as plain strings so that
//! `hms-core` can reject bad values with a field-level validation message instead of a
//! generic deserialisation failure.

pub mod auth;
pub mod envelope;
pub mod health;
pub mod requests;

pub use envelope::{ApiResponse, ErrorResponse};
pub use health::{HealthRes, HealthService};
pub use requests::*;
