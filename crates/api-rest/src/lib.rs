//! # API REST
//!
//! REST and WebSocket API for the hospital management service.
//!
//! Handles:
//! - HTTP endpoints under `/api` with axum
//! - Bearer-token authentication middleware
//! - The `/ws` presence socket and appointment notifications
//! - OpenAPI/Swagger documentation
//!
//! Business rules live in `hms-core`; this crate only maps them onto HTTP.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod state;
pub mod websocket;

pub use error::{set_expose_error_details, ApiError};
pub use router::{build_router, RouterOptions};
pub use state::AppState;
