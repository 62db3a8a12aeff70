//! # HMS Core
//!
//! Core business logic for the hospital management service.
//!
//! This crate contains the domain model and every operation on it:
//! - Accounts, password hashing and signed access tokens
//! - Appointments, lab tests, prescriptions and uploaded reports
//! - Write-through JSON document storage under `HMS_DATA_DIR`
//! - The presence registry and appointment notifications
//!
//! **No API concerns**: HTTP routing, WebSocket framing and status codes belong in `api-rest`.

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod extraction;
pub mod models;
pub mod notifications;
pub mod presence;
pub mod services;
pub mod store;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use error::{HospitalError, HospitalResult};
pub use hms_types::{EmailAddress, NonEmptyText, TextError};
pub use hms_uuid::RecordId;
