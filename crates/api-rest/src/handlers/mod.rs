//! REST handlers, one module per resource.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod files;
pub mod health;
pub mod lab_tests;
pub mod prescriptions;
pub mod reports;
pub mod users;

use crate::error::ApiError;
use api_shared::ApiResponse;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::Json;
use hms_core::HospitalResult;

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// `Json` whose rejections use the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// `Query` whose rejections use the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

fn created<T>(message: &str, data: T) -> Created<T> {
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(message, data)),
    ))
}

/// Runs a blocking core call on the blocking pool.
///
/// Used for storage, extraction and password hashing, which would otherwise stall a runtime
/// worker.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> HospitalResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}
