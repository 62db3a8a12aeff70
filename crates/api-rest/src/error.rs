//! Maps domain errors onto HTTP statuses and the error envelope.

use api_shared::ErrorResponse;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hms_core::HospitalError;
use hms_files::FilesError;
use std::sync::OnceLock;

static EXPOSE_DETAILS: OnceLock<bool> = OnceLock::new();

/// Controls whether 5xx bodies carry the underlying error text. Set once at start-up; details
/// are exposed when this is never called.
pub fn set_expose_error_details(expose: bool) {
    if EXPOSE_DETAILS.set(expose).is_err() {
        tracing::warn!("error detail exposure already configured");
    }
}

fn expose_details() -> bool {
    EXPOSE_DETAILS.get().copied().unwrap_or(true)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Hospital(#[from] HospitalError),
    #[error("{message}")]
    BadRequest {
        field: Option<String>,
        message: String,
    },
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Hospital(e) => hospital_status(e),
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn hospital_status(err: &HospitalError) -> StatusCode {
    match err {
        HospitalError::InvalidInput(_) | HospitalError::Validation { .. } => {
            StatusCode::BAD_REQUEST
        }
        HospitalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        HospitalError::AccountDisabled | HospitalError::Forbidden(_) => StatusCode::FORBIDDEN,
        HospitalError::NotFound(_) => StatusCode::NOT_FOUND,
        HospitalError::Conflict(_) => StatusCode::CONFLICT,
        HospitalError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        HospitalError::Storage(FilesError::NotFound(_)) => StatusCode::NOT_FOUND,
        HospitalError::Storage(FilesError::InvalidObjectId(_) | FilesError::InvalidUpload(_)) => {
            StatusCode::BAD_REQUEST
        }
        HospitalError::Storage(_)
        | HospitalError::Extraction(_)
        | HospitalError::ExtractionUnavailable => StatusCode::BAD_GATEWAY,
        HospitalError::StorageDirCreation(_)
        | HospitalError::FileWrite(_)
        | HospitalError::FileRead(_)
        | HospitalError::FileRemove(_)
        | HospitalError::Serialization(_)
        | HospitalError::Deserialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            field: None,
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest {
            field: None,
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            HospitalError::PayloadTooLarge {
                limit: hms_core::constants::MAX_UPLOAD_BYTES,
            }
            .into()
        } else {
            ApiError::bad_request("file", err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Hospital(HospitalError::Validation { field, message }) => {
                ErrorResponse::new(message.clone()).with_field(field.clone())
            }
            ApiError::BadRequest {
                field: Some(field),
                message,
            } => ErrorResponse::new(message.clone()).with_field(field.clone()),
            ApiError::Hospital(HospitalError::Storage(_)) if status == StatusCode::BAD_GATEWAY => {
                tracing::error!(error = %self, "object storage failure");
                with_details(ErrorResponse::new("File storage is unavailable"), &self)
            }
            ApiError::Hospital(HospitalError::Storage(FilesError::NotFound(_))) => {
                ErrorResponse::new("File not found")
            }
            _ if status == StatusCode::BAD_GATEWAY => {
                tracing::warn!(error = %self, "upstream failure");
                with_details(ErrorResponse::new(capitalise(&self.to_string())), &self)
            }
            _ if status.is_server_error() => {
                tracing::error!(error = %self, "request failed");
                with_details(ErrorResponse::new("Internal server error"), &self)
            }
            _ => ErrorResponse::new(capitalise(&self.to_string())),
        };

        (status, Json(body)).into_response()
    }
}

fn with_details(body: ErrorResponse, err: &ApiError) -> ErrorResponse {
    if expose_details() {
        body.with_details(err.to_string())
    } else {
        body
    }
}

fn capitalise(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_name_the_field() {
        let (status, body) =
            body_of(HospitalError::validation("email", "Email is invalid").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Email is invalid");
        assert_eq!(body["field"], "email");
    }

    #[tokio::test]
    async fn domain_errors_map_to_statuses() {
        let cases = [
            (
                ApiError::from(HospitalError::Unauthorized("Invalid email or password".into())),
                StatusCode::UNAUTHORIZED,
            ),
            (HospitalError::AccountDisabled.into(), StatusCode::FORBIDDEN),
            (HospitalError::NotFound("Patient").into(), StatusCode::NOT_FOUND),
            (
                HospitalError::Conflict("duplicate".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                HospitalError::PayloadTooLarge { limit: 10 }.into(),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                HospitalError::Storage(FilesError::Unavailable("down".into())).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                HospitalError::ExtractionUnavailable.into(),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected);
        }

        let (_, body) = body_of(HospitalError::NotFound("Patient").into()).await;
        assert_eq!(body["error"], "Patient not found");
    }

    #[tokio::test]
    async fn internal_errors_use_generic_message() {
        let err = HospitalError::FileWrite(std::io::Error::other("disk full"));
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
