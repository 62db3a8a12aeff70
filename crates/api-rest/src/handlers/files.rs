use super::blocking;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use api_shared::ErrorResponse;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Extension;

#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Content hash of the stored object")),
    responses(
        (status = 200, description = "File bytes with their media type"),
        (status = 404, description = "No visible report references this file", body = ErrorResponse)
    )
)]
/// Download the file behind a report
#[axum::debug_handler]
pub async fn download(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let reports = state.reports.clone();
    let (file, bytes) = blocking(move || reports.read_file(&actor, &id)).await?;

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "inline; filename=\"{}\"",
        file.original_filename.replace('"', "")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
