//! Report endpoints.
//!
//! Upload and reprocess call the object store and the extraction service, both blocking, so
//! they run on the blocking pool.

use super::{blocking, created, ok, ApiResult, Created, JsonBody, QueryParams};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use api_shared::{ApiResponse, ErrorResponse, ReportQuery, UpdateStatusReq, UploadReportMeta};
use axum::extract::{Multipart, Path, State};
use axum::{Extension, Json};
use hms_core::constants::MAX_UPLOAD_BYTES;
use hms_core::models::Report;
use hms_core::services::UploadedFile;
use hms_core::HospitalError;
use serde::Deserialize;
use utoipa::ToSchema;

/// Multipart form accepted by `POST /api/reports/upload`.
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
#[serde(rename_all = "camelCase")]
pub struct UploadReportForm {
    /// PDF, PNG, JPEG or plain text, at most 10 MiB
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    title: String,
    report_type: Option<String>,
    /// Required when the caller is staff
    patient_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/reports/upload",
    tag = "reports",
    security(("bearer" = [])),
    request_body(content = UploadReportForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Report stored; extraction outcome is on the record", body = Report),
        (status = 400, description = "Missing field or unsupported file type", body = ErrorResponse),
        (status = 413, description = "File larger than 10 MiB", body = ErrorResponse),
        (status = 502, description = "Object storage failed; no report created", body = ErrorResponse)
    )
)]
/// Upload a medical report
#[axum::debug_handler]
pub async fn upload(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    multipart: Multipart,
) -> Created<Report> {
    let (meta, file) = read_upload(multipart).await?;
    let reports = state.reports.clone();
    let report = blocking(move || reports.upload(&actor, meta, file)).await?;

    let message = if report.ai_processed {
        "Report uploaded and processed"
    } else {
        "Report uploaded"
    };
    created(message, report)
}

async fn read_upload(mut multipart: Multipart) -> Result<(UploadReportMeta, UploadedFile), ApiError> {
    let mut meta = UploadReportMeta::default();
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_owned();
                let bytes = field.bytes().await?;
                if bytes.len() > MAX_UPLOAD_BYTES {
                    return Err(HospitalError::PayloadTooLarge {
                        limit: MAX_UPLOAD_BYTES,
                    }
                    .into());
                }
                file = Some(UploadedFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            "title" => meta.title = field.text().await?,
            "reportType" => meta.report_type = Some(field.text().await?),
            "patientId" => meta.patient_id = Some(field.text().await?),
            other => tracing::debug!(field = other, "ignoring unknown upload field"),
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("file", "A file is required"))?;
    Ok((meta, file))
}

#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "reports",
    security(("bearer" = [])),
    params(ReportQuery),
    responses(
        (status = 200, description = "Reports, newest first", body = [Report])
    )
)]
/// List reports visible to the caller
#[axum::debug_handler]
pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    QueryParams(query): QueryParams<ReportQuery>,
) -> ApiResult<Vec<Report>> {
    ok(state.reports.list(&actor, &query)?)
}

#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    tag = "reports",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "The report", body = Report),
        (status = 404, description = "No such report", body = ErrorResponse)
    )
)]
/// Get one report
#[axum::debug_handler]
pub async fn get_one(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Report> {
    ok(state.reports.get(&actor, &id)?)
}

#[utoipa::path(
    patch,
    path = "/api/reports/{id}/status",
    tag = "reports",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Report id")),
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Status changed", body = Report),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 403, description = "Caller is not clinical staff", body = ErrorResponse)
    )
)]
/// Mark a report processed or reviewed
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusReq>,
) -> ApiResult<Report> {
    let report = state.reports.update_status(&actor, &id, req)?;
    Ok(Json(ApiResponse::with_message(
        format!("Report marked {}", report.status),
        report,
    )))
}

#[utoipa::path(
    post,
    path = "/api/reports/{id}/reprocess",
    tag = "reports",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "Extraction retried; outcome is on the record", body = Report),
        (status = 502, description = "Extraction is not configured", body = ErrorResponse)
    )
)]
/// Retry field extraction for a report
#[axum::debug_handler]
pub async fn reprocess(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Report> {
    let reports = state.reports.clone();
    let report = blocking(move || reports.reprocess(&actor, &id)).await?;
    ok(report)
}

#[utoipa::path(
    delete,
    path = "/api/reports/{id}",
    tag = "reports",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report and stored file deleted"),
        (status = 403, description = "Not the uploader or an administrator", body = ErrorResponse),
        (status = 404, description = "No such report", body = ErrorResponse)
    )
)]
/// Delete a report
#[axum::debug_handler]
pub async fn delete(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let reports = state.reports.clone();
    blocking(move || reports.delete(&actor, &id)).await?;
    Ok(Json(ApiResponse::message("Report deleted")))
}
