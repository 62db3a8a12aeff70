use super::{created, ok, ApiResult, Created, JsonBody, QueryParams};
use crate::middleware::AuthUser;
use crate::state::AppState;
use api_shared::{
    ApiResponse, CreatePrescriptionReq, ErrorResponse, PrescriptionQuery, UpdateStatusReq,
};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use hms_core::models::Prescription;

#[utoipa::path(
    post,
    path = "/api/prescriptions",
    tag = "prescriptions",
    security(("bearer" = [])),
    request_body = CreatePrescriptionReq,
    responses(
        (status = 201, description = "Prescription issued", body = Prescription),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Caller may not prescribe", body = ErrorResponse)
    )
)]
/// Issue a prescription
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreatePrescriptionReq>,
) -> Created<Prescription> {
    created(
        "Prescription issued",
        state.prescriptions.create(&actor, req)?,
    )
}

#[utoipa::path(
    get,
    path = "/api/prescriptions",
    tag = "prescriptions",
    security(("bearer" = [])),
    params(PrescriptionQuery),
    responses(
        (status = 200, description = "Prescriptions, newest first", body = [Prescription])
    )
)]
/// List prescriptions visible to the caller
#[axum::debug_handler]
pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    QueryParams(query): QueryParams<PrescriptionQuery>,
) -> ApiResult<Vec<Prescription>> {
    ok(state.prescriptions.list(&actor, &query)?)
}

#[utoipa::path(
    get,
    path = "/api/prescriptions/{id}",
    tag = "prescriptions",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Prescription id")),
    responses(
        (status = 200, description = "The prescription", body = Prescription),
        (status = 404, description = "No such prescription", body = ErrorResponse)
    )
)]
/// Get one prescription
#[axum::debug_handler]
pub async fn get_one(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Prescription> {
    ok(state.prescriptions.get(&actor, &id)?)
}

#[utoipa::path(
    patch,
    path = "/api/prescriptions/{id}/status",
    tag = "prescriptions",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Prescription id")),
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Status changed", body = Prescription),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 403, description = "Not the issuing doctor", body = ErrorResponse)
    )
)]
/// Complete or cancel a prescription
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusReq>,
) -> ApiResult<Prescription> {
    let prescription = state.prescriptions.update_status(&actor, &id, req)?;
    Ok(Json(ApiResponse::with_message(
        format!("Prescription marked {}", prescription.status),
        prescription,
    )))
}
