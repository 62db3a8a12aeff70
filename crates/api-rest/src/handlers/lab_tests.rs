use super::{created, ok, ApiResult, Created, JsonBody, QueryParams};
use crate::middleware::AuthUser;
use crate::state::AppState;
use api_shared::{
    ApiResponse, CreateLabTestReq, ErrorResponse, LabTestQuery, RecordLabResultsReq,
    UpdateStatusReq,
};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use hms_core::models::LabTest;

#[utoipa::path(
    post,
    path = "/api/lab-tests",
    tag = "lab-tests",
    security(("bearer" = [])),
    request_body = CreateLabTestReq,
    responses(
        (status = 201, description = "Lab test ordered", body = LabTest),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Caller is not clinical staff", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse)
    )
)]
/// Order a lab test
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreateLabTestReq>,
) -> Created<LabTest> {
    created("Lab test ordered", state.lab_tests.create(&actor, req)?)
}

#[utoipa::path(
    get,
    path = "/api/lab-tests",
    tag = "lab-tests",
    security(("bearer" = [])),
    params(LabTestQuery),
    responses(
        (status = 200, description = "Lab tests, newest first", body = [LabTest])
    )
)]
/// List lab tests visible to the caller
#[axum::debug_handler]
pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    QueryParams(query): QueryParams<LabTestQuery>,
) -> ApiResult<Vec<LabTest>> {
    ok(state.lab_tests.list(&actor, &query)?)
}

#[utoipa::path(
    get,
    path = "/api/lab-tests/{id}",
    tag = "lab-tests",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Lab test id")),
    responses(
        (status = 200, description = "The lab test", body = LabTest),
        (status = 404, description = "No such lab test", body = ErrorResponse)
    )
)]
/// Get one lab test
#[axum::debug_handler]
pub async fn get_one(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<LabTest> {
    ok(state.lab_tests.get(&actor, &id)?)
}

#[utoipa::path(
    patch,
    path = "/api/lab-tests/{id}/status",
    tag = "lab-tests",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Lab test id")),
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Status changed", body = LabTest),
        (status = 400, description = "Transition not allowed", body = ErrorResponse)
    )
)]
/// Move a lab test through its workflow
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusReq>,
) -> ApiResult<LabTest> {
    let test = state.lab_tests.update_status(&actor, &id, req)?;
    Ok(Json(ApiResponse::with_message(
        format!("Lab test marked {}", test.status),
        test,
    )))
}

#[utoipa::path(
    put,
    path = "/api/lab-tests/{id}/results",
    tag = "lab-tests",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Lab test id")),
    request_body = RecordLabResultsReq,
    responses(
        (status = 200, description = "Results recorded and test completed", body = LabTest),
        (status = 400, description = "Validation failed or test already closed", body = ErrorResponse)
    )
)]
/// Record result values and complete the test
#[axum::debug_handler]
pub async fn record_results(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RecordLabResultsReq>,
) -> ApiResult<LabTest> {
    let test = state.lab_tests.record_results(&actor, &id, req)?;
    Ok(Json(ApiResponse::with_message("Results recorded", test)))
}
