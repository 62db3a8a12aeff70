//! Appointment endpoints. Every successful write also notifies the other parties over the
//! presence socket.

use super::{created, ok, ApiResult, Created, JsonBody, QueryParams};
use crate::middleware::AuthUser;
use crate::state::AppState;
use api_shared::{
    ApiResponse, AppointmentQuery, CreateAppointmentReq, ErrorResponse, UpdateAppointmentReq,
    UpdateStatusReq,
};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use hms_core::models::Appointment;
use hms_core::notifications::AppointmentChange;

#[utoipa::path(
    post,
    path = "/api/appointments",
    tag = "appointments",
    security(("bearer" = [])),
    request_body = CreateAppointmentReq,
    responses(
        (status = 201, description = "Appointment booked", body = Appointment),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Patient or doctor not found", body = ErrorResponse),
        (status = 409, description = "Slot already taken", body = ErrorResponse)
    )
)]
/// Book an appointment
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreateAppointmentReq>,
) -> Created<Appointment> {
    let appointment = state.appointments.create(&actor, req)?;
    let delivered = state.notifier.appointment_created(&appointment, &actor);
    tracing::debug!(appointment = %appointment.id, delivered, "booking notifications sent");
    created("Appointment booked successfully", appointment)
}

#[utoipa::path(
    get,
    path = "/api/appointments",
    tag = "appointments",
    security(("bearer" = [])),
    params(AppointmentQuery),
    responses(
        (status = 200, description = "Appointments sorted by date then slot", body = [Appointment]),
        (status = 400, description = "Bad filter", body = ErrorResponse)
    )
)]
/// List appointments visible to the caller
#[axum::debug_handler]
pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    QueryParams(query): QueryParams<AppointmentQuery>,
) -> ApiResult<Vec<Appointment>> {
    ok(state.appointments.list(&actor, &query)?)
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    tag = "appointments",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "The appointment", body = Appointment),
        (status = 403, description = "Not a party to it", body = ErrorResponse),
        (status = 404, description = "No such appointment", body = ErrorResponse)
    )
)]
/// Get one appointment
#[axum::debug_handler]
pub async fn get_one(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Appointment> {
    ok(state.appointments.get(&actor, &id)?)
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}",
    tag = "appointments",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Appointment id")),
    request_body = UpdateAppointmentReq,
    responses(
        (status = 200, description = "Appointment updated", body = Appointment),
        (status = 400, description = "Validation failed or not scheduled", body = ErrorResponse),
        (status = 409, description = "Slot already taken", body = ErrorResponse)
    )
)]
/// Reschedule or edit a scheduled appointment
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateAppointmentReq>,
) -> ApiResult<Appointment> {
    let appointment = state.appointments.update(&actor, &id, req)?;
    state
        .notifier
        .appointment_updated(&appointment, &actor, AppointmentChange::Rescheduled);
    Ok(Json(ApiResponse::with_message(
        "Appointment updated",
        appointment,
    )))
}

#[utoipa::path(
    patch,
    path = "/api/appointments/{id}/status",
    tag = "appointments",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Appointment id")),
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Status changed", body = Appointment),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 403, description = "Not permitted", body = ErrorResponse)
    )
)]
/// Complete, cancel or mark an appointment as a no-show
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusReq>,
) -> ApiResult<Appointment> {
    let appointment = state.appointments.update_status(&actor, &id, req)?;
    state.notifier.appointment_updated(
        &appointment,
        &actor,
        AppointmentChange::Status(appointment.status),
    );
    Ok(Json(ApiResponse::with_message(
        format!("Appointment marked {}", appointment.status),
        appointment,
    )))
}
