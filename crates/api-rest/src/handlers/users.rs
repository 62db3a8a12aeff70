use super::{ok, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;
use api_shared::ErrorResponse;
use axum::extract::{Path, State};
use axum::Extension;
use hms_core::models::AccountView;

#[utoipa::path(
    get,
    path = "/api/users/patients",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All patient accounts", body = [AccountView]),
        (status = 403, description = "Caller is a patient", body = ErrorResponse)
    )
)]
/// List patients (staff only)
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
) -> ApiResult<Vec<AccountView>> {
    let patients = state.accounts.list_patients(&actor)?;
    ok(patients.iter().map(AccountView::from).collect())
}

#[utoipa::path(
    get,
    path = "/api/users/doctors",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Active doctor accounts", body = [AccountView])
    )
)]
/// List active doctors
#[axum::debug_handler]
pub async fn list_doctors(State(state): State<AppState>) -> ApiResult<Vec<AccountView>> {
    ok(state
        .accounts
        .list_doctors()
        .iter()
        .map(AccountView::from)
        .collect())
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "The account", body = AccountView),
        (status = 403, description = "Not visible to the caller", body = ErrorResponse),
        (status = 404, description = "No such account", body = ErrorResponse)
    )
)]
/// Get one account
#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<AccountView> {
    ok(state.accounts.get_visible(&actor, &id)?.view())
}
