//! Administrator endpoints. Every handler here rejects non-admin callers.

use super::{blocking, created, ok, ApiResult, Created, JsonBody, QueryParams};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use api_shared::{AccountQuery, ApiResponse, ErrorResponse, SignupReq, UpdateAccountStatusReq};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use hms_core::models::{Account, AccountView, Role};
use hms_core::presence::OnlineAccount;
use hms_core::services::HospitalStats;
use hms_core::{validation, HospitalError};

fn require_admin(actor: &Account) -> Result<(), ApiError> {
    if actor.role() == Role::Admin {
        Ok(())
    } else {
        Err(HospitalError::forbidden("Administrator access required").into())
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    security(("bearer" = [])),
    params(AccountQuery),
    responses(
        (status = 200, description = "Accounts, oldest first", body = [AccountView]),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    )
)]
/// List accounts, optionally of one role
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    QueryParams(query): QueryParams<AccountQuery>,
) -> ApiResult<Vec<AccountView>> {
    require_admin(&actor)?;
    let role: Option<Role> = query
        .role
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(|r| validation::choice("role", r))
        .transpose()?;
    ok(state.accounts.list(role).iter().map(AccountView::from).collect())
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "admin",
    security(("bearer" = [])),
    request_body = SignupReq,
    responses(
        (status = 201, description = "Account created", body = AccountView),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
/// Create an account of any role, including administrators
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    JsonBody(req): JsonBody<SignupReq>,
) -> Created<AccountView> {
    require_admin(&actor)?;
    let accounts = state.accounts.clone();
    let account = blocking(move || accounts.create_account(req)).await?;
    tracing::info!(account = %account.id, role = %account.role(), by = %actor.id, "account created by administrator");
    created("Account created successfully", account.view())
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/status",
    tag = "admin",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Account id")),
    request_body = UpdateAccountStatusReq,
    responses(
        (status = 200, description = "Status changed", body = AccountView),
        (status = 403, description = "Not permitted", body = ErrorResponse),
        (status = 404, description = "No such account", body = ErrorResponse)
    )
)]
/// Activate or deactivate an account
#[axum::debug_handler]
pub async fn set_user_status(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateAccountStatusReq>,
) -> ApiResult<AccountView> {
    let account = state.accounts.set_active(&actor, &id, req.is_active)?;
    let message = if account.is_active {
        "Account activated"
    } else {
        "Account deactivated"
    };
    Ok(Json(ApiResponse::with_message(message, account.view())))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "admin",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deleted"),
        (status = 403, description = "Not permitted", body = ErrorResponse),
        (status = 404, description = "No such account", body = ErrorResponse)
    )
)]
/// Delete an account
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.accounts.delete(&actor, &id)?;
    Ok(Json(ApiResponse::message("Account deleted")))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Dashboard figures", body = HospitalStats),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    )
)]
/// Hospital-wide counts
#[axum::debug_handler]
pub async fn stats(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
) -> ApiResult<HospitalStats> {
    require_admin(&actor)?;
    ok(state.admin.stats())
}

#[utoipa::path(
    get,
    path = "/api/admin/online",
    tag = "admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Accounts with a live socket", body = [OnlineAccount]),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    )
)]
/// Presence snapshot
#[axum::debug_handler]
pub async fn online(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
) -> ApiResult<Vec<OnlineAccount>> {
    require_admin(&actor)?;
    ok(state.admin.online())
}
