use super::{blocking, created, ok, ApiResult, Created, JsonBody};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use api_shared::{
    ApiResponse, ChangePasswordReq, ErrorResponse, LoginReq, SignupReq, UpdateProfileReq,
};
use axum::extract::State;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use hms_core::models::{Account, AccountView};
use serde::Serialize;
use utoipa::ToSchema;

/// Issued token plus the account it belongs to.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthRes {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AccountView,
}

fn session(state: &AppState, account: &Account) -> Result<AuthRes, ApiError> {
    let issued = state.tokens.issue(account)?;
    Ok(AuthRes {
        token: issued.token,
        expires_at: issued.expires_at,
        user: account.view(),
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupReq,
    responses(
        (status = 201, description = "Account created; returns a token", body = AuthRes),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Administrator signup attempted", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
/// Register a new account
#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupReq>,
) -> Created<AuthRes> {
    let accounts = state.accounts.clone();
    let account = blocking(move || accounts.signup(req)).await?;
    created("Account created successfully", session(&state, &account)?)
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in; returns a token", body = AuthRes),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 403, description = "Account deactivated", body = ErrorResponse)
    )
)]
/// Exchange credentials for a bearer token
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginReq>,
) -> ApiResult<AuthRes> {
    let accounts = state.accounts.clone();
    let account = blocking(move || accounts.authenticate(&req.email, &req.password)).await?;
    Ok(Json(ApiResponse::with_message(
        "Login successful",
        session(&state, &account)?,
    )))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's account", body = AccountView),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
/// Current account
#[axum::debug_handler]
pub async fn me(Extension(AuthUser(actor)): Extension<AuthUser>) -> ApiResult<AccountView> {
    ok(actor.view())
}

#[utoipa::path(
    put,
    path = "/api/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    request_body = UpdateProfileReq,
    responses(
        (status = 200, description = "Profile updated", body = AccountView),
        (status = 400, description = "Validation failed", body = ErrorResponse)
    )
)]
/// Update the caller's own profile
#[axum::debug_handler]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdateProfileReq>,
) -> ApiResult<AccountView> {
    let updated = state.accounts.update_profile(&actor.id, req)?;
    Ok(Json(ApiResponse::with_message(
        "Profile updated",
        updated.view(),
    )))
}

#[utoipa::path(
    put,
    path = "/api/auth/password",
    tag = "auth",
    security(("bearer" = [])),
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password wrong or new password too short", body = ErrorResponse)
    )
)]
/// Change the caller's password
#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    JsonBody(req): JsonBody<ChangePasswordReq>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let accounts = state.accounts.clone();
    blocking(move || accounts.change_password(&actor.id, req)).await?;
    Ok(Json(ApiResponse::message("Password changed")))
}
