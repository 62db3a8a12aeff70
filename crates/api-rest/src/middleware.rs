//! Bearer token authentication.
//!
//! Extracts `Authorization: Bearer <token>`, verifies it, resolves the account it names and
//! injects [`AuthUser`] into the request extensions for downstream handlers.

use crate::error::ApiError;
use crate::state::AppState;
use api_shared::auth::bearer_token;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use hms_core::models::Account;

/// The authenticated caller, as currently stored.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Account);

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or(ApiError::Unauthorized("Authentication required"))?;

    let claims = state.tokens.verify(token).inspect_err(|e| {
        tracing::debug!(path = %req.uri().path(), error = %e, "token rejected");
    })?;
    let account = state.accounts.resolve_active(&claims.sub).inspect_err(|e| {
        tracing::info!(subject = %claims.sub, error = %e, "token subject rejected");
    })?;

    req.extensions_mut().insert(AuthUser(account));
    Ok(next.run(req).await)
}
