//! Router assembly.
//!
//! Routes are nested under `/api/`. Everything except health, signup and login passes the
//! bearer-token middleware. Middleware stack (outermost to innermost):
//! CORS, request tracing, panic catcher, then per-route auth.

use crate::error::ApiError;
use crate::handlers::{
    admin, appointments, auth, files, health, lab_tests, prescriptions, reports, users,
};
use crate::middleware::require_auth;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::websocket;
use api_shared::ErrorResponse;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use hms_core::constants::MAX_UPLOAD_BYTES;
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Multipart framing on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Transport settings that are not part of the domain configuration.
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Allowed CORS origins. Empty or containing `*` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl RouterOptions {
    /// Parses a comma-separated `ALLOWED_ORIGINS` value.
    pub fn from_origins_value(value: Option<String>) -> Self {
        let allowed_origins = value
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_owned)
            .collect();
        Self { allowed_origins }
    }

    fn cors(&self) -> CorsLayer {
        if self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*") {
            return CorsLayer::permissive();
        }
        let origins: Vec<HeaderValue> = self
            .allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
    }
}

pub fn build_router(state: AppState, options: &RouterOptions) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(auth::me).put(auth::update_me))
        .route("/auth/password", put(auth::change_password))
        .route("/users/patients", get(users::list_patients))
        .route("/users/doctors", get(users::list_doctors))
        .route("/users/:id", get(users::get_user))
        .route(
            "/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route("/admin/users/:id", axum::routing::delete(admin::delete_user))
        .route("/admin/users/:id/status", patch(admin::set_user_status))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/online", get(admin::online))
        .route(
            "/appointments",
            post(appointments::create).get(appointments::list),
        )
        .route(
            "/appointments/:id",
            get(appointments::get_one).put(appointments::update),
        )
        .route(
            "/appointments/:id/status",
            patch(appointments::update_status),
        )
        .route("/lab-tests", post(lab_tests::create).get(lab_tests::list))
        .route("/lab-tests/:id", get(lab_tests::get_one))
        .route("/lab-tests/:id/status", patch(lab_tests::update_status))
        .route("/lab-tests/:id/results", put(lab_tests::record_results))
        .route(
            "/prescriptions",
            post(prescriptions::create).get(prescriptions::list),
        )
        .route("/prescriptions/:id", get(prescriptions::get_one))
        .route(
            "/prescriptions/:id/status",
            patch(prescriptions::update_status),
        )
        .route(
            "/reports/upload",
            post(reports::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/reports", get(reports::list))
        .route(
            "/reports/:id",
            get(reports::get_one).delete(reports::delete),
        )
        .route("/reports/:id/status", patch(reports::update_status))
        .route("/reports/:id/reprocess", post(reports::reprocess))
        .route("/files/:id", get(files::download))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login));

    Router::new()
        .nest("/api", protected.merge(public))
        .route("/ws", get(websocket::ws_upgrade))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(options.cors())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route")
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error")),
    )
        .into_response()
}
