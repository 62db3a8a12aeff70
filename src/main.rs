use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use api_rest::{AppState, RouterOptions, build_router, set_expose_error_details};
use hms_core::auth::TokenService;
use hms_core::config::{
    CoreConfig, TokenConfig, extraction_config_from_env_values,
    password_iterations_from_env_value, token_ttl_from_env_value,
};
use hms_core::constants::DEFAULT_DATA_DIR;
use hms_core::extraction::{HttpExtractor, ReportExtractor};
use hms_files::FilesService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Main entry point for the hospital management server
///
/// Serves the REST API, the presence WebSocket and Swagger UI on one listener.
/// All configuration is read here, once, from the environment (and `.env` if present).
///
/// # Environment Variables
/// - `HMS_REST_ADDR`: listen address (default: "0.0.0.0:3000")
/// - `HMS_DATA_DIR`: document and file storage root (default: "hospital_data")
/// - `JWT_SECRET`: token signing secret (required)
/// - `JWT_TTL_HOURS`, `PASSWORD_HASH_ITERATIONS`: auth tuning
/// - `ALLOWED_ORIGINS`: comma-separated CORS origins (default: any)
/// - `APP_ENV`: `production` hides internal error detail from responses
/// - `FILES_PUBLIC_BASE_URL`: prefix for stored file URLs
/// - `EXTRACTION_API_URL`, `EXTRACTION_API_KEY`, `EXTRACTION_TIMEOUT_SECS`: report extraction
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hms=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("hms_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr: SocketAddr = env("HMS_REST_ADDR")
        .unwrap_or_else(|| "0.0.0.0:3000".into())
        .parse()
        .context("HMS_REST_ADDR is not a socket address")?;
    let data_dir = PathBuf::from(env("HMS_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into()));
    let production = env("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));
    set_expose_error_details(!production);

    let cfg = Arc::new(CoreConfig::new(
        data_dir,
        password_iterations_from_env_value(env("PASSWORD_HASH_ITERATIONS"))?,
        env("FILES_PUBLIC_BASE_URL").unwrap_or_else(|| "http://localhost:3000".into()),
    )?);

    let secret = env("JWT_SECRET").context("JWT_SECRET must be set")?;
    let tokens = TokenService::new(TokenConfig::new(
        secret,
        token_ttl_from_env_value(env("JWT_TTL_HOURS"))?,
    )?);

    let storage = Arc::new(FilesService::new(&cfg.files_dir(), cfg.files_public_base_url())?);

    let extraction = extraction_config_from_env_values(
        env("EXTRACTION_API_URL"),
        env("EXTRACTION_API_KEY"),
        env("EXTRACTION_TIMEOUT_SECS"),
    )?;
    // The blocking HTTP client must be built off the async runtime.
    let extractor: Option<Arc<dyn ReportExtractor>> = match extraction {
        Some(extraction) => {
            tracing::info!(endpoint = %extraction.endpoint, "report extraction enabled");
            let client = tokio::task::spawn_blocking(move || HttpExtractor::new(extraction)).await??;
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("EXTRACTION_API_URL not set; uploaded reports will not be processed");
            None
        }
    };

    let state = AppState::new(cfg.clone(), tokens, storage, extractor)?;
    let options = RouterOptions::from_origins_value(env("ALLOWED_ORIGINS"));
    let app = build_router(state, &options);

    tracing::info!("++ Starting HMS REST on {}", rest_addr);
    tracing::info!(data_dir = %cfg.data_dir().display(), production, "storage ready");

    let listener = tokio::net::TcpListener::bind(rest_addr)
        .await
        .with_context(|| format!("binding {rest_addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
