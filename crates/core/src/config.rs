//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services, so
//! nothing reads process-wide environment variables during request handling. The binaries own
//! the environment; the helpers here only parse values they hand over.

use crate::constants::{
    DEFAULT_EXTRACTION_TIMEOUT_SECS, DEFAULT_PASSWORD_ITERATIONS, DEFAULT_TOKEN_TTL_HOURS,
    FILES_DIR_NAME, MIN_PASSWORD_ITERATIONS, RECORDS_DIR_NAME,
};
use crate::{HospitalError, HospitalResult};
use chrono::Duration;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    password_iterations: u32,
    files_public_base_url: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        data_dir: PathBuf,
        password_iterations: u32,
        files_public_base_url: String,
    ) -> HospitalResult<Self> {
        if password_iterations < MIN_PASSWORD_ITERATIONS {
            return Err(HospitalError::InvalidInput(format!(
                "password_iterations must be at least {MIN_PASSWORD_ITERATIONS}"
            )));
        }

        let files_public_base_url = files_public_base_url.trim().trim_end_matches('/').to_string();
        if !(files_public_base_url.starts_with("http://")
            || files_public_base_url.starts_with("https://"))
        {
            return Err(HospitalError::InvalidInput(
                "files_public_base_url must be an http(s) URL".into(),
            ));
        }

        Ok(Self {
            data_dir,
            password_iterations,
            files_public_base_url,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join(RECORDS_DIR_NAME)
    }

    pub fn files_dir(&self) -> PathBuf {
        self.data_dir.join(FILES_DIR_NAME)
    }

    pub fn password_iterations(&self) -> u32 {
        self.password_iterations
    }

    pub fn files_public_base_url(&self) -> &str {
        &self.files_public_base_url
    }
}

/// Bearer token signing settings.
///
/// Kept apart from [`CoreConfig`] so that tools working directly on the data directory (the
/// operator CLI) never need the signing secret.
#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> HospitalResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(HospitalError::InvalidInput(
                "token secret cannot be empty".into(),
            ));
        }
        if ttl <= Duration::zero() {
            return Err(HospitalError::InvalidInput(
                "token lifetime must be positive".into(),
            ));
        }
        Ok(Self { secret, ttl })
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Settings for the HTTP report extraction client.
#[derive(Clone, Debug)]
pub struct ExtractionConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: std::time::Duration,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the PBKDF2 round count. `None` or blank yields the default.
pub fn password_iterations_from_env_value(value: Option<String>) -> HospitalResult<u32> {
    match non_blank(value) {
        None => Ok(DEFAULT_PASSWORD_ITERATIONS),
        Some(v) => v.parse::<u32>().map_err(|_| {
            HospitalError::InvalidInput(format!("PASSWORD_HASH_ITERATIONS is not a number: {v}"))
        }),
    }
}

/// Parse the token lifetime in hours. `None` or blank yields 7 days.
pub fn token_ttl_from_env_value(value: Option<String>) -> HospitalResult<Duration> {
    let hours = match non_blank(value) {
        None => DEFAULT_TOKEN_TTL_HOURS,
        Some(v) => v.parse::<i64>().map_err(|_| {
            HospitalError::InvalidInput(format!("JWT_TTL_HOURS is not a number: {v}"))
        })?,
    };
    if hours <= 0 {
        return Err(HospitalError::InvalidInput(
            "JWT_TTL_HOURS must be positive".into(),
        ));
    }
    Ok(Duration::hours(hours))
}

/// Build the extraction settings. Returns `None` when no endpoint is configured.
pub fn extraction_config_from_env_values(
    endpoint: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<String>,
) -> HospitalResult<Option<ExtractionConfig>> {
    let Some(endpoint) = non_blank(endpoint) else {
        return Ok(None);
    };
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(HospitalError::InvalidInput(
            "EXTRACTION_API_URL must be an http(s) URL".into(),
        ));
    }

    let secs = match non_blank(timeout_secs) {
        None => DEFAULT_EXTRACTION_TIMEOUT_SECS,
        Some(v) => v.parse::<u64>().map_err(|_| {
            HospitalError::InvalidInput(format!("EXTRACTION_TIMEOUT_SECS is not a number: {v}"))
        })?,
    };

    Ok(Some(ExtractionConfig {
        endpoint,
        api_key: non_blank(api_key),
        timeout: std::time::Duration::from_secs(secs),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_config_rejects_low_iterations_and_bad_urls() {
        assert!(CoreConfig::new("d".into(), 10, "http://localhost:3000".into()).is_err());
        assert!(CoreConfig::new("d".into(), 1_000, "localhost:3000".into()).is_err());

        let cfg = CoreConfig::new("d".into(), 1_000, " https://files.example.org/ ".into())
            .expect("valid config");
        assert_eq!(cfg.files_public_base_url(), "https://files.example.org");
        assert_eq!(cfg.records_dir(), Path::new("d").join(RECORDS_DIR_NAME));
    }

    #[test]
    fn env_values_fall_back_to_defaults() {
        assert_eq!(
            password_iterations_from_env_value(None).unwrap(),
            DEFAULT_PASSWORD_ITERATIONS
        );
        assert_eq!(
            password_iterations_from_env_value(Some("  ".into())).unwrap(),
            DEFAULT_PASSWORD_ITERATIONS
        );
        assert_eq!(token_ttl_from_env_value(None).unwrap(), Duration::days(7));
        assert_eq!(
            token_ttl_from_env_value(Some("2".into())).unwrap(),
            Duration::hours(2)
        );
        assert!(token_ttl_from_env_value(Some("-1".into())).is_err());
        assert!(password_iterations_from_env_value(Some("many".into())).is_err());
    }

    #[test]
    fn extraction_is_disabled_without_endpoint() {
        assert!(extraction_config_from_env_values(None, Some("k".into()), None)
            .unwrap()
            .is_none());

        let cfg = extraction_config_from_env_values(
            Some("https://extract.example.org/v1".into()),
            Some("".into()),
            Some("5".into()),
        )
        .unwrap()
        .expect("configured");
        assert_eq!(cfg.timeout, std::time::Duration::from_secs(5));
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn token_config_requires_secret() {
        assert!(TokenConfig::new(Vec::new(), Duration::hours(1)).is_err());
        let cfg = TokenConfig::new("s3cret", Duration::hours(1)).unwrap();
        assert!(!format!("{cfg:?}").contains("s3cret"));
    }
}
