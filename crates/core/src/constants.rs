//! Constants used throughout the hospital core crate.
//!
//! Directory names, file names and domain limits live here so that storage layout and
//! validation rules stay consistent across services.

/// Default root directory for hospital data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "hospital_data";

/// Directory name for JSON document collections.
pub const RECORDS_DIR_NAME: &str = "records";

/// Directory name for uploaded report files.
pub const FILES_DIR_NAME: &str = "files";

/// Filename for each persisted document.
pub const RECORD_JSON_FILENAME: &str = "record.json";

pub const ACCOUNTS_COLLECTION: &str = "accounts";
pub const APPOINTMENTS_COLLECTION: &str = "appointments";
pub const LAB_TESTS_COLLECTION: &str = "lab_tests";
pub const PRESCRIPTIONS_COLLECTION: &str = "prescriptions";
pub const REPORTS_COLLECTION: &str = "reports";

/// Default PBKDF2 rounds for password hashing.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 100_000;

/// Lowest accepted PBKDF2 round count. Tests use this to keep hashing fast.
pub const MIN_PASSWORD_ITERATIONS: u32 = 1_000;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Display ids carry six digits, so each role has at most this many.
pub const MAX_DISPLAY_NUMBER: u32 = 999_999;

/// Default bearer token lifetime (7 days).
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 168;

/// Upper bound on uploaded report size (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Media types accepted for report uploads.
pub const ALLOWED_REPORT_MEDIA_TYPES: &[&str] =
    &["application/pdf", "image/png", "image/jpeg", "text/plain"];

pub const DEFAULT_APPOINTMENT_MINUTES: u32 = 30;

pub const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 60;

/// Outbound buffer per WebSocket connection. Events beyond this are dropped.
pub const PRESENCE_CHANNEL_CAPACITY: usize = 64;
