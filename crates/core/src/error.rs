use hms_files::FilesError;

#[derive(Debug, thiserror::Error)]
pub enum HospitalError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{message}")]
    Validation { field: String, message: String },
    #[error("{0}")]
    Unauthorized(String),
    #[error("account is deactivated")]
    AccountDisabled,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("upload exceeds the maximum size of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("object storage error: {0}")]
    Storage(#[from] FilesError),
    #[error("report extraction failed: {0}")]
    Extraction(String),
    #[error("report extraction is not configured")]
    ExtractionUnavailable,

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove record: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
}

impl HospitalError {
    /// Input rejected for a named request field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

pub type HospitalResult<T> = std::result::Result<T, HospitalError>;
