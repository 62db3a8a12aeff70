//! Hospital File Storage
//!
//! Storage boundary for uploaded medical documents (scanned reports, PDFs, images).
//!
//! The rest of the system only sees the [`ObjectStorage`] trait: hand it bytes and a filename,
//! get back a durable URL plus an opaque identifier; later read or delete by that identifier.
//! Any hosted object store can sit behind the trait. [`FilesService`] is the bundled
//! implementation, a local content-addressed store.
//!
//! ## Local layout
//!
//! ```text
//! <root>/
//! └── sha256/
//!     └── ab/
//!         └── 3f/
//!             └── ab3f9e…   # object bytes, named by their SHA-256 digest
//! ```
//!
//! Objects are immutable. Uploading bytes that are already stored returns the existing object
//! rather than writing a second copy.
//!
//! ## Example Usage
//!
//! ```no_run
//! use hms_files::{FilesService, ObjectStorage};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = FilesService::new(Path::new("hospital_data/files"), "http://localhost:3000")?;
//! let stored = service.upload(b"%PDF-1.4 ...", "blood-panel.pdf")?;
//! println!("{} -> {}", stored.id, stored.url);
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;

pub use constants::{FILES_ROUTE_PREFIX, HASH_ALGORITHM};
pub use files::{detect_media_type, ContentHash, FilesService, StoredObject};

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Identifier is not a valid content hash
    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    /// Nothing is stored under the identifier
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Upload was rejected before anything was stored
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// Remote storage backend could not be reached or refused the request
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Boundary to a durable object store.
///
/// Implementations must be safe to share across request handlers.
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` and returns where they can be fetched from.
    fn upload(&self, bytes: &[u8], filename: &str) -> Result<StoredObject, FilesError>;

    /// Returns the bytes stored under `object_id`.
    fn read(&self, object_id: &str) -> Result<Vec<u8>, FilesError>;

    /// Whether an object is currently stored under `object_id`.
    fn exists(&self, object_id: &str) -> Result<bool, FilesError>;

    /// Removes the object stored under `object_id`.
    fn delete(&self, object_id: &str) -> Result<(), FilesError>;
}
