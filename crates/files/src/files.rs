use crate::constants::{FILES_ROUTE_PREFIX, HASH_ALGORITHM};
use crate::{FilesError, ObjectStorage};
use chrono::{DateTime, Utc};
use hms_types::NonEmptyText;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Hexadecimal SHA-256 digest identifying a stored object.
///
/// Always 64 lowercase hex characters, which also makes it safe to splice into paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Computes the digest of `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        let digest: [u8; 32] = Sha256::digest(bytes).into();
        Self(hex::encode(digest))
    }

    /// Validates an externally supplied identifier.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidObjectId` unless `input` is 64 lowercase hex characters.
    pub fn parse(input: &str) -> Result<Self, FilesError> {
        let ok = input.len() == 64
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !ok {
            return Err(FilesError::InvalidObjectId(input.to_string()));
        }
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = FilesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ContentHash::parse(&value)
    }
}

impl From<ContentHash> for String {
    fn from(value: ContentHash) -> Self {
        value.0
    }
}

/// Result of a successful upload.
///
/// This is what gets embedded in a report record; it carries no patient identifiers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    /// Opaque identifier to read or delete the object with
    pub id: ContentHash,

    /// Durable URL the object can be fetched from
    pub url: String,

    /// Filename supplied by the uploader
    pub original_filename: NonEmptyText,

    /// Best-effort media type; not authoritative
    pub media_type: Option<String>,

    /// Size of the object in bytes
    pub size_bytes: u64,

    /// When the object was first stored
    pub stored_at: DateTime<Utc>,
}

/// Best-effort media type detection from magic bytes, falling back to the file extension for
/// formats without a signature (plain text).
pub fn detect_media_type(bytes: &[u8], filename: &str) -> Option<String> {
    if let Some(kind) = infer::get(bytes) {
        return Some(kind.mime_type().to_string());
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("txt") | Some("text") => Some("text/plain".to_string()),
        Some("csv") => Some("text/csv".to_string()),
        _ => None,
    }
}

/// Local content-addressed implementation of [`ObjectStorage`].
///
/// # Design
///
/// - Content-addressed: objects are identified by their SHA-256 hash
/// - Immutable: stored bytes are never rewritten
/// - Identifiers are validated before they touch the filesystem
#[derive(Debug, Clone)]
pub struct FilesService {
    /// Canonicalised storage root
    root_directory: PathBuf,

    /// Prefix for generated URLs, without trailing slash
    public_base_url: String,
}

impl FilesService {
    /// Creates a store rooted at `root_directory`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - The root exists but is not a directory
    /// - The root cannot be created or canonicalised
    pub fn new(root_directory: &Path, public_base_url: &str) -> Result<Self, FilesError> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        fs::create_dir_all(root_directory).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create directory {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self {
            root_directory,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the URL under which the REST API serves `hash`.
    pub fn url_for(&self, hash: &ContentHash) -> String {
        format!("{}{}/{}", self.public_base_url, FILES_ROUTE_PREFIX, hash)
    }

    /// Returns true if an object with this hash is stored.
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.storage_path(hash).is_file()
    }

    /// `<root>/sha256/<h[0..2]>/<h[2..4]>/<h>`
    fn storage_path(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.as_str();
        self.root_directory
            .join(HASH_ALGORITHM)
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(hex)
    }
}

impl ObjectStorage for FilesService {
    fn upload(&self, bytes: &[u8], filename: &str) -> Result<StoredObject, FilesError> {
        if bytes.is_empty() {
            return Err(FilesError::InvalidUpload("file is empty".into()));
        }

        // Only the final path component is kept; client paths are never trusted.
        let base_name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename);
        let original_filename = NonEmptyText::new(base_name)
            .map_err(|_| FilesError::InvalidUpload("filename is required".into()))?;

        let hash = ContentHash::of(bytes);
        let storage_path = self.storage_path(&hash);

        if storage_path.is_file() {
            tracing::debug!(hash = %hash, "object already stored, reusing");
        } else {
            if let Some(parent) = storage_path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    FilesError::Io(std::io::Error::new(
                        e.kind(),
                        format!(
                            "Failed to create storage directory {}: {}",
                            parent.display(),
                            e
                        ),
                    ))
                })?;
            }

            let tmp_path = storage_path.with_extension("partial");
            fs::write(&tmp_path, bytes).map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to write file to {}: {}", tmp_path.display(), e),
                ))
            })?;
            fs::rename(&tmp_path, &storage_path)?;
        }

        Ok(StoredObject {
            url: self.url_for(&hash),
            id: hash,
            media_type: detect_media_type(bytes, original_filename.as_str()),
            original_filename,
            size_bytes: bytes.len() as u64,
            stored_at: Utc::now(),
        })
    }

    fn read(&self, object_id: &str) -> Result<Vec<u8>, FilesError> {
        let hash = ContentHash::parse(object_id)?;
        let storage_path = self.storage_path(&hash);

        if !storage_path.is_file() {
            return Err(FilesError::NotFound(hash.to_string()));
        }

        fs::read(&storage_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read file from {}: {}", storage_path.display(), e),
            ))
        })
    }

    fn exists(&self, object_id: &str) -> Result<bool, FilesError> {
        Ok(self.contains(&ContentHash::parse(object_id)?))
    }

    fn delete(&self, object_id: &str) -> Result<(), FilesError> {
        let hash = ContentHash::parse(object_id)?;
        let storage_path = self.storage_path(&hash);

        match fs::remove_file(&storage_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FilesError::NotFound(hash.to_string()))
            }
            Err(e) => Err(FilesError::Io(e)),
        }
    }
}
