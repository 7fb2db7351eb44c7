//! Error types for archivist
//!
//! All modules use `ArchiveResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for archivist operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// All errors that can occur in archivist
#[derive(Error, Debug)]
pub enum ArchiveError {
    // Request errors
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Unsupported archive type: {0}")]
    UnsupportedType(String),

    #[error("Invalid document id {id}: {reason}")]
    InvalidId { id: String, reason: String },

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Operation cancelled")]
    Cancelled,

    // Archive errors
    #[error("Failed to open archive {locator}: {reason}")]
    OpenFailed { locator: String, reason: String },

    #[error("Timed out after {secs}s waiting for {locator} to open")]
    LoadTimeout { locator: String, secs: u64 },

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl ArchiveError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid id error
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an open failure for a container
    pub fn open_failed(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OpenFailed {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedType(_) => {
                Some("Only application/zip, application/x-zip and application/x-zip-compressed are handled")
            }
            Self::InvalidId { .. } => Some("Paths inside an archive must start with '/'"),
            Self::OpenFailed { .. } => Some("Check that the file is a readable ZIP archive"),
            Self::LoadTimeout { .. } => {
                Some("Raise listing.load_timeout_secs in the config file")
            }
            _ => None,
        }
    }
}
