//! Document identifiers for files inside archives
//!
//! A document id packs three parts into one opaque string:
//!
//! ```text
//! <container locator>#<access mode>#<path inside the archive>
//! ```
//!
//! The locator may not contain `#`, the mode is `r` or `w`, and the path is
//! always `/`-rooted. The path is the remainder of the string, so it may
//! itself contain `#`.

use crate::error::{ArchiveError, ArchiveResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DELIMITER: char = '#';

/// Path of the archive root
pub const ROOT_PATH: &str = "/";

/// How an archive is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    Write,
}

impl AccessMode {
    /// Single-character token used inside document ids
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
        }
    }

    /// Parse a token produced by [`AccessMode::as_token`]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "r" => Some(Self::Read),
            "w" => Some(Self::Write),
            _ => None,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Identifies one document inside one archive opened with one access mode
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArchiveId {
    locator: String,
    mode: AccessMode,
    path: String,
}

impl ArchiveId {
    /// Build an id, validating each part
    pub fn new(
        locator: impl Into<String>,
        mode: AccessMode,
        path: impl Into<String>,
    ) -> ArchiveResult<Self> {
        let locator = locator.into();
        let path = path.into();

        if locator.is_empty() {
            return Err(ArchiveError::invalid_id(&locator, "empty container locator"));
        }
        if locator.contains(DELIMITER) {
            return Err(ArchiveError::invalid_id(
                &locator,
                format!("container locator may not contain '{}'", DELIMITER),
            ));
        }
        if !path.starts_with('/') {
            return Err(ArchiveError::invalid_id(&path, "path must start with '/'"));
        }

        Ok(Self {
            locator,
            mode,
            path,
        })
    }

    /// Id of the archive root
    pub fn root(locator: impl Into<String>, mode: AccessMode) -> ArchiveResult<Self> {
        Self::new(locator, mode, ROOT_PATH)
    }

    /// Parse a document id string
    pub fn parse(document_id: &str) -> ArchiveResult<Self> {
        let mut parts = document_id.splitn(3, DELIMITER);
        let (Some(locator), Some(mode), Some(path)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ArchiveError::invalid_id(
                document_id,
                "expected <locator>#<mode>#<path>",
            ));
        };

        let mode = AccessMode::from_token(mode).ok_or_else(|| {
            ArchiveError::invalid_id(document_id, format!("unknown access mode '{}'", mode))
        })?;

        Self::new(locator, mode, path)
    }

    /// Compose the document id string
    pub fn to_document_id(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.locator, DELIMITER, self.mode, DELIMITER, self.path
        )
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether this id addresses the archive itself
    pub fn is_root(&self) -> bool {
        self.path == ROOT_PATH
    }

    /// Same archive and mode, different path
    pub fn with_path(&self, path: impl Into<String>) -> ArchiveResult<Self> {
        Self::new(self.locator.clone(), self.mode, path)
    }

    /// Id of the archive root this document lives in
    pub fn to_root(&self) -> Self {
        Self {
            locator: self.locator.clone(),
            mode: self.mode,
            path: ROOT_PATH.to_string(),
        }
    }

    /// Cache key shared by every document in this archive
    pub fn key(&self) -> CacheKey {
        CacheKey {
            locator: self.locator.clone(),
            mode: self.mode,
        }
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_document_id())
    }
}

impl FromStr for ArchiveId {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ArchiveId {
    type Error = ArchiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ArchiveId> for String {
    fn from(id: ArchiveId) -> Self {
        id.to_document_id()
    }
}

/// One cache entry per container and access mode.
///
/// The in-archive path is not part of the key: a single loader serves every
/// document of an archive opened with a given mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub locator: String,
    pub mode: AccessMode,
}

impl CacheKey {
    pub fn new(locator: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            locator: locator.into(),
            mode,
        }
    }

    /// Root id of the archive this key refers to
    pub fn root_id(&self) -> ArchiveResult<ArchiveId> {
        ArchiveId::root(self.locator.clone(), self.mode)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.locator, self.mode)
    }
}
