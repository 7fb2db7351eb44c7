//! Local filesystem collaborators
//!
//! Lets the archive cache browse `.zip` files on disk. Locators are plain
//! paths or `file://` URLs.

mod resolver;
mod zip_archive;

pub use resolver::LocalResolver;
pub use zip_archive::{ZipArchiveHandle, ZipOpener};

use std::path::PathBuf;

const FILE_SCHEME: &str = "file://";

/// Filesystem path a locator points at
pub fn locator_path(locator: &str) -> PathBuf {
    PathBuf::from(locator.strip_prefix(FILE_SCHEME).unwrap_or(locator))
}

/// Best-effort MIME type from a file name's extension
pub fn mime_type_for(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "zip" => "application/zip",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
