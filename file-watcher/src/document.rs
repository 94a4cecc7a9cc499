//! Watch-independent document access.
//!
//! Used for the initial load and as the manual reload path when a session
//! could not be started.

use std::path::Path;

use crate::error::{Result, WatchError};
use crate::fs::ContentReader;

/// Title used when a path has no usable file name.
pub const UNTITLED: &str = "Untitled";

/// Read the document at `path` as UTF-8 text.
pub async fn read_document(reader: &dyn ContentReader, path: &Path) -> Result<String> {
    let bytes = reader.read(path).await?;
    String::from_utf8(bytes).map_err(|_| WatchError::InvalidUtf8(path.display().to_string()))
}

/// File name to show for `path`.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(UNTITLED)
        .to_string()
}
