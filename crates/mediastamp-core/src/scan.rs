use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{AuditError, Result};

/// Extensions the audit picks up (lowercase).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "tif", "tiff", "heic", "heif", "webp", "mp4", "mov", "avi",
    "mkv", "wmv", "mpg", "qt", "m4v", "3gp",
];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// List supported media files under `root`, sorted for a stable dispatch order.
///
/// An unreadable root is fatal; unreadable entries below it are logged and skipped.
pub fn enumerate(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    fs::read_dir(root).map_err(|source| AuditError::Enumerate {
        root: root.to_path_buf(),
        source,
    })?;

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_supported(p))
        .collect();
    files.sort();
    Ok(files)
}
