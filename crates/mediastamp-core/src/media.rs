use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{AuditError, Result};
use crate::fs::Filesystem;

/// One file under audit. Owned by the worker processing it.
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Current location on disk
    pub path: PathBuf,
    /// Effective extension, without the dot. After a signature mismatch this is the
    /// detected one, even when the rename was not applied.
    pub extension: String,
    /// Up to the first 12 bytes
    pub header: Vec<u8>,
    /// Filesystem creation time (local)
    pub created: Option<NaiveDateTime>,
    /// Filesystem modification time (local)
    pub modified: Option<NaiveDateTime>,
}

impl MediaFile {
    pub fn new(path: PathBuf) -> Self {
        let extension = extension_of(&path);
        Self {
            path,
            extension,
            header: Vec::new(),
            created: None,
            modified: None,
        }
    }

    /// Read the header bytes and filesystem times.
    pub fn load(fs: &dyn Filesystem, path: &Path) -> Result<Self> {
        let mut media = Self::new(path.to_path_buf());
        media.header = fs.read_header(path).map_err(|source| AuditError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let times = fs.times(path);
        media.created = times.created;
        media.modified = times.modified;
        Ok(media)
    }

    /// Where the file lives once pending changes are taken into account.
    /// Differs from `path` only in preview mode after a signature mismatch.
    pub fn logical_path(&self) -> PathBuf {
        if self.extension == extension_of(&self.path) {
            self.path.clone()
        } else {
            self.path.with_extension(&self.extension)
        }
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string()
}
