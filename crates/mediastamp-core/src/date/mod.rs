pub mod exif;
pub mod provider;
pub mod quicktime;

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuditError;
use crate::media::MediaFile;
use provider::{CaptureDateProvider, ContainerDateProvider, DateTagger};

/// Extensions handled as video containers rather than still images.
pub const CONTAINER_EXTENSIONS: &[&str] = &["mov", "mp4", "avi", "mkv", "wmv", "mpg", "qt"];

pub fn is_container(extension: &str) -> bool {
    let ext = extension.to_ascii_lowercase();
    CONTAINER_EXTENSIONS.contains(&ext.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimestampSource {
    CaptureDate,
    ContainerDate,
    FilesystemCreated,
    FilesystemModified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampCandidate {
    pub source: TimestampSource,
    pub instant: NaiveDateTime,
}

/// All timestamp candidates of one file, normalized to local time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Candidates {
    pub capture: Option<NaiveDateTime>,
    pub container: Option<NaiveDateTime>,
    pub fs_created: Option<NaiveDateTime>,
    pub fs_modified: Option<NaiveDateTime>,
}

impl Candidates {
    pub fn iter(&self) -> impl Iterator<Item = TimestampCandidate> {
        [
            (TimestampSource::CaptureDate, self.capture),
            (TimestampSource::ContainerDate, self.container),
            (TimestampSource::FilesystemCreated, self.fs_created),
            (TimestampSource::FilesystemModified, self.fs_modified),
        ]
        .into_iter()
        .filter_map(|(source, instant)| instant.map(|instant| TimestampCandidate { source, instant }))
    }

    /// The oldest candidate. Equal instants resolve to the first source in declaration order.
    pub fn canonical(&self) -> Option<TimestampCandidate> {
        self.iter().min_by_key(|c| c.instant)
    }
}

/// Gathers timestamp candidates for a file from the providers and the filesystem.
pub struct TimestampResolver<'a> {
    pub capture: &'a dyn CaptureDateProvider,
    pub container: &'a dyn ContainerDateProvider,
    pub tagger: &'a dyn DateTagger,
    pub tag_path_limit: usize,
}

impl TimestampResolver<'_> {
    pub fn resolve(&self, media: &MediaFile) -> Candidates {
        let mut candidates = Candidates {
            fs_created: media.created,
            fs_modified: media.modified,
            ..Candidates::default()
        };

        if is_container(&media.extension) {
            candidates.container = self.container.container_date(&media.path);
            if candidates.container.is_none() {
                debug!(path = %media.path.display(), "no container date candidate");
            }
            return candidates;
        }

        candidates.capture = self.capture.capture_date(&media.path);
        if candidates.capture.is_none() {
            debug!(path = %media.path.display(), "no capture date candidate");
            match check_tag_path(&media.path, self.tag_path_limit) {
                Ok(()) => {
                    if let (Some(dir), Some(name)) = (media.path.parent(), media.path.file_name()) {
                        candidates.capture = self.tagger.read_date_taken(dir, name);
                    }
                }
                Err(e) => debug!(error = %e, "skipping date tag lookup"),
            }
        }

        candidates
    }
}

/// Paths over the tagging provider's limit skip that provider.
pub fn check_tag_path(path: &Path, limit: usize) -> Result<(), AuditError> {
    let len = path.to_string_lossy().chars().count();
    if len > limit {
        return Err(AuditError::PathTooLong {
            path: path.to_path_buf(),
            len,
            limit,
        });
    }
    Ok(())
}
