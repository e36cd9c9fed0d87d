use std::ffi::OsStr;
use std::io;
use std::path::Path;

use chrono::NaiveDateTime;

/// Capture date embedded in image metadata.
///
/// Implementations absorb their own failures: `None` is the only "no data" signal.
pub trait CaptureDateProvider: Send + Sync {
    fn capture_date(&self, path: &Path) -> Option<NaiveDateTime>;
}

/// Creation date stored in a video container.
pub trait ContainerDateProvider: Send + Sync {
    fn container_date(&self, path: &Path) -> Option<NaiveDateTime>;
}

/// OS-level "date taken" tag, consulted as a secondary capture-date source.
pub trait DateTagger: Send + Sync {
    fn read_date_taken(&self, dir: &Path, file_name: &OsStr) -> Option<NaiveDateTime>;

    /// Whether [`DateTagger::write_date_taken`] is supported.
    fn can_write(&self) -> bool;

    fn write_date_taken(&self, dir: &Path, file_name: &OsStr, at: NaiveDateTime) -> io::Result<()>;
}

/// Tagger for platforms without a shell property store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTagger;

impl DateTagger for NoTagger {
    fn read_date_taken(&self, _dir: &Path, _file_name: &OsStr) -> Option<NaiveDateTime> {
        None
    }

    fn can_write(&self) -> bool {
        false
    }

    fn write_date_taken(&self, _dir: &Path, _file_name: &OsStr, _at: NaiveDateTime) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "no date tagging provider on this platform",
        ))
    }
}
