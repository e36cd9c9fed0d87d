use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};

use crate::signature::HEADER_LEN;

/// Creation and modification times of a file, in local time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTimes {
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
}

/// Filesystem operations the audit needs. Every call may fail independently.
pub trait Filesystem: Send + Sync {
    /// Up to the first [`HEADER_LEN`] bytes of the file.
    fn read_header(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// A time the platform cannot report comes back as `None`.
    fn times(&self, path: &Path) -> FileTimes;

    fn set_modified(&self, path: &Path, at: NaiveDateTime) -> io::Result<()>;

    /// Whether [`Filesystem::set_created`] does anything on this platform.
    fn can_set_created(&self) -> bool;

    fn set_created(&self, path: &Path, at: NaiveDateTime) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// The real local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn read_header(&self, path: &Path) -> io::Result<Vec<u8>> {
        let file = File::open(path)?;
        let mut header = Vec::with_capacity(HEADER_LEN);
        file.take(HEADER_LEN as u64).read_to_end(&mut header)?;
        Ok(header)
    }

    fn times(&self, path: &Path) -> FileTimes {
        let Ok(meta) = fs::metadata(path) else {
            return FileTimes::default();
        };
        FileTimes {
            created: meta.created().ok().map(to_local),
            modified: meta.modified().ok().map(to_local),
        }
    }

    fn set_modified(&self, path: &Path, at: NaiveDateTime) -> io::Result<()> {
        let st = from_local(at)?;
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(st))
    }

    fn can_set_created(&self) -> bool {
        cfg!(windows)
    }

    #[cfg(windows)]
    fn set_created(&self, path: &Path, at: NaiveDateTime) -> io::Result<()> {
        use std::os::windows::fs::FileTimesExt;
        let st = from_local(at)?;
        let file = fs::OpenOptions::new().write(true).open(path)?;
        file.set_times(fs::FileTimes::new().set_created(st))
    }

    #[cfg(not(windows))]
    fn set_created(&self, _path: &Path, _at: NaiveDateTime) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "creation time cannot be set on this platform",
        ))
    }

    fn exists(&self, path: &Path) -> bool {
        // symlink_metadata so a dangling link still occupies the name
        fs::symlink_metadata(path).is_ok()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

/// Convert a filesystem time to the local time reference used for all candidates.
pub fn to_local(st: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(st).naive_local()
}

/// Inverse of [`to_local`]. Ambiguous local times (DST fold) take the earlier instant.
pub fn from_local(at: NaiveDateTime) -> io::Result<SystemTime> {
    at.and_local_timezone(Local)
        .earliest()
        .map(SystemTime::from)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{at} does not exist in the local timezone"),
            )
        })
}
