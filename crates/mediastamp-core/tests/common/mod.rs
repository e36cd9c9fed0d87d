#![allow(dead_code)]

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use mediastamp_core::date::provider::{CaptureDateProvider, ContainerDateProvider, DateTagger};
use mediastamp_core::fs::{FileTimes, Filesystem, LocalFs};
use mediastamp_core::Progress;

pub const JPEG_HEADER: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01];

pub fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(hh, mm, ss)
        .unwrap()
}

pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Bytes with no recognisable signature.
pub fn plain_bytes() -> Vec<u8> {
    b"plain image bytes, no magic".to_vec()
}

pub fn jpeg_bytes() -> Vec<u8> {
    let mut bytes = JPEG_HEADER.to_vec();
    bytes.extend_from_slice(&[0u8; 64]);
    bytes
}

pub fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn no_progress() -> impl Fn(&Progress) + Send + Sync {
    |_: &Progress| {}
}

/// Local filesystem that reports fixed creation/modification times for every file.
pub struct FixedTimesFs {
    pub times: FileTimes,
}

impl FixedTimesFs {
    pub fn new(created: Option<NaiveDateTime>, modified: Option<NaiveDateTime>) -> Self {
        Self {
            times: FileTimes { created, modified },
        }
    }
}

impl Filesystem for FixedTimesFs {
    fn read_header(&self, path: &Path) -> io::Result<Vec<u8>> {
        LocalFs.read_header(path)
    }

    fn times(&self, _path: &Path) -> FileTimes {
        self.times
    }

    fn set_modified(&self, path: &Path, at: NaiveDateTime) -> io::Result<()> {
        LocalFs.set_modified(path, at)
    }

    fn can_set_created(&self) -> bool {
        false
    }

    fn set_created(&self, path: &Path, at: NaiveDateTime) -> io::Result<()> {
        LocalFs.set_created(path, at)
    }

    fn exists(&self, path: &Path) -> bool {
        LocalFs.exists(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        LocalFs.rename(from, to)
    }
}

/// [`FixedTimesFs`] that refuses selected writes.
pub struct FaultyFs {
    pub inner: FixedTimesFs,
    /// Renames onto this file name fail with `PermissionDenied`
    pub deny_rename_to: Option<String>,
    pub deny_set_modified: bool,
}

fn denied() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "read-only")
}

impl Filesystem for FaultyFs {
    fn read_header(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.inner.read_header(path)
    }

    fn times(&self, path: &Path) -> FileTimes {
        self.inner.times(path)
    }

    fn set_modified(&self, path: &Path, at: NaiveDateTime) -> io::Result<()> {
        if self.deny_set_modified {
            return Err(denied());
        }
        self.inner.set_modified(path, at)
    }

    fn can_set_created(&self) -> bool {
        self.inner.can_set_created()
    }

    fn set_created(&self, path: &Path, at: NaiveDateTime) -> io::Result<()> {
        self.inner.set_created(path, at)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let name = to.file_name().map(|n| n.to_string_lossy().into_owned());
        if name.is_some() && name == self.deny_rename_to {
            return Err(denied());
        }
        self.inner.rename(from, to)
    }
}

pub struct FixedDate(pub Option<NaiveDateTime>);

impl CaptureDateProvider for FixedDate {
    fn capture_date(&self, _path: &Path) -> Option<NaiveDateTime> {
        self.0
    }
}

impl ContainerDateProvider for FixedDate {
    fn container_date(&self, _path: &Path) -> Option<NaiveDateTime> {
        self.0
    }
}

/// Tagger that supports writes and remembers them.
#[derive(Clone, Default)]
pub struct RecordingTagger {
    pub writes: Arc<Mutex<Vec<(PathBuf, NaiveDateTime)>>>,
}

impl DateTagger for RecordingTagger {
    fn read_date_taken(&self, _dir: &Path, _file_name: &OsStr) -> Option<NaiveDateTime> {
        None
    }

    fn can_write(&self) -> bool {
        true
    }

    fn write_date_taken(&self, dir: &Path, file_name: &OsStr, at: NaiveDateTime) -> io::Result<()> {
        self.writes.lock().unwrap().push((dir.join(file_name), at));
        Ok(())
    }
}
