use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures the audit can record for a file (or, for `Enumerate`, for the whole batch).
///
/// Timestamp providers never produce an error value: a provider that fails is
/// indistinguishable from one that has no data.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("cannot read header of {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no free name for {base} in {dir}: suffixes 001-999 are taken")]
    RenameCollisionExhausted { dir: PathBuf, base: String },

    #[error("write failed for {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path has {len} characters, tagging provider limit is {limit}: {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        limit: usize,
    },

    #[error("no timestamp candidate available for {path}")]
    NoTimestamp { path: PathBuf },

    #[error("cannot enumerate {root}: {source}")]
    Enumerate {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, AuditError>;
