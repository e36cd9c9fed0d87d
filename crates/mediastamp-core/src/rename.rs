use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDateTime, Timelike};

use crate::error::{AuditError, Result};
use crate::fs::Filesystem;
use crate::media::MediaFile;
use crate::ExecutionMode;

/// Highest collision suffix tried before giving up.
pub const MAX_SUFFIX: u32 = 999;

/// `YYYYMMDD_HHMMSS`, plus `.mmm` when the millisecond part is non-zero.
pub fn base_name(ts: NaiveDateTime) -> String {
    let base = ts.format("%Y%m%d_%H%M%S").to_string();
    let millis = (ts.nanosecond() / 1_000_000) % 1000;
    if millis == 0 {
        base
    } else {
        format!("{base}.{millis:03}")
    }
}

/// Target of a canonical rename. The directory never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub dir: PathBuf,
    pub base: String,
    pub suffix: Option<u32>,
    pub extension: String,
}

impl RenamePlan {
    pub fn file_name(&self) -> String {
        let mut name = self.base.clone();
        if let Some(n) = self.suffix {
            name.push_str(&format!(".{n:03}"));
        }
        if !self.extension.is_empty() {
            name.push('.');
            name.push_str(&self.extension);
        }
        name
    }

    pub fn target(&self) -> PathBuf {
        self.dir.join(self.file_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub plan: RenamePlan,
    /// The file already carries its canonical name; nothing was moved.
    pub already_named: bool,
}

/// Names moved in and out of one directory during a preview run, where nothing
/// on disk changes. Stays empty when applying: the disk is the only record then.
#[derive(Debug, Default)]
struct DirNames {
    claimed: HashSet<String>,
    vacated: HashSet<String>,
}

impl DirNames {
    fn is_taken(&self, fs: &dyn Filesystem, dir: &Path, name: &str) -> bool {
        self.claimed.contains(name) || (!self.vacated.contains(name) && fs.exists(&dir.join(name)))
    }

    fn record_move(&mut self, from: &str, to: String) {
        self.claimed.remove(from);
        self.vacated.insert(from.to_string());
        self.vacated.remove(&to);
        self.claimed.insert(to);
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Hands out collision-free names. The free-name check and the move itself happen
/// under one lock per directory, so two workers computing the same name cannot
/// both see it as free.
#[derive(Debug, Default)]
pub struct RenamePlanner {
    dirs: Mutex<HashMap<PathBuf, Arc<Mutex<DirNames>>>>,
}

impl RenamePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, dir: &Path) -> Arc<Mutex<DirNames>> {
        let mut dirs = self.dirs.lock().unwrap_or_else(PoisonError::into_inner);
        dirs.entry(dir.to_path_buf()).or_default().clone()
    }

    /// Give `media` its canonical name built from `base`, trying suffixes `001..=999`
    /// when the plain name is taken.
    pub fn place(
        &self,
        fs: &dyn Filesystem,
        media: &MediaFile,
        base: &str,
        mode: ExecutionMode,
    ) -> Result<Placement> {
        let logical = media.logical_path();
        let dir = logical.parent().unwrap_or(Path::new("")).to_path_buf();
        let slot = self.slot(&dir);
        let mut names = slot.lock().unwrap_or_else(PoisonError::into_inner);

        for suffix in std::iter::once(None).chain((1..=MAX_SUFFIX).map(Some)) {
            let plan = RenamePlan {
                dir: dir.clone(),
                base: base.to_string(),
                suffix,
                extension: media.extension.clone(),
            };
            let name = plan.file_name();
            let target = dir.join(&name);

            if target == logical {
                return Ok(Placement {
                    plan,
                    already_named: true,
                });
            }
            if names.is_taken(fs, &dir, &name) {
                continue;
            }

            if mode.applies() {
                fs.rename(&media.path, &target)
                    .map_err(|source| AuditError::Write {
                        path: media.path.clone(),
                        source,
                    })?;
            } else {
                names.record_move(&file_name_of(&logical), name);
            }
            return Ok(Placement {
                plan,
                already_named: false,
            });
        }

        Err(AuditError::RenameCollisionExhausted {
            dir,
            base: base.to_string(),
        })
    }

    /// Swap the extension of `media`, keeping the stem. Fails when the new name is taken.
    pub fn rename_extension(
        &self,
        fs: &dyn Filesystem,
        media: &MediaFile,
        extension: &str,
        mode: ExecutionMode,
    ) -> Result<PathBuf> {
        let target = media.path.with_extension(extension);
        let dir = target.parent().unwrap_or(Path::new("")).to_path_buf();
        let name = file_name_of(&target);
        let slot = self.slot(&dir);
        let mut names = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if names.is_taken(fs, &dir, &name) {
            return Err(AuditError::Write {
                path: target,
                source: io::Error::new(io::ErrorKind::AlreadyExists, "target name already in use"),
            });
        }
        if mode.applies() {
            fs.rename(&media.path, &target)
                .map_err(|source| AuditError::Write {
                    path: media.path.clone(),
                    source,
                })?;
        } else {
            names.record_move(&file_name_of(&media.path), name);
        }
        Ok(target)
    }
}
