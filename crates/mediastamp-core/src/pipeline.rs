use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::date::{self, Candidates, TimestampCandidate, TimestampResolver};
use crate::error::{AuditError, Result};
use crate::media::MediaFile;
use crate::provenance::Provenance;
use crate::rename::{base_name, Placement, RenamePlanner};
use crate::signature::{self, DetectedFormat};
use crate::stats::{Counter, Stats};
use crate::{Collaborators, ExecutionMode};

/// Stages a file moves through. Any stage may end in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Step {
    Start,
    SignatureCheck,
    TimestampResolve,
    ProvenanceClassify,
    MetadataWrite,
    Rename,
    Done,
    Failed,
}

/// What happened to one file. Failures are recorded here, never propagated.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub mode: ExecutionMode,
    pub state: Step,
    /// First stage that recorded an error
    pub failed_at: Option<Step>,
    /// Detected format, set only when it disagreed with the extension
    pub detected: Option<DetectedFormat>,
    pub canonical: Option<TimestampCandidate>,
    pub provenance: Option<Provenance>,
    pub placement: Option<Placement>,
    pub errors: Vec<AuditError>,
}

impl FileOutcome {
    fn new(path: &Path, mode: ExecutionMode) -> Self {
        Self {
            path: path.to_path_buf(),
            mode,
            state: Step::Start,
            failed_at: None,
            detected: None,
            canonical: None,
            provenance: None,
            placement: None,
            errors: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        !self.errors.is_empty()
    }

    /// One-line action summary for logs and progress output.
    pub fn summary(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());

        let mut parts = Vec::new();
        if let Some(format) = self.detected {
            parts.push(format!("signature is {}", format.extension()));
        }
        if let (Some(c), Some(p)) = (self.canonical, self.provenance) {
            parts.push(format!("{} [{}]", c.instant.format("%Y-%m-%d %H:%M:%S%.3f"), p));
        }
        if let Some(placement) = &self.placement {
            if placement.already_named {
                parts.push("already named".to_string());
            } else {
                parts.push(format!("-> {}", placement.plan.file_name()));
            }
        }
        for e in &self.errors {
            parts.push(format!("FAILED: {e}"));
        }

        let prefix = if self.mode.applies() { "" } else { "(preview) " };
        format!("{prefix}{name}: {}", parts.join(", "))
    }
}

/// Runs single files through signature check, timestamp resolution, provenance,
/// metadata write and rename.
pub struct Pipeline<'a> {
    collab: &'a Collaborators,
    planner: &'a RenamePlanner,
    stats: &'a Stats,
    mode: ExecutionMode,
    tag_path_limit: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        collab: &'a Collaborators,
        planner: &'a RenamePlanner,
        stats: &'a Stats,
        mode: ExecutionMode,
        tag_path_limit: usize,
    ) -> Self {
        Self {
            collab,
            planner,
            stats,
            mode,
            tag_path_limit,
        }
    }

    /// Process one file. Never fails: errors end up in the outcome and the counters.
    pub fn process(&self, path: &Path) -> FileOutcome {
        let mut outcome = FileOutcome::new(path, self.mode);

        match self.run(path, &mut outcome) {
            Ok(()) => outcome.state = Step::Done,
            Err(e) => {
                outcome.failed_at.get_or_insert(outcome.state);
                outcome.state = Step::Failed;
                outcome.errors.push(e);
            }
        }

        self.stats.incr(Counter::Processed);
        if outcome.is_failed() {
            self.stats.incr(Counter::Failed);
            warn!("{}", outcome.summary());
        } else {
            info!("{}", outcome.summary());
        }
        outcome
    }

    fn run(&self, path: &Path, outcome: &mut FileOutcome) -> Result<()> {
        let fs = self.collab.fs.as_ref();

        outcome.state = Step::SignatureCheck;
        let mut media = MediaFile::load(fs, path)?;
        self.check_signature(&mut media, outcome);

        outcome.state = Step::TimestampResolve;
        let candidates = self.resolver().resolve(&media);

        outcome.state = Step::ProvenanceClassify;
        let provenance = Provenance::classify(&candidates);
        outcome.provenance = Some(provenance);
        self.stats.incr(provenance.into());
        let canonical = candidates.canonical().ok_or_else(|| AuditError::NoTimestamp {
            path: media.path.clone(),
        })?;
        outcome.canonical = Some(canonical);

        outcome.state = Step::MetadataWrite;
        self.write_metadata(&media, &candidates, canonical.instant)?;

        outcome.state = Step::Rename;
        let placement = self
            .planner
            .place(fs, &media, &base_name(canonical.instant), self.mode)?;
        self.record_placement(&placement);
        outcome.placement = Some(placement);
        Ok(())
    }

    fn resolver(&self) -> TimestampResolver<'_> {
        TimestampResolver {
            capture: self.collab.capture.as_ref(),
            container: self.collab.container.as_ref(),
            tagger: self.collab.tagger.as_ref(),
            tag_path_limit: self.tag_path_limit,
        }
    }

    /// A failed extension fix is recorded but the file continues under its old name.
    fn check_signature(&self, media: &mut MediaFile, outcome: &mut FileOutcome) {
        let Some(format) = signature::mismatch(&media.header, &media.extension) else {
            return;
        };
        self.stats.incr(Counter::SignatureMismatchCount);
        outcome.detected = Some(format);

        match self
            .planner
            .rename_extension(self.collab.fs.as_ref(), media, format.extension(), self.mode)
        {
            Ok(target) => {
                if self.mode.applies() {
                    self.stats.incr(Counter::SignatureRenamedCount);
                    media.path = target;
                } else {
                    self.stats.incr(Counter::DryRun);
                }
                media.extension = format.extension().to_string();
            }
            Err(e) => {
                warn!(path = %media.path.display(), error = %e, "extension fix failed, keeping original");
                outcome.failed_at = Some(Step::SignatureCheck);
                outcome.errors.push(e);
            }
        }
    }

    fn write_metadata(&self, media: &MediaFile, candidates: &Candidates, ts: NaiveDateTime) -> Result<()> {
        let fs = self.collab.fs.as_ref();
        let write_err = |source: io::Error| AuditError::Write {
            path: media.path.clone(),
            source,
        };

        if differs(media.modified, ts) {
            if self.mode.applies() {
                fs.set_modified(&media.path, ts).map_err(write_err)?;
                self.stats.incr(Counter::DateModifiedSet);
            } else {
                self.stats.incr(Counter::DryRun);
            }
        }

        if fs.can_set_created() && differs(media.created, ts) {
            if self.mode.applies() {
                fs.set_created(&media.path, ts).map_err(write_err)?;
                self.stats.incr(Counter::DateCreatedSet);
            } else {
                self.stats.incr(Counter::DryRun);
            }
        }

        let tagger = self.collab.tagger.as_ref();
        if date::is_container(&media.extension) || !tagger.can_write() || candidates.capture == Some(ts) {
            return Ok(());
        }
        if let Err(e) = date::check_tag_path(&media.path, self.tag_path_limit) {
            debug!(error = %e, "skipping date tag write");
            return Ok(());
        }
        if self.mode.applies() {
            if let (Some(dir), Some(name)) = (media.path.parent(), media.path.file_name()) {
                tagger.write_date_taken(dir, name, ts).map_err(write_err)?;
                self.stats.incr(Counter::DateTakenSet);
            }
        } else {
            self.stats.incr(Counter::DryRun);
        }
        Ok(())
    }

    fn record_placement(&self, placement: &Placement) {
        if placement.already_named {
            self.stats.incr(Counter::Skipped);
        } else if self.mode.applies() {
            self.stats.incr(Counter::Renamed);
            if placement.plan.suffix.is_some() {
                self.stats.incr(Counter::WithCounter);
            }
        } else {
            self.stats.incr(Counter::DryRun);
        }
    }
}

/// Timestamps within the same second count as equal; filesystems differ in precision.
fn differs(current: Option<NaiveDateTime>, ts: NaiveDateTime) -> bool {
    current.map_or(true, |c| (c - ts).num_seconds() != 0)
}
