//! Walks the source tree and drives every media file to a terminal state.
//!
//! Per file:
//!
//! ```text
//! discovered ─┬─ live-photo video ─────────────────────────────► skipped
//!             └─ sidecar lookup ─┬─ missing ───────────────────► quarantined
//!                                └─ map tags ─ sniff ─ stage ─┬► committed
//!                                                             └► quarantined
//! ```
//!
//! Files are processed one at a time, in directory-listing order, depth first.

use crate::config::Config;
use crate::error::{FailureCategory, ProcessError, RunError};
use crate::exiftool::TagWriter;
use crate::live_photo::is_live_photo_video;
use crate::media::MediaFile;
use crate::quarantine::ErrorQuarantine;
use crate::sniff::CorrectedIdentity;
use crate::stager::{self, FileStager};
use crate::tags;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    LivePhoto,
}

/// What happened to one media file.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Committed(PathBuf),
    Skipped(SkipReason),
    Failed {
        category: FailureCategory,
        message: String,
        /// Error-tree copy, `None` if even that copy failed.
        quarantined: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub committed: usize,
    pub skipped: usize,
    pub quarantined: usize,
    pub quarantine_failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &ProcessingOutcome) {
        match outcome {
            ProcessingOutcome::Committed(_) => self.committed += 1,
            ProcessingOutcome::Skipped(_) => self.skipped += 1,
            ProcessingOutcome::Failed {
                quarantined: Some(_),
                ..
            } => self.quarantined += 1,
            ProcessingOutcome::Failed {
                quarantined: None, ..
            } => self.quarantine_failed += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} committed, {} skipped, {} quarantined, {} could not be quarantined",
            self.committed, self.skipped, self.quarantined, self.quarantine_failed
        )
    }
}

/// Drives a run over `config.source` with a borrowed or owned [`TagWriter`].
pub struct Processor<W: TagWriter> {
    config: Config,
    writer: W,
    stager: FileStager,
    quarantine: ErrorQuarantine,
}

impl<W: TagWriter> Processor<W> {
    pub fn new(config: Config, writer: W) -> Self {
        let stager = FileStager::new(
            config.scratch.clone(),
            config.output.clone(),
            config.error.clone(),
        );
        let quarantine = ErrorQuarantine::new(config.error.clone());
        Self {
            config,
            writer,
            stager,
            quarantine,
        }
    }

    /// Processes the whole source tree.
    ///
    /// Per-file failures are quarantined and counted. Only a missing source,
    /// an uncreatable base directory or a directory that cannot be listed
    /// abort the run.
    pub fn run(&mut self) -> Result<RunSummary, RunError> {
        if !self.config.source.is_dir() {
            return Err(RunError::SourceMissing(self.config.source.clone()));
        }
        for dir in [&self.config.scratch, &self.config.output, &self.config.error] {
            fs::create_dir_all(dir).map_err(|source| RunError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }

        let mut summary = RunSummary::default();
        for entry in WalkDir::new(&self.config.source).follow_links(false) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(media) = MediaFile::from_path(entry.path()) else {
                log::debug!("Ignoring {}", entry.path().display());
                continue;
            };

            let outcome = self.process_file(&media);
            summary.record(&outcome);
        }

        log::info!("All done. {summary}");
        Ok(summary)
    }

    /// Runs one file to its terminal state. Never fails; failures are quarantined.
    pub fn process_file(&mut self, media: &MediaFile) -> ProcessingOutcome {
        let relative = self.relative(&media.path);

        if is_live_photo_video(&media.dir, &media.file_name) {
            log::info!("[SKIP LIVE PHOTO VIDEO] {}", relative.display());
            return ProcessingOutcome::Skipped(SkipReason::LivePhoto);
        }

        let mut identity = None;
        match self.commit_file(media, &mut identity) {
            Ok(output) => {
                log::info!("[OK] {} → {}", relative.display(), output.display());
                ProcessingOutcome::Committed(output)
            }
            Err(err) => {
                let category = err.category();
                log::warn!("{} {}: {}", category.label(), relative.display(), err);

                let identity = identity.unwrap_or_else(|| {
                    CorrectedIdentity::resolve_lenient(media, &self.config.source)
                });
                let quarantined = match self.quarantine.admit(media, &identity) {
                    Ok(dest) => Some(dest),
                    Err(e) => {
                        log::error!("[QUARANTINE FAIL] {}: {}", relative.display(), e);
                        None
                    }
                };

                ProcessingOutcome::Failed {
                    category,
                    message: err.to_string(),
                    quarantined,
                }
            }
        }
    }

    /// The success path. `identity` is filled in as soon as it is known so the
    /// failure path places the quarantine copy identically.
    fn commit_file(
        &mut self,
        media: &MediaFile,
        identity: &mut Option<CorrectedIdentity>,
    ) -> Result<PathBuf, ProcessError> {
        let sidecar = stager::require_sidecar(media)?;
        let tags = tags::read_tag_set(&sidecar, media.is_video())?;

        let resolved = CorrectedIdentity::resolve(media, &self.config.source).map_err(|source| {
            ProcessError::Sniff {
                path: media.path.clone(),
                source,
            }
        })?;
        let identity = identity.insert(resolved);

        self.stager.stage(media, &tags, identity, &mut self.writer)
    }

    fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.config.source).unwrap_or(path)
    }
}
