use crate::error::ProcessError;
use crate::exiftool::TagWriter;
use crate::media::MediaFile;
use crate::sniff::CorrectedIdentity;
use crate::tags::TagSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

/// Returns the sidecar path of `media`, or `MissingSidecar` if there is none.
pub fn require_sidecar(media: &MediaFile) -> Result<PathBuf, ProcessError> {
    let sidecar = media.sidecar_path();
    if sidecar.is_file() {
        Ok(sidecar)
    } else {
        Err(ProcessError::MissingSidecar {
            media: media.path.clone(),
            sidecar,
        })
    }
}

/// Copies media into a scratch area, embeds tags there and moves the result
/// into the output tree.
///
/// The source file is only ever opened for reading. A staged copy that fails
/// to embed is removed when its guard drops and never reaches the output tree.
#[derive(Debug)]
pub struct FileStager {
    scratch_dir: PathBuf,
    output_dir: PathBuf,
    error_dir: PathBuf,
    sequence: u64,
}

impl FileStager {
    pub fn new(scratch_dir: PathBuf, output_dir: PathBuf, error_dir: PathBuf) -> Self {
        Self {
            scratch_dir,
            output_dir,
            error_dir,
            sequence: 0,
        }
    }

    /// Stages, embeds and commits one file. Returns the committed output path.
    pub fn stage<W: TagWriter>(
        &mut self,
        media: &MediaFile,
        tags: &TagSet,
        identity: &CorrectedIdentity,
        writer: &mut W,
    ) -> Result<PathBuf, ProcessError> {
        let output_path = self.output_dir.join(&identity.relative_path);
        let error_path = self.error_dir.join(&identity.relative_path);
        ensure_parent(&output_path)?;
        ensure_parent(&error_path)?;

        let staged = self.copy_to_scratch(media, identity)?;
        log::debug!(
            "Staged {} as {}",
            media.path.display(),
            staged.display()
        );

        if tags.is_empty() {
            log::debug!("No tags for {}, committing copy as-is", media.path.display());
        } else {
            writer
                .embed(&staged, tags)
                .map_err(|source| ProcessError::EmbedFailure {
                    media: media.path.clone(),
                    source,
                })?;
        }

        // Scratch files are created owner-only; the output keeps the source's mode.
        fs::set_permissions(&staged, fs::metadata(&media.path)?.permissions())?;
        commit(staged, &output_path)?;
        Ok(output_path)
    }

    fn copy_to_scratch(
        &mut self,
        media: &MediaFile,
        identity: &CorrectedIdentity,
    ) -> io::Result<TempPath> {
        self.sequence += 1;
        let prefix = format!("temp_{}_", self.sequence);
        // Lossy so the path handed to exiftool is always valid UTF-8.
        let suffix = format!("_{}", identity.file_name().to_string_lossy());

        let mut staged = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.scratch_dir)?;
        let mut source = File::open(&media.path)?;
        io::copy(&mut source, staged.as_file_mut())?;
        staged.as_file().sync_all()?;

        Ok(staged.into_temp_path())
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
}

/// Renames `staged` onto `dest`, replacing whatever is there.
///
/// If the rename fails (scratch and output on different filesystems), the
/// bytes are copied into a temporary file beside `dest` and renamed from there.
fn commit(staged: TempPath, dest: &Path) -> io::Result<()> {
    let staged = match staged.persist(dest) {
        Ok(()) => return Ok(()),
        Err(err) => {
            log::debug!(
                "Rename into {} failed ({}), copying instead",
                dest.display(),
                err.error
            );
            err.path
        }
    };

    let dir = dest.parent().unwrap_or(Path::new("."));
    let mut local = NamedTempFile::new_in(dir)?;
    io::copy(&mut File::open(&staged)?, local.as_file_mut())?;
    local.as_file().sync_all()?;
    local
        .as_file()
        .set_permissions(fs::metadata(&staged)?.permissions())?;
    local.persist(dest).map_err(|e| e.error)?;
    Ok(())
}
