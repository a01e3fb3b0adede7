use crate::media::MediaFile;
use crate::sniff::CorrectedIdentity;
use std::fs;
use std::io;
use std::path::PathBuf;

/// The error tree: untouched copies of originals that could not be processed.
#[derive(Debug, Clone)]
pub struct ErrorQuarantine {
    error_dir: PathBuf,
}

impl ErrorQuarantine {
    pub fn new(error_dir: PathBuf) -> Self {
        Self { error_dir }
    }

    /// Copies the original into `<error dir>/<corrected relative path>`.
    pub fn admit(&self, media: &MediaFile, identity: &CorrectedIdentity) -> io::Result<PathBuf> {
        let dest = self.error_dir.join(&identity.relative_path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&media.path, &dest)?;
        Ok(dest)
    }
}
