use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the long-lived ExifTool worker.
#[derive(Debug, Error)]
pub enum ExifToolError {
    #[error("Failed to launch exiftool: {0}")]
    ExifToolNotFound(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {}. command={command_args}", .path.display())]
    FileNotFound { path: PathBuf, command_args: String },

    #[error("ExifTool error: {message}. command={command_args}")]
    ExifToolProcess {
        message: String,
        std_err: String,
        command_args: String,
    },

    #[error("Process terminated unexpectedly.")]
    ProcessTerminated,

    #[error("stderr channel for exiftool disconnected.")]
    StderrDisconnected,

    #[error("Expected different format from exiftool. file={path}, args={command_args}")]
    UnexpectedFormat { path: String, command_args: String },

    #[error("Tag '{tag}' not found in {}", .path.display())]
    TagNotFound { path: PathBuf, tag: String },

    #[error("Failed to deserialize tag '{tag}' of {}: {error}", .path.display())]
    TagDeserialization {
        path: PathBuf,
        tag: String,
        error: serde_json::Error,
    },

    #[error("Deserialization error at path '{path}': {source}")]
    Deserialization {
        path: String,
        source: serde_json::Error,
    },
}

impl From<serde_path_to_error::Error<serde_json::Error>> for ExifToolError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        ExifToolError::Deserialization {
            path: err.path().to_string(),
            source: err.into_inner(),
        }
    }
}

/// A sidecar document that exists but could not be turned into a tag set.
#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("Failed to read sidecar {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed sidecar {} at '{json_path}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        json_path: String,
        source: serde_json::Error,
    },
}

/// Why a single media file ended up in the error tree.
///
/// Every variant is handled at the per-file boundary; none of them stops the run.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("No matching JSON found at {}", .sidecar.display())]
    MissingSidecar { media: PathBuf, sidecar: PathBuf },

    #[error("Failed to embed metadata into {}: {source}", .media.display())]
    EmbedFailure {
        media: PathBuf,
        source: ExifToolError,
    },

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to inspect file type of {}: {source}", .path.display())]
    Sniff {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The coarse failure categories used for log prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    MissingSidecar,
    EmbedFailure,
    Uncategorized,
}

impl ProcessError {
    pub fn category(&self) -> FailureCategory {
        match self {
            ProcessError::MissingSidecar { .. } => FailureCategory::MissingSidecar,
            ProcessError::EmbedFailure { .. } => FailureCategory::EmbedFailure,
            ProcessError::Sidecar(_) | ProcessError::Io(_) | ProcessError::Sniff { .. } => {
                FailureCategory::Uncategorized
            }
        }
    }
}

impl FailureCategory {
    /// Fixed prefix of the per-file log line.
    pub fn label(self) -> &'static str {
        match self {
            FailureCategory::MissingSidecar => "[MISS JSON]",
            FailureCategory::EmbedFailure => "[EXIF FAIL]",
            FailureCategory::Uncategorized => "[OTHER ERR]",
        }
    }
}

/// Failures that abort the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Source folder does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to enumerate source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Could not determine the home directory to expand {0}")]
    NoHomeDir(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
