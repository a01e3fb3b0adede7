use crate::error::RunError;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_SOURCE: &str = "~/path/to/Ente Photos";
pub const DEFAULT_OUTPUT: &str = "~/Documents/output";
pub const DEFAULT_ERROR: &str = "~/Documents/error";
pub const DEFAULT_SCRATCH: &str = "~/Documents/tmp";
pub const DEFAULT_EXIFTOOL: &str = "exiftool";

/// Where a run reads from and writes to.
///
/// Build one with [`Config::default`] or from CLI flags, then call
/// [`Config::resolve`] to get absolute paths before starting a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Export tree to read. Never modified.
    pub source: PathBuf,
    /// Successfully processed files.
    pub output: PathBuf,
    /// Untouched copies of files that failed.
    pub error: PathBuf,
    /// Staging area for copies being written.
    pub scratch: PathBuf,
    /// `exiftool` executable. A bare name is looked up on `PATH`.
    pub exiftool: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            output: PathBuf::from(DEFAULT_OUTPUT),
            error: PathBuf::from(DEFAULT_ERROR),
            scratch: PathBuf::from(DEFAULT_SCRATCH),
            exiftool: PathBuf::from(DEFAULT_EXIFTOOL),
        }
    }
}

impl Config {
    /// Expands `~` and makes every directory absolute against the current directory.
    pub fn resolve(self) -> Result<Self, RunError> {
        let cwd = std::env::current_dir()?;
        let home = dirs::home_dir();
        self.resolve_with(&cwd, home.as_deref())
    }

    pub fn resolve_with(self, cwd: &Path, home: Option<&Path>) -> Result<Self, RunError> {
        let dir = |p: &Path| resolve_path(p, cwd, home);

        // A bare executable name stays as-is so it is found on PATH.
        let exiftool = if self.exiftool.components().count() > 1 || self.exiftool.starts_with("~")
        {
            dir(&self.exiftool)?
        } else {
            self.exiftool
        };

        Ok(Self {
            source: dir(&self.source)?,
            output: dir(&self.output)?,
            error: dir(&self.error)?,
            scratch: dir(&self.scratch)?,
            exiftool,
        })
    }
}

/// `~` expansion, then lexical normalisation against `cwd`.
pub fn resolve_path(raw: &Path, cwd: &Path, home: Option<&Path>) -> Result<PathBuf, RunError> {
    let expanded = match raw.strip_prefix("~") {
        Ok(rest) => {
            let home = home.ok_or_else(|| RunError::NoHomeDir(raw.display().to_string()))?;
            home.join(rest)
        }
        Err(_) => raw.to_path_buf(),
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn expands_home() -> Result<(), RunError> {
        let resolved = resolve_path(
            Path::new("~/Documents/output"),
            Path::new("/work"),
            Some(Path::new("/home/me")),
        )?;
        assert_eq!(resolved, PathBuf::from("/home/me/Documents/output"));

        let bare = resolve_path(Path::new("~"), Path::new("/work"), Some(Path::new("/home/me")))?;
        assert_eq!(bare, PathBuf::from("/home/me"));
        Ok(())
    }

    #[test]
    fn relative_paths_use_cwd() -> Result<(), RunError> {
        let resolved = resolve_path(Path::new("./export/../photos"), Path::new("/work"), None)?;
        assert_eq!(resolved, PathBuf::from("/work/photos"));
        Ok(())
    }

    #[test]
    fn tilde_inside_name_is_literal() -> Result<(), RunError> {
        let resolved = resolve_path(Path::new("~backup"), Path::new("/work"), None)?;
        assert_eq!(resolved, PathBuf::from("/work/~backup"));
        Ok(())
    }

    #[test]
    fn missing_home_is_an_error() {
        let result = resolve_path(Path::new("~/photos"), Path::new("/work"), None);
        assert_matches!(result, Err(RunError::NoHomeDir(_)));
    }

    #[test]
    fn resolves_defaults() -> Result<(), RunError> {
        let config = Config::default().resolve_with(Path::new("/work"), Some(Path::new("/home/me")))?;

        assert_eq!(config.source, PathBuf::from("/home/me/path/to/Ente Photos"));
        assert_eq!(config.output, PathBuf::from("/home/me/Documents/output"));
        assert_eq!(config.error, PathBuf::from("/home/me/Documents/error"));
        assert_eq!(config.scratch, PathBuf::from("/home/me/Documents/tmp"));
        assert_eq!(config.exiftool, PathBuf::from("exiftool"));
        Ok(())
    }

    #[test]
    fn exiftool_path_with_directories_is_resolved() -> Result<(), RunError> {
        let config = Config {
            exiftool: PathBuf::from("tools/exiftool"),
            ..Config::default()
        }
        .resolve_with(Path::new("/work"), Some(Path::new("/home/me")))?;

        assert_eq!(config.exiftool, PathBuf::from("/work/tools/exiftool"));
        Ok(())
    }
}
