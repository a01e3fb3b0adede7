use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Still-image extensions, lower-case without the dot.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "webp", "gif", "tif", "tiff"];

/// Video extensions, lower-case without the dot.
pub const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "mkv", "avi", "webm"];

/// Name of the per-directory folder holding the JSON sidecars.
pub const SIDECAR_DIR: &str = "metadata";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a file name by its extension, case-insensitively.
    pub fn from_file_name(file_name: impl AsRef<OsStr>) -> Option<Self> {
        let ext = Path::new(file_name.as_ref())
            .extension()?
            .to_string_lossy()
            .to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn is_video(self) -> bool {
        self == MediaKind::Video
    }
}

/// A media file discovered in the source tree. Never written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub dir: PathBuf,
    /// Kept as the OS gave it; names need not be valid UTF-8.
    pub file_name: OsString,
    /// On-disk extension, lower-case with a leading dot (e.g. `.jpg`).
    pub extension: String,
    pub kind: MediaKind,
}

impl MediaFile {
    /// Returns `None` for anything that is not a recognised image or video.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_os_string();
        let kind = MediaKind::from_file_name(&file_name)?;
        let extension = format!(
            ".{}",
            path.extension()?.to_string_lossy().to_ascii_lowercase()
        );
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Some(Self {
            path: path.to_path_buf(),
            dir,
            file_name,
            extension,
            kind,
        })
    }

    /// File name without its extension.
    pub fn stem(&self) -> &OsStr {
        Path::new(&self.file_name)
            .file_stem()
            .unwrap_or(self.file_name.as_os_str())
    }

    /// `<dir>/metadata/<file name>.json`
    pub fn sidecar_path(&self) -> PathBuf {
        let mut name = self.file_name.clone();
        name.push(".json");
        self.dir.join(SIDECAR_DIR).join(name)
    }

    pub fn is_video(&self) -> bool {
        self.kind.is_video()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(MediaKind::from_file_name("a.jpg"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_file_name("a.HEIC"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_file_name("a.tiff"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_file_name("clip.MOV"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_file_name("clip.webm"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_file_name("a.jpg.json"), None);
        assert_eq!(MediaKind::from_file_name("README"), None);
    }

    #[test]
    fn media_file_fields() {
        let media = MediaFile::from_path(Path::new("/src/2023/IMG_01.JPG")).unwrap();
        assert_eq!(media.dir, PathBuf::from("/src/2023"));
        assert_eq!(media.file_name, "IMG_01.JPG");
        assert_eq!(media.extension, ".jpg");
        assert_eq!(media.stem(), "IMG_01");
        assert_eq!(media.kind, MediaKind::Image);
        assert!(!media.is_video());
    }

    #[test]
    fn sidecar_keeps_full_file_name() {
        let media = MediaFile::from_path(Path::new("/src/trip/CLIP.mov")).unwrap();
        assert_eq!(
            media.sidecar_path(),
            PathBuf::from("/src/trip/metadata/CLIP.mov.json")
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_still_media() {
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"IMG_\xe9.JPG");
        let media = MediaFile::from_path(&Path::new("/src/latin1").join(name)).unwrap();

        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.extension, ".jpg");
        assert_eq!(media.stem(), OsStr::from_bytes(b"IMG_\xe9"));
        assert_eq!(
            media.sidecar_path(),
            Path::new("/src/latin1/metadata").join(OsStr::from_bytes(b"IMG_\xe9.JPG.json"))
        );
    }

    #[test]
    fn non_media_is_rejected() {
        assert!(MediaFile::from_path(Path::new("/src/metadata/IMG_01.jpg.json")).is_none());
        assert!(MediaFile::from_path(Path::new("/src/notes.txt")).is_none());
    }
}
