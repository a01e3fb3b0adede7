use crate::media::MediaFile;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Detects the real format of a file from its leading bytes.
///
/// Returns the extension without a dot (`"png"`, `"mov"`, ...) or `None` when
/// the signature is not recognised. HEIF containers are reported as `heic`,
/// the name phones use for them.
pub fn sniff_extension(path: &Path) -> std::io::Result<Option<String>> {
    let detected = infer::get_from_path(path)?;
    Ok(detected.map(|kind| match kind.extension() {
        "heif" => "heic".to_string(),
        ext => ext.to_ascii_lowercase(),
    }))
}

/// Where a media file lands in the output and error trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectedIdentity {
    /// Lower-case, with a leading dot.
    pub extension: String,
    /// Path under the source root with the corrected extension.
    pub relative_path: PathBuf,
}

impl CorrectedIdentity {
    /// Sniffs the file and places it under `source_root`. Read errors propagate.
    pub fn resolve(media: &MediaFile, source_root: &Path) -> std::io::Result<Self> {
        let detected = sniff_extension(&media.path)?;
        Ok(Self::with_detected(media, source_root, detected))
    }

    /// Like [`CorrectedIdentity::resolve`], but falls back to the nominal
    /// extension if the file cannot be read.
    pub fn resolve_lenient(media: &MediaFile, source_root: &Path) -> Self {
        let detected = sniff_extension(&media.path).unwrap_or_else(|e| {
            log::debug!("Could not sniff {}: {e}", media.path.display());
            None
        });
        Self::with_detected(media, source_root, detected)
    }

    fn with_detected(media: &MediaFile, source_root: &Path, detected: Option<String>) -> Self {
        let extension = match detected {
            Some(ext) => format!(".{ext}"),
            None => media.extension.clone(),
        };

        let relative_dir = media
            .dir
            .strip_prefix(source_root)
            .unwrap_or(Path::new(""));
        let mut name = media.stem().to_os_string();
        name.push(&extension);
        let relative_path = relative_dir.join(name);

        Self {
            extension,
            relative_path,
        }
    }

    pub fn file_name(&self) -> &OsStr {
        self.relative_path.file_name().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    fn write_png(path: &Path) {
        RgbImage::new(2, 2)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn detects_png_behind_jpg_name() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("IMG_01.jpg");
        write_png(&path);

        assert_eq!(sniff_extension(&path)?.as_deref(), Some("png"));
        Ok(())
    }

    #[test]
    fn detects_jpeg() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("photo.png");
        RgbImage::new(4, 4)
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();

        assert_eq!(sniff_extension(&path)?.as_deref(), Some("jpg"));
        Ok(())
    }

    #[test]
    fn unknown_content_is_inconclusive() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("CLIP.mov");
        fs::write(&path, b"definitely not a container")?;

        assert_eq!(sniff_extension(&path)?, None);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(sniff_extension(Path::new("/nonexistent/IMG.jpg")).is_err());
    }

    #[test]
    fn identity_uses_detected_extension() -> std::io::Result<()> {
        let root = TempDir::new()?;
        let album = root.path().join("2023").join("Trip");
        fs::create_dir_all(&album)?;
        let path = album.join("IMG_01.jpg");
        write_png(&path);

        let media = MediaFile::from_path(&path).unwrap();
        let identity = CorrectedIdentity::resolve(&media, root.path())?;

        assert_eq!(identity.extension, ".png");
        assert_eq!(
            identity.relative_path,
            Path::new("2023").join("Trip").join("IMG_01.png")
        );
        assert_eq!(identity.file_name(), "IMG_01.png");
        Ok(())
    }

    #[test]
    fn identity_falls_back_to_lowercased_nominal() -> std::io::Result<()> {
        let root = TempDir::new()?;
        let path = root.path().join("CLIP.MOV");
        fs::write(&path, b"????")?;

        let media = MediaFile::from_path(&path).unwrap();
        let identity = CorrectedIdentity::resolve(&media, root.path())?;

        assert_eq!(identity.extension, ".mov");
        assert_eq!(identity.relative_path, PathBuf::from("CLIP.mov"));
        Ok(())
    }

    #[test]
    fn lenient_and_strict_agree() -> std::io::Result<()> {
        let root = TempDir::new()?;
        let path = root.path().join("IMG_02.heic");
        write_png(&path);
        let media = MediaFile::from_path(&path).unwrap();

        assert_eq!(
            CorrectedIdentity::resolve(&media, root.path())?,
            CorrectedIdentity::resolve_lenient(&media, root.path())
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn identity_keeps_non_utf8_stem() -> std::io::Result<()> {
        use std::os::unix::ffi::OsStrExt;

        let root = TempDir::new()?;
        let path = root.path().join(OsStr::from_bytes(b"IMG_\xe9.jpg"));
        write_png(&path);

        let media = MediaFile::from_path(&path).unwrap();
        let identity = CorrectedIdentity::resolve(&media, root.path())?;

        assert_eq!(identity.file_name(), OsStr::from_bytes(b"IMG_\xe9.png"));
        Ok(())
    }

    #[test]
    fn lenient_survives_unreadable_file() {
        let media = MediaFile::from_path(Path::new("/gone/album/IMG_03.JPEG")).unwrap();
        let identity = CorrectedIdentity::resolve_lenient(&media, Path::new("/gone"));

        assert_eq!(identity.extension, ".jpeg");
        assert_eq!(identity.relative_path, Path::new("album").join("IMG_03.jpeg"));
    }
}
