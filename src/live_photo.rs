use crate::media::{MediaKind, IMAGE_EXTENSIONS};
use std::ffi::{OsStr, OsString};
use std::path::Path;

/// Returns `true` when `file_name` is a video sitting next to a still image with
/// the same base name, i.e. the motion half of a Live Photo.
///
/// Only the directory itself is checked, never its subdirectories. Both the
/// lower- and upper-case spelling of every image extension is probed.
pub fn is_live_photo_video(dir: &Path, file_name: impl AsRef<OsStr>) -> bool {
    let file_name = file_name.as_ref();
    if MediaKind::from_file_name(file_name) != Some(MediaKind::Video) {
        return false;
    }

    let Some(base) = Path::new(file_name).file_stem() else {
        return false;
    };
    let sibling = |ext: &str| {
        let mut name = OsString::from(base);
        name.push(".");
        name.push(ext);
        dir.join(name).is_file()
    };

    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| sibling(*ext) || sibling(&ext.to_ascii_uppercase()))
}
