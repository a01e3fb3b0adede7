//! Sidecar documents and the tag sets computed from them.
//!
//! A sidecar sits at `<dir>/metadata/<file name>.json` and carries the metadata
//! the export stripped from the media file. Only three fields are consumed:
//!
//! ```json
//! {
//!   "description": "Beach",
//!   "creationTime": { "timestamp": 1700000000 },
//!   "geoData": { "latitude": 10.5, "longitude": 20.25 }
//! }
//! ```
//!
//! [`map_sidecar`] is pure: the same document and media kind always yield the
//! same [`TagSet`], and fields that are missing or malformed are left out.

use crate::error::SidecarError;
use crate::media::MediaKind;
use crate::parse_fn;
use chrono::{DateTime, Datelike};
use serde::Deserialize;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

pub const IMAGE_DESCRIPTION: &str = "ImageDescription";
pub const VIDEO_TITLE: &str = "QuickTime:Title";
pub const DATE_TIME_ORIGINAL: &str = "DateTimeOriginal";
pub const CREATE_DATE: &str = "CreateDate";
pub const GPS_LATITUDE: &str = "GPSLatitude";
pub const GPS_LONGITUDE: &str = "GPSLongitude";
pub const VIDEO_GPS_COORDINATES: &str = "QuickTime:GPSCoordinates";

/// EXIF date-time syntax, always rendered in UTC.
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sidecar {
    #[serde(default, deserialize_with = "parse_fn::string::non_empty")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "parse_fn::object::lenient")]
    pub creation_time: Option<CreationTime>,
    #[serde(default, deserialize_with = "parse_fn::object::lenient")]
    pub geo_data: Option<GeoData>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreationTime {
    #[serde(default, deserialize_with = "parse_fn::float::number_or_numeric_string")]
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeoData {
    #[serde(default, deserialize_with = "parse_fn::float::number")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "parse_fn::float::number")]
    pub longitude: Option<f64>,
}

impl Sidecar {
    pub fn from_slice(path: &Path, bytes: &[u8]) -> Result<Self, SidecarError> {
        let de = &mut serde_json::Deserializer::from_slice(bytes);
        serde_path_to_error::deserialize(de).map_err(|e| SidecarError::Parse {
            path: path.to_path_buf(),
            json_path: e.path().to_string(),
            source: e.into_inner(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, SidecarError> {
        let bytes = fs::read(path).map_err(|source| SidecarError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(path, &bytes)
    }

    /// Both coordinates, if both are present and non-zero.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let geo = self.geo_data.as_ref()?;
        match (geo.latitude, geo.longitude) {
            (Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0 => Some((lat, lon)),
            _ => None,
        }
    }

    /// The capture time as an EXIF date-time string.
    pub fn exif_datetime(&self) -> Option<String> {
        self.creation_time
            .as_ref()
            .and_then(|c| c.timestamp)
            .and_then(format_exif_datetime)
    }
}

/// Formats Unix seconds as `YYYY:MM:DD HH:MM:SS` in UTC.
///
/// Fractional seconds are dropped. Zero, non-finite and out-of-range values
/// return `None`, as do years outside `0000..=9999`, which `%Y` would print
/// with a sign.
pub fn format_exif_datetime(unix_seconds: f64) -> Option<String> {
    if !unix_seconds.is_finite() || unix_seconds == 0.0 {
        return None;
    }
    let dt = DateTime::from_timestamp(unix_seconds.floor() as i64, 0)?;
    if !(0..=9999).contains(&dt.year()) {
        return None;
    }
    Some(dt.format(EXIF_DATETIME_FORMAT).to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Text(s) => f.write_str(s),
            TagValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Text(value)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Number(value)
    }
}

/// Tag name to value, in a stable order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSet(BTreeMap<String, TagValue>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: &str, value: impl Into<TagValue>) {
        self.0.insert(tag.to_string(), value.into());
    }

    pub fn get(&self, tag: &str) -> Option<&TagValue> {
        self.0.get(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, TagValue> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = (&'a String, &'a TagValue);
    type IntoIter = btree_map::Iter<'a, String, TagValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Maps a parsed sidecar to the tags written into a file of the given kind.
pub fn map_sidecar(sidecar: &Sidecar, kind: MediaKind) -> TagSet {
    let mut tags = TagSet::new();

    if let Some(description) = &sidecar.description {
        match kind {
            MediaKind::Video => tags.insert(VIDEO_TITLE, description.as_str()),
            MediaKind::Image => tags.insert(IMAGE_DESCRIPTION, description.as_str()),
        }
    }

    if let Some(datetime) = sidecar.exif_datetime() {
        if kind.is_video() {
            tags.insert(CREATE_DATE, datetime.as_str());
        }
        tags.insert(DATE_TIME_ORIGINAL, datetime);
    }

    if let Some((lat, lon)) = sidecar.coordinates() {
        tags.insert(GPS_LATITUDE, lat);
        tags.insert(GPS_LONGITUDE, lon);
        if kind.is_video() {
            tags.insert(VIDEO_GPS_COORDINATES, format!("{lat} {lon}"));
        }
    }

    tags
}

/// Reads the sidecar at `path` and maps it for an image or a video.
pub fn read_tag_set(path: &Path, is_video: bool) -> Result<TagSet, SidecarError> {
    let sidecar = Sidecar::from_path(path)?;
    let kind = if is_video {
        MediaKind::Video
    } else {
        MediaKind::Image
    };
    Ok(map_sidecar(&sidecar, kind))
}
