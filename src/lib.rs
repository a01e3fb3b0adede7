//! # exif-restore
//!
//! Puts exported metadata back where it belongs. Photo exports (Ente and
//! similar) strip the capture date, description and location out of every
//! file and drop them into `metadata/<file name>.json` sidecars. This crate
//! reads those sidecars and writes the values back into copies of the media
//! with ExifTool.
//!
//! The source tree is never modified. Each media file ends up in exactly one
//! place:
//!
//! - the **output** tree, with metadata embedded and its extension corrected
//!   to match the actual content,
//! - the **error** tree, as an untouched copy, when anything went wrong,
//! - nowhere, if it is the motion half of a Live Photo.
//!
//! ## Usage
//!
//! ```no_run
//! use exif_restore::{Config, ExifTool, Processor};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         source: "~/Downloads/Ente Photos".into(),
//!         ..Config::default()
//!     }
//!     .resolve()?;
//!
//!     let mut exiftool = ExifTool::with_executable(&config.exiftool)?;
//!     let result = Processor::new(config, &mut exiftool).run();
//!     exiftool.shutdown()?;
//!
//!     let summary = result?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! The sidecar mapping can be used on its own:
//!
//! ```
//! use exif_restore::tags::{map_sidecar, Sidecar};
//! use exif_restore::MediaKind;
//! use std::path::Path;
//!
//! let json = br#"{"creationTime":{"timestamp":1700000000}}"#;
//! let sidecar = Sidecar::from_slice(Path::new("IMG_01.jpg.json"), json).unwrap();
//! let tags = map_sidecar(&sidecar, MediaKind::Image);
//! assert_eq!(
//!     tags.get("DateTimeOriginal").map(ToString::to_string).as_deref(),
//!     Some("2023:11:14 22:13:20")
//! );
//! ```

mod error;
mod exiftool;

pub mod config;
pub mod live_photo;
pub mod media;
pub mod parse_fn;
pub mod pipeline;
pub mod quarantine;
pub mod sniff;
pub mod stager;
pub mod tags;

pub use config::Config;
pub use error::{ExifToolError, FailureCategory, ProcessError, RunError, SidecarError};
pub use exiftool::{ExifTool, TagWriter};
pub use media::{MediaFile, MediaKind};
pub use pipeline::{ProcessingOutcome, Processor, RunSummary, SkipReason};
pub use sniff::CorrectedIdentity;
pub use tags::{TagSet, TagValue};
