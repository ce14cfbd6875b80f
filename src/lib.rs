//! # mediakit - batch image and video utilities
//!
//! `mediakit` bundles a handful of small media tools behind one library and
//! one binary:
//!
//! - Change the aspect ratio of images and videos by letterboxing or by
//!   cropping around one of nine anchors
//! - Report video durations, and trim or loop videos to a target length with
//!   optional fades
//! - Turn an image into a C header holding a JPEG byte array
//! - Turn still images into short video clips
//! - Render each line of a text file into its own image
//! - Shrink and re-encode images for the web
//!
//! Images are decoded and encoded with the `image` crate. Videos go through
//! `ffmpeg`/`ffprobe` child processes exchanging raw RGB24 frames, so both
//! must be on `PATH` (or configured in [`Settings`]) for the video tools.
//!
//! ## Example
//!
//! ```no_run
//! use mediakit::{aspect, Anchor, FitMode, FitOptions, Size};
//! use mediakit::report::ConsoleReporter;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = FitOptions::new(Size::new(1080, 1080))
//!     .with_mode(FitMode::Crop)
//!     .with_anchor(Anchor::UpperCenter);
//! aspect::process_image(
//!     Path::new("wide.jpg"),
//!     Path::new("square.jpg"),
//!     &options,
//!     &ConsoleReporter::new(),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Batches
//!
//! Batch operations never stop on a bad file. Each item's outcome lands in a
//! [`BatchReport`]:
//!
//! ```no_run
//! use mediakit::{aspect, FfmpegConfig, FitOptions, MediaKind, Size};
//! use mediakit::report::SilentReporter;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = aspect::batch_process(
//!     &FfmpegConfig::default(),
//!     Path::new("images_to_process"),
//!     Path::new("images_processed"),
//!     &FitOptions::new(Size::new(1920, 1080)),
//!     MediaKind::Images,
//!     &SilentReporter,
//! )?;
//! println!("{} ok, {} failed", report.success_count(), report.failure_count());
//! # Ok(())
//! # }
//! ```

pub mod aspect;
pub mod c_array;
pub mod choices;
pub mod duration;
pub mod encode;
pub mod error;
pub mod fit;
pub mod formats;
pub mod geometry;
pub mod media;
pub mod optimize;
pub mod report;
pub mod settings;
pub mod text_image;
pub mod to_video;
pub mod video;

pub use error::{Result, ToolError};
pub use fit::{fit, FitOptions};
pub use formats::{ImageFormat, UseCase, VideoFormat};
pub use geometry::{plan_fit, resolve_anchor, Anchor, FitMode, FitPlan, Region, Size};
pub use media::MediaKind;
pub use report::{BatchReport, ItemOutcome, Reporter};
pub use settings::Settings;
pub use video::{FfmpegConfig, VideoInfo};
