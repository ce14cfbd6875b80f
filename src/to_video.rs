//! Still images to short video clips with optional fades.

use std::path::{Path, PathBuf};

use crate::duration::apply_fade;
use crate::encode;
use crate::error::{Result, ToolError};
use crate::fit::resize_exact;
use crate::formats::{is_image_file, VideoFormat, IMAGE_EXTENSIONS};
use crate::geometry::Size;
use crate::media::{ensure_output_folder, scan_folder, MediaKind};
use crate::report::{self, BatchReport, Reporter};
use crate::video::{validate_frame_size, FfmpegConfig, FrameWriter};

pub const DEFAULT_OUTPUT_DIR: &str = "videos";

#[derive(Debug, Clone, PartialEq)]
pub struct ToVideoOptions {
    pub duration_secs: f64,
    pub fps: u32,
    pub size: Option<Size>,
    pub format: VideoFormat,
    pub codec: String,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
}

impl Default for ToVideoOptions {
    fn default() -> Self {
        Self {
            duration_secs: 4.0,
            fps: 24,
            size: None,
            format: VideoFormat::Mp4,
            codec: "libx264".to_string(),
            fade_in_secs: 0.0,
            fade_out_secs: 0.0,
        }
    }
}

impl ToVideoOptions {
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_size(mut self, size: Option<Size>) -> Self {
        self.size = size;
        self
    }

    pub fn with_format(mut self, format: VideoFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn with_fades(mut self, fade_in_secs: f64, fade_out_secs: f64) -> Self {
        self.fade_in_secs = fade_in_secs;
        self.fade_out_secs = fade_out_secs;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(ToolError::validation("duration", "must be a positive number of seconds"));
        }
        if self.fps == 0 {
            return Err(ToolError::validation("fps", "must be at least 1"));
        }
        if let Some(size) = self.size {
            validate_frame_size(size, "size")?;
        }
        for (field, v) in [("fade in", self.fade_in_secs), ("fade out", self.fade_out_secs)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ToolError::validation(field, "must not be negative"));
            }
        }
        Ok(())
    }

    /// `max(1, round(duration * fps))`.
    pub fn frame_count(&self) -> u64 {
        ((self.duration_secs * self.fps as f64).round() as u64).max(1)
    }

    /// Brightness factor at time `t` seconds into the clip.
    pub fn fade_factor(&self, t: f64) -> f64 {
        let mut factor = 1.0;
        if self.fade_in_secs > 0.0 {
            factor *= (t / self.fade_in_secs).min(1.0);
        }
        if self.fade_out_secs > 0.0 {
            factor *= ((self.duration_secs - t) / self.fade_out_secs).min(1.0);
        }
        factor.clamp(0.0, 1.0)
    }

    /// `{output_dir}/{stem}.{format}`.
    pub fn output_path(&self, image: &Path, output_dir: &Path) -> PathBuf {
        let stem = image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        output_dir.join(format!("{}.{}", stem, self.format.extension()))
    }
}

/// Encode a clip showing `image` for the configured duration. Returns the frame count.
///
/// The still must have even dimensions unless a size is configured.
pub fn image_to_video(
    ffmpeg: &FfmpegConfig,
    image: &Path,
    output: &Path,
    options: &ToVideoOptions,
) -> Result<u64> {
    options.validate()?;
    let mut still = encode::open_rgb(image)?;
    if let Some(size) = options.size {
        still = resize_exact(still, size);
    }
    let (w, h) = still.dimensions();
    let size = validate_frame_size(Size::new(w, h), "image size")?;

    let total = options.frame_count();
    tracing::debug!(
        image = %image.display(),
        frames = total,
        codec = %options.codec,
        "encoding clip"
    );
    let mut writer = FrameWriter::create(ffmpeg, output, size, options.fps as f64, &options.codec)?;
    for i in 0..total {
        let factor = options.fade_factor(i as f64 / options.fps as f64);
        if factor >= 1.0 {
            writer.write_frame(&still)?;
        } else {
            let mut frame = still.clone();
            apply_fade(&mut frame, factor);
            writer.write_frame(&frame)?;
        }
    }
    writer.finish()
}

/// Images selected by `input`: the file itself, or every image in the folder.
pub fn collect_images(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        if is_image_file(input) {
            return Ok(vec![input.to_path_buf()]);
        }
        return Err(ToolError::UnsupportedFormat(report::display_name(input)));
    }
    if input.is_dir() {
        return scan_folder(input, MediaKind::Images);
    }
    Err(ToolError::FileNotFound(input.to_path_buf()))
}

/// Convert `input` (one image or a folder of images) into clips under `output_dir`.
pub fn convert(
    ffmpeg: &FfmpegConfig,
    input: &Path,
    output_dir: &Path,
    options: &ToVideoOptions,
    reporter: &dyn Reporter,
) -> Result<BatchReport> {
    options.validate()?;
    ensure_output_folder(output_dir, reporter)?;

    let mut batch = BatchReport::new();
    let images = collect_images(input)?;
    if images.is_empty() {
        let mut supported: Vec<String> =
            IMAGE_EXTENSIONS.iter().map(|e| format!(".{}", e)).collect();
        supported.sort();
        reporter.warning(&format!("No images found. Supported: {}", supported.join(", ")));
        return Ok(batch);
    }

    reporter.info(&format!("Converting {} image(s) to video...", images.len()));
    for image in &images {
        let output = options.output_path(image, output_dir);
        let result = image_to_video(ffmpeg, image, &output, options);
        match &result {
            Ok(_) => reporter.success(&format!("✓ {}", report::display_name(&output))),
            Err(e) => reporter.error(&format!("✗ {}: {}", report::display_name(image), e)),
        }
        batch.push(image, result.map(|frames| format!("{} frames", frames)));
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;

    #[test]
    fn frame_counts() {
        assert_eq!(ToVideoOptions::default().frame_count(), 96);
        assert_eq!(ToVideoOptions::default().with_duration(0.01).frame_count(), 1);
        assert_eq!(ToVideoOptions::default().with_duration(1.5).with_fps(30).frame_count(), 45);
    }

    #[test]
    fn fades_multiply() {
        let opts = ToVideoOptions::default().with_duration(4.0).with_fades(1.0, 2.0);
        assert_eq!(opts.fade_factor(0.0), 0.0);
        assert_eq!(opts.fade_factor(0.5), 0.5);
        assert_eq!(opts.fade_factor(1.5), 1.0);
        assert_eq!(opts.fade_factor(3.0), 0.5);
        // both ramps active at once
        let short = ToVideoOptions::default().with_duration(1.0).with_fades(1.0, 1.0);
        assert_eq!(short.fade_factor(0.5), 0.25);
        assert_eq!(ToVideoOptions::default().fade_factor(2.0), 1.0);
    }

    #[test]
    fn output_names() {
        let opts = ToVideoOptions::default().with_format(VideoFormat::Webm);
        assert_eq!(
            opts.output_path(Path::new("in/sunset.final.png"), Path::new("videos")),
            PathBuf::from("videos/sunset.final.webm")
        );
    }

    #[test]
    fn validation() {
        assert!(ToVideoOptions::default().validate().is_ok());
        assert!(ToVideoOptions::default().with_fps(0).validate().is_err());
        assert!(ToVideoOptions::default().with_duration(-1.0).validate().is_err());
        assert!(ToVideoOptions::default().with_fades(-0.1, 0.0).validate().is_err());
        assert!(ToVideoOptions::default().with_size(Some(Size::new(0, 4))).validate().is_err());
        assert!(ToVideoOptions::default().with_size(Some(Size::new(4, 4))).validate().is_ok());
    }

    #[test]
    fn odd_stills_are_rejected_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let still = dir.path().join("odd.png");
        image::RgbImage::new(33, 16).save(&still).unwrap();
        let output = dir.path().join("odd.mp4");
        let config = FfmpegConfig {
            ffmpeg: "/no/such/ffmpeg".to_string(),
            ..FfmpegConfig::default()
        };
        let err = image_to_video(&config, &still, &output, &ToVideoOptions::default()).unwrap_err();
        assert!(matches!(err, ToolError::ValidationFailure { .. }));
        assert!(!output.exists());

        let odd_target = ToVideoOptions::default().with_size(Some(Size::new(1081, 1080)));
        assert!(matches!(
            odd_target.validate(),
            Err(ToolError::ValidationFailure { .. })
        ));
    }

    #[test]
    fn empty_folder_reports_supported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let r = MemoryReporter::new();
        let batch = convert(
            &FfmpegConfig::default(),
            dir.path(),
            &dir.path().join("videos"),
            &ToVideoOptions::default(),
            &r,
        )
        .unwrap();
        assert!(batch.is_empty());
        assert!(r.contains("No images found. Supported: .bmp, .gif"));
    }
}
