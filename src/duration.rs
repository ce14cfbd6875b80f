//! Video duration mapping and trim/loop to a target length with fades.

use image::RgbImage;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{Result, ToolError};
use crate::media::{ensure_output_folder, require_input_folder, scan_folder, MediaKind};
use crate::report::{self, BatchReport, Reporter};
use crate::video::{probe, reencode_codec_for, FfmpegConfig, FrameReader, FrameWriter};

/// Scale every channel by `alpha`, truncating toward zero.
pub fn apply_fade(frame: &mut RgbImage, alpha: f64) {
    if alpha >= 1.0 {
        return;
    }
    let alpha = alpha.max(0.0);
    for v in frame.iter_mut() {
        *v = (*v as f64 * alpha) as u8;
    }
}

/// Fade factor for output frame `index` of `total`, or `None` outside the ramps.
///
/// The fade-in ramp covers the first `fade_frames` frames starting at 0; the
/// fade-out ramp covers the last `fade_frames` frames ending at `1/fade_frames`.
pub fn fade_alpha(index: u64, total: u64, fade_frames: u64) -> Option<f64> {
    if fade_frames == 0 {
        return None;
    }
    if index < fade_frames {
        Some(index as f64 / fade_frames as f64)
    } else if index + fade_frames >= total {
        Some(total.saturating_sub(index) as f64 / fade_frames as f64)
    } else {
        None
    }
}

/// Options for [`adjust_duration`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationOptions {
    pub target_secs: f64,
    pub fade_secs: f64,
    pub apply_fades: bool,
}

impl DurationOptions {
    pub fn new(target_secs: f64) -> Self {
        Self {
            target_secs,
            fade_secs: 0.5,
            apply_fades: false,
        }
    }

    pub fn with_fades(mut self, fade_secs: f64) -> Self {
        self.fade_secs = fade_secs;
        self.apply_fades = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.target_secs.is_finite() && self.target_secs > 0.0) {
            return Err(ToolError::validation(
                "target duration",
                "must be a positive number of seconds",
            ));
        }
        if self.apply_fades && !(self.fade_secs.is_finite() && self.fade_secs >= 0.0) {
            return Err(ToolError::validation("fade duration", "must not be negative"));
        }
        Ok(())
    }
}

/// Duration of `path` in seconds.
pub fn video_duration(ffmpeg: &FfmpegConfig, path: &Path) -> Result<f64> {
    Ok(probe(ffmpeg, path)?.duration_secs())
}

/// Header of a mapping file.
pub fn mapping_header(target_secs: f64) -> String {
    format!(
        "Video Mapping (Filename - Durations)\nTarget Duration: {:.2}s\n{}\n\n",
        target_secs,
        "=".repeat(50)
    )
}

/// One mapping line: the measured duration, or `ERROR`.
pub fn mapping_line(name: &str, duration: Option<f64>, target_secs: f64) -> String {
    match duration {
        Some(d) => format!("{} - Original: {:.2}s, Target: {:.2}s", name, d, target_secs),
        None => format!("{} - ERROR", name),
    }
}

/// Write a duration report for every video in `input_folder` to `output_file`.
pub fn write_mapping(
    ffmpeg: &FfmpegConfig,
    input_folder: &Path,
    output_file: &Path,
    target_secs: f64,
    reporter: &dyn Reporter,
) -> Result<BatchReport> {
    let mut batch = BatchReport::new();
    if !require_input_folder(input_folder, reporter) {
        return Ok(batch);
    }
    let videos = scan_folder(input_folder, MediaKind::Videos)?;
    if videos.is_empty() {
        reporter.warning(&format!("No video files found in '{}'", input_folder.display()));
        return Ok(batch);
    }

    let mut text = mapping_header(target_secs);
    for video in &videos {
        let name = report::display_name(video);
        match video_duration(ffmpeg, video) {
            Ok(d) => {
                reporter.success(&format!("Mapped: {} ({:.2}s → {:.2}s)", name, d, target_secs));
                let _ = writeln!(text, "{}", mapping_line(&name, Some(d), target_secs));
                batch.push(video, Ok(format!("{:.2}s", d)));
            }
            Err(e) => {
                reporter.error(&format!("Could not read duration of {}: {}", name, e));
                let _ = writeln!(text, "{}", mapping_line(&name, None, target_secs));
                batch.push(video, Err(e));
            }
        }
    }

    fs::write(output_file, text)?;
    reporter.success(&format!("Mapping saved to '{}'", output_file.display()));
    reporter.info(&format!("Total videos processed: {}", batch.success_count()));
    Ok(batch)
}

/// Re-encode `input` as exactly `floor(target * fps)` frames, trimming when the
/// source is longer and looping it when shorter. Returns the frame count.
pub fn adjust_duration(
    ffmpeg: &FfmpegConfig,
    input: &Path,
    output: &Path,
    options: &DurationOptions,
) -> Result<u64> {
    options.validate()?;
    let info = probe(ffmpeg, input)?;
    let frames = FrameReader::open(ffmpeg, input, info.size)?.read_all()?;
    if frames.is_empty() {
        return Err(ToolError::processing(
            format!("Reading {}", input.display()),
            "video has no frames",
        ));
    }

    let target_frames = (options.target_secs * info.fps).floor() as u64;
    let fade_frames = if options.apply_fades {
        (options.fade_secs * info.fps).floor() as u64
    } else {
        0
    };
    tracing::debug!(
        source_frames = frames.len(),
        target_frames,
        fade_frames,
        fps = info.fps,
        "adjusting duration"
    );

    let codec = reencode_codec_for(output);
    let mut writer = FrameWriter::create(ffmpeg, output, info.size, info.fps, codec)?;
    for i in 0..target_frames {
        let source = &frames[(i % frames.len() as u64) as usize];
        match fade_alpha(i, target_frames, fade_frames) {
            Some(alpha) => {
                let mut faded = source.clone();
                apply_fade(&mut faded, alpha);
                writer.write_frame(&faded)?;
            }
            None => writer.write_frame(source)?,
        }
    }
    writer.finish()
}

/// Adjust every video in `input_folder`, writing same-named files to `output_folder`.
pub fn batch_adjust(
    ffmpeg: &FfmpegConfig,
    input_folder: &Path,
    output_folder: &Path,
    options: &DurationOptions,
    reporter: &dyn Reporter,
) -> Result<BatchReport> {
    options.validate()?;
    ensure_output_folder(output_folder, reporter)?;

    let mut batch = BatchReport::new();
    if !require_input_folder(input_folder, reporter) {
        return Ok(batch);
    }
    let videos = scan_folder(input_folder, MediaKind::Videos)?;
    if videos.is_empty() {
        reporter.warning(&format!("No video files found in '{}'", input_folder.display()));
        report::setup_instructions(reporter, input_folder, output_folder);
        return Ok(batch);
    }

    reporter.info(&format!("Processing videos to {:.2}s duration...", options.target_secs));
    for video in &videos {
        let Some(name) = video.file_name() else { continue };
        let output = output_folder.join(name);
        let result = adjust_duration(ffmpeg, video, &output, options).map(|frames| {
            reporter.success(&format!(
                "Created: {} ({:.2}s, {} frames)",
                report::display_name(&output),
                options.target_secs,
                frames
            ));
            format!("{} frames", frames)
        });
        if let Err(e) = &result {
            reporter.error(&format!("Failed to process {}: {}", report::display_name(video), e));
        }
        batch.push(video, result);
    }

    report::batch_completed(reporter, &batch, "videos");
    reporter.info(&format!("Output saved to '{}/'", output_folder.display()));
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use image::Rgb;

    #[test]
    fn fade_halves_channels() {
        let mut frame = RgbImage::from_pixel(2, 2, Rgb([200, 101, 0]));
        apply_fade(&mut frame, 0.5);
        assert_eq!(*frame.get_pixel(1, 1), Rgb([100, 50, 0]));
    }

    #[test]
    fn full_alpha_is_identity() {
        let original = RgbImage::from_fn(3, 3, |x, y| Rgb([x as u8 * 40, y as u8 * 40, 7]));
        let mut frame = original.clone();
        apply_fade(&mut frame, 1.0);
        assert_eq!(frame, original);
        apply_fade(&mut frame, 0.0);
        assert!(frame.iter().all(|&v| v == 0));
    }

    #[test]
    fn fade_ramps() {
        // 10 frames with 4-frame fades
        let alphas: Vec<Option<f64>> = (0..10).map(|i| fade_alpha(i, 10, 4)).collect();
        assert_eq!(alphas[0], Some(0.0));
        assert_eq!(alphas[1], Some(0.25));
        assert_eq!(alphas[3], Some(0.75));
        assert_eq!(alphas[4], None);
        assert_eq!(alphas[5], None);
        assert_eq!(alphas[6], Some(1.0));
        assert_eq!(alphas[9], Some(0.25));
        assert_eq!(fade_alpha(3, 10, 0), None);
    }

    #[test]
    fn mapping_text() {
        assert_eq!(
            mapping_header(5.0),
            format!(
                "Video Mapping (Filename - Durations)\nTarget Duration: 5.00s\n{}\n\n",
                "=".repeat(50)
            )
        );
        assert_eq!(
            mapping_line("clip.mp4", Some(3.456), 5.0),
            "clip.mp4 - Original: 3.46s, Target: 5.00s"
        );
        assert_eq!(mapping_line("bad.mp4", None, 5.0), "bad.mp4 - ERROR");
    }

    #[test]
    fn options_validation() {
        assert!(DurationOptions::new(0.0).validate().is_err());
        assert!(DurationOptions::new(f64::NAN).validate().is_err());
        assert!(DurationOptions::new(2.0).with_fades(-1.0).validate().is_err());
        assert!(DurationOptions::new(2.0).with_fades(0.5).validate().is_ok());
    }

    #[test]
    fn mapping_of_missing_folder_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("mapping.txt");
        let r = MemoryReporter::new();
        let batch =
            write_mapping(&FfmpegConfig::default(), &dir.path().join("nope"), &out, 5.0, &r)
                .unwrap();
        assert!(batch.is_empty());
        assert!(!out.exists());
    }
}
