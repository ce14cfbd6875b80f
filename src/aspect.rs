//! Aspect-ratio conversion for images and videos.

use image::DynamicImage;
use std::path::Path;

use crate::encode;
use crate::error::{Result, ToolError};
use crate::fit::{fit, FitOptions};
use crate::formats::{is_image_file, is_video_file};
use crate::media::{ensure_output_folder, require_input_folder, scan_folder, MediaKind};
use crate::report::{self, BatchReport, Reporter};
use crate::video::{
    probe, reencode_codec_for, validate_frame_size, FfmpegConfig, FrameReader, FrameWriter,
};

/// How often, in frames, video progress is reported.
pub const VIDEO_PROGRESS_FRAME_INTERVAL: u64 = 30;

/// Fit one image and save it under `output`, keeping the output's format.
pub fn process_image(
    input: &Path,
    output: &Path,
    options: &FitOptions,
    reporter: &dyn Reporter,
) -> Result<String> {
    reporter.info(&format!("Processing image: {}", report::display_name(input)));
    let source = encode::open_rgb(input)?;
    let result = fit(source, options)?;
    encode::save(&DynamicImage::ImageRgb8(result), output, encode::DEFAULT_SAVE_QUALITY)?;

    report::file_processed(reporter, output, report::size_kb(input), report::size_kb(output));
    Ok(format!("{} → {}", report::display_name(input), options.target))
}

/// Fit every frame of a video, calling `on_frame(done, total)` after each
/// frame. `total` is the probed frame count and may be 0 when unknown.
pub fn process_video_with_progress<F>(
    ffmpeg: &FfmpegConfig,
    input: &Path,
    output: &Path,
    options: &FitOptions,
    mut on_frame: F,
) -> Result<u64>
where
    F: FnMut(u64, u64),
{
    validate_frame_size(options.target, "target")?;
    let info = probe(ffmpeg, input)?;
    let mut reader = FrameReader::open(ffmpeg, input, info.size)?;
    let codec = reencode_codec_for(output);
    let mut writer = FrameWriter::create(ffmpeg, output, options.target, info.fps, codec)?;

    while let Some(frame) = reader.next_frame()? {
        let fitted = fit(frame, options)?;
        writer.write_frame(&fitted)?;
        on_frame(writer.frames_written(), info.frame_count);
    }

    if reader.frames_read() == 0 {
        return Err(ToolError::processing(
            format!("Reading {}", input.display()),
            "video has no frames",
        ));
    }
    writer.finish()
}

/// Fit a video, reporting progress through `reporter` at a fixed frame interval.
pub fn process_video(
    ffmpeg: &FfmpegConfig,
    input: &Path,
    output: &Path,
    options: &FitOptions,
    reporter: &dyn Reporter,
) -> Result<String> {
    reporter.info(&format!("Processing video: {}", report::display_name(input)));
    let frames = process_video_with_progress(ffmpeg, input, output, options, |done, total| {
        if done % VIDEO_PROGRESS_FRAME_INTERVAL == 0 {
            if total > 0 {
                let pct = done as f64 / total as f64 * 100.0;
                reporter.info(&format!("Progress: {}/{} frames ({:.1}%)", done, total, pct));
            } else {
                reporter.info(&format!("Progress: {} frames", done));
            }
        }
    })?;
    reporter.success(&format!("Video processed: {}", report::display_name(output)));
    Ok(format!("{} frames at {}", frames, options.target))
}

/// Fit one file, dispatching on its extension.
pub fn process_file(
    ffmpeg: &FfmpegConfig,
    input: &Path,
    output: &Path,
    options: &FitOptions,
    reporter: &dyn Reporter,
) -> Result<String> {
    if is_image_file(input) {
        process_image(input, output, options, reporter)
    } else if is_video_file(input) {
        process_video(ffmpeg, input, output, options, reporter)
    } else {
        Err(ToolError::UnsupportedFormat(report::display_name(input)))
    }
}

/// Fit every matching file in `input_folder` into `output_folder`, keeping
/// file names. Item failures are reported and collected; the batch always
/// runs to the end.
pub fn batch_process(
    ffmpeg: &FfmpegConfig,
    input_folder: &Path,
    output_folder: &Path,
    options: &FitOptions,
    kind: MediaKind,
    reporter: &dyn Reporter,
) -> Result<BatchReport> {
    if kind == MediaKind::Videos {
        validate_frame_size(options.target, "target")?;
    } else {
        options.target.validate("target")?;
    }
    ensure_output_folder(output_folder, reporter)?;

    let mut batch = BatchReport::new();
    if !require_input_folder(input_folder, reporter) {
        return Ok(batch);
    }

    let files = scan_folder(input_folder, kind)?;
    if files.is_empty() {
        reporter.warning(&format!("No media files found in '{}'", input_folder.display()));
        report::setup_instructions(reporter, input_folder, output_folder);
        return Ok(batch);
    }

    report::batch_started(reporter, files.len(), kind.item_noun());
    tracing::debug!(
        target = %options.target,
        mode = %options.mode,
        anchor = %options.anchor,
        "aspect batch"
    );

    for file in &files {
        let Some(name) = file.file_name() else { continue };
        let output = output_folder.join(name);
        let result = process_file(ffmpeg, file, &output, options, reporter);
        if let Err(e) = &result {
            reporter.error(&format!("Failed to process {}: {}", report::display_name(file), e));
        }
        batch.push(file, result);
    }

    report::batch_completed(reporter, &batch, kind.item_noun());
    reporter.info(&format!("Output saved to '{}/'", output_folder.display()));
    Ok(batch)
}
