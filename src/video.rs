//! Raw RGB24 frame pipes to and from `ffmpeg`, plus `ffprobe` metadata.
//!
//! Every decoder and encoder is a child process owned by a guard. Dropping a
//! [`FrameReader`] or an unfinished [`FrameWriter`] kills and reaps its child,
//! so an early `?` return never leaves a process behind.

use image::RgbImage;
use serde::Deserialize;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use crate::error::{Result, ToolError};
use crate::geometry::Size;

/// Codec used when re-encoding existing videos.
pub const REENCODE_CODEC: &str = "mpeg4";

/// Encoder for re-encoding into `path`: WebM only carries VP8/VP9/AV1.
pub fn reencode_codec_for(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ext) if ext == "webm" => "libvpx-vp9",
        _ => REENCODE_CODEC,
    }
}

/// Locations of the external binaries.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl FfmpegConfig {
    /// True when both binaries can be executed.
    pub fn is_available(&self) -> bool {
        [&self.ffmpeg, &self.ffprobe].iter().all(|bin| {
            Command::new(bin)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        })
    }
}

/// Stream properties of the first video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub size: Size,
    pub fps: f64,
    pub frame_count: u64,
}

impl VideoInfo {
    /// `frame_count / fps`, or 0 when the frame rate is unknown.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    tags: Option<ProbeTags>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

impl ProbeStream {
    /// Display rotation in degrees, from the display matrix or the legacy
    /// `rotate` tag.
    fn rotation(&self) -> i64 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|t| t.rotate.as_deref())
                    .and_then(|r| r.trim().parse::<f64>().ok())
            })
            .unwrap_or(0.0);
        if degrees.is_finite() {
            (degrees.round() as i64).rem_euclid(360)
        } else {
            0
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `30000/1001` or `25` into frames per second. `0/0` yields 0.
pub fn parse_frame_rate(raw: &str) -> f64 {
    let raw = raw.trim();
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let n: f64 = num.trim().parse().unwrap_or(0.0);
            let d: f64 = den.trim().parse().unwrap_or(0.0);
            if d == 0.0 {
                0.0
            } else {
                n / d
            }
        }
        None => raw.parse().unwrap_or(0.0),
    };
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        0.0
    }
}

/// Interpret `ffprobe -of json` output.
///
/// The frame count comes from `nb_frames` when the container records it,
/// otherwise it is estimated from the stream (or container) duration.
///
/// `size` is the displayed size. ffmpeg applies rotation metadata while
/// decoding, so a stream rotated by 90 or 270 degrees reports its coded
/// width and height swapped.
pub fn parse_probe_json(text: &str) -> Result<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(text)
        .map_err(|e| ToolError::processing("Parsing ffprobe output", e))?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::UnsupportedFormat("no video stream".to_string()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(ToolError::UnsupportedFormat(
                "video stream has no dimensions".to_string(),
            ))
        }
    };
    let rotation = stream.rotation();
    let (width, height) = match rotation {
        90 | 270 => (height, width),
        _ => (width, height),
    };
    if rotation != 0 {
        tracing::debug!(rotation, width, height, "stream is rotated");
    }

    let mut fps = stream.r_frame_rate.as_deref().map(parse_frame_rate).unwrap_or(0.0);
    if fps == 0.0 {
        fps = stream.avg_frame_rate.as_deref().map(parse_frame_rate).unwrap_or(0.0);
    }

    let duration = stream
        .duration
        .or_else(|| probe.format.and_then(|f| f.duration))
        .and_then(|d| d.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    let frame_count = stream
        .nb_frames
        .and_then(|n| n.trim().parse::<u64>().ok())
        .unwrap_or_else(|| (duration * fps).round().max(0.0) as u64);

    Ok(VideoInfo {
        size: Size::new(width, height),
        fps,
        frame_count,
    })
}

/// Probe the first video stream of `path`.
pub fn probe(config: &FfmpegConfig, path: &Path) -> Result<VideoInfo> {
    if !path.exists() {
        return Err(ToolError::FileNotFound(path.to_path_buf()));
    }
    let output = Command::new(&config.ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            concat!(
                "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,duration",
                ":stream_side_data=rotation:stream_tags=rotate:format=duration",
            ),
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| spawn_failure("Running ffprobe", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolError::UnsupportedFormat(format!(
            "cannot open video {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    let info = parse_probe_json(&String::from_utf8_lossy(&output.stdout))?;
    tracing::debug!(
        path = %path.display(),
        size = %info.size,
        fps = info.fps,
        frames = info.frame_count,
        "probed video"
    );
    Ok(info)
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_failure(operation: &str, err: std::io::Error) -> ToolError {
    ToolError::processing(operation, format!("{} (is ffmpeg installed?)", err))
}

/// Longest stderr tail kept in an encoder error.
const STDERR_TAIL_CHARS: usize = 2000;

/// Read `stderr` to the end on its own thread so a chatty child never
/// blocks on a full pipe. The handle yields the trimmed tail.
fn drain_stderr(stderr: Option<ChildStderr>) -> Option<JoinHandle<String>> {
    let mut stderr = stderr?;
    Some(thread::spawn(move || {
        let mut raw = Vec::new();
        let _ = stderr.read_to_end(&mut raw);
        let text = String::from_utf8_lossy(&raw);
        let text = text.trim();
        let skip = text.chars().count().saturating_sub(STDERR_TAIL_CHARS);
        text.chars().skip(skip).collect()
    }))
}

/// Encoded frames use 4:2:0 chroma, which needs even dimensions.
pub fn validate_frame_size(size: Size, field: &str) -> Result<Size> {
    let size = size.validate(field)?;
    if size.width % 2 == 1 || size.height % 2 == 1 {
        return Err(ToolError::validation(
            field,
            format!("video frames need even dimensions, got {}", size),
        ));
    }
    Ok(size)
}

/// Decodes a video into RGB frames of a fixed size.
pub struct FrameReader {
    child: Child,
    stdout: BufReader<ChildStdout>,
    size: Size,
    buf: Vec<u8>,
    frames_read: u64,
}

impl FrameReader {
    /// Start decoding `path`, whose frames are `size` pixels.
    pub fn open(config: &FfmpegConfig, path: &Path, size: Size) -> Result<Self> {
        tracing::debug!(path = %path.display(), size = %size, "spawning ffmpeg reader");
        let mut child = Command::new(&config.ffmpeg)
            .arg("-i")
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-v", "error", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_failure("Spawning ffmpeg reader", e))?;

        let stdout = match child.stdout.take() {
            Some(s) => s,
            None => {
                kill_and_reap(&mut child);
                return Err(ToolError::processing("Spawning ffmpeg reader", "no stdout pipe"));
            }
        };

        let frame_len = size.width as usize * size.height as usize * 3;
        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            size,
            buf: vec![0u8; frame_len],
            frames_read: 0,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Next decoded frame, or `None` at end of stream.
    pub fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        match self.stdout.read_exact(&mut self.buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(ToolError::Io(e)),
        }
        self.frames_read += 1;
        RgbImage::from_raw(self.size.width, self.size.height, self.buf.clone())
            .map(Some)
            .ok_or_else(|| {
                ToolError::processing("Decoding frame", "buffer does not match frame size")
            })
    }

    /// Decode every remaining frame.
    pub fn read_all(&mut self) -> Result<Vec<RgbImage>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        kill_and_reap(&mut self.child);
    }
}

/// Encodes RGB frames of a fixed size into a video file.
pub struct FrameWriter {
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr: Option<JoinHandle<String>>,
    size: Size,
    frames_written: u64,
}

impl FrameWriter {
    /// Start encoding `size` frames at `fps` into `path` with `codec`.
    /// `size` must be even in both dimensions.
    pub fn create(
        config: &FfmpegConfig,
        path: &Path,
        size: Size,
        fps: f64,
        codec: &str,
    ) -> Result<Self> {
        validate_frame_size(size, "frame size")?;
        if !(fps.is_finite() && fps > 0.0) {
            return Err(ToolError::validation("fps", format!("must be positive, got {}", fps)));
        }

        let args: Vec<String> = vec![
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "-s".into(),
            size.to_string(),
            "-r".into(),
            format!("{}", fps),
            "-i".into(),
            "pipe:0".into(),
            "-c:v".into(),
            codec.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ];
        tracing::debug!(path = %path.display(), ?args, "spawning ffmpeg writer");

        let mut child = Command::new(&config.ffmpeg)
            .args(&args)
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_failure("Spawning ffmpeg writer", e))?;
        let stderr = drain_stderr(child.stderr.take());

        let stdin = match child.stdin.take() {
            Some(s) => s,
            None => {
                kill_and_reap(&mut child);
                return Err(ToolError::processing("Spawning ffmpeg writer", "no stdin pipe"));
            }
        };

        Ok(Self {
            child: Some(child),
            stdin: Some(BufWriter::new(stdin)),
            stderr,
            size,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.size.width, self.size.height) {
            let (w, h) = frame.dimensions();
            return Err(ToolError::validation(
                "frame",
                format!("expected {} but got {}x{}", self.size, w, h),
            ));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ToolError::processing("Writing frame", "encoder already closed"))?;
        stdin.write_all(frame.as_raw()).map_err(|e| {
            ToolError::processing("Writing frame", format!("encoder pipe closed: {}", e))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    /// Close the pipe and wait for the encoder. Returns the number of frames written.
    pub fn finish(mut self) -> Result<u64> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush()?;
        }
        let Some(mut child) = self.child.take() else {
            return Ok(self.frames_written);
        };
        let status = child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(ToolError::processing(
                "Encoding video",
                format!("ffmpeg exited with {}: {}", status, stderr),
            ));
        }
        tracing::debug!(frames = self.frames_written, "encoder finished");
        Ok(self.frames_written)
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            kill_and_reap(&mut child);
        }
        if let Some(handle) = self.stderr.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rates() {
        assert_eq!(parse_frame_rate("25"), 25.0);
        assert_eq!(parse_frame_rate("30/1"), 30.0);
        assert!((parse_frame_rate("30000/1001") - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), 0.0);
        assert_eq!(parse_frame_rate("garbage"), 0.0);
    }

    #[test]
    fn probe_json_with_frame_count() {
        let json = r#"{
            "programs": [],
            "streams": [
                {"width": 1920, "height": 1080, "r_frame_rate": "30/1",
                 "avg_frame_rate": "30/1", "nb_frames": "150", "duration": "5.000000"}
            ],
            "format": {"duration": "5.010000"}
        }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.size, Size::new(1920, 1080));
        assert_eq!(info.fps, 30.0);
        assert_eq!(info.frame_count, 150);
        assert!((info.duration_secs() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn probe_json_estimates_frames_from_duration() {
        let json = r#"{
            "streams": [
                {"width": 640, "height": 480, "r_frame_rate": "0/0", "avg_frame_rate": "25/1"}
            ],
            "format": {"duration": "2.0"}
        }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.fps, 25.0);
        assert_eq!(info.frame_count, 50);
    }

    #[test]
    fn probe_json_without_video_stream_is_unsupported() {
        let err = parse_probe_json(r#"{"streams": []}"#).unwrap_err();
        assert!(matches!(err, ToolError::UnsupportedFormat(_)));
        assert!(parse_probe_json("not json").is_err());
    }

    #[test]
    fn webm_gets_vp9() {
        assert_eq!(reencode_codec_for(Path::new("a.webm")), "libvpx-vp9");
        assert_eq!(reencode_codec_for(Path::new("a.MP4")), REENCODE_CODEC);
        assert_eq!(reencode_codec_for(Path::new("a.avi")), REENCODE_CODEC);
    }

    #[test]
    fn zero_fps_has_zero_duration() {
        let info = VideoInfo {
            size: Size::new(2, 2),
            fps: 0.0,
            frame_count: 100,
        };
        assert_eq!(info.duration_secs(), 0.0);
    }

    #[test]
    fn probe_missing_file_is_not_found() {
        let err = probe(&FfmpegConfig::default(), Path::new("/no/such/video.mp4")).unwrap_err();
        assert!(matches!(err, ToolError::FileNotFound(_)));
    }

    #[test]
    fn rotated_streams_report_display_size() {
        let json = r#"{
            "streams": [{
                "width": 1920, "height": 1080, "r_frame_rate": "30/1", "nb_frames": "30",
                "side_data_list": [
                    {"side_data_type": "Display Matrix", "rotation": -90}
                ]
            }]
        }"#;
        assert_eq!(parse_probe_json(json).unwrap().size, Size::new(1080, 1920));

        let tagged = |rotate: &str| {
            format!(
                r#"{{"streams": [{{"width": 1920, "height": 1080, "tags": {{"rotate": "{}"}}}}]}}"#,
                rotate
            )
        };
        assert_eq!(parse_probe_json(&tagged("270")).unwrap().size, Size::new(1080, 1920));
        assert_eq!(parse_probe_json(&tagged("180")).unwrap().size, Size::new(1920, 1080));
    }

    #[test]
    fn frame_sizes_must_be_even() {
        assert_eq!(validate_frame_size(Size::new(16, 8), "size").unwrap(), Size::new(16, 8));
        assert!(validate_frame_size(Size::new(1081, 1080), "size").is_err());
        assert!(validate_frame_size(Size::new(1080, 1081), "size").is_err());
        assert!(validate_frame_size(Size::new(0, 2), "size").is_err());
    }

    #[test]
    fn odd_writer_is_rejected_before_spawning() {
        let config = FfmpegConfig {
            ffmpeg: "/no/such/ffmpeg".to_string(),
            ..FfmpegConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("odd.mp4");
        let err = FrameWriter::create(&config, &out, Size::new(33, 16), 10.0, "mpeg4").err();
        assert!(matches!(err, Some(ToolError::ValidationFailure { .. })));
        // an even size gets as far as spawning
        let err = FrameWriter::create(&config, &out, Size::new(32, 16), 10.0, "mpeg4").err();
        assert!(matches!(err, Some(ToolError::ProcessingFailure { .. })));
    }

    #[cfg(unix)]
    fn fake_encoder(dir: &Path, body: &str) -> FfmpegConfig {
        use std::os::unix::fs::PermissionsExt;
        let script = dir.join("fake-ffmpeg");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        FfmpegConfig {
            ffmpeg: script.to_string_lossy().into_owned(),
            ..FfmpegConfig::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn chatty_encoder_does_not_stall_the_writer() {
        let dir = tempfile::tempdir().unwrap();
        // fills well past a pipe buffer on stderr before reading any frames
        let config = fake_encoder(
            dir.path(),
            "head -c 300000 /dev/zero | tr '\\000' x >&2\ncat > /dev/null",
        );
        let mut writer =
            FrameWriter::create(&config, &dir.path().join("out.mp4"), Size::new(64, 64), 10.0, "x")
                .unwrap();
        let frame = RgbImage::new(64, 64);
        for _ in 0..50 {
            writer.write_frame(&frame).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), 50);
    }

    #[cfg(unix)]
    #[test]
    fn encoder_failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let config = fake_encoder(dir.path(), "cat > /dev/null\necho 'bad codec' >&2\nexit 3");
        let mut writer =
            FrameWriter::create(&config, &dir.path().join("out.mp4"), Size::new(8, 8), 10.0, "x")
                .unwrap();
        writer.write_frame(&RgbImage::new(8, 8)).unwrap();
        let err = writer.finish().unwrap_err().to_string();
        assert!(err.contains("bad codec"), "{}", err);
    }
}
