//! Tool defaults, loadable from `mediakit.json` or `mediakit.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ToolError};
use crate::formats::VideoFormat;
use crate::geometry::{Anchor, FitMode, Size};
use crate::video::FfmpegConfig;

pub const SETTINGS_STEM: &str = "mediakit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Folders {
    pub images_input: PathBuf,
    pub images_output: PathBuf,
    pub videos_input: PathBuf,
    pub videos_output: PathBuf,
    pub duration_input: PathBuf,
    pub duration_output: PathBuf,
    pub mapping_file: PathBuf,
    pub text_input: PathBuf,
    pub text_output: PathBuf,
    pub video_clips_output: PathBuf,
}

impl Default for Folders {
    fn default() -> Self {
        Self {
            images_input: "images_to_process".into(),
            images_output: "images_processed".into(),
            videos_input: "videos_to_process".into(),
            videos_output: "videos_processed".into(),
            duration_input: "videos_to_process".into(),
            duration_output: "videos_adjusted".into(),
            mapping_file: "video_mapping.txt".into(),
            text_input: "text_to_process".into(),
            text_output: "images_processed".into(),
            video_clips_output: crate::to_video::DEFAULT_OUTPUT_DIR.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AspectDefaults {
    pub mode: FitMode,
    pub anchor: Anchor,
    pub letterbox_color: [u8; 3],
}

impl Default for AspectDefaults {
    fn default() -> Self {
        Self {
            mode: FitMode::Letterbox,
            anchor: Anchor::Center,
            letterbox_color: [0, 0, 0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationDefaults {
    pub target_secs: f64,
    pub fade_secs: f64,
}

impl Default for DurationDefaults {
    fn default() -> Self {
        Self {
            target_secs: 5.0,
            fade_secs: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CArrayDefaults {
    pub size: Size,
    pub quality: u8,
    pub array_name: String,
    pub bytes_per_line: usize,
    pub output: PathBuf,
}

impl Default for CArrayDefaults {
    fn default() -> Self {
        Self {
            size: Size::new(240, 320),
            quality: 75,
            array_name: crate::c_array::DEFAULT_ARRAY_NAME.to_string(),
            bytes_per_line: crate::c_array::DEFAULT_BYTES_PER_LINE,
            output: crate::c_array::DEFAULT_HEADER_OUTPUT.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToVideoDefaults {
    pub duration_secs: f64,
    pub fps: u32,
    pub format: VideoFormat,
    pub codec: String,
}

impl Default for ToVideoDefaults {
    fn default() -> Self {
        Self {
            duration_secs: 4.0,
            fps: 24,
            format: VideoFormat::Mp4,
            codec: "libx264".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub size: Size,
    pub font_size: u32,
    pub padding: u32,
    pub font_path: Option<PathBuf>,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            size: Size::new(1080, 1080),
            font_size: 48,
            padding: 20,
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeDefaults {
    pub max_size: Size,
    pub quality: u8,
}

impl Default for OptimizeDefaults {
    fn default() -> Self {
        Self {
            max_size: Size::new(1920, 1080),
            quality: 85,
        }
    }
}

/// Every default the tools fall back to. Missing keys keep built-in values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub folders: Folders,
    pub aspect: AspectDefaults,
    pub duration: DurationDefaults,
    pub c_array: CArrayDefaults,
    pub to_video: ToVideoDefaults,
    pub text: TextDefaults,
    pub optimize: OptimizeDefaults,
    pub ffmpeg: FfmpegConfig,
}

impl Settings {
    /// Parse settings text; `.toml` paths are TOML, anything else JSON.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        let invalid = |e: &dyn std::fmt::Display| {
            ToolError::validation("settings", format!("{}: {}", path.display(), e))
        };
        let settings: Settings = if is_toml {
            toml::from_str(text).map_err(|e| invalid(&e))?
        } else {
            serde_json::from_str(text).map_err(|e| invalid(&e))?
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::FileNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        Self::parse(&text, path)
    }

    /// Config directory first, then the current directory.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut tried = Vec::new();
        if let Some(mut d) = dirs::config_dir() {
            d.push(SETTINGS_STEM);
            for ext in ["json", "toml"] {
                tried.push(d.join(format!("{}.{}", SETTINGS_STEM, ext)));
            }
        }
        for ext in ["json", "toml"] {
            tried.push(PathBuf::from(format!("{}.{}", SETTINGS_STEM, ext)));
        }
        tried
    }

    /// Load `explicit` if given, else the first existing candidate, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load_from(path)?, Some(path.to_path_buf())));
        }
        for path in Self::candidate_paths() {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "loading settings");
                return Ok((Self::load_from(&path)?, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }

    pub fn validate(&self) -> Result<()> {
        self.c_array.size.validate("c_array.size")?;
        self.text.size.validate("text.size")?;
        self.optimize.max_size.validate("optimize.max_size")?;
        let qualities = [
            ("c_array.quality", self.c_array.quality),
            ("optimize.quality", self.optimize.quality),
        ];
        for (field, q) in qualities {
            if !(1..=100).contains(&q) {
                return Err(ToolError::validation(field, "must be between 1 and 100"));
            }
        }
        if self.to_video.fps == 0 {
            return Err(ToolError::validation("to_video.fps", "must be at least 1"));
        }
        if !(self.duration.target_secs.is_finite() && self.duration.target_secs > 0.0) {
            return Err(ToolError::validation("duration.target_secs", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_keeps_defaults() {
        let s = Settings::parse("{}", Path::new("mediakit.json")).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.c_array.size, Size::new(240, 320));
        assert_eq!(s.to_video.codec, "libx264");
    }

    #[test]
    fn partial_json_overrides() {
        let json = r#"{
            "aspect": {"mode": "crop", "anchor": "upper_right"},
            "optimize": {"quality": 70},
            "ffmpeg": {"ffmpeg": "/opt/ffmpeg/bin/ffmpeg"}
        }"#;
        let s = Settings::parse(json, Path::new("x.json")).unwrap();
        assert_eq!(s.aspect.mode, FitMode::Crop);
        assert_eq!(s.aspect.anchor, Anchor::UpperRight);
        assert_eq!(s.aspect.letterbox_color, [0, 0, 0]);
        assert_eq!(s.optimize.quality, 70);
        assert_eq!(s.ffmpeg.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(s.ffmpeg.ffprobe, "ffprobe");
    }

    #[test]
    fn toml_is_accepted() {
        let text = r#"
[duration]
target_secs = 8.0

[text]
font_size = 64
size = { width = 1920, height = 1080 }

[to_video]
format = "webm"
"#;
        let s = Settings::parse(text, Path::new("mediakit.toml")).unwrap();
        assert_eq!(s.duration.target_secs, 8.0);
        assert_eq!(s.text.font_size, 64);
        assert_eq!(s.text.size, Size::new(1920, 1080));
        assert_eq!(s.to_video.format, VideoFormat::Webm);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let json = Path::new("s.json");
        let err = Settings::parse(r#"{"c_array": {"quality": 0}}"#, json).unwrap_err();
        assert!(matches!(err, ToolError::ValidationFailure { .. }));
        assert!(Settings::parse("{not json", json).is_err());
        assert!(Settings::parse(r#"{"text": {"size": {"width": 0, "height": 5}}}"#, json).is_err());
    }

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(&path, r#"{"to_video": {"fps": 30}}"#).unwrap();
        let (s, from) = Settings::discover(Some(&path)).unwrap();
        assert_eq!(s.to_video.fps, 30);
        assert_eq!(from, Some(path));
        assert!(Settings::discover(Some(&dir.path().join("missing.json"))).is_err());
    }
}
