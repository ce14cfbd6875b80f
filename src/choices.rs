//! Resolution of raw interactive answers into validated values.
//!
//! Every function here is pure: it takes what the user typed and returns the
//! value to use, plus a warning when the answer was rejected and a default
//! substituted. The binary does the prompting; these decide.

use image::Rgb;

use crate::formats::ImageFormat;
use crate::geometry::{Anchor, FitMode, Size};
use crate::media::MediaKind;
use crate::report::Reporter;

/// A resolved answer and the warning to show if a default was substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub warning: Option<String>,
}

impl<T> Resolved<T> {
    pub fn ok(value: T) -> Self {
        Self { value, warning: None }
    }

    pub fn fallback(value: T, warning: String) -> Self {
        Self {
            value,
            warning: Some(warning),
        }
    }

    /// Emit the warning, if any, and return the value.
    pub fn report(self, reporter: &dyn Reporter) -> T {
        if let Some(w) = &self.warning {
            reporter.warning(w);
        }
        self.value
    }
}

pub fn invalid_input(default: impl std::fmt::Display) -> String {
    format!("Invalid input. Using default: {}", default)
}

pub fn invalid_choice(default: impl std::fmt::Display) -> String {
    format!("Invalid choice. Using default: {}", default)
}

/// A named output size offered in the aspect ratio menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectPreset {
    pub ratio: &'static str,
    pub size: Size,
    pub label: &'static str,
}

/// Menu entries 1 to 5; entry 6 is "custom".
pub const ASPECT_PRESETS: [AspectPreset; 5] = [
    AspectPreset {
        ratio: "16:9",
        size: Size { width: 1920, height: 1080 },
        label: "Widescreen",
    },
    AspectPreset {
        ratio: "4:3",
        size: Size { width: 1024, height: 768 },
        label: "Standard",
    },
    AspectPreset {
        ratio: "1:1",
        size: Size { width: 1080, height: 1080 },
        label: "Square",
    },
    AspectPreset {
        ratio: "9:16",
        size: Size { width: 1080, height: 1920 },
        label: "Vertical/Portrait",
    },
    AspectPreset {
        ratio: "21:9",
        size: Size { width: 2560, height: 1080 },
        label: "Ultra-wide",
    },
];

pub const CUSTOM_ASPECT_CHOICE: &str = "6";

/// Menu lines for the aspect ratio prompt.
pub fn aspect_menu() -> Vec<String> {
    let mut lines: Vec<String> = ASPECT_PRESETS
        .iter()
        .map(|p| format!("{} ({}) - {}", p.ratio, p.size, p.label))
        .collect();
    lines.push("Custom".to_string());
    lines
}

fn parse_dimension(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

/// Resolve the aspect menu. `default_index` (0-based into [`ASPECT_PRESETS`])
/// is used for an empty answer, an unknown entry, or a bad custom size.
pub fn resolve_aspect(
    choice: &str,
    custom_width: &str,
    custom_height: &str,
    default_index: usize,
) -> Resolved<Size> {
    let default = ASPECT_PRESETS[default_index.min(ASPECT_PRESETS.len() - 1)];
    let choice = choice.trim();
    if choice.is_empty() {
        return Resolved::ok(default.size);
    }
    if choice == CUSTOM_ASPECT_CHOICE {
        return match (parse_dimension(custom_width), parse_dimension(custom_height)) {
            (Some(w), Some(h)) => Resolved::ok(Size::new(w, h)),
            _ => Resolved::fallback(default.size, invalid_input(default.size)),
        };
    }
    match choice.parse::<usize>() {
        Ok(n) if (1..=ASPECT_PRESETS.len()).contains(&n) => {
            Resolved::ok(ASPECT_PRESETS[n - 1].size)
        }
        _ => Resolved::fallback(
            default.size,
            invalid_choice(format!("{} ({})", default.ratio, default.size)),
        ),
    }
}

/// `2` selects crop; anything else letterbox.
pub fn resolve_mode(choice: &str) -> FitMode {
    match choice.trim() {
        "2" => FitMode::Crop,
        _ => FitMode::Letterbox,
    }
}

/// Menu entries 1 to 9 follow [`Anchor::ALL`]; empty means center.
pub fn resolve_anchor(choice: &str) -> Resolved<Anchor> {
    let choice = choice.trim();
    if choice.is_empty() {
        return Resolved::ok(Anchor::Center);
    }
    match choice.parse::<usize>() {
        Ok(n) if (1..=Anchor::ALL.len()).contains(&n) => Resolved::ok(Anchor::ALL[n - 1]),
        _ => Resolved::fallback(Anchor::Center, invalid_choice(Anchor::Center.label())),
    }
}

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

/// Parse `r,g,b` (commas or spaces), clamping each component to 0..=255.
pub fn parse_rgb(raw: &str) -> Option<Rgb<u8>> {
    let parts: Vec<i64> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [r, g, b] => Some(Rgb([
            (*r).clamp(0, 255) as u8,
            (*g).clamp(0, 255) as u8,
            (*b).clamp(0, 255) as u8,
        ])),
        _ => None,
    }
}

/// Letterbox color menu: 1 black (default), 2 white, 3 gray, 4 custom `r,g,b`.
pub fn resolve_letterbox_color(choice: &str, custom: &str) -> Resolved<Rgb<u8>> {
    match choice.trim() {
        "" | "1" => Resolved::ok(BLACK),
        "2" => Resolved::ok(WHITE),
        "3" => Resolved::ok(GRAY),
        "4" => match parse_rgb(custom) {
            Some(c) => Resolved::ok(c),
            None => Resolved::fallback(BLACK, invalid_input("black (0, 0, 0)")),
        },
        _ => Resolved::fallback(BLACK, invalid_choice("black (0, 0, 0)")),
    }
}

/// Media menu: 1 images (default), 2 videos, 3 both.
pub fn resolve_media_kind(choice: &str) -> Resolved<MediaKind> {
    match choice.trim() {
        "" | "1" => Resolved::ok(MediaKind::Images),
        "2" => Resolved::ok(MediaKind::Videos),
        "3" => Resolved::ok(MediaKind::Both),
        _ => Resolved::fallback(MediaKind::Images, invalid_choice("images")),
    }
}

/// Text color scheme menu: 1 white on black (default), 2 black on white,
/// 3 custom. Returns `(text, background)`.
pub fn resolve_color_scheme(
    choice: &str,
    custom_text: &str,
    custom_background: &str,
) -> Resolved<(Rgb<u8>, Rgb<u8>)> {
    let default = (WHITE, BLACK);
    match choice.trim() {
        "" | "1" => Resolved::ok(default),
        "2" => Resolved::ok((BLACK, WHITE)),
        "3" => match (parse_rgb(custom_text), parse_rgb(custom_background)) {
            (Some(t), Some(b)) => Resolved::ok((t, b)),
            _ => Resolved::fallback(default, invalid_input("white text on black")),
        },
        _ => Resolved::fallback(default, invalid_choice("white text on black")),
    }
}

/// Text image format menu: 1 PNG (default), 2 JPEG, 3 WEBP.
pub fn resolve_text_format(choice: &str) -> Resolved<ImageFormat> {
    match choice.trim() {
        "" | "1" => Resolved::ok(ImageFormat::Png),
        "2" => Resolved::ok(ImageFormat::Jpeg),
        "3" => Resolved::ok(ImageFormat::Webp),
        _ => Resolved::fallback(ImageFormat::Png, invalid_choice("PNG")),
    }
}

/// What the duration tool should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationAction {
    Mapping,
    Adjust,
    Both,
}

impl DurationAction {
    pub fn includes_mapping(self) -> bool {
        matches!(self, DurationAction::Mapping | DurationAction::Both)
    }

    pub fn includes_adjust(self) -> bool {
        matches!(self, DurationAction::Adjust | DurationAction::Both)
    }
}

/// `1` mapping, `2` adjust, `3` both. Anything else is rejected.
pub fn resolve_duration_action(choice: &str) -> Option<DurationAction> {
    match choice.trim() {
        "1" => Some(DurationAction::Mapping),
        "2" => Some(DurationAction::Adjust),
        "3" => Some(DurationAction::Both),
        _ => None,
    }
}

/// Empty input yields `default` silently; unparsable or non-finite input
/// yields `default` with a warning.
pub fn parse_float_or(raw: &str, default: f64) -> Resolved<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Resolved::ok(default);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Resolved::ok(v),
        _ => Resolved::fallback(default, invalid_input(default)),
    }
}

/// Like [`parse_float_or`] for strictly positive integers.
pub fn parse_positive_or(raw: &str, default: u32) -> Resolved<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Resolved::ok(default);
    }
    match raw.parse::<u32>() {
        Ok(v) if v > 0 => Resolved::ok(v),
        _ => Resolved::fallback(default, invalid_input(default)),
    }
}

/// `y`, `yes`, `true` and `1` (any case) are yes; empty is `default`.
pub fn parse_yes_no(raw: &str, default: bool) -> bool {
    let raw = raw.trim().to_ascii_lowercase();
    if raw.is_empty() {
        return default;
    }
    matches!(raw.as_str(), "y" | "yes" | "true" | "1")
}

/// Empty input means `default`.
pub fn folder_or<'a>(raw: &'a str, default: &'a str) -> &'a str {
    let raw = raw.trim();
    if raw.is_empty() {
        default
    } else {
        raw
    }
}
