//! Letterbox and crop geometry.
//!
//! Everything here is plain integer arithmetic on sizes; the pixel work lives
//! in [`crate::fit`]. Aspect comparisons use cross-multiplication so that
//! equal ratios compare equal and floors are exact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ToolError};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Reject zero dimensions; `field` names the offending parameter.
    pub fn validate(self, field: &str) -> Result<Self> {
        if self.width == 0 || self.height == 0 {
            return Err(ToolError::validation(
                field,
                format!("dimensions must be positive, got {}", self),
            ));
        }
        Ok(self)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = ToolError;

    /// Parses `WIDTHxHEIGHT`, e.g. `1920x1080`.
    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| {
                ToolError::validation("size", format!("expected WIDTHxHEIGHT, got '{}'", s))
            })?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| ToolError::validation("size", format!("invalid width '{}'", w)))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| ToolError::validation("size", format!("invalid height '{}'", h)))?;
        Size::new(width, height).validate("size")
    }
}

/// Which part of the source is kept when cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    #[default]
    Center,
    UpperLeft,
    UpperCenter,
    UpperRight,
    CenterLeft,
    CenterRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::Center,
        Anchor::UpperLeft,
        Anchor::UpperCenter,
        Anchor::UpperRight,
        Anchor::CenterLeft,
        Anchor::CenterRight,
        Anchor::LowerLeft,
        Anchor::LowerCenter,
        Anchor::LowerRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Anchor::Center => "center",
            Anchor::UpperLeft => "upper_left",
            Anchor::UpperCenter => "upper_center",
            Anchor::UpperRight => "upper_right",
            Anchor::CenterLeft => "center_left",
            Anchor::CenterRight => "center_right",
            Anchor::LowerLeft => "lower_left",
            Anchor::LowerCenter => "lower_center",
            Anchor::LowerRight => "lower_right",
        }
    }

    /// Human label used in menus.
    pub fn label(self) -> &'static str {
        match self {
            Anchor::Center => "Center",
            Anchor::UpperLeft => "Upper Left",
            Anchor::UpperCenter => "Upper Center",
            Anchor::UpperRight => "Upper Right",
            Anchor::CenterLeft => "Center Left",
            Anchor::CenterRight => "Center Right",
            Anchor::LowerLeft => "Lower Left",
            Anchor::LowerCenter => "Lower Center",
            Anchor::LowerRight => "Lower Right",
        }
    }

    /// Unknown names silently resolve to [`Anchor::Center`].
    pub fn from_name_or_center(name: &str) -> Self {
        name.parse().unwrap_or(Anchor::Center)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Anchor {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Anchor::ALL
            .into_iter()
            .find(|a| a.name() == key)
            .ok_or_else(|| ToolError::validation("anchor", format!("unknown anchor '{}'", s)))
    }
}

/// How a source is brought to the target aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Scale to fit inside and pad with a solid color.
    #[default]
    Letterbox,
    /// Cut the source to the target aspect ratio, then scale.
    Crop,
}

impl FitMode {
    pub fn name(self) -> &'static str {
        match self {
            FitMode::Letterbox => "letterbox",
            FitMode::Crop => "crop",
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FitMode {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letterbox" | "pad" => Ok(FitMode::Letterbox),
            "crop" => Ok(FitMode::Crop),
            other => Err(ToolError::validation("mode", format!("unknown mode '{}'", other))),
        }
    }
}

/// An axis-aligned region of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub size: Size,
}

/// The resize/placement decisions for one fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitPlan {
    /// Resize the whole source to `resized`, paste it at `offset` on a
    /// canvas of the target size.
    Letterbox { resized: Size, offset: (u32, u32) },
    /// Take `region` from the source and resize it to the target size.
    Crop { region: Region },
}

/// Top-left offset at which a `target`-sized window is taken from `source`.
///
/// Offsets are clamped to zero, so a target larger than the source yields
/// `(0, 0)` on that axis rather than an error.
pub fn resolve_anchor(source: Size, target: Size, anchor: Anchor) -> (u32, u32) {
    let dx = source.width as i64 - target.width as i64;
    let dy = source.height as i64 - target.height as i64;

    let (x, y) = match anchor {
        Anchor::Center => (dx / 2, dy / 2),
        Anchor::UpperLeft => (0, 0),
        Anchor::UpperCenter => (dx / 2, 0),
        Anchor::UpperRight => (dx, 0),
        Anchor::CenterLeft => (0, dy / 2),
        Anchor::CenterRight => (dx, dy / 2),
        Anchor::LowerLeft => (0, dy),
        Anchor::LowerCenter => (dx / 2, dy),
        Anchor::LowerRight => (dx, dy),
    };

    (x.max(0) as u32, y.max(0) as u32)
}

/// True when `source` is relatively wider than `target`.
fn is_wider(source: Size, target: Size) -> bool {
    source.width as u64 * target.height as u64 > target.width as u64 * source.height as u64
}

/// `floor(a * b / c)`, at least 1.
fn scaled(a: u32, b: u32, c: u32) -> u32 {
    ((a as u64 * b as u64) / c as u64).max(1) as u32
}

/// Compute how `source` is mapped onto `target` for `mode`.
pub fn plan_fit(source: Size, target: Size, mode: FitMode, anchor: Anchor) -> Result<FitPlan> {
    let target = target.validate("target")?;
    let source = source.validate("source")?;
    let wider = is_wider(source, target);

    let plan = match mode {
        FitMode::Letterbox => {
            let resized = if wider {
                Size::new(target.width, scaled(target.width, source.height, source.width))
            } else {
                Size::new(scaled(target.height, source.width, source.height), target.height)
            };
            let offset = (
                (target.width - resized.width) / 2,
                (target.height - resized.height) / 2,
            );
            FitPlan::Letterbox { resized, offset }
        }
        FitMode::Crop => {
            let crop = if wider {
                Size::new(scaled(source.height, target.width, target.height), source.height)
            } else {
                Size::new(source.width, scaled(source.width, target.height, target.width))
            };
            let (x, y) = resolve_anchor(source, crop, anchor);
            FitPlan::Crop {
                region: Region { x, y, size: crop },
            }
        }
    };

    tracing::debug!(%source, %target, ?plan, "planned fit");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD: Size = Size::new(1920, 1080);
    const SQUARE: Size = Size::new(1080, 1080);

    #[test]
    fn anchors_on_landscape_to_square() {
        let expect = [
            (Anchor::Center, (420, 0)),
            (Anchor::UpperLeft, (0, 0)),
            (Anchor::UpperCenter, (420, 0)),
            (Anchor::UpperRight, (840, 0)),
            (Anchor::CenterLeft, (0, 0)),
            (Anchor::CenterRight, (840, 0)),
            (Anchor::LowerLeft, (0, 0)),
            (Anchor::LowerCenter, (420, 0)),
            (Anchor::LowerRight, (840, 0)),
        ];
        for (anchor, offset) in expect {
            assert_eq!(resolve_anchor(HD, SQUARE, anchor), offset, "{}", anchor);
        }
    }

    #[test]
    fn anchors_on_both_axes() {
        let source = Size::new(101, 51);
        let target = Size::new(50, 20);
        assert_eq!(resolve_anchor(source, target, Anchor::Center), (25, 15));
        assert_eq!(resolve_anchor(source, target, Anchor::LowerRight), (51, 31));
        assert_eq!(resolve_anchor(source, target, Anchor::CenterRight), (51, 15));
        assert_eq!(resolve_anchor(source, target, Anchor::LowerCenter), (25, 31));
    }

    #[test]
    fn offsets_clamp_when_target_exceeds_source() {
        let small = Size::new(100, 100);
        let big = Size::new(200, 200);
        for anchor in Anchor::ALL {
            assert_eq!(resolve_anchor(small, big, anchor), (0, 0));
        }
    }

    #[test]
    fn window_stays_inside_source() {
        let sources = [Size::new(1920, 1080), Size::new(7, 13), Size::new(640, 640)];
        let targets = [Size::new(1, 1), Size::new(7, 5), Size::new(640, 480), Size::new(3, 13)];
        for source in sources {
            for target in targets {
                if target.width > source.width || target.height > source.height {
                    continue;
                }
                for anchor in Anchor::ALL {
                    let (x, y) = resolve_anchor(source, target, anchor);
                    assert!(x + target.width <= source.width);
                    assert!(y + target.height <= source.height);
                }
            }
        }
    }

    #[test]
    fn unknown_anchor_name_is_center() {
        assert_eq!(Anchor::from_name_or_center("diagonal"), Anchor::Center);
        assert_eq!(Anchor::from_name_or_center("upper-right"), Anchor::UpperRight);
        assert_eq!(Anchor::from_name_or_center("LOWER_LEFT"), Anchor::LowerLeft);
    }

    #[test]
    fn letterbox_wide_source_into_square() {
        let plan = plan_fit(HD, SQUARE, FitMode::Letterbox, Anchor::Center).unwrap();
        assert_eq!(
            plan,
            FitPlan::Letterbox {
                resized: Size::new(1080, 607),
                offset: (0, 236),
            }
        );
    }

    #[test]
    fn letterbox_tall_source_into_landscape() {
        let plan = plan_fit(Size::new(1080, 1920), HD, FitMode::Letterbox, Anchor::Center).unwrap();
        assert_eq!(
            plan,
            FitPlan::Letterbox {
                resized: Size::new(607, 1080),
                offset: (656, 0),
            }
        );
    }

    #[test]
    fn crop_wide_source_keeps_full_height() {
        let plan = plan_fit(HD, SQUARE, FitMode::Crop, Anchor::UpperRight).unwrap();
        assert_eq!(
            plan,
            FitPlan::Crop {
                region: Region { x: 840, y: 0, size: SQUARE },
            }
        );
    }

    #[test]
    fn crop_tall_source_keeps_full_width() {
        let plan = plan_fit(Size::new(1080, 1920), HD, FitMode::Crop, Anchor::LowerCenter).unwrap();
        assert_eq!(
            plan,
            FitPlan::Crop {
                region: Region { x: 0, y: 1313, size: Size::new(1080, 607) },
            }
        );
    }

    #[test]
    fn equal_aspect_is_identity() {
        for mode in [FitMode::Letterbox, FitMode::Crop] {
            let plan = plan_fit(HD, HD, mode, Anchor::LowerRight).unwrap();
            match plan {
                FitPlan::Letterbox { resized, offset } => {
                    assert_eq!(resized, HD);
                    assert_eq!(offset, (0, 0));
                }
                FitPlan::Crop { region } => {
                    assert_eq!(region, Region { x: 0, y: 0, size: HD });
                }
            }
        }
    }

    #[test]
    fn extreme_aspect_clamps_to_one_pixel() {
        let plan =
            plan_fit(Size::new(10_000, 1), Size::new(4, 4), FitMode::Letterbox, Anchor::Center)
                .unwrap();
        assert_eq!(
            plan,
            FitPlan::Letterbox {
                resized: Size::new(4, 1),
                offset: (0, 1),
            }
        );

        let plan = plan_fit(Size::new(1, 10_000), Size::new(4, 4), FitMode::Crop, Anchor::Center)
            .unwrap();
        match plan {
            FitPlan::Crop { region } => {
                assert_eq!(region.size, Size::new(1, 1));
                assert_eq!((region.x, region.y), (0, 4999));
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn zero_target_is_rejected() {
        let err = plan_fit(HD, Size::new(0, 1080), FitMode::Crop, Anchor::Center).unwrap_err();
        assert!(matches!(err, ToolError::ValidationFailure { .. }));
    }

    #[test]
    fn size_parsing() {
        assert_eq!("1920x1080".parse::<Size>().unwrap(), HD);
        assert_eq!(" 640 X 480 ".parse::<Size>().unwrap(), Size::new(640, 480));
        assert!("1920".parse::<Size>().is_err());
        assert!("0x10".parse::<Size>().is_err());
        assert!("axb".parse::<Size>().is_err());
    }
}
