//! Applies a [`FitPlan`] to RGB pixels.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::error::Result;
use crate::geometry::{plan_fit, Anchor, FitMode, FitPlan, Size};

/// Resampling filter used for every resize in the crate.
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Parameters of a fit, shared by every image and frame in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    pub target: Size,
    pub mode: FitMode,
    pub anchor: Anchor,
    pub letterbox_color: Rgb<u8>,
}

impl FitOptions {
    pub fn new(target: Size) -> Self {
        Self {
            target,
            mode: FitMode::Letterbox,
            anchor: Anchor::Center,
            letterbox_color: Rgb([0, 0, 0]),
        }
    }

    pub fn with_mode(mut self, mode: FitMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_letterbox_color(mut self, color: Rgb<u8>) -> Self {
        self.letterbox_color = color;
        self
    }
}

/// Resize to exactly `size`, returning the input untouched when it already matches.
pub fn resize_exact(image: RgbImage, size: Size) -> RgbImage {
    if image.dimensions() == (size.width, size.height) {
        return image;
    }
    imageops::resize(&image, size.width, size.height, RESAMPLE_FILTER)
}

/// Bring `image` to exactly `options.target`.
///
/// Letterboxing never discards source content; cropping never introduces
/// pixels that are not derived from the source.
pub fn fit(image: RgbImage, options: &FitOptions) -> Result<RgbImage> {
    let (w, h) = image.dimensions();
    let plan = plan_fit(Size::new(w, h), options.target, options.mode, options.anchor)?;

    let out = match plan {
        FitPlan::Letterbox { resized, offset } => {
            let content = resize_exact(image, resized);
            if resized == options.target {
                content
            } else {
                let mut canvas = RgbImage::from_pixel(
                    options.target.width,
                    options.target.height,
                    options.letterbox_color,
                );
                imageops::replace(&mut canvas, &content, offset.0 as i64, offset.1 as i64);
                canvas
            }
        }
        FitPlan::Crop { region } => {
            let cropped = if region.size == Size::new(w, h) {
                image
            } else {
                let (cw, ch) = (region.size.width, region.size.height);
                imageops::crop_imm(&image, region.x, region.y, cw, ch).to_image()
            };
            resize_exact(cropped, options.target)
        }
    };

    Ok(out)
}
