//! Known image/video formats and the facts the tools need about them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, ToolError};

/// Extensions (lowercase, no dot) treated as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif"];

/// Extensions (lowercase, no dot) treated as videos.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// Quality reported for lossless formats.
pub const LOSSLESS_QUALITY: u8 = 100;

/// Quality used for a lossy format with no specific recommendation.
pub const DEFAULT_QUALITY_FALLBACK: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
    Bmp,
    Tiff,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 6] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Webp,
        ImageFormat::Gif,
        ImageFormat::Bmp,
        ImageFormat::Tiff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::Webp => "WEBP",
            ImageFormat::Gif => "GIF",
            ImageFormat::Bmp => "BMP",
            ImageFormat::Tiff => "TIFF",
        }
    }

    /// Canonical extension including the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => ".jpg",
            ImageFormat::Png => ".png",
            ImageFormat::Webp => ".webp",
            ImageFormat::Gif => ".gif",
            ImageFormat::Bmp => ".bmp",
            ImageFormat::Tiff => ".tiff",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::Webp),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }

    pub fn is_lossy(self) -> bool {
        matches!(self, ImageFormat::Jpeg | ImageFormat::Webp)
    }

    pub fn is_lossless(self) -> bool {
        !self.is_lossy()
    }

    pub fn supports_transparency(self) -> bool {
        matches!(self, ImageFormat::Png | ImageFormat::Webp | ImageFormat::Gif | ImageFormat::Tiff)
    }

    pub fn supports_animation(self) -> bool {
        matches!(self, ImageFormat::Gif | ImageFormat::Webp)
    }

    /// The matching `image` crate encoder format.
    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Webp => image::ImageFormat::WebP,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
            ImageFormat::Tiff => image::ImageFormat::Tiff,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFormat {
    type Err = ToolError;

    /// Accepts a format name (`JPEG`, `jpg`, `png`, ...) case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        ImageFormat::from_extension(s).ok_or_else(|| ToolError::UnsupportedFormat(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    Mp4,
    Avi,
    Mov,
    Mkv,
    Webm,
}

impl VideoFormat {
    pub const ALL: [VideoFormat; 5] = [
        VideoFormat::Mp4,
        VideoFormat::Avi,
        VideoFormat::Mov,
        VideoFormat::Mkv,
        VideoFormat::Webm,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Avi => "avi",
            VideoFormat::Mov => "mov",
            VideoFormat::Mkv => "mkv",
            VideoFormat::Webm => "webm",
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for VideoFormat {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().trim_start_matches('.').to_ascii_lowercase();
        VideoFormat::ALL
            .into_iter()
            .find(|f| f.extension() == key)
            .ok_or_else(|| ToolError::UnsupportedFormat(s.to_string()))
    }
}

/// What an encoded image is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UseCase {
    Thumbnail,
    #[default]
    Web,
    Archive,
}

impl UseCase {
    pub const ALL: [UseCase; 3] = [UseCase::Thumbnail, UseCase::Web, UseCase::Archive];

    pub fn name(self) -> &'static str {
        match self {
            UseCase::Thumbnail => "thumbnail",
            UseCase::Web => "web",
            UseCase::Archive => "archive",
        }
    }
}

impl FromStr for UseCase {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        UseCase::ALL
            .into_iter()
            .find(|u| u.name() == key)
            .ok_or_else(|| ToolError::validation("use case", format!("unknown use case '{}'", s)))
    }
}

/// Suggested encoder quality for `format` when producing `use_case` output.
pub fn recommended_quality(format: ImageFormat, use_case: UseCase) -> u8 {
    if format.is_lossless() {
        return LOSSLESS_QUALITY;
    }
    match (use_case, format) {
        (UseCase::Thumbnail, ImageFormat::Jpeg) => 60,
        (UseCase::Thumbnail, ImageFormat::Webp) => 55,
        (UseCase::Web, ImageFormat::Jpeg) => 85,
        (UseCase::Web, ImageFormat::Webp) => 80,
        (UseCase::Archive, ImageFormat::Jpeg) => 95,
        (UseCase::Archive, ImageFormat::Webp) => 90,
        _ => DEFAULT_QUALITY_FALLBACK,
    }
}

/// Format inferred from a file name's extension.
pub fn format_from_filename(path: &Path) -> Result<ImageFormat> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    ImageFormat::from_extension(ext)
        .ok_or_else(|| {
            ToolError::UnsupportedFormat(format!("unsupported file extension: .{}", ext))
        })
}

pub fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| allowed.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Consequences of re-encoding from one format to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionAdvice {
    pub should_convert: bool,
    pub will_lose_transparency: bool,
    pub will_lose_quality: bool,
    pub recommended: bool,
    pub warnings: Vec<String>,
}

pub fn conversion_advice(
    source: ImageFormat,
    target: ImageFormat,
    has_transparency: bool,
) -> ConversionAdvice {
    let mut advice = ConversionAdvice {
        should_convert: source != target,
        will_lose_transparency: false,
        will_lose_quality: false,
        recommended: true,
        warnings: Vec::new(),
    };
    if source == target {
        return advice;
    }

    if has_transparency && source.supports_transparency() && !target.supports_transparency() {
        advice.will_lose_transparency = true;
        advice
            .warnings
            .push(format!("Converting from {} to {} will lose transparency", source, target));
    }

    if source.is_lossless() && target.is_lossy() {
        advice.will_lose_quality = true;
        advice.warnings.push(format!(
            "Converting from lossless {} to lossy {} will degrade quality",
            source, target
        ));
    }

    if target == ImageFormat::Jpeg && has_transparency {
        advice.recommended = false;
        advice.warnings.push(
            "JPEG does not support transparency. Consider using PNG or WEBP instead.".to_string(),
        );
    }

    advice
}

/// Best web output format for an input with the given properties.
pub fn optimal_output_format(
    input: ImageFormat,
    has_transparency: bool,
    prefer_modern: bool,
) -> ImageFormat {
    if has_transparency {
        return if prefer_modern { ImageFormat::Webp } else { ImageFormat::Png };
    }
    if input.supports_animation() {
        return if prefer_modern { ImageFormat::Webp } else { input };
    }
    if prefer_modern {
        ImageFormat::Webp
    } else {
        ImageFormat::Jpeg
    }
}

/// Everything known about one image format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatInfo {
    pub name: &'static str,
    pub extension: &'static str,
    pub is_lossy: bool,
    pub is_lossless: bool,
    pub supports_transparency: bool,
    pub supports_animation: bool,
    pub quality_thumbnail: u8,
    pub quality_web: u8,
    pub quality_archive: u8,
}

impl FormatInfo {
    pub fn of(format: ImageFormat) -> Self {
        Self {
            name: format.name(),
            extension: format.extension(),
            is_lossy: format.is_lossy(),
            is_lossless: format.is_lossless(),
            supports_transparency: format.supports_transparency(),
            supports_animation: format.supports_animation(),
            quality_thumbnail: recommended_quality(format, UseCase::Thumbnail),
            quality_web: recommended_quality(format, UseCase::Web),
            quality_archive: recommended_quality(format, UseCase::Archive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension_is_case_insensitive() {
        assert_eq!(format_from_filename(Path::new("photo.jpg")).unwrap(), ImageFormat::Jpeg);
        assert_eq!(format_from_filename(Path::new("photo.jpeg")).unwrap(), ImageFormat::Jpeg);
        assert_eq!(format_from_filename(Path::new("PHOTO.JPG")).unwrap(), ImageFormat::Jpeg);
        assert_eq!(
            format_from_filename(Path::new("/path/to/Image.PNG")).unwrap(),
            ImageFormat::Png
        );
        assert_eq!(format_from_filename(Path::new("graphic.webp")).unwrap(), ImageFormat::Webp);
        let err = format_from_filename(Path::new("notes.txt")).unwrap_err();
        assert!(err.to_string().to_lowercase().contains("unsupported"));
    }

    #[test]
    fn extensions_for_names() {
        assert_eq!("jpeg".parse::<ImageFormat>().unwrap().extension(), ".jpg");
        assert_eq!("PNG".parse::<ImageFormat>().unwrap().extension(), ".png");
        assert_eq!("WEBP".parse::<ImageFormat>().unwrap().extension(), ".webp");
        assert!("PSD".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn media_detection() {
        assert!(is_image_file(Path::new("animation.gif")));
        assert!(is_image_file(Path::new("scan.TIF")));
        assert!(!is_image_file(Path::new("video.mp4")));
        assert!(is_video_file(Path::new("clip.MKV")));
        assert!(!is_video_file(Path::new("document.pdf")));
        assert!(!is_image_file(Path::new("no_extension")));
    }

    #[test]
    fn categories() {
        assert!(ImageFormat::Jpeg.is_lossy() && ImageFormat::Webp.is_lossy());
        assert!(ImageFormat::Png.is_lossless());
        assert!(ImageFormat::Bmp.is_lossless());
        assert!(ImageFormat::Tiff.is_lossless());
        assert!(!ImageFormat::Jpeg.supports_transparency());
        assert!(ImageFormat::Gif.supports_animation() && !ImageFormat::Png.supports_animation());
    }

    #[test]
    fn quality_recommendations() {
        assert_eq!(recommended_quality(ImageFormat::Jpeg, UseCase::Web), 85);
        assert_eq!(recommended_quality(ImageFormat::Jpeg, UseCase::Thumbnail), 60);
        assert_eq!(recommended_quality(ImageFormat::Jpeg, UseCase::Archive), 95);
        assert_eq!(recommended_quality(ImageFormat::Png, UseCase::Web), LOSSLESS_QUALITY);
        assert_eq!(recommended_quality(ImageFormat::Bmp, UseCase::Thumbnail), LOSSLESS_QUALITY);
        assert_eq!(
            recommended_quality(ImageFormat::Webp, UseCase::default()),
            recommended_quality(ImageFormat::Webp, UseCase::Web)
        );
    }

    #[test]
    fn conversion_warnings() {
        let same = conversion_advice(ImageFormat::Png, ImageFormat::Png, true);
        assert!(!same.should_convert && same.warnings.is_empty());

        let png_to_jpeg = conversion_advice(ImageFormat::Png, ImageFormat::Jpeg, true);
        assert!(png_to_jpeg.should_convert);
        assert!(png_to_jpeg.will_lose_transparency);
        assert!(png_to_jpeg.will_lose_quality);
        assert!(!png_to_jpeg.recommended);
        assert_eq!(png_to_jpeg.warnings.len(), 3);

        let png_to_webp = conversion_advice(ImageFormat::Png, ImageFormat::Webp, true);
        assert!(!png_to_webp.will_lose_transparency);

        let png_to_bmp = conversion_advice(ImageFormat::Png, ImageFormat::Bmp, false);
        assert!(!png_to_bmp.will_lose_quality);
    }

    #[test]
    fn optimal_formats() {
        assert_eq!(optimal_output_format(ImageFormat::Png, true, true), ImageFormat::Webp);
        assert_eq!(optimal_output_format(ImageFormat::Png, true, false), ImageFormat::Png);
        assert_eq!(optimal_output_format(ImageFormat::Gif, false, true), ImageFormat::Webp);
        assert_eq!(optimal_output_format(ImageFormat::Gif, false, false), ImageFormat::Gif);
        assert_eq!(optimal_output_format(ImageFormat::Jpeg, false, false), ImageFormat::Jpeg);
    }

    #[test]
    fn info_for_jpeg() {
        let info = FormatInfo::of(ImageFormat::Jpeg);
        assert_eq!(info.name, "JPEG");
        assert_eq!(info.extension, ".jpg");
        assert!(info.is_lossy && !info.is_lossless);
        assert!(!info.supports_transparency && !info.supports_animation);
        assert_eq!(info.quality_web, 85);
    }
}
