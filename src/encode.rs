//! Image encoding with explicit format and quality.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, Rgb, RgbImage};
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::error::{Result, ToolError};
use crate::formats::{format_from_filename, ImageFormat};

/// JPEG quality used when saving without an explicit quality.
pub const DEFAULT_SAVE_QUALITY: u8 = 95;

pub fn validate_quality(quality: u8) -> Result<u8> {
    if (1..=100).contains(&quality) {
        Ok(quality)
    } else {
        Err(ToolError::validation("quality", "must be between 1 and 100"))
    }
}

/// Slowest and smallest libwebp compression method.
const WEBP_METHOD: i32 = 6;

/// Encode `image` as `format`. `quality` applies to JPEG and WEBP; PNG always
/// uses the best compression.
pub fn encode(image: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let op = format!("Encoding {}", format);
    match format {
        ImageFormat::Jpeg => {
            let quality = validate_quality(quality)?;
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| ToolError::processing(&op, e))?;
        }
        ImageFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive);
            image
                .write_with_encoder(encoder)
                .map_err(|e| ToolError::processing(&op, e))?;
        }
        ImageFormat::Webp => {
            let quality = validate_quality(quality)?;
            buf = encode_webp(image, quality).map_err(|reason| ToolError::processing(&op, reason))?;
        }
        ImageFormat::Gif | ImageFormat::Bmp | ImageFormat::Tiff => {
            let converted = if image.color().has_alpha() {
                DynamicImage::ImageRgba8(image.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(image.to_rgb8())
            };
            converted
                .write_to(&mut Cursor::new(&mut buf), format.to_image_format())
                .map_err(|e| ToolError::processing(&op, e))?;
        }
    }
    Ok(buf)
}

/// Lossy WEBP through libwebp, keeping alpha when the image has it.
fn encode_webp(image: &DynamicImage, quality: u8) -> std::result::Result<Vec<u8>, String> {
    let mut config =
        webp::WebPConfig::new().map_err(|_| "libwebp rejected its default config".to_string())?;
    config.lossless = 0;
    config.quality = quality as f32;
    config.method = WEBP_METHOD;

    let encoded = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
            .encode_advanced(&config)
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height()).encode_advanced(&config)
    };
    encoded.map(|memory| memory.to_vec()).map_err(|e| format!("{:?}", e))
}

/// Encode `image` in the format named by `path`'s extension and write it.
/// Returns the number of bytes written.
pub fn save(image: &DynamicImage, path: &Path, quality: u8) -> Result<u64> {
    let format = format_from_filename(path)?;
    let bytes = encode(image, format, quality)?;
    fs::write(path, &bytes)?;
    tracing::debug!(
        path = %path.display(),
        format = %format,
        bytes = bytes.len(),
        "saved image"
    );
    Ok(bytes.len() as u64)
}

/// Decode `path` into RGB8, mapping failures into the error taxonomy.
pub fn open_rgb(path: &Path) -> Result<RgbImage> {
    if !path.exists() {
        return Err(ToolError::FileNotFound(path.to_path_buf()));
    }
    let image = image::open(path).map_err(|e| ToolError::from_image(path, e))?;
    Ok(image.to_rgb8())
}

/// Flatten any alpha onto a solid `background`.
pub fn composite_onto(image: &DynamicImage, background: Rgb<u8>) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let a = p[3] as u32;
        let mix = |c: u8, bg: u8| ((c as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8;
        Rgb([
            mix(p[0], background[0]),
            mix(p[1], background[1]),
            mix(p[2], background[2]),
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(32, 16, |x, y| {
            Rgb([(x * 8) as u8, (y * 16) as u8, 90])
        }))
    }

    #[test]
    fn jpeg_starts_with_soi_marker() {
        let bytes = encode(&gradient(), ImageFormat::Jpeg, 75).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn lower_quality_is_smaller() {
        let img = gradient();
        let low = encode(&img, ImageFormat::Jpeg, 10).unwrap();
        let high = encode(&img, ImageFormat::Jpeg, 100).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn webp_quality_changes_size() {
        let noisy = DynamicImage::ImageRgb8(RgbImage::from_fn(128, 128, |x, y| {
            let v = (x * 7919 + y * 104_729) % 251;
            Rgb([v as u8, (v * 3 % 256) as u8, (x * 2) as u8])
        }));
        let low = encode(&noisy, ImageFormat::Webp, 10).unwrap();
        let high = encode(&noisy, ImageFormat::Webp, 100).unwrap();
        assert_eq!(&low[..4], b"RIFF");
        assert_eq!(&low[8..12], b"WEBP");
        assert!(low.len() < high.len(), "{} vs {}", low.len(), high.len());
        assert!(encode(&noisy, ImageFormat::Webp, 0).is_err());
    }

    #[test]
    fn webp_keeps_alpha() {
        let mut rgba = image::RgbaImage::from_pixel(16, 16, Rgba([200, 10, 10, 255]));
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let bytes = encode(&DynamicImage::ImageRgba8(rgba), ImageFormat::Webp, 90).unwrap();
        let back = image::load_from_memory(&bytes).unwrap();
        assert!(back.color().has_alpha());
        assert_eq!(back.to_rgba8().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn quality_out_of_range_is_rejected() {
        assert!(matches!(
            encode(&gradient(), ImageFormat::Jpeg, 0),
            Err(ToolError::ValidationFailure { .. })
        ));
        assert!(validate_quality(101).is_err());
        assert_eq!(validate_quality(1).unwrap(), 1);
    }

    #[test]
    fn save_uses_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "a.jpg", "a.bmp", "a.webp", "a.gif", "a.tiff"] {
            let path = dir.path().join(name);
            save(&gradient(), &path, DEFAULT_SAVE_QUALITY).unwrap();
            let back = image::open(&path).unwrap();
            assert_eq!((back.width(), back.height()), (32, 16), "{}", name);
        }
        assert!(save(&gradient(), &dir.path().join("a.xyz"), 90).is_err());
    }

    #[test]
    fn png_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exact.png");
        let img = gradient();
        save(&img, &path, 90).unwrap();
        assert_eq!(open_rgb(&path).unwrap(), img.to_rgb8());
    }

    #[test]
    fn open_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            open_rgb(&dir.path().join("missing.png")),
            Err(ToolError::FileNotFound(_))
        ));
        let corrupt = dir.path().join("corrupt.png");
        fs::write(&corrupt, b"definitely not a png").unwrap();
        assert!(matches!(open_rgb(&corrupt), Err(ToolError::UnsupportedFormat(_))));
    }

    #[test]
    fn composite_blends_alpha_onto_background() {
        let mut rgba = image::RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let out = composite_onto(&DynamicImage::ImageRgba8(rgba), Rgb([255, 255, 255]));
        assert_eq!(*out.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*out.get_pixel(1, 0), Rgb([0, 0, 0]));
    }
}
