//! Image to C header holding a JPEG byte array, for embedding in firmware.

use image::imageops;
use image::DynamicImage;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::encode;
use crate::error::{Result, ToolError};
use crate::fit::resize_exact;
use crate::formats::ImageFormat;
use crate::geometry::Size;
use crate::report::{self, Reporter};

pub const DEFAULT_ARRAY_NAME: &str = "photoData";
pub const DEFAULT_HEADER_OUTPUT: &str = "photoData.h";
pub const DEFAULT_BYTES_PER_LINE: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CArrayOptions {
    pub size: Size,
    pub quality: u8,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub array_name: String,
    pub bytes_per_line: usize,
}

impl Default for CArrayOptions {
    fn default() -> Self {
        Self {
            size: Size::new(240, 320),
            quality: 75,
            flip_horizontal: false,
            flip_vertical: false,
            array_name: DEFAULT_ARRAY_NAME.to_string(),
            bytes_per_line: DEFAULT_BYTES_PER_LINE,
        }
    }
}

impl CArrayOptions {
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_flips(mut self, horizontal: bool, vertical: bool) -> Self {
        self.flip_horizontal = horizontal;
        self.flip_vertical = vertical;
        self
    }

    pub fn with_array_name(mut self, name: impl Into<String>) -> Self {
        self.array_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.size.validate("size")?;
        encode::validate_quality(self.quality)?;
        if self.bytes_per_line == 0 {
            return Err(ToolError::validation("bytes per line", "must be at least 1"));
        }
        if !is_c_identifier(&self.array_name) {
            return Err(ToolError::validation(
                "array name",
                format!("'{}' is not a valid C identifier", self.array_name),
            ));
        }
        Ok(())
    }
}

fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Render `data` as a commented `PROGMEM` array declaration.
pub fn render_header(
    source_name: &str,
    size: Size,
    array_name: &str,
    bytes_per_line: usize,
    data: &[u8],
) -> String {
    let per_line = bytes_per_line.max(1);
    let mut out = String::with_capacity(data.len() * 6 + 128);
    let _ = writeln!(out, "// Generated from: {}", source_name);
    let _ = writeln!(out, "// Size: {} pixels", size);
    let _ = writeln!(out, "// JPEG size: {} bytes", data.len());
    out.push('\n');
    let _ = writeln!(out, "const unsigned char {}[] PROGMEM = {{", array_name);

    let lines = data.chunks(per_line).count();
    for (i, chunk) in data.chunks(per_line).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("0x{:02X}", b)).collect();
        out.push_str("  ");
        out.push_str(&hex.join(", "));
        if i + 1 < lines {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str("};\n");
    out
}

/// Resize, flip and JPEG-encode `input`, writing a C header to `output`.
/// Returns the JPEG size in bytes.
pub fn image_to_header(
    input: &Path,
    output: &Path,
    options: &CArrayOptions,
    reporter: &dyn Reporter,
) -> Result<usize> {
    options.validate()?;
    if !input.exists() {
        return Err(ToolError::FileNotFound(input.to_path_buf()));
    }

    reporter.info(&format!("Loading image: {}", input.display()));
    let source = image::open(input).map_err(|e| ToolError::from_image(input, e))?;
    if source.color() != image::ColorType::Rgb8 {
        reporter.info(&format!("Converting from {:?} to RGB", source.color()));
    }
    reporter.info(&format!("Original size: {}x{}", source.width(), source.height()));
    reporter.info(&format!("Resizing to: {}", options.size));
    let mut img = resize_exact(source.to_rgb8(), options.size);

    if options.flip_horizontal {
        reporter.info("Flipping horizontally");
        imageops::flip_horizontal_in_place(&mut img);
    }
    if options.flip_vertical {
        reporter.info("Flipping vertically");
        imageops::flip_vertical_in_place(&mut img);
    }

    reporter.info(&format!("Encoding JPEG (quality={})", options.quality));
    let jpeg = encode::encode(&DynamicImage::ImageRgb8(img), ImageFormat::Jpeg, options.quality)?;
    reporter.info(&format!(
        "JPEG size: {} bytes ({:.2} KB)",
        jpeg.len(),
        jpeg.len() as f64 / 1024.0
    ));

    let header = render_header(
        &report::display_name(input),
        options.size,
        &options.array_name,
        options.bytes_per_line,
        &jpeg,
    );
    fs::write(output, header)?;

    reporter.success(&format!("Generated {}", output.display()));
    reporter.info(&format!(
        "Include this file in your sketch with: #include \"{}\"",
        report::display_name(output)
    ));
    Ok(jpeg.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SilentReporter;
    use image::{Rgb, RgbImage};

    #[test]
    fn thirteen_bytes_make_two_lines() {
        let data: Vec<u8> = (0..13).collect();
        let text = render_header("a.png", Size::new(2, 2), "photoData", 12, &data);
        let expected = "// Generated from: a.png\n\
                        // Size: 2x2 pixels\n\
                        // JPEG size: 13 bytes\n\
                        \n\
                        const unsigned char photoData[] PROGMEM = {\n  \
                        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,\n  \
                        0x0C\n\
                        };\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn exact_multiple_has_no_trailing_comma() {
        let data = [0xFFu8; 24];
        let text = render_header("x", Size::new(1, 1), "img", 12, &data);
        let body: Vec<&str> = text.lines().filter(|l| l.starts_with("  ")).collect();
        assert_eq!(body.len(), 2);
        assert!(body[0].ends_with(','));
        assert!(!body[1].ends_with(','));
    }

    #[test]
    fn header_from_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        RgbImage::from_fn(64, 64, |x, y| Rgb([x as u8 * 4, y as u8 * 4, 128]))
            .save(&input)
            .unwrap();
        let output = dir.path().join("photoData.h");

        let options = CArrayOptions::default().with_size(Size::new(24, 32)).with_flips(true, true);
        let jpeg_len = image_to_header(&input, &output, &options, &SilentReporter).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("// Generated from: photo.png\n// Size: 24x32 pixels\n"));
        assert!(text.contains(&format!("// JPEG size: {} bytes", jpeg_len)));
        assert!(text.contains("const unsigned char photoData[] PROGMEM = {\n  0xFF, 0xD8,"));
        assert!(text.ends_with("};\n"));
    }

    #[test]
    fn missing_input_and_bad_options() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("o.h");
        let err = image_to_header(
            &dir.path().join("none.png"),
            &out,
            &CArrayOptions::default(),
            &SilentReporter,
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::FileNotFound(_)));

        assert!(CArrayOptions::default().with_quality(0).validate().is_err());
        assert!(CArrayOptions::default().with_array_name("1bad").validate().is_err());
        assert!(CArrayOptions::default().with_array_name("img_2").validate().is_ok());
    }
}
