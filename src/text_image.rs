//! Render each line of a text file into its own centered image.

use ab_glyph::{point, Font, FontVec, OutlinedGlyph, PxScale, Rect, ScaleFont};
use image::{DynamicImage, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

use crate::encode;
use crate::error::{Result, ToolError};
use crate::formats::ImageFormat;
use crate::geometry::Size;
use crate::media::ensure_output_folder;
use crate::report::{self, BatchReport, Reporter};

/// Longest sanitized line kept in an output file name.
pub const MAX_FILENAME_CHARS: usize = 50;

/// Fonts tried, in order, when no font file is given.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/Helvetica.ttc",
    "/System/Library/Fonts/SFNSDisplay.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
];

#[derive(Debug, Clone, PartialEq)]
pub struct TextImageOptions {
    pub size: Size,
    pub font_size: f32,
    pub padding: u32,
    pub text_color: Rgb<u8>,
    pub background: Rgb<u8>,
    pub format: ImageFormat,
    pub font_path: Option<PathBuf>,
}

impl Default for TextImageOptions {
    fn default() -> Self {
        Self {
            size: Size::new(1080, 1080),
            font_size: 48.0,
            padding: 20,
            text_color: Rgb([255, 255, 255]),
            background: Rgb([0, 0, 0]),
            format: ImageFormat::Png,
            font_path: None,
        }
    }
}

impl TextImageOptions {
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_colors(mut self, text: Rgb<u8>, background: Rgb<u8>) -> Self {
        self.text_color = text;
        self.background = background;
        self
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_font_path(mut self, path: Option<PathBuf>) -> Self {
        self.font_path = path;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.size.validate("size")?;
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(ToolError::validation("font size", "must be positive"));
        }
        if !matches!(self.format, ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Webp) {
            return Err(ToolError::UnsupportedFormat(format!(
                "{} output is not supported for text images",
                self.format
            )));
        }
        Ok(())
    }
}

/// DejaVu Sans, compiled in for machines without any candidate font.
pub const BUNDLED_FONT: &[u8] = include_bytes!("../resources/DejaVuSans.ttf");

/// First of `candidates` that exists on this machine.
pub fn find_font_in(candidates: &[&str]) -> Option<PathBuf> {
    candidates.iter().map(PathBuf::from).find(|p| p.is_file())
}

pub fn bundled_font() -> Result<FontVec> {
    FontVec::try_from_vec(BUNDLED_FONT.to_vec())
        .map_err(|e| ToolError::processing("Loading bundled font", e))
}

/// Load `path`, or the first available system font when `None`.
pub fn load_font(path: Option<&Path>) -> Result<FontVec> {
    load_font_from(path, SYSTEM_FONT_CANDIDATES)
}

/// Load `path`, or the first of `candidates` that exists, or the bundled
/// font when none do.
pub fn load_font_from(path: Option<&Path>, candidates: &[&str]) -> Result<FontVec> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match find_font_in(candidates) {
            Some(found) => found,
            None => {
                tracing::debug!("no system font found, using bundled DejaVu Sans");
                return bundled_font();
            }
        },
    };
    if !path.exists() {
        return Err(ToolError::FileNotFound(path));
    }
    let bytes = fs::read(&path)?;
    tracing::debug!(font = %path.display(), "loading font");
    FontVec::try_from_vec(bytes)
        .map_err(|e| ToolError::UnsupportedFormat(format!("{}: {}", path.display(), e)))
}

/// Lay out `text` on one line with its baseline at `ascent`, returning the
/// outlines of every visible glyph.
fn layout(font: &FontVec, font_size: f32, text: &str) -> Vec<OutlinedGlyph> {
    let scale = PxScale::from(font_size);
    let scaled = font.as_scaled(scale);
    let mut caret = 0.0f32;
    let mut previous = None;
    let mut outlines = Vec::new();

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
        caret += scaled.h_advance(id);
        previous = Some(id);
        if let Some(outline) = font.outline_glyph(glyph) {
            outlines.push(outline);
        }
    }
    outlines
}

fn union_bounds(glyphs: &[OutlinedGlyph]) -> Option<Rect> {
    glyphs.iter().map(|g| g.px_bounds()).reduce(|a, b| Rect {
        min: point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
        max: point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
    })
}

/// Width and height of the ink of `text`, 0x0 for whitespace.
pub fn measure_text(font: &FontVec, font_size: f32, text: &str) -> (u32, u32) {
    match union_bounds(&layout(font, font_size, text)) {
        Some(r) => (r.width().ceil() as u32, r.height().ceil() as u32),
        None => (0, 0),
    }
}

/// Draw `text` centered by its ink bounding box. The flag is false when the
/// text box exceeds the padded area.
pub fn render_text(font: &FontVec, text: &str, options: &TextImageOptions) -> (RgbImage, bool) {
    let (w, h) = (options.size.width, options.size.height);
    let mut canvas = RgbImage::from_pixel(w, h, options.background);
    let glyphs = layout(font, options.font_size, text);
    let Some(bounds) = union_bounds(&glyphs) else {
        return (canvas, true);
    };

    let max_w = w.saturating_sub(2 * options.padding) as f32;
    let max_h = h.saturating_sub(2 * options.padding) as f32;
    let fits = bounds.width() <= max_w && bounds.height() <= max_h;

    let dx = ((w as f32 - bounds.width()) / 2.0).floor() - bounds.min.x;
    let dy = ((h as f32 - bounds.height()) / 2.0).floor() - bounds.min.y;
    let color = options.text_color;

    for glyph in &glyphs {
        let gb = glyph.px_bounds();
        let ox = (gb.min.x + dx) as i64;
        let oy = (gb.min.y + dy) as i64;
        glyph.draw(|gx, gy, coverage| {
            let px = ox + gx as i64;
            let py = oy + gy as i64;
            if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
                return;
            }
            let a = coverage.clamp(0.0, 1.0);
            if a <= 0.0 {
                return;
            }
            let dst = canvas.get_pixel_mut(px as u32, py as u32);
            for c in 0..3 {
                let blended = color[c] as f32 * a + dst[c] as f32 * (1.0 - a);
                dst[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        });
    }
    (canvas, fits)
}

/// Replace characters unsafe in file names with `_` and cut to
/// [`MAX_FILENAME_CHARS`]. The flag reports whether the text was cut.
pub fn sanitize_filename(line: &str) -> (String, bool) {
    let safe: String = line
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let truncated = safe.chars().count() > MAX_FILENAME_CHARS;
    (safe.chars().take(MAX_FILENAME_CHARS).collect(), truncated)
}

/// `line_{idx:03}_{safe}{ext}`.
pub fn output_file_name(idx: usize, safe: &str, format: ImageFormat) -> String {
    format!("line_{:03}_{}{}", idx, safe, format.extension())
}

/// Non-blank lines of `path`, trimmed.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ToolError::FileNotFound(path.to_path_buf()),
        _ => ToolError::Io(e),
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn preview(text: &str) -> String {
    text.chars().take(30).collect()
}

/// Render every line of `input` into `output_folder`. A missing input file or
/// a file with no text produces an empty report.
pub fn process_text_file(
    input: &Path,
    output_folder: &Path,
    options: &TextImageOptions,
    reporter: &dyn Reporter,
) -> Result<BatchReport> {
    options.validate()?;
    let mut batch = BatchReport::new();
    if !input.is_file() {
        reporter.error(&format!("File '{}' does not exist", input.display()));
        return Ok(batch);
    }
    ensure_output_folder(output_folder, reporter)?;
    let font = load_font(options.font_path.as_deref())?;

    let lines = match read_lines(input) {
        Ok(lines) => lines,
        Err(e) => {
            reporter.error(&format!("Failed to read file {}: {}", input.display(), e));
            return Ok(batch);
        }
    };
    if lines.is_empty() {
        reporter.warning(&format!("No text found in {}", input.display()));
        return Ok(batch);
    }

    report::batch_started(reporter, lines.len(), "lines");
    for (i, line) in lines.iter().enumerate() {
        let idx = i + 1;
        reporter.info(&format!("Creating image {}/{}", idx, lines.len()));

        let (image, fits) = render_text(&font, line, options);
        if !fits {
            reporter.warning(&format!(
                "Text '{}...' may not fit properly in {} image",
                preview(line),
                options.size
            ));
        }

        let (safe, truncated) = sanitize_filename(line);
        if truncated {
            reporter.warning(&format!(
                "Line {} text too long for filename ('{}...'), will be cropped to {} characters",
                idx,
                preview(line),
                MAX_FILENAME_CHARS
            ));
        }

        let output = output_folder.join(output_file_name(idx, &safe, options.format));
        let rendered = DynamicImage::ImageRgb8(image);
        let result = encode::save(&rendered, &output, encode::DEFAULT_SAVE_QUALITY)
            .map(|bytes| {
                reporter.success(&format!(
                    "Created: {} ({:.2} KB)",
                    report::display_name(&output),
                    bytes as f64 / 1024.0
                ));
                report::display_name(&output)
            });
        if let Err(e) = &result {
            reporter.error(&format!("Failed to save image for line {}: {}", idx, e));
        }
        batch.push(&output, result);
    }

    report::batch_completed(reporter, &batch, "images");
    reporter.info(&format!("Output saved to '{}' folder", output_folder.display()));
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("Hello, World!"), ("Hello_ World_".to_string(), false));
        assert_eq!(sanitize_filename("a/b\\c:d"), ("a_b_c_d".to_string(), false));
        assert_eq!(sanitize_filename("keep-this_one 2"), ("keep-this_one 2".to_string(), false));
    }

    #[test]
    fn sanitize_truncates_long_lines() {
        let long = "x".repeat(80);
        let (safe, truncated) = sanitize_filename(&long);
        assert!(truncated);
        assert_eq!(safe.len(), MAX_FILENAME_CHARS);
        let (exact, cut) = sanitize_filename(&"y".repeat(MAX_FILENAME_CHARS));
        assert!(!cut);
        assert_eq!(exact.len(), MAX_FILENAME_CHARS);
    }

    #[test]
    fn file_names() {
        assert_eq!(output_file_name(7, "Hi there", ImageFormat::Png), "line_007_Hi there.png");
        assert_eq!(output_file_name(123, "x", ImageFormat::Jpeg), "line_123_x.jpg");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        fs::write(&path, "  first  \n\n   \nsecond\r\n\tthird\n").unwrap();
        assert_eq!(read_lines(&path).unwrap(), vec!["first", "second", "third"]);
        assert!(matches!(
            read_lines(&dir.path().join("missing.txt")),
            Err(ToolError::FileNotFound(_))
        ));
    }

    #[test]
    fn missing_input_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let r = MemoryReporter::new();
        let out = dir.path().join("out");
        let options = TextImageOptions::default();
        let batch = process_text_file(&dir.path().join("none.txt"), &out, &options, &r).unwrap();
        assert!(batch.is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn gif_output_is_rejected() {
        let opts = TextImageOptions::default().with_format(ImageFormat::Gif);
        assert!(matches!(opts.validate(), Err(ToolError::UnsupportedFormat(_))));
    }

    #[test]
    fn rendered_text_is_centered() {
        let font = bundled_font().unwrap();
        let options = TextImageOptions::default().with_size(Size::new(400, 200));
        let (img, fits) = render_text(&font, "HI", &options);
        assert!(fits);
        assert_eq!(img.dimensions(), (400, 200));
        assert_eq!(*img.get_pixel(0, 0), Rgb([0, 0, 0]));

        let lit: Vec<(u32, u32)> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 128)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!lit.is_empty());
        let min_x = lit.iter().map(|p| p.0).min().unwrap() as i64;
        let max_x = lit.iter().map(|p| p.0).max().unwrap() as i64;
        let min_y = lit.iter().map(|p| p.1).min().unwrap() as i64;
        let max_y = lit.iter().map(|p| p.1).max().unwrap() as i64;
        assert!((min_x - (399 - max_x)).abs() <= 3);
        assert!((min_y - (199 - max_y)).abs() <= 3);
    }

    #[test]
    fn oversized_text_is_flagged() {
        let font = bundled_font().unwrap();
        let options = TextImageOptions::default().with_size(Size::new(60, 60));
        let (_, fits) = render_text(&font, "This line is far too wide", &options);
        assert!(!fits);
        let (w, h) = measure_text(&font, 48.0, "This line is far too wide");
        assert!(w > 60 && h > 0);
        assert_eq!(measure_text(&font, 48.0, "   "), (0, 0));
    }

    #[test]
    fn no_candidate_font_falls_back_to_bundled() {
        assert_eq!(find_font_in(&[]), None);
        assert_eq!(find_font_in(&["/no/such/font.ttf"]), None);
        let font = load_font_from(None, &["/no/such/font.ttf"]).unwrap();
        let (w, h) = measure_text(&font, 48.0, "Fallback");
        assert!(w > 0 && h > 0);
    }

    #[test]
    fn explicit_missing_font_is_not_found() {
        let err = load_font_from(Some(Path::new("/no/such/font.ttf")), &[]).unwrap_err();
        assert!(matches!(err, ToolError::FileNotFound(_)));
    }
}
