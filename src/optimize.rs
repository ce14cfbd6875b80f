//! Web optimization: bounded resize and re-encode with a size report.

use image::{DynamicImage, Rgb};
use std::path::{Path, PathBuf};

use crate::encode;
use crate::error::{Result, ToolError};
use crate::fit::RESAMPLE_FILTER;
use crate::formats::{format_from_filename, ImageFormat};
use crate::geometry::Size;
use crate::media::{ensure_output_folder, scan_folder, MediaKind};
use crate::report::{self, BatchReport, Reporter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeOptions {
    pub max_size: Size,
    pub quality: u8,
    /// Output format; `None` keeps the input's format.
    pub format: Option<ImageFormat>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            max_size: Size::new(1920, 1080),
            quality: 85,
            format: None,
        }
    }
}

impl OptimizeOptions {
    pub fn with_max_size(mut self, max_size: Size) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_format(mut self, format: Option<ImageFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.max_size.validate("max size")?;
        encode::validate_quality(self.quality)?;
        Ok(())
    }

    /// `{stem}_optimized{ext}` next to `input`, using the output format's extension when set.
    pub fn default_output(&self, input: &Path) -> PathBuf {
        let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let ext = match self.format {
            Some(f) => f.extension().to_string(),
            None => input
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
        };
        input.with_file_name(format!("{}_optimized{}", stem, ext))
    }
}

/// Largest size within `max` that keeps the aspect of `source`; `source`
/// itself when it already fits.
pub fn bounded_size(source: Size, max: Size) -> Size {
    if source.width <= max.width && source.height <= max.height {
        return source;
    }
    let (sw, sh) = (source.width as u64, source.height as u64);
    let (mw, mh) = (max.width as u64, max.height as u64);
    if sw * mh > sh * mw {
        Size::new(max.width, ((sh * mw / sw) as u32).max(1))
    } else {
        Size::new(((sw * mh / sh) as u32).max(1), max.height)
    }
}

/// Result of one optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOutcome {
    pub output: PathBuf,
    pub original_kb: f64,
    pub optimized_kb: f64,
}

impl OptimizeOutcome {
    pub fn reduction_percent(&self) -> f64 {
        if self.original_kb > 0.0 {
            (self.original_kb - self.optimized_kb) / self.original_kb * 100.0
        } else {
            0.0
        }
    }
}

/// Optimize `input`, writing to `output` or the default `_optimized` path.
pub fn optimize_image(
    input: &Path,
    output: Option<&Path>,
    options: &OptimizeOptions,
    reporter: &dyn Reporter,
) -> Result<OptimizeOutcome> {
    options.validate()?;
    if !input.exists() {
        return Err(ToolError::FileNotFound(input.to_path_buf()));
    }
    let output = output.map(Path::to_path_buf).unwrap_or_else(|| options.default_output(input));
    let format = match options.format {
        Some(f) => f,
        None => format_from_filename(&output)?,
    };

    let mut img = image::open(input).map_err(|e| ToolError::from_image(input, e))?;
    if format == ImageFormat::Jpeg && img.color().has_alpha() {
        img = DynamicImage::ImageRgb8(encode::composite_onto(&img, Rgb([255, 255, 255])));
    }

    let source = Size::new(img.width(), img.height());
    let target = bounded_size(source, options.max_size);
    if target != source {
        img = img.resize_exact(target.width, target.height, RESAMPLE_FILTER);
        reporter.info(&format!("Resized to {}", target));
    }

    let bytes = encode::encode(&img, format, options.quality)?;
    std::fs::write(&output, &bytes)?;

    let outcome = OptimizeOutcome {
        original_kb: report::size_kb(input),
        optimized_kb: bytes.len() as f64 / 1024.0,
        output,
    };
    reporter.info(&format!("Original: {:.2} KB", outcome.original_kb));
    reporter.info(&format!("Optimized: {:.2} KB", outcome.optimized_kb));
    reporter.info(&format!("Reduction: {:.1}%", outcome.reduction_percent()));
    Ok(outcome)
}

/// Optimize every image in `input_dir`. With `output_dir` the results keep
/// their names there; otherwise they land next to the inputs.
pub fn optimize_directory(
    input_dir: &Path,
    output_dir: Option<&Path>,
    options: &OptimizeOptions,
    reporter: &dyn Reporter,
) -> Result<BatchReport> {
    options.validate()?;
    if let Some(dir) = output_dir {
        ensure_output_folder(dir, reporter)?;
    }
    let mut batch = BatchReport::new();
    let images: Vec<PathBuf> = scan_folder(input_dir, MediaKind::Images)?
        .into_iter()
        .filter(|p| {
            !p.file_stem()
                .map(|s| s.to_string_lossy().ends_with("_optimized"))
                .unwrap_or(false)
        })
        .collect();
    if images.is_empty() {
        reporter.warning(&format!("No images found in {}", input_dir.display()));
        return Ok(batch);
    }

    report::batch_started(reporter, images.len(), "images");
    for image in &images {
        reporter.info(&format!("Processing {}...", report::display_name(image)));
        let out = output_dir.and_then(|d| {
            let name = image.file_name()?;
            let mut path = d.join(name);
            if let Some(f) = options.format {
                path.set_extension(f.extension().trim_start_matches('.'));
            }
            Some(path)
        });
        let result = optimize_image(image, out.as_deref(), options, reporter).map(|o| {
            report::file_processed(reporter, &o.output, o.original_kb, o.optimized_kb);
            format!("{:.1}% reduction", o.reduction_percent())
        });
        if let Err(e) = &result {
            reporter.error(&format!("Error processing {}: {}", report::display_name(image), e));
        }
        batch.push(image, result);
    }
    report::batch_completed(reporter, &batch, "images");
    Ok(batch)
}
