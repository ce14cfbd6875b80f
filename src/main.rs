use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, FuzzySelect, Input, Select};
use image::Rgb;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mediakit::c_array::{self, CArrayOptions};
use mediakit::choices::{self, DurationAction};
use mediakit::duration::{self, DurationOptions};
use mediakit::formats::{self, FormatInfo};
use mediakit::media::{self, MediaKind};
use mediakit::optimize::{self, OptimizeOptions};
use mediakit::report::{self, ConsoleReporter, Reporter};
use mediakit::text_image::{self, TextImageOptions};
use mediakit::to_video::{self, ToVideoOptions};
use mediakit::{
    aspect, Anchor, BatchReport, FitMode, FitOptions, ImageFormat, Settings, Size, ToolError,
    VideoFormat,
};

#[derive(Parser, Debug)]
#[command(version, about = "Batch image and video utilities.")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// Settings file (JSON or TOML) overriding the discovered one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Never prompt; use configured defaults for anything not given as a flag
    #[arg(long, global = true, default_value_t = false)]
    defaults: bool,

    /// Log diagnostic detail to stderr
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Change the aspect ratio of images and videos
    Aspect(AspectArgs),
    /// Report video durations, or trim/loop videos to a target duration
    Duration(DurationArgs),
    /// Convert an image into a C header holding a JPEG byte array
    CArray(CArrayArgs),
    /// Turn still images into short video clips
    ToVideo(ToVideoArgs),
    /// Render each line of a text file into its own image
    Text(TextArgs),
    /// Shrink and re-encode images for the web
    Optimize(OptimizeArgs),
    /// Show image format facts and conversion advice
    Formats(FormatsArgs),
}

#[derive(Args, Debug)]
struct AspectArgs {
    /// Input file or folder
    input: Option<PathBuf>,
    /// Output file or folder
    output: Option<PathBuf>,
    /// Target size, e.g. 1920x1080
    #[arg(long)]
    size: Option<Size>,
    /// letterbox or crop
    #[arg(long)]
    mode: Option<FitMode>,
    /// Crop anchor, e.g. center or upper_left
    #[arg(long)]
    anchor: Option<Anchor>,
    /// Letterbox color as r,g,b
    #[arg(long)]
    color: Option<String>,
    /// images, videos or both (folder input only)
    #[arg(long)]
    media: Option<MediaKind>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ActionArg {
    Mapping,
    Adjust,
    Both,
}

impl From<ActionArg> for DurationAction {
    fn from(a: ActionArg) -> Self {
        match a {
            ActionArg::Mapping => DurationAction::Mapping,
            ActionArg::Adjust => DurationAction::Adjust,
            ActionArg::Both => DurationAction::Both,
        }
    }
}

#[derive(Args, Debug)]
struct DurationArgs {
    #[arg(long, value_enum)]
    action: Option<ActionArg>,
    /// Folder of videos
    #[arg(long)]
    input: Option<PathBuf>,
    /// Folder for adjusted videos
    #[arg(long)]
    output: Option<PathBuf>,
    /// Where the duration mapping is written
    #[arg(long)]
    mapping_file: Option<PathBuf>,
    /// Target duration in seconds
    #[arg(long)]
    target: Option<f64>,
    /// Fade in/out length in seconds; enables fades
    #[arg(long, conflicts_with = "no_fade")]
    fade: Option<f64>,
    /// Disable fades
    #[arg(long, default_value_t = false)]
    no_fade: bool,
}

#[derive(Args, Debug)]
struct CArrayArgs {
    /// Input image
    input: Option<PathBuf>,
    /// Output header file
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Output image size, e.g. 240x320
    #[arg(long)]
    size: Option<Size>,
    /// JPEG quality (1-100)
    #[arg(long)]
    quality: Option<u8>,
    /// Mirror left to right
    #[arg(long, default_value_t = false)]
    flip_h: bool,
    /// Mirror top to bottom
    #[arg(long, default_value_t = false)]
    flip_v: bool,
    /// C array identifier
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
struct ToVideoArgs {
    /// Image file or folder of images
    input: Option<PathBuf>,
    /// Folder for the clips
    #[arg(long, short)]
    output_dir: Option<PathBuf>,
    /// Clip length in seconds
    #[arg(long)]
    duration: Option<f64>,
    #[arg(long)]
    fps: Option<u32>,
    /// Resize frames to WIDTHxHEIGHT
    #[arg(long)]
    size: Option<Size>,
    /// Container: mp4, avi, mov, mkv or webm
    #[arg(long)]
    format: Option<VideoFormat>,
    #[arg(long)]
    codec: Option<String>,
    /// Fade-in length in seconds
    #[arg(long, default_value_t = 0.0)]
    fade_in: f64,
    /// Fade-out length in seconds
    #[arg(long, default_value_t = 0.0)]
    fade_out: f64,
}

#[derive(Args, Debug)]
struct TextArgs {
    /// Text file, one image per non-blank line
    input: Option<PathBuf>,
    /// Folder for the images
    #[arg(long, short)]
    output_dir: Option<PathBuf>,
    /// Image size, e.g. 1080x1080
    #[arg(long)]
    size: Option<Size>,
    #[arg(long)]
    font_size: Option<u32>,
    /// .ttf or .otf font file
    #[arg(long)]
    font: Option<PathBuf>,
    /// Text color as r,g,b
    #[arg(long)]
    text_color: Option<String>,
    /// Background color as r,g,b
    #[arg(long)]
    background: Option<String>,
    /// png, jpeg or webp
    #[arg(long)]
    format: Option<ImageFormat>,
}

#[derive(Args, Debug)]
struct OptimizeArgs {
    /// Image file or folder of images
    input: PathBuf,
    /// Output file (single image) or folder (folder input)
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Bounding box, e.g. 1920x1080
    #[arg(long)]
    max_size: Option<Size>,
    #[arg(long)]
    quality: Option<u8>,
    /// Re-encode to this format
    #[arg(long)]
    format: Option<ImageFormat>,
}

#[derive(Args, Debug)]
struct FormatsArgs {
    /// Only this format
    format: Option<ImageFormat>,
    /// Show advice for converting to this format
    #[arg(long)]
    to: Option<ImageFormat>,
    /// The source image has transparency
    #[arg(long, default_value_t = false)]
    transparent: bool,
    /// Print JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

/// Interactive prompts, disabled by `--defaults`.
struct Prompter {
    enabled: bool,
    theme: ColorfulTheme,
}

impl Prompter {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            theme: ColorfulTheme::default(),
        }
    }

    /// Free text answer, possibly empty.
    fn text(&self, prompt: &str) -> Result<String> {
        Ok(Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?)
    }

    /// 1-based menu answer as text, the form `choices` resolves.
    fn menu(&self, prompt: &str, items: &[String], default: usize) -> Result<String> {
        let idx = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()?;
        Ok((idx + 1).to_string())
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    /// Folder or file path, `default` when left empty.
    fn path(&self, prompt: &str, default: &Path) -> Result<PathBuf> {
        let default = default.display().to_string();
        let raw = self.text(&format!("{} [{}]", prompt, default))?;
        Ok(PathBuf::from(choices::folder_or(&raw, &default)))
    }

    fn pick_file(&self, prompt: &str, files: &[PathBuf]) -> Result<PathBuf> {
        let items: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
        let selection = FuzzySelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(0)
            .items(&items)
            .interact()?;
        Ok(files[selection].clone())
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let (settings, from) = Settings::discover(explicit).context("loading settings")?;
    match from {
        Some(path) => tracing::debug!(path = %path.display(), "settings loaded"),
        None => tracing::debug!("using built-in settings"),
    }
    Ok(settings)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            let code = e.downcast_ref::<ToolError>().map(ToolError::exit_code).unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run(cli: Cli) -> Result<BatchReport> {
    let settings = load_settings(cli.config.as_deref())?;
    let prompter = Prompter::new(!cli.defaults);
    let reporter = ConsoleReporter::new();

    match cli.cmd {
        Command::Aspect(args) => run_aspect(args, &settings, &prompter, &reporter),
        Command::Duration(args) => run_duration(args, &settings, &prompter, &reporter),
        Command::CArray(args) => run_c_array(args, &settings, &prompter, &reporter),
        Command::ToVideo(args) => run_to_video(args, &settings, &prompter, &reporter),
        Command::Text(args) => run_text(args, &settings, &prompter, &reporter),
        Command::Optimize(args) => run_optimize(args, &settings, &reporter),
        Command::Formats(args) => run_formats(args),
    }
}

fn banner(title: &str) {
    println!("{}", "=".repeat(60));
    println!("{}", style(title).bold());
    println!("{}", "=".repeat(60));
}

fn aspect_size(p: &Prompter, reporter: &dyn Reporter, default_index: usize) -> Result<Size> {
    let answer = p.menu("Select aspect ratio", &choices::aspect_menu(), default_index)?;
    let (w, h) = if answer == choices::CUSTOM_ASPECT_CHOICE {
        (p.text("Width (px)")?, p.text("Height (px)")?)
    } else {
        (String::new(), String::new())
    };
    Ok(choices::resolve_aspect(&answer, &w, &h, default_index).report(reporter))
}

fn default_folders(settings: &Settings, kind: MediaKind) -> (PathBuf, PathBuf) {
    match kind {
        MediaKind::Videos => (
            settings.folders.videos_input.clone(),
            settings.folders.videos_output.clone(),
        ),
        _ => (
            settings.folders.images_input.clone(),
            settings.folders.images_output.clone(),
        ),
    }
}

fn parse_color(raw: &str) -> Result<Rgb<u8>> {
    choices::parse_rgb(raw).ok_or_else(|| anyhow!("invalid color '{}', expected r,g,b", raw))
}

fn run_aspect(
    args: AspectArgs,
    settings: &Settings,
    p: &Prompter,
    reporter: &ConsoleReporter,
) -> Result<BatchReport> {
    if p.enabled {
        banner("Aspect Ratio Changer");
    }
    let single_file = args.input.as_deref().is_some_and(Path::is_file);

    let kind = match args.media {
        Some(k) => k,
        None if p.enabled && !single_file => {
            let items: Vec<String> = ["Images only", "Videos only", "Both"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            choices::resolve_media_kind(&p.menu("What to process", &items, 0)?).report(reporter)
        }
        None => MediaKind::Images,
    };

    let size = match args.size {
        Some(s) => s,
        None if p.enabled => aspect_size(p, reporter, 0)?,
        None => choices::ASPECT_PRESETS[0].size,
    };

    let mode = match args.mode {
        Some(m) => m,
        None if p.enabled => {
            let items = vec!["Letterbox (add bars)".to_string(), "Crop (cut edges)".to_string()];
            let default = usize::from(settings.aspect.mode == FitMode::Crop);
            choices::resolve_mode(&p.menu("Processing mode", &items, default)?)
        }
        None => settings.aspect.mode,
    };

    let anchor = match args.anchor {
        Some(a) => a,
        None if p.enabled && mode == FitMode::Crop => {
            let items: Vec<String> = Anchor::ALL.iter().map(|a| a.label().to_string()).collect();
            let default = Anchor::ALL
                .iter()
                .position(|a| *a == settings.aspect.anchor)
                .unwrap_or(0);
            choices::resolve_anchor(&p.menu("Crop anchor", &items, default)?).report(reporter)
        }
        None => settings.aspect.anchor,
    };

    let [r, g, b] = settings.aspect.letterbox_color;
    let configured_color = Rgb([r, g, b]);
    let color = match args.color.as_deref() {
        Some(raw) => parse_color(raw)?,
        None if p.enabled && mode == FitMode::Letterbox => {
            let items: Vec<String> = ["Black", "White", "Gray", "Custom"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            let answer = p.menu("Letterbox color", &items, 0)?;
            let custom = if answer == "4" { p.text("Color (r,g,b)")? } else { String::new() };
            choices::resolve_letterbox_color(&answer, &custom).report(reporter)
        }
        None => configured_color,
    };

    let options = FitOptions::new(size)
        .with_mode(mode)
        .with_anchor(anchor)
        .with_letterbox_color(color);
    tracing::debug!(?options, "aspect options");

    if let Some(input) = args.input.as_deref().filter(|_| single_file) {
        let output = match args.output {
            Some(o) => o,
            None => {
                let folder = if formats::is_video_file(input) {
                    &settings.folders.videos_output
                } else {
                    &settings.folders.images_output
                };
                media::ensure_output_folder(folder, reporter)?;
                folder.join(input.file_name().ok_or_else(|| anyhow!("input has no file name"))?)
            }
        };
        let mut batch = BatchReport::new();
        let result = if formats::is_video_file(input) {
            aspect_video_with_bar(settings, input, &output, &options, reporter)
        } else {
            aspect::process_file(&settings.ffmpeg, input, &output, &options, reporter)
        };
        if let Err(e) = &result {
            reporter.error(&format!("Failed to process {}: {}", report::display_name(input), e));
        }
        batch.push(input, result);
        return Ok(batch);
    }

    let (default_in, default_out) = default_folders(settings, kind);
    let input = match args.input {
        Some(i) => i,
        None if p.enabled => p.path("Input folder", &default_in)?,
        None => default_in,
    };
    let output = match args.output {
        Some(o) => o,
        None if p.enabled => p.path("Output folder", &default_out)?,
        None => default_out,
    };

    Ok(aspect::batch_process(&settings.ffmpeg, &input, &output, &options, kind, reporter)?)
}

/// Single video with a per-frame progress bar.
fn aspect_video_with_bar(
    settings: &Settings,
    input: &Path,
    output: &Path,
    options: &FitOptions,
    reporter: &dyn Reporter,
) -> mediakit::Result<String> {
    reporter.info(&format!("Processing video: {}", report::display_name(input)));
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
        )
        .map_err(|e| ToolError::processing("Progress bar", e))?
        .progress_chars("#>-");

    let mut bar: Option<ProgressBar> = None;
    let on_frame = |done: u64, total: u64| {
        let pb = bar.get_or_insert_with(|| {
            let pb = ProgressBar::new(total.max(1));
            pb.set_style(style.clone());
            pb
        });
        if done > pb.length().unwrap_or(0) {
            pb.set_length(done);
        }
        pb.set_position(done);
    };
    let frames =
        aspect::process_video_with_progress(&settings.ffmpeg, input, output, options, on_frame);
    if let Some(pb) = bar.take() {
        pb.finish_and_clear();
    }
    let frames = frames?;
    reporter.success(&format!("Video processed: {}", report::display_name(output)));
    Ok(format!("{} frames at {}", frames, options.target))
}

fn run_duration(
    args: DurationArgs,
    settings: &Settings,
    p: &Prompter,
    reporter: &ConsoleReporter,
) -> Result<BatchReport> {
    if p.enabled {
        banner("Video Duration Tool");
    }
    let action = match args.action {
        Some(a) => a.into(),
        None if p.enabled => {
            let items = vec![
                "Create duration mapping".to_string(),
                "Adjust video durations".to_string(),
                "Both".to_string(),
            ];
            choices::resolve_duration_action(&p.menu("Select operation", &items, 0)?)
                .ok_or_else(|| anyhow!("invalid operation"))?
        }
        None => DurationAction::Both,
    };

    let folders = &settings.folders;
    let input = match args.input {
        Some(i) => i,
        None if p.enabled => p.path("Input folder", &folders.duration_input)?,
        None => folders.duration_input.clone(),
    };

    let defaults = &settings.duration;
    let target = match args.target {
        Some(t) => t,
        None if p.enabled => {
            let raw = p.text(&format!("Target duration in seconds [{}]", defaults.target_secs))?;
            choices::parse_float_or(&raw, defaults.target_secs).report(reporter)
        }
        None => defaults.target_secs,
    };

    let mut batch = BatchReport::new();
    if action.includes_mapping() {
        let mapping_file = args.mapping_file.unwrap_or_else(|| folders.mapping_file.clone());
        let mapped =
            duration::write_mapping(&settings.ffmpeg, &input, &mapping_file, target, reporter)?;
        batch.items.extend(mapped.items);
    }

    if action.includes_adjust() {
        let output = match args.output {
            Some(o) => o,
            None if p.enabled => p.path("Output folder", &folders.duration_output)?,
            None => folders.duration_output.clone(),
        };
        let fade = if args.no_fade {
            None
        } else if let Some(f) = args.fade {
            Some(f)
        } else if p.enabled {
            let raw = p.text("Apply fade in/out? (y/N)")?;
            if choices::parse_yes_no(&raw, false) {
                let raw = p.text(&format!("Fade duration in seconds [{}]", defaults.fade_secs))?;
                Some(choices::parse_float_or(&raw, defaults.fade_secs).report(reporter))
            } else {
                None
            }
        } else {
            None
        };

        let mut options = DurationOptions::new(target);
        if let Some(f) = fade {
            options = options.with_fades(f);
        }
        let adjusted =
            duration::batch_adjust(&settings.ffmpeg, &input, &output, &options, reporter)?;
        batch.items.extend(adjusted.items);
    }
    Ok(batch)
}

fn images_in_current_dir() -> Vec<PathBuf> {
    media::scan_folder(Path::new("."), MediaKind::Images).unwrap_or_default()
}

fn run_c_array(
    args: CArrayArgs,
    settings: &Settings,
    p: &Prompter,
    reporter: &ConsoleReporter,
) -> Result<BatchReport> {
    let input = match args.input {
        Some(i) => i,
        None if p.enabled => {
            let files = images_in_current_dir();
            if files.is_empty() {
                return Err(anyhow!("No images found in current directory."));
            }
            p.pick_file("Choose an input image", &files)?
        }
        None => return Err(anyhow!("Input image must be provided when using --defaults.")),
    };

    let defaults = &settings.c_array;
    let mut options = CArrayOptions::default()
        .with_size(args.size.unwrap_or(defaults.size))
        .with_quality(args.quality.unwrap_or(defaults.quality))
        .with_flips(args.flip_h, args.flip_v)
        .with_array_name(args.name.unwrap_or_else(|| defaults.array_name.clone()));
    options.bytes_per_line = defaults.bytes_per_line;
    let output = args.output.unwrap_or_else(|| defaults.output.clone());

    let mut batch = BatchReport::new();
    let result = c_array::image_to_header(&input, &output, &options, reporter);
    if let Err(e) = &result {
        reporter.error(&format!("Error: {}", e));
    }
    batch.push(&input, result.map(|bytes| format!("{} bytes", bytes)));
    Ok(batch)
}

fn run_to_video(
    args: ToVideoArgs,
    settings: &Settings,
    p: &Prompter,
    reporter: &ConsoleReporter,
) -> Result<BatchReport> {
    let defaults = &settings.to_video;
    let input = match args.input {
        Some(i) => i,
        None if p.enabled => p.path("Image file or folder", &settings.folders.images_input)?,
        None => settings.folders.images_input.clone(),
    };
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| settings.folders.video_clips_output.clone());

    let options = ToVideoOptions::default()
        .with_duration(args.duration.unwrap_or(defaults.duration_secs))
        .with_fps(args.fps.unwrap_or(defaults.fps))
        .with_size(args.size)
        .with_format(args.format.unwrap_or(defaults.format))
        .with_codec(args.codec.unwrap_or_else(|| defaults.codec.clone()))
        .with_fades(args.fade_in, args.fade_out);

    let batch = to_video::convert(&settings.ffmpeg, &input, &output_dir, &options, reporter)?;
    if !batch.is_empty() {
        println!(
            "\nDone: {}/{} succeeded. Output: {}/",
            batch.success_count(),
            batch.items.len(),
            output_dir.display()
        );
    }
    Ok(batch)
}

fn run_text(
    args: TextArgs,
    settings: &Settings,
    p: &Prompter,
    reporter: &ConsoleReporter,
) -> Result<BatchReport> {
    if p.enabled {
        banner("Text to Image Converter");
    }
    let folders = &settings.folders;
    let default_input = folders.text_input.join("text.txt");
    let input = match args.input {
        Some(i) => i,
        None if p.enabled => {
            let raw = p.text(&format!("Path to text file [{}]", default_input.display()))?;
            if raw.trim().is_empty() {
                media::ensure_output_folder(&folders.text_input, reporter)?;
                report::setup_instructions(reporter, &folders.text_input, &folders.text_output);
                default_input
            } else {
                PathBuf::from(raw.trim())
            }
        }
        None => default_input,
    };
    let output_dir = match args.output_dir {
        Some(o) => o,
        None if p.enabled => p.path("Output folder", &folders.text_output)?,
        None => folders.text_output.clone(),
    };

    let defaults = &settings.text;
    let size = match args.size {
        Some(s) => s,
        None if p.enabled => aspect_size(p, reporter, 2)?,
        None => defaults.size,
    };
    let font_size = match args.font_size {
        Some(s) => s,
        None if p.enabled => {
            let raw = p.text(&format!("Font size [{}]", defaults.font_size))?;
            choices::parse_positive_or(&raw, defaults.font_size).report(reporter)
        }
        None => defaults.font_size,
    };

    let mut font_path = match args.font {
        Some(f) => Some(f),
        None if p.enabled && p.confirm("Use custom font?", false)? => {
            Some(PathBuf::from(p.text("Path to .ttf or .otf font file")?.trim()))
        }
        None => defaults.font_path.clone(),
    };
    if let Some(path) = font_path.as_deref() {
        match text_image::load_font(Some(path)) {
            Ok(_) => reporter.success(&format!("Loaded custom font: {}", path.display())),
            Err(e) => {
                reporter.error(&format!("Failed to load font: {}", e));
                reporter.info("Using system default font");
                font_path = None;
            }
        }
    }

    let (text_color, background) = match (args.text_color.as_deref(), args.background.as_deref()) {
        (None, None) if p.enabled => {
            let items = vec![
                "White text on black".to_string(),
                "Black text on white".to_string(),
                "Custom".to_string(),
            ];
            let answer = p.menu("Color scheme", &items, 0)?;
            let (t, b) = if answer == "3" {
                (p.text("Text color (r,g,b)")?, p.text("Background color (r,g,b)")?)
            } else {
                (String::new(), String::new())
            };
            choices::resolve_color_scheme(&answer, &t, &b).report(reporter)
        }
        (t, b) => {
            let parse = |raw: Option<&str>, default: Rgb<u8>| match raw {
                Some(raw) => parse_color(raw),
                None => Ok(default),
            };
            (parse(t, choices::WHITE)?, parse(b, choices::BLACK)?)
        }
    };

    let format = match args.format {
        Some(f) => f,
        None if p.enabled => {
            let items = vec!["PNG".to_string(), "JPEG".to_string(), "WEBP".to_string()];
            choices::resolve_text_format(&p.menu("Output format", &items, 0)?).report(reporter)
        }
        None => ImageFormat::Png,
    };

    let mut options = TextImageOptions::default()
        .with_size(size)
        .with_font_size(font_size as f32)
        .with_colors(text_color, background)
        .with_format(format)
        .with_font_path(font_path);
    options.padding = defaults.padding;

    if p.enabled {
        println!("\nSettings:");
        println!("  Input file: {}", input.display());
        println!("  Output folder: {}", output_dir.display());
        println!("  Image dimensions: {}", options.size);
        println!("  Font size: {}", font_size);
        println!("  Text color (RGB): {:?}", options.text_color.0);
        println!("  Background color (RGB): {:?}", options.background.0);
        println!("  Output format: {}", options.format);
    }

    let batch = text_image::process_text_file(&input, &output_dir, &options, reporter)?;
    if batch.success_count() > 0 {
        println!("\n{} images created successfully!", batch.success_count());
    } else {
        println!("\nNo images were created.");
    }
    Ok(batch)
}

fn run_optimize(
    args: OptimizeArgs,
    settings: &Settings,
    reporter: &ConsoleReporter,
) -> Result<BatchReport> {
    let options = OptimizeOptions::default()
        .with_max_size(args.max_size.unwrap_or(settings.optimize.max_size))
        .with_quality(args.quality.unwrap_or(settings.optimize.quality))
        .with_format(args.format);

    if args.input.is_dir() {
        let output = args.output.as_deref();
        return Ok(optimize::optimize_directory(&args.input, output, &options, reporter)?);
    }

    let mut batch = BatchReport::new();
    let result = optimize::optimize_image(&args.input, args.output.as_deref(), &options, reporter)
        .map(|o| {
            format!(
                "{} ({:.1}% reduction)",
                report::display_name(&o.output),
                o.reduction_percent()
            )
        });
    match &result {
        Ok(summary) => reporter.success(&format!("Optimized: {}", summary)),
        Err(e) => reporter.error(&format!("Error: {}", e)),
    }
    batch.push(&args.input, result);
    Ok(batch)
}

fn run_formats(args: FormatsArgs) -> Result<BatchReport> {
    let selected: Vec<ImageFormat> = match args.format {
        Some(f) => vec![f],
        None => ImageFormat::ALL.to_vec(),
    };
    let infos: Vec<FormatInfo> = selected.iter().map(|f| FormatInfo::of(*f)).collect();

    let advice = match (args.format, args.to) {
        (Some(from), Some(to)) => Some(formats::conversion_advice(from, to, args.transparent)),
        (None, Some(_)) => return Err(anyhow!("--to needs a source format")),
        _ => None,
    };

    if args.json {
        let value = serde_json::json!({ "formats": infos, "advice": advice });
        println!("{}", serde_json::to_string_pretty(&value).context("serializing format info")?);
        return Ok(BatchReport::new());
    }

    for info in &infos {
        println!("{} ({})", style(info.name).bold(), info.extension);
        let kind = if info.is_lossy { "lossy" } else { "lossless" };
        println!("  compression: {}", kind);
        println!("  transparency: {}", yes_no(info.supports_transparency));
        println!("  animation: {}", yes_no(info.supports_animation));
        println!(
            "  quality: thumbnail {}, web {}, archive {}",
            info.quality_thumbnail, info.quality_web, info.quality_archive
        );
    }

    if let (Some(from), Some(advice)) = (args.format, advice) {
        println!();
        println!("{} -> {}", from, args.to.map(|t| t.to_string()).unwrap_or_default());
        println!("  recommended: {}", yes_no(advice.recommended));
        println!("  loses transparency: {}", yes_no(advice.will_lose_transparency));
        println!("  loses quality: {}", yes_no(advice.will_lose_quality));
        for w in &advice.warnings {
            println!("  {} {}", style("warning:").yellow(), w);
        }
        let best = formats::optimal_output_format(from, args.transparent, true);
        println!("  best modern output: {}", best);
    }
    Ok(BatchReport::new())
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "yes"
    } else {
        "no"
    }
}

