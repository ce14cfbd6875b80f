//! User-facing messages and batch outcome aggregation.
//!
//! Every operation takes a `&dyn Reporter` so that the binary, tests and
//! library callers each decide where messages go.

use console::style;
use std::cell::RefCell;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::error::ToolError;

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn prefix(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Success => "SUCCESS",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }
}

/// Sink for user-facing messages.
pub trait Reporter {
    fn emit(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn success(&self, message: &str) {
        self.emit(Level::Success, message);
    }

    fn warning(&self, message: &str) {
        self.emit(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }
}

/// Writes `[LEVEL] message` lines to the terminal, errors to stderr.
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    colors: bool,
}

impl ConsoleReporter {
    /// Colors are enabled only when stdout is a terminal.
    pub fn new() -> Self {
        Self {
            colors: std::io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { colors: false }
    }

    fn format(&self, level: Level, message: &str) -> String {
        let tag = format!("[{}]", level.prefix());
        if !self.colors {
            return format!("{} {}", tag, message);
        }
        let tag = match level {
            Level::Info => style(tag).cyan(),
            Level::Success => style(tag).green(),
            Level::Warning => style(tag).yellow(),
            Level::Error => style(tag).red(),
        };
        format!("{} {}", tag.bold().force_styling(true), message)
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn emit(&self, level: Level, message: &str) {
        let line = self.format(level, message);
        match level {
            Level::Error => eprintln!("{}", line),
            _ => println!("{}", line),
        }
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: RefCell<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages at `level`, in order.
    pub fn at(&self, level: Level) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.borrow().iter().any(|(_, m)| m.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn emit(&self, level: Level, message: &str) {
        self.messages.borrow_mut().push((level, message.to_string()));
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn emit(&self, _level: Level, _message: &str) {}
}

/// Outcome of one item in a batch.
#[derive(Debug)]
pub struct ItemOutcome {
    pub path: PathBuf,
    pub result: std::result::Result<String, ToolError>,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-item results of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: &Path, result: std::result::Result<String, ToolError>) {
        self.items.push(ItemOutcome {
            path: path.to_path_buf(),
            result,
        });
    }

    pub fn success_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.items.len() - self.success_count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when no item failed.
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|i| !i.is_success())
    }
}

/// Display name for messages: the file name, or the whole path if it has none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn folder_created(reporter: &dyn Reporter, folder: &Path) {
    reporter.info(&format!("Created folder: '{}'", folder.display()));
}

pub fn folder_missing(reporter: &dyn Reporter, folder: &Path) {
    reporter.error(&format!("Folder '{}' does not exist", folder.display()));
    reporter.info(&format!("Place your files in '{}/' folder", folder.display()));
}

pub fn setup_instructions(reporter: &dyn Reporter, input: &Path, output: &Path) {
    reporter.info(&format!(
        "Place your files in '{}/' folder. Output will be saved to '{}/'",
        input.display(),
        output.display()
    ));
}

/// `Processed: name (a KB → b KB, r% reduction)`.
pub fn file_processed(reporter: &dyn Reporter, output: &Path, original_kb: f64, new_kb: f64) {
    let name = display_name(output);
    if original_kb > 0.0 && new_kb > 0.0 {
        let reduction = (original_kb - new_kb) / original_kb * 100.0;
        reporter.success(&format!(
            "Processed: {} ({:.2} KB → {:.2} KB, {:.1}% reduction)",
            name, original_kb, new_kb, reduction
        ));
    } else {
        reporter.success(&format!("Processed: {}", name));
    }
}

pub fn batch_started(reporter: &dyn Reporter, count: usize, item_type: &str) {
    reporter.info(&format!("Found {} {} to process", count, item_type));
}

/// Success tally, plus one error line per failed item.
pub fn batch_completed(reporter: &dyn Reporter, report: &BatchReport, item_type: &str) {
    reporter.success(&format!("Completed processing {} {}", report.success_count(), item_type));
    if report.failure_count() > 0 {
        reporter.error(&format!("{} {} failed:", report.failure_count(), item_type));
        for item in report.failures() {
            if let Err(e) = &item.result {
                reporter.error(&format!("  {}: {}", display_name(&item.path), e));
            }
        }
    }
}

/// Size of `path` in KB, 0 when it cannot be read.
pub fn size_kb(path: &Path) -> f64 {
    std::fs::metadata(path).map(|m| m.len() as f64 / 1024.0).unwrap_or(0.0)
}
