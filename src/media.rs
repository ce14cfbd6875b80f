//! Folder scanning for the batch tools.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

use crate::error::{Result, ToolError};
use crate::formats::{is_image_file, is_video_file};
use crate::report::{self, Reporter};

/// Which files a folder scan picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Images,
    Videos,
    Both,
}

impl MediaKind {
    pub fn name(self) -> &'static str {
        match self {
            MediaKind::Images => "images",
            MediaKind::Videos => "videos",
            MediaKind::Both => "both",
        }
    }

    pub fn accepts(self, path: &Path) -> bool {
        match self {
            MediaKind::Images => is_image_file(path),
            MediaKind::Videos => is_video_file(path),
            MediaKind::Both => is_image_file(path) || is_video_file(path),
        }
    }

    /// Plural noun for progress messages.
    pub fn item_noun(self) -> &'static str {
        match self {
            MediaKind::Images => "images",
            MediaKind::Videos => "videos",
            MediaKind::Both => "files",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MediaKind {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "images" | "image" => Ok(MediaKind::Images),
            "videos" | "video" => Ok(MediaKind::Videos),
            "both" | "all" => Ok(MediaKind::Both),
            other => Err(ToolError::validation(
                "media kind",
                format!("unknown media kind '{}'", other),
            )),
        }
    }
}

/// Files directly inside `folder` accepted by `kind`, sorted by path.
pub fn scan_folder(folder: &Path, kind: MediaKind) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(ToolError::FileNotFound(folder.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| kind.accepts(p))
        .collect();
    files.sort();
    tracing::debug!(
        folder = %folder.display(),
        kind = %kind,
        count = files.len(),
        "scanned folder"
    );
    Ok(files)
}

/// Create `folder` if it is missing, announcing it through `reporter`.
pub fn ensure_output_folder(folder: &Path, reporter: &dyn Reporter) -> Result<()> {
    if !folder.exists() {
        fs::create_dir_all(folder)?;
        report::folder_created(reporter, folder);
    }
    Ok(())
}

/// True when `folder` exists; otherwise reports where files should go.
pub fn require_input_folder(folder: &Path, reporter: &dyn Reporter) -> bool {
    if folder.is_dir() {
        return true;
    }
    report::folder_missing(reporter, folder);
    false
}
