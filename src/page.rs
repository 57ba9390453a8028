//! Page descriptors, measured dimensions, and chapter manifests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identity of a page within a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a chapter, as supplied by the host.
///
/// The position in the chapter's page list is the reading order.
/// `page_number` is only a label and may skip or repeat values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDescriptor {
    pub id: PageId,
    pub page_number: u32,
    pub primary_src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsic_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsic_height: Option<f64>,
}

impl PageDescriptor {
    pub fn new(id: impl Into<String>, page_number: u32, primary_src: impl Into<String>) -> Self {
        Self {
            id: PageId::new(id),
            page_number,
            primary_src: primary_src.into(),
            backup_src: None,
            intrinsic_width: None,
            intrinsic_height: None,
        }
    }

    #[must_use]
    pub fn with_backup(mut self, backup_src: impl Into<String>) -> Self {
        self.backup_src = Some(backup_src.into());
        self
    }

    #[must_use]
    pub const fn with_intrinsic_size(mut self, width: f64, height: f64) -> Self {
        self.intrinsic_width = Some(width);
        self.intrinsic_height = Some(height);
        self
    }

    /// Whether `src` names either of this page's sources.
    pub fn uses_src(&self, src: &str) -> bool {
        self.primary_src == src || self.backup_src.as_deref() == Some(src)
    }
}

/// Width and height learned about a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub loaded: bool,
}

/// Facts learned about page proportions during a session.
///
/// Entries are only ever added or refined, never removed.
#[derive(Debug, Clone, Default)]
pub struct MeasuredDimensions {
    entries: HashMap<PageId, Dimensions>,
}

impl MeasuredDimensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record loaded dimensions for a page.
    ///
    /// Returns true when the stored proportions changed.
    pub fn record(&mut self, id: &PageId, width: f64, height: f64) -> bool {
        let next = Dimensions {
            width,
            height,
            loaded: true,
        };
        match self.entries.get(id) {
            Some(existing) if *existing == next => false,
            _ => {
                self.entries.insert(id.clone(), next);
                true
            }
        }
    }

    pub fn get(&self, id: &PageId) -> Option<&Dimensions> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Errors raised while reading a chapter manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("manifest {0} lists no chapters")]
    NoChapters(PathBuf),
    #[error("chapter \"{0}\" has no pages")]
    EmptyChapter(String),
}

/// One chapter's ordered page list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: String,
    pub pages: Vec<PageDescriptor>,
}

/// A series manifest: a title and its chapters in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

impl Manifest {
    /// Parse a manifest from JSON text without touching the filesystem.
    ///
    /// # Errors
    /// Returns an error for invalid JSON or when a chapter list is empty.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ManifestError> {
        let manifest: Self =
            serde_json::from_str(content).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if manifest.chapters.is_empty() {
            return Err(ManifestError::NoChapters(path.to_path_buf()));
        }
        if let Some(empty) = manifest.chapters.iter().find(|c| c.pages.is_empty()) {
            return Err(ManifestError::EmptyChapter(empty.title.clone()));
        }
        Ok(manifest)
    }

    /// Read a manifest and resolve relative page sources against its directory.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::parse(path, &content)?;
        let base_dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        manifest.resolve_sources(&base_dir);
        Ok(manifest)
    }

    fn resolve_sources(&mut self, base_dir: &Path) {
        for page in self.chapters.iter_mut().flat_map(|c| c.pages.iter_mut()) {
            page.primary_src = resolve_src(base_dir, &page.primary_src);
            if let Some(backup) = page.backup_src.as_mut() {
                *backup = resolve_src(base_dir, backup);
            }
        }
    }
}

fn resolve_src(base_dir: &Path, src: &str) -> String {
    if src.contains("://") || Path::new(src).is_absolute() {
        return src.to_string();
    }
    base_dir.join(src).to_string_lossy().into_owned()
}
