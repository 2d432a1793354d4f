//! Local image selection for create/edit forms.
//!
//! Selections accumulate across multiple picks, dedup on the file identity
//! key, and are capped at [`MAX_PRODUCT_IMAGES`] total. Entries are owned by
//! the selection and released together on `clear` or drop.
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

use crate::api::ImageFile;
use crate::model::MAX_PRODUCT_IMAGES;

/// One picked file. The key is (name, size, mtime) so re-picking the same
/// file is a no-op while a same-named re-export is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl SelectedImage {
    fn from_path(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path)
            .with_context(|| format!("cannot stat image: {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow::anyhow!("invalid file name: {}", path.display()))?
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn key(&self) -> (String, u64, Option<SystemTime>) {
        (self.file_name.clone(), self.size, self.modified)
    }
}

/// Ordered, deduplicated set of locally selected images.
#[derive(Debug, Default)]
pub struct ImageSelection {
    entries: Vec<SelectedImage>,
}

impl ImageSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append new picks, skipping duplicates and truncating to the cap.
    /// First-seen order is preserved. Returns how many entries were added.
    pub fn add_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<usize> {
        let before = self.entries.len();
        for path in paths {
            if self.entries.len() >= MAX_PRODUCT_IMAGES {
                warn!(
                    cap = MAX_PRODUCT_IMAGES,
                    "image cap reached, dropping remaining picks"
                );
                break;
            }
            let picked = SelectedImage::from_path(path.as_ref())?;
            if self.entries.iter().any(|e| e.key() == picked.key()) {
                continue;
            }
            self.entries.push(picked);
        }
        Ok(self.entries.len() - before)
    }

    pub fn remove(&mut self, index: usize) -> Option<SelectedImage> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Release every held entry (reset-on-replace discipline).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedImage> {
        self.entries.iter()
    }

    /// Read every selected file into memory for submission, in order.
    pub async fn load_files(&self) -> Result<Vec<ImageFile>> {
        let mut files = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            files.push(ImageFile::from_path(&entry.path).await?);
        }
        Ok(files)
    }
}
