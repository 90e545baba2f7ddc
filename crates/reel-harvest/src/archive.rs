//! Archival side-channel: mirror every fetched page to disk.
//!
//! Each call overwrites the previous snapshot. Write failures are logged
//! and swallowed; archival never fails the caller.

use crate::layout;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Archiver {
    root: PathBuf,
}

impl Archiver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` to `<root>/[creator/][work/]index.html`.
    ///
    /// Returns the written path, or `None` when the write failed.
    pub async fn save_html(
        &self,
        url: &str,
        content: &str,
        creator_slug: Option<&str>,
        work_slug: Option<&str>,
    ) -> Option<PathBuf> {
        let path = layout::archive_path(&self.root, creator_slug, work_slug);

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(url, path = %parent.display(), "archive directory creation failed: {e}");
                return None;
            }
        }

        match tokio::fs::write(&path, content).await {
            Ok(()) => {
                tracing::debug!(url, path = %path.display(), bytes = content.len(), "page archived");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(url, path = %path.display(), "archive write failed: {e}");
                None
            }
        }
    }
}
