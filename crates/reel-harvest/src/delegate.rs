//! Delegation to an external youtube-dl compatible media downloader.

use crate::error::{HarvestError, HarvestResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Binaries tried, in order, when no downloader is configured.
pub const DOWNLOADER_CANDIDATES: &[&str] = &["yt-dlp", "youtube-dl"];

/// Retrieves a media page (typically an embedded player) to disk.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download `source_url`, writing to files named by `output_template`
    /// (youtube-dl `%(field)s` syntax).
    async fn download(&self, source_url: &str, output_template: &str) -> HarvestResult<()>;
}

/// Runs a youtube-dl compatible binary as a child process.
#[derive(Debug, Clone)]
pub struct ExternalDownloader {
    program: PathBuf,
}

impl ExternalDownloader {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve the configured binary, or the first candidate on PATH.
    pub fn locate(explicit: Option<&Path>) -> Option<Self> {
        if let Some(path) = explicit {
            return which::which(path).ok().map(Self::new);
        }
        DOWNLOADER_CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(Self::new)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl MediaDownloader for ExternalDownloader {
    async fn download(&self, source_url: &str, output_template: &str) -> HarvestResult<()> {
        tracing::info!(
            program = %self.program.display(),
            source_url,
            output_template,
            "delegating to media downloader"
        );

        // Dropping this future (cancellation) kills the child.
        let output = Command::new(&self.program)
            .arg("--no-progress")
            .arg("-o")
            .arg(output_template)
            .arg(source_url)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                HarvestError::Delegate(format!("failed to run {}: {e}", self.program.display()))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(3).collect();
        Err(HarvestError::Delegate(format!(
            "{} exited with {}: {}",
            self.program.display(),
            output.status,
            tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
        )))
    }
}

/// Stand-in used when no downloader binary is installed.
pub struct UnavailableDownloader;

#[async_trait]
impl MediaDownloader for UnavailableDownloader {
    async fn download(&self, source_url: &str, _output_template: &str) -> HarvestResult<()> {
        Err(HarvestError::Delegate(format!(
            "no media downloader installed (tried {}) for {source_url}",
            DOWNLOADER_CANDIDATES.join(", ")
        )))
    }
}
