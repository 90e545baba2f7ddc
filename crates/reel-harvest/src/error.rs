//! Error taxonomy for discovery, resolution and acquisition.

use std::path::PathBuf;

/// All errors that can occur while harvesting the catalogue.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    /// The site redirected to its sentinel error page, or answered non-2xx.
    #[error("page unavailable: {url}")]
    PageUnavailable { url: String },

    /// Fewer than two `<table>` elements on a listing page.
    #[error("no content table found ({found} table(s) on page)")]
    NoTableFound { found: usize },

    #[error("media container missing on {url}")]
    ContainerMissing { url: String },

    #[error("render failed: {0}")]
    RenderFailed(String),

    /// Neither a static link nor an embedded frame could be found.
    #[error("no media source found for {url}")]
    NoMediaSource { url: String },

    #[error("timed out waiting for {url}")]
    Timeout { url: String },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    Http(String),

    #[error("media downloader failed: {0}")]
    Delegate(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cancelled")]
    Cancelled,
}

impl HarvestError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarvestError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Stable short name used in logs and the transfer ledger.
    pub fn kind(&self) -> &'static str {
        match self {
            HarvestError::PageUnavailable { .. } => "page_unavailable",
            HarvestError::NoTableFound { .. } => "no_table_found",
            HarvestError::ContainerMissing { .. } => "container_missing",
            HarvestError::RenderFailed(_) => "render_failed",
            HarvestError::NoMediaSource { .. } => "no_media_source",
            HarvestError::Timeout { .. } => "timeout",
            HarvestError::Filesystem { .. } => "filesystem",
            HarvestError::Http(_) => "http",
            HarvestError::Delegate(_) => "delegate",
            HarvestError::Config(_) => "config",
            HarvestError::Cancelled => "cancelled",
        }
    }

    /// Transport-level failures: the direct path did not work and the
    /// alternate path should be tried.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            HarvestError::PageUnavailable { .. }
                | HarvestError::Timeout { .. }
                | HarvestError::Http(_)
        )
    }
}

pub type HarvestResult<T> = Result<T, HarvestError>;
