//! Core data model: creators, works, and the outcomes of resolving and
//! acquiring a work.

use crate::error::HarvestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// An artist owning zero or more works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub name: String,
    pub source_url: String,
    pub description: Option<String>,
    pub birth_year: Option<i32>,
    /// The creator page is missing or redirects to the sentinel page.
    pub is_unavailable: bool,
    /// The creator page carries a takedown notice.
    pub is_takedown: bool,
}

impl Creator {
    pub fn new(name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
            description: None,
            birth_year: None,
            is_unavailable: false,
            is_takedown: false,
        }
    }

    /// Directory name used for this creator under the download root.
    pub fn slug(&self) -> String {
        crate::layout::slugify(&self.name)
    }
}

/// A single media item, identified by its detail page.
///
/// A `Work` is consumed by [`crate::resolver::Resolver::resolve`], so it
/// can be resolved at most once. Resolving again means listing it again.
#[derive(Debug, PartialEq)]
pub struct Work {
    name: String,
    source_url: String,
    creator: Arc<Creator>,
}

impl Work {
    pub fn new(
        name: impl Into<String>,
        source_url: impl Into<String>,
        creator: Arc<Creator>,
    ) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
            creator,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn creator(&self) -> &Creator {
        &self.creator
    }

    pub fn slug(&self) -> String {
        crate::layout::slugify(&self.name)
    }

    /// `creator/work` label for logs and progress events.
    pub fn label(&self) -> String {
        format!("{}/{}", self.creator.name, self.name)
    }
}

/// Why a work's direct media URL could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    PageUnavailable,
    ContainerMissing,
    RenderFailed,
    Timeout,
    Cancelled,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageUnavailable => write!(f, "page unavailable"),
            Self::ContainerMissing => write!(f, "media container missing"),
            Self::RenderFailed => write!(f, "render failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of the resolution engine for one work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    Resolved(String),
    Unresolved(UnresolvedReason),
}

impl ResolutionResult {
    pub fn media_url(&self) -> Option<&str> {
        match self {
            Self::Resolved(url) => Some(url),
            Self::Unresolved(_) => None,
        }
    }
}

/// Whether resolution rendered the detail page, and what came of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RenderAttempt {
    #[default]
    NotAttempted,
    /// The renderer failed or timed out; it is not retried for this work.
    Failed,
    Rendered(String),
}

/// A work paired with its single resolution attempt.
///
/// Also carries the pages fetched while resolving, so that archival and
/// the alternate path do not have to fetch or render them again.
#[derive(Debug)]
pub struct ResolvedWork {
    work: Work,
    resolution: ResolutionResult,
    detail_html: Option<String>,
    render: RenderAttempt,
}

impl ResolvedWork {
    pub(crate) fn new(
        work: Work,
        resolution: ResolutionResult,
        detail_html: Option<String>,
        render: RenderAttempt,
    ) -> Self {
        Self {
            work,
            resolution,
            detail_html,
            render,
        }
    }

    pub fn work(&self) -> &Work {
        &self.work
    }

    pub fn resolution(&self) -> &ResolutionResult {
        &self.resolution
    }

    pub fn media_url(&self) -> Option<&str> {
        self.resolution.media_url()
    }

    /// Raw detail page as fetched during resolution.
    pub fn detail_html(&self) -> Option<&str> {
        self.detail_html.as_deref()
    }

    /// Script-rendered detail page, when resolution had to render it.
    pub fn rendered_html(&self) -> Option<&str> {
        match &self.render {
            RenderAttempt::Rendered(html) => Some(html),
            _ => None,
        }
    }

    pub fn render_attempt(&self) -> &RenderAttempt {
        &self.render
    }

    pub fn into_work(self) -> Work {
        self.work
    }
}

/// Result of acquiring one work.
#[derive(Debug)]
pub enum AcquisitionOutcome {
    /// Media streamed to this path.
    Downloaded(PathBuf),
    /// The destination file already existed; nothing was streamed.
    Skipped(PathBuf),
    /// Retrieval was handed to the external media downloader.
    Delegated,
    Failed(HarvestError),
}

impl AcquisitionOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Downloaded(_) => "downloaded",
            Self::Skipped(_) => "skipped",
            Self::Delegated => "delegated",
            Self::Failed(_) => "failed",
        }
    }

    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Downloaded(p) | Self::Skipped(p) => Some(p),
            _ => None,
        }
    }
}
