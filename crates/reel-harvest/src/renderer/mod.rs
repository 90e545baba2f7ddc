//! Renderer abstraction for script-rendered detail pages.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide).

pub mod chromium;

use crate::error::{HarvestError, HarvestResult};
use async_trait::async_trait;
use std::time::Duration;

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> HarvestResult<Box<dyn RenderContext>>;
    /// Number of currently open contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab).
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL and wait until the page has finished loading.
    /// Returns the final URL.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> HarvestResult<String>;
    /// Serialized DOM after scripts ran.
    async fn get_html(&self) -> HarvestResult<String>;
    async fn close(self: Box<Self>) -> HarvestResult<()>;
}

/// Render `url` in a fresh context and return the resulting HTML.
///
/// The context is closed whether or not rendering succeeded.
pub async fn render_html(
    renderer: &dyn Renderer,
    url: &str,
    timeout: Duration,
) -> HarvestResult<String> {
    let mut ctx = renderer.new_context().await?;
    let result = match ctx.navigate(url, timeout).await {
        Ok(_) => ctx.get_html().await,
        Err(e) => Err(e),
    };
    if let Err(e) = ctx.close().await {
        tracing::debug!(url, "closing render context failed: {e}");
    }
    result
}

/// Renderer used when no browser is available (`--no-render` or Chromium
/// missing). Every render attempt fails, so the static paths still work.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> HarvestResult<Box<dyn RenderContext>> {
        Err(HarvestError::RenderFailed(
            "browser not available, HTTP-only mode".to_string(),
        ))
    }

    fn active_contexts(&self) -> usize {
        0
    }
}
