//! Resolution engine: turn a work's detail page into a direct media URL.
//!
//! Strategies run in a fixed order and each only when the previous one
//! produced nothing usable:
//!
//! 1. static parse of the detail page (media container → fixed-id link)
//! 2. script-rendered re-parse, only when the container exists but the
//!    link does not
//! 3. `Unresolved(reason)`

use crate::context::HarvestContext;
use crate::error::HarvestError;
use crate::html::{self, MediaContainer};
use crate::layout;
use crate::renderer;
use crate::types::{RenderAttempt, ResolutionResult, ResolvedWork, UnresolvedReason, Work};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct Resolver {
    ctx: HarvestContext,
}

impl Resolver {
    pub fn new(ctx: HarvestContext) -> Self {
        Self { ctx }
    }

    /// Resolve a work. Consumes it: a work gets exactly one attempt.
    pub async fn resolve(&self, work: Work, cancel: &CancellationToken) -> ResolvedWork {
        if cancel.is_cancelled() {
            return ResolvedWork::new(
                work,
                ResolutionResult::Unresolved(UnresolvedReason::Cancelled),
                None,
                RenderAttempt::NotAttempted,
            );
        }

        let url = work.source_url().to_string();
        let page = match self.ctx.fetcher.get(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(work = %work.label(), url = %url, "detail page fetch failed: {e}");
                let reason = unresolved_reason(&e);
                return ResolvedWork::new(
                    work,
                    ResolutionResult::Unresolved(reason),
                    None,
                    RenderAttempt::NotAttempted,
                );
            }
        };

        if page.is_sentinel(&self.ctx.config.error_sentinel_url) || !page.is_success() {
            tracing::warn!(work = %work.label(), url = %url, status = page.status, "detail page unavailable");
            return ResolvedWork::new(
                work,
                ResolutionResult::Unresolved(UnresolvedReason::PageUnavailable),
                Some(page.body),
                RenderAttempt::NotAttempted,
            );
        }

        let base = self.ctx.config.media_base_url.as_str();
        match html::inspect_media_container(&page.body) {
            MediaContainer::Missing => {
                tracing::warn!(work = %work.label(), url = %url, "media container missing");
                ResolvedWork::new(
                    work,
                    ResolutionResult::Unresolved(UnresolvedReason::ContainerMissing),
                    Some(page.body),
                    RenderAttempt::NotAttempted,
                )
            }
            MediaContainer::Present {
                link: Some(href), ..
            } => {
                let media_url = layout::join_media_url(base, &href);
                tracing::debug!(work = %work.label(), media_url = %media_url, "resolved from static page");
                ResolvedWork::new(
                    work,
                    ResolutionResult::Resolved(media_url),
                    Some(page.body),
                    RenderAttempt::NotAttempted,
                )
            }
            MediaContainer::Present { link: None, .. } => {
                if cancel.is_cancelled() {
                    return ResolvedWork::new(
                        work,
                        ResolutionResult::Unresolved(UnresolvedReason::Cancelled),
                        Some(page.body),
                        RenderAttempt::NotAttempted,
                    );
                }
                tracing::info!(work = %work.label(), url = %url, "media link missing from static page, rendering");
                self.resolve_rendered(work, page.body).await
            }
        }
    }

    async fn resolve_rendered(&self, work: Work, detail_html: String) -> ResolvedWork {
        let url = work.source_url().to_string();
        let rendered = renderer::render_html(
            self.ctx.renderer.as_ref(),
            &url,
            self.ctx.config.render_timeout,
        )
        .await;

        match rendered {
            Ok(rendered_html) => match html::find_media_link(&rendered_html) {
                Some(href) => {
                    let media_url = layout::join_media_url(&self.ctx.config.media_base_url, &href);
                    tracing::debug!(work = %work.label(), media_url = %media_url, "resolved from rendered page");
                    ResolvedWork::new(
                        work,
                        ResolutionResult::Resolved(media_url),
                        Some(detail_html),
                        RenderAttempt::Rendered(rendered_html),
                    )
                }
                None => {
                    tracing::warn!(work = %work.label(), url = %url, "rendered page has no media link");
                    ResolvedWork::new(
                        work,
                        ResolutionResult::Unresolved(UnresolvedReason::RenderFailed),
                        Some(detail_html),
                        RenderAttempt::Rendered(rendered_html),
                    )
                }
            },
            Err(e) => {
                tracing::warn!(work = %work.label(), url = %url, "render failed: {e}");
                let reason = match e {
                    HarvestError::Timeout { .. } => UnresolvedReason::Timeout,
                    _ => UnresolvedReason::RenderFailed,
                };
                ResolvedWork::new(
                    work,
                    ResolutionResult::Unresolved(reason),
                    Some(detail_html),
                    RenderAttempt::Failed,
                )
            }
        }
    }
}

fn unresolved_reason(e: &HarvestError) -> UnresolvedReason {
    match e {
        HarvestError::Timeout { .. } => UnresolvedReason::Timeout,
        HarvestError::Cancelled => UnresolvedReason::Cancelled,
        _ => UnresolvedReason::PageUnavailable,
    }
}
