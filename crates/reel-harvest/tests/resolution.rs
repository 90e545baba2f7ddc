//! Resolution strategies and their ordering.

mod common;

use common::*;
use reel_harvest::{Creator, Renderer, ResolutionResult, Resolver, UnresolvedReason, Work};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn work(path: &str) -> Work {
    let creator = Arc::new(Creator::new("Maya Deren", url("Deren.html")));
    Work::new("Meshes of the Afternoon (1943)", url(path), creator)
}

#[tokio::test]
async fn test_static_link_resolves_without_rendering() {
    let dir = TempDir::new().unwrap();
    let h = harness(dir.path());
    h.fetcher
        .page(&url("Deren-Meshes.html"), detail_with_link("mp4/Deren-Meshes.mp4"));

    let resolved = Resolver::new(h.ctx.clone())
        .resolve(work("Deren-Meshes.html"), &CancellationToken::new())
        .await;

    assert_eq!(
        resolved.resolution(),
        &ResolutionResult::Resolved(url("mp4/Deren-Meshes.mp4"))
    );
    assert_eq!(h.renderer.contexts_opened(), 0);
    assert!(resolved.detail_html().is_some());
}

#[tokio::test]
async fn test_missing_link_renders_once() {
    let dir = TempDir::new().unwrap();
    let h = harness(dir.path());
    let page = url("Deren-Meshes.html");
    h.fetcher.page(&page, detail_empty_container());
    h.renderer.page(&page, detail_with_link("mp4/Deren-Meshes.mp4"));

    let resolved = Resolver::new(h.ctx.clone())
        .resolve(work("Deren-Meshes.html"), &CancellationToken::new())
        .await;

    assert_eq!(resolved.media_url(), Some(url("mp4/Deren-Meshes.mp4").as_str()));
    assert_eq!(h.renderer.contexts_opened(), 1);
    assert_eq!(h.renderer.active_contexts(), 0);
    assert!(resolved.rendered_html().is_some());
}

#[tokio::test]
async fn test_missing_container_never_renders() {
    let dir = TempDir::new().unwrap();
    let h = harness(dir.path());
    let page = url("Deren-Meshes.html");
    h.fetcher.page(&page, detail_without_container());
    h.renderer.page(&page, detail_with_link("mp4/never-used.mp4"));

    let resolved = Resolver::new(h.ctx.clone())
        .resolve(work("Deren-Meshes.html"), &CancellationToken::new())
        .await;

    assert_eq!(
        resolved.resolution(),
        &ResolutionResult::Unresolved(UnresolvedReason::ContainerMissing)
    );
    assert_eq!(h.renderer.contexts_opened(), 0);
}

#[tokio::test]
async fn test_rendered_page_without_link_is_render_failed() {
    let dir = TempDir::new().unwrap();
    let h = harness(dir.path());
    let page = url("Deren-Meshes.html");
    h.fetcher.page(&page, detail_empty_container());
    h.renderer.page(&page, detail_empty_container());

    let resolved = Resolver::new(h.ctx.clone())
        .resolve(work("Deren-Meshes.html"), &CancellationToken::new())
        .await;

    assert_eq!(
        resolved.resolution(),
        &ResolutionResult::Unresolved(UnresolvedReason::RenderFailed)
    );
    assert_eq!(h.renderer.contexts_opened(), 1);
}

#[tokio::test]
async fn test_sentinel_redirect_is_page_unavailable() {
    let dir = TempDir::new().unwrap();
    let h = harness(dir.path());
    h.fetcher.redirect_to_sentinel(&url("Deren-Meshes.html"));

    let resolved = Resolver::new(h.ctx.clone())
        .resolve(work("Deren-Meshes.html"), &CancellationToken::new())
        .await;

    assert_eq!(
        resolved.resolution(),
        &ResolutionResult::Unresolved(UnresolvedReason::PageUnavailable)
    );
    assert_eq!(h.renderer.contexts_opened(), 0);
}

#[tokio::test]
async fn test_absolute_link_kept_verbatim() {
    let dir = TempDir::new().unwrap();
    let h = harness(dir.path());
    h.fetcher.page(
        &url("Deren-Meshes.html"),
        detail_with_link("https://media.example/Deren-Meshes.mp4"),
    );

    let resolved = Resolver::new(h.ctx.clone())
        .resolve(work("Deren-Meshes.html"), &CancellationToken::new())
        .await;
    assert_eq!(
        resolved.media_url(),
        Some("https://media.example/Deren-Meshes.mp4")
    );
}

#[tokio::test]
async fn test_cancelled_before_fetch() {
    let dir = TempDir::new().unwrap();
    let h = harness(dir.path());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let resolved = Resolver::new(h.ctx.clone())
        .resolve(work("Deren-Meshes.html"), &cancel)
        .await;
    assert_eq!(
        resolved.resolution(),
        &ResolutionResult::Unresolved(UnresolvedReason::Cancelled)
    );
    assert_eq!(h.fetcher.get_count(&url("Deren-Meshes.html")), 0);
}
