//! In-process doubles for the fetcher, renderer and media downloader,
//! plus builders for the site's page shapes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use reel_harvest::error::{HarvestError, HarvestResult};
use reel_harvest::http::{Fetcher, HttpPage, MediaStream};
use reel_harvest::renderer::{RenderContext, Renderer};
use reel_harvest::{HarvestConfig, HarvestContext, MediaDownloader};

pub const BASE: &str = "https://films.example/film/";
pub const INDEX: &str = "https://films.example/film/index.html";
pub const SENTINEL: &str = "https://films.example/error.html";

// ─────────────────────── fetcher ───────────────────────

#[derive(Clone)]
struct FakePage {
    final_url: String,
    status: u16,
    body: String,
}

#[derive(Clone)]
struct FakeMedia {
    final_url: String,
    status: u16,
    bytes: Vec<u8>,
    /// Fail the stream after this many bytes.
    break_after: Option<usize>,
}

/// Serves canned pages and media bodies keyed by URL. Unknown URLs fail
/// with a transport error.
#[derive(Default)]
pub struct FakeFetcher {
    pages: Mutex<HashMap<String, FakePage>>,
    media: Mutex<HashMap<String, FakeMedia>>,
    gets: Mutex<HashMap<String, usize>>,
    streams: Mutex<HashMap<String, usize>>,
    get_delay: Mutex<Option<Duration>>,
    timeouts: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub fn page(&self, url: &str, body: impl Into<String>) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FakePage {
                final_url: url.to_string(),
                status: 200,
                body: body.into(),
            },
        );
    }

    /// `url` redirects to the sentinel error page.
    pub fn redirect_to_sentinel(&self, url: &str) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FakePage {
                final_url: SENTINEL.to_string(),
                status: 200,
                body: "<html><body>Sorry, this page is gone</body></html>".to_string(),
            },
        );
        self.media.lock().unwrap().insert(
            url.to_string(),
            FakeMedia {
                final_url: SENTINEL.to_string(),
                status: 200,
                bytes: b"<html>error</html>".to_vec(),
                break_after: None,
            },
        );
    }

    pub fn media(&self, url: &str, bytes: Vec<u8>) {
        self.media.lock().unwrap().insert(
            url.to_string(),
            FakeMedia {
                final_url: url.to_string(),
                status: 200,
                bytes,
                break_after: None,
            },
        );
    }

    /// Media whose stream errors after `break_after` bytes.
    pub fn broken_media(&self, url: &str, bytes: Vec<u8>, break_after: usize) {
        self.media.lock().unwrap().insert(
            url.to_string(),
            FakeMedia {
                final_url: url.to_string(),
                status: 200,
                bytes,
                break_after: Some(break_after),
            },
        );
    }

    /// Every `get` sleeps this long while counted as in flight.
    pub fn set_get_delay(&self, delay: Duration) {
        *self.get_delay.lock().unwrap() = Some(delay);
    }

    /// The next `times` gets of `url` fail with a timeout.
    pub fn time_out(&self, url: &str, times: usize) {
        self.timeouts.lock().unwrap().insert(url.to_string(), times);
    }

    pub fn get_count(&self, url: &str) -> usize {
        self.gets.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn stream_count(&self, url: &str) -> usize {
        self.streams.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn get(&self, url: &str) -> HarvestResult<HttpPage> {
        *self.gets.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.get_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(left) = self.timeouts.lock().unwrap().get_mut(url) {
            if *left > 0 {
                *left -= 1;
                return Err(HarvestError::Timeout {
                    url: url.to_string(),
                });
            }
        }

        let page = self.pages.lock().unwrap().get(url).cloned();
        match page {
            Some(p) => Ok(HttpPage {
                url: url.to_string(),
                final_url: p.final_url,
                status: p.status,
                body: p.body,
            }),
            None => Err(HarvestError::Http(format!("connection refused: {url}"))),
        }
    }

    async fn stream(&self, url: &str) -> HarvestResult<MediaStream> {
        *self
            .streams
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        let media = self.media.lock().unwrap().get(url).cloned();
        let Some(m) = media else {
            return Err(HarvestError::Http(format!("connection refused: {url}")));
        };

        let len = m.bytes.len() as u64;
        let mut chunks: Vec<HarvestResult<Bytes>> = Vec::new();
        let limit = m.break_after.unwrap_or(m.bytes.len()).min(m.bytes.len());
        for chunk in m.bytes[..limit].chunks(700) {
            chunks.push(Ok(Bytes::copy_from_slice(chunk)));
        }
        if m.break_after.is_some() {
            chunks.push(Err(HarvestError::Http("connection reset".to_string())));
        }

        Ok(MediaStream {
            url: url.to_string(),
            final_url: m.final_url,
            status: m.status,
            content_length: Some(len),
            body: Box::pin(stream::iter(chunks)),
        })
    }
}

// ─────────────────────── renderer ───────────────────────

/// Returns canned rendered HTML per URL and counts contexts.
#[derive(Default)]
pub struct FakeRenderer {
    pages: Arc<Mutex<HashMap<String, String>>>,
    opened: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
}

impl FakeRenderer {
    pub fn page(&self, url: &str, html: impl Into<String>) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.into());
    }

    pub fn contexts_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

struct FakeRenderContext {
    pages: Arc<Mutex<HashMap<String, String>>>,
    active: Arc<AtomicUsize>,
    current: Option<String>,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_context(&self) -> HarvestResult<Box<dyn RenderContext>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeRenderContext {
            pages: Arc::clone(&self.pages),
            active: Arc::clone(&self.active),
            current: None,
        }))
    }

    fn active_contexts(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderContext for FakeRenderContext {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> HarvestResult<String> {
        let html = self.pages.lock().unwrap().get(url).cloned();
        match html {
            Some(html) => {
                self.current = Some(html);
                Ok(url.to_string())
            }
            None => Err(HarvestError::RenderFailed(format!("navigation failed: {url}"))),
        }
    }

    async fn get_html(&self) -> HarvestResult<String> {
        self.current
            .clone()
            .ok_or_else(|| HarvestError::RenderFailed("nothing loaded".to_string()))
    }

    async fn close(self: Box<Self>) -> HarvestResult<()> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

// ─────────────────────── downloader ───────────────────────

/// Records delegated downloads instead of running a binary.
#[derive(Default)]
pub struct FakeDownloader {
    calls: Mutex<Vec<(String, String)>>,
    fail: Mutex<bool>,
}

impl FakeDownloader {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_all(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

#[async_trait]
impl MediaDownloader for FakeDownloader {
    async fn download(&self, source_url: &str, output_template: &str) -> HarvestResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((source_url.to_string(), output_template.to_string()));
        if *self.fail.lock().unwrap() {
            return Err(HarvestError::Delegate("exit status: 1".to_string()));
        }
        Ok(())
    }
}

// ─────────────────────── harness ───────────────────────

pub struct Harness {
    pub ctx: HarvestContext,
    pub fetcher: Arc<FakeFetcher>,
    pub renderer: Arc<FakeRenderer>,
    pub downloader: Arc<FakeDownloader>,
}

pub fn config(root: &Path) -> HarvestConfig {
    let mut config = HarvestConfig::new(INDEX, BASE, root, SENTINEL);
    config.fetch_timeout = Duration::from_secs(2);
    config.render_timeout = Duration::from_secs(2);
    config
}

pub fn harness(root: &Path) -> Harness {
    harness_with(config(root))
}

pub fn harness_with(config: HarvestConfig) -> Harness {
    let fetcher = Arc::new(FakeFetcher::default());
    let renderer = Arc::new(FakeRenderer::default());
    let downloader = Arc::new(FakeDownloader::default());
    let ctx = HarvestContext::new(
        config,
        fetcher.clone(),
        renderer.clone(),
        downloader.clone(),
    );
    Harness {
        ctx,
        fetcher,
        renderer,
        downloader,
    }
}

// ─────────────────────── page builders ───────────────────────

/// A listing page: a navigation table, then the content table holding
/// `anchors` as `(text, href)` and an optional biography.
pub fn listing_page(anchors: &[(&str, &str)], bio: Option<&str>) -> String {
    let links: String = anchors
        .iter()
        .map(|(text, href)| format!("<tr><td><a href=\"{href}\">{text}</a></td></tr>"))
        .collect();
    let bio = bio
        .map(|b| format!("<tr><td><div class=\"storycontent\"><p>{b}</p></div></td></tr>"))
        .unwrap_or_default();
    format!(
        "<html><body>\
         <table><tr><td><a href=\"/\">Site home</a></td></tr></table>\
         <table>{bio}{links}</table>\
         </body></html>"
    )
}

/// Index page: one navigation anchor followed by the creators.
pub fn index_page(creators: &[(&str, &str)]) -> String {
    let mut anchors = vec![("Back to index", "../index.html")];
    anchors.extend_from_slice(creators);
    listing_page(&anchors, None)
}

/// Creator page: two leading header anchors followed by the works.
pub fn creator_page(works: &[(&str, &str)], bio: Option<&str>) -> String {
    let mut anchors = vec![("Film", "index.html"), ("Sound", "../sound/index.html")];
    anchors.extend_from_slice(works);
    listing_page(&anchors, bio)
}

/// Detail page whose media container holds the fixed-id link.
pub fn detail_with_link(href: &str) -> String {
    format!(
        "<html><body><div class=\"ubucontainer\">\
         <a id=\"moviename\" href=\"{href}\">Download</a>\
         </div></body></html>"
    )
}

/// Detail page whose container holds only an embedded frame.
pub fn detail_with_frame(src: &str) -> String {
    format!(
        "<html><body><div class=\"ubucontainer\">\
         <iframe src=\"{src}\"></iframe>\
         </div></body></html>"
    )
}

/// Detail page with an empty media container.
pub fn detail_empty_container() -> String {
    "<html><body><div class=\"ubucontainer\"><p>Loading player</p></div></body></html>"
        .to_string()
}

/// Detail page without any media container.
pub fn detail_without_container() -> String {
    "<html><body><p>This film is not available.</p></body></html>".to_string()
}

pub fn url(path: &str) -> String {
    format!("{BASE}{path}")
}
