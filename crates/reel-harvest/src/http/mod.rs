//! HTTP fetching seam.
//!
//! Every page and media fetch goes through [`Fetcher`], so discovery,
//! resolution and acquisition can run against the reqwest-backed
//! [`client::HttpClient`] or an in-process double.

pub mod client;

use crate::error::HarvestResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt;

pub use client::HttpClient;

/// A fully buffered page.
#[derive(Debug, Clone)]
pub struct HttpPage {
    /// Requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

impl HttpPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when the site bounced the request to its sentinel error page.
    pub fn is_sentinel(&self, sentinel: &str) -> bool {
        crate::layout::same_url(&self.final_url, sentinel)
    }
}

/// A response whose body is consumed incrementally.
pub struct MediaStream {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    /// Declared `Content-Length`, when the server sent one.
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, HarvestResult<Bytes>>,
}

impl MediaStream {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_sentinel(&self, sentinel: &str) -> bool {
        crate::layout::same_url(&self.final_url, sentinel)
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("url", &self.url)
            .field("final_url", &self.final_url)
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Fetches pages and media.
///
/// Implementations report elapsed bounded waits as
/// [`crate::error::HarvestError::Timeout`] and other transport failures as
/// [`crate::error::HarvestError::Http`]. Non-2xx answers are returned as
/// values so callers can archive the body before deciding.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET a page and buffer its body as text.
    async fn get(&self, url: &str) -> HarvestResult<HttpPage>;
    /// GET a resource and hand back its body as a stream.
    async fn stream(&self, url: &str) -> HarvestResult<MediaStream>;
}
