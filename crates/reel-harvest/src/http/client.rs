//! Async HTTP client wrapping reqwest.
//!
//! Follows redirects (so the final URL can be compared against the
//! sentinel page), bounds every request with a timeout, retries on 5xx
//! and backs off on 429.

use super::{Fetcher, HttpPage, MediaStream};
use crate::error::{HarvestError, HarvestResult};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;

const MAX_RETRIES: u32 = 2;
const MAX_REDIRECTS: usize = 10;

/// reqwest-backed [`Fetcher`].
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client for hosts that reject HTTP/2.
    h1_client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client whose page fetches and response heads are bounded
    /// by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let ua = "Mozilla/5.0 (X11; Linux x86_64) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(ua)
            .build()
            .unwrap_or_default();

        let h1_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(ua)
            .http1_only()
            .build()
            .unwrap_or_default();

        Self {
            client,
            h1_client,
            timeout,
        }
    }

    async fn get_inner(&self, client: &reqwest::Client, url: &str) -> HarvestResult<HttpPage> {
        let mut retries = 0u32;

        loop {
            let resp = client.get(url).timeout(self.timeout).send().await;

            match resp {
                Ok(r) => {
                    let status = r.status().as_u16();

                    if status >= 500 && retries < MAX_RETRIES {
                        retries += 1;
                        tokio::time::sleep(backoff(retries)).await;
                        continue;
                    }

                    if status == 429 && retries < MAX_RETRIES {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        tokio::time::sleep(Duration::from_secs(retry_after.min(10))).await;
                        continue;
                    }

                    let final_url = r.url().to_string();
                    let body = r.text().await.map_err(|e| classify(url, e))?;

                    return Ok(HttpPage {
                        url: url.to_string(),
                        final_url,
                        status,
                        body,
                    });
                }
                Err(e) => {
                    if !e.is_timeout() && retries < MAX_RETRIES {
                        retries += 1;
                        tracing::debug!(url, retries, "retrying after transport error: {e}");
                        tokio::time::sleep(backoff(retries)).await;
                        continue;
                    }
                    return Err(classify(url, e));
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    /// Falls back to HTTP/1.1 on protocol errors (some CDNs reject HTTP/2).
    async fn get(&self, url: &str) -> HarvestResult<HttpPage> {
        match self.get_inner(&self.client, url).await {
            Ok(page) => Ok(page),
            Err(HarvestError::Http(msg))
                if msg.contains("http2")
                    || msg.contains("protocol")
                    || msg.contains("connection closed") =>
            {
                self.get_inner(&self.h1_client, url).await
            }
            Err(e) => Err(e),
        }
    }

    /// Only the response head is bounded here; the caller bounds each
    /// body chunk so long downloads are not cut off.
    async fn stream(&self, url: &str) -> HarvestResult<MediaStream> {
        let resp = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| HarvestError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|e| classify(url, e))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let content_length = resp.content_length().filter(|len| *len > 0);
        let owned_url = url.to_string();
        let body = resp
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| classify(&owned_url, e)))
            .boxed();

        Ok(MediaStream {
            url: url.to_string(),
            final_url,
            status,
            content_length,
            body,
        })
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * 2u64.pow(attempt.saturating_sub(1)))
}

fn classify(url: &str, e: reqwest::Error) -> HarvestError {
    if e.is_timeout() {
        HarvestError::Timeout {
            url: url.to_string(),
        }
    } else {
        HarvestError::Http(format!("{url}: {e}"))
    }
}
