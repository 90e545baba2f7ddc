//! Harvest configuration, read once at startup.
//!
//! The four site settings are required; a missing one is the only error
//! that is fatal to the whole process. Everything else has a default.

use crate::error::{HarvestError, HarvestResult};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_CONCURRENCY: usize = 5;
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_RENDER_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_BLOCK_SIZE: usize = 1024;
const DEFAULT_TAKEDOWN_MARKER: &str = "DMCA";
const DEFAULT_TRANSFER_LOG: &str = "transfers.jsonl";

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Catalogue root listing every creator.
    pub index_url: String,
    /// Prefix joined with the relative hrefs found on listing pages.
    pub media_base_url: String,
    /// Root of the archived pages and downloaded media.
    pub download_root: PathBuf,
    /// Redirect target the site uses for missing or broken pages.
    pub error_sentinel_url: String,
    /// Positions in the creator list to skip outright.
    pub known_broken_page_ids: BTreeSet<usize>,
    pub max_concurrency: usize,
    pub fetch_timeout: Duration,
    pub render_timeout: Duration,
    /// Size of the blocks the media body is written in.
    pub block_size: usize,
    /// Anchors whose text contains this marker are takedown notices.
    pub takedown_marker: String,
    /// Explicit youtube-dl compatible binary; located on PATH when unset.
    pub media_downloader: Option<PathBuf>,
    pub chromium_path: Option<PathBuf>,
    pub transfer_log: PathBuf,
}

impl HarvestConfig {
    /// Build a config with defaults for everything but the site settings.
    pub fn new(
        index_url: impl Into<String>,
        media_base_url: impl Into<String>,
        download_root: impl Into<PathBuf>,
        error_sentinel_url: impl Into<String>,
    ) -> Self {
        let download_root = download_root.into();
        Self {
            index_url: index_url.into(),
            media_base_url: media_base_url.into(),
            transfer_log: download_root.join(DEFAULT_TRANSFER_LOG),
            download_root,
            error_sentinel_url: error_sentinel_url.into(),
            known_broken_page_ids: BTreeSet::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            render_timeout: Duration::from_millis(DEFAULT_RENDER_TIMEOUT_MS),
            block_size: DEFAULT_BLOCK_SIZE,
            takedown_marker: DEFAULT_TAKEDOWN_MARKER.to_string(),
            media_downloader: None,
            chromium_path: None,
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> HarvestResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> HarvestResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> HarvestResult<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| HarvestError::Config(format!("{key} is not set")))
        };

        let mut config = Self::new(
            required("INDEX_URL")?,
            required("MEDIA_BASE_URL")?,
            PathBuf::from(required("DOWNLOAD_ROOT")?),
            required("ERROR_SENTINEL_URL")?,
        );

        if let Some(raw) = lookup("KNOWN_BROKEN_PAGE_IDS") {
            config.known_broken_page_ids = parse_id_list(&raw)?;
        }
        config.max_concurrency =
            read_number(&lookup, "MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY)?.max(1);
        config.fetch_timeout = Duration::from_millis(read_number(
            &lookup,
            "FETCH_TIMEOUT_MS",
            DEFAULT_FETCH_TIMEOUT_MS,
        )?);
        config.render_timeout = Duration::from_millis(read_number(
            &lookup,
            "RENDER_TIMEOUT_MS",
            DEFAULT_RENDER_TIMEOUT_MS,
        )?);
        config.block_size = read_number(&lookup, "DOWNLOAD_BLOCK_SIZE", DEFAULT_BLOCK_SIZE)?.max(1);
        if let Some(marker) = lookup("TAKEDOWN_MARKER").filter(|m| !m.trim().is_empty()) {
            config.takedown_marker = marker.trim().to_string();
        }
        config.media_downloader = lookup("MEDIA_DOWNLOADER")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        config.chromium_path = lookup("CHROMIUM_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        if let Some(path) = lookup("TRANSFER_LOG").filter(|v| !v.trim().is_empty()) {
            config.transfer_log = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Override the download root, moving a defaulted transfer log along.
    pub fn with_download_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if self.transfer_log == self.download_root.join(DEFAULT_TRANSFER_LOG) {
            self.transfer_log = root.join(DEFAULT_TRANSFER_LOG);
        }
        self.download_root = root;
        self
    }
}

/// Parse a comma-separated list of integers, ignoring blanks.
pub fn parse_id_list(raw: &str) -> HarvestResult<BTreeSet<usize>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>().map_err(|_| {
                HarvestError::Config(format!("KNOWN_BROKEN_PAGE_IDS: '{s}' is not an integer"))
            })
        })
        .collect()
}

fn read_number<F, T>(lookup: &F, key: &str, default: T) -> HarvestResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key).map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v
            .parse::<T>()
            .map_err(|_| HarvestError::Config(format!("{key}: '{v}' is not a valid number"))),
        _ => Ok(default),
    }
}
