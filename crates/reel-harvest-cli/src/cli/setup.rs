//! Wire configuration and collaborators into a harvest session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use reel_harvest::progress::{self, ProgressReceiver};
use reel_harvest::renderer::chromium::ChromiumRenderer;
use reel_harvest::{
    Coordinator, ExternalDownloader, HarvestConfig, HarvestContext, HttpClient, MediaDownloader,
    NoopRenderer, Renderer, TransferLedger, UnavailableDownloader,
};
use tokio_util::sync::CancellationToken;

/// Options from global CLI flags that affect session setup.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub download_root: Option<PathBuf>,
    pub no_render: bool,
}

pub struct Session {
    pub config: Arc<HarvestConfig>,
    pub coordinator: Coordinator,
    pub cancel: CancellationToken,
    pub progress: Option<ProgressReceiver>,
}

/// Read the configuration, honouring `--download-root`.
pub fn load_config(opts: &SessionOptions) -> Result<HarvestConfig> {
    let root_override = opts
        .download_root
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned());

    let config = HarvestConfig::from_lookup(|key| match (key, &root_override) {
        ("DOWNLOAD_ROOT", Some(root)) => Some(root.clone()),
        _ => std::env::var(key).ok(),
    })
    .context("invalid configuration")?;
    Ok(config)
}

/// Build a session. `with_progress` attaches a progress channel whose
/// receiver is handed back for the terminal UI.
pub async fn open(opts: &SessionOptions, with_progress: bool) -> Result<Session> {
    let config = load_config(opts)?;
    tracing::debug!(
        index = %config.index_url,
        root = %config.download_root.display(),
        "configuration loaded"
    );

    let fetcher = Arc::new(HttpClient::new(config.fetch_timeout));
    let renderer = build_renderer(&config, opts.no_render).await;
    let downloader = build_downloader(&config);

    let ledger = TransferLedger::open(&config.transfer_log)?;
    let mut ctx = HarvestContext::new(config, fetcher, renderer, downloader).with_ledger(ledger);

    let mut receiver = None;
    if with_progress {
        let (tx, rx) = progress::channel();
        ctx = ctx.with_progress(tx);
        receiver = Some(rx);
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    Ok(Session {
        config: Arc::clone(&ctx.config),
        coordinator: Coordinator::new(ctx),
        cancel,
        progress: receiver,
    })
}

async fn build_renderer(config: &HarvestConfig, no_render: bool) -> Arc<dyn Renderer> {
    if no_render {
        tracing::info!("rendering disabled, HTTP-only mode");
        return Arc::new(NoopRenderer);
    }
    match ChromiumRenderer::launch(config.chromium_path.as_deref()).await {
        Ok(renderer) => Arc::new(renderer),
        Err(e) => {
            tracing::warn!("browser unavailable, script-rendered pages will not resolve: {e:#}");
            Arc::new(NoopRenderer)
        }
    }
}

fn build_downloader(config: &HarvestConfig) -> Arc<dyn MediaDownloader> {
    match ExternalDownloader::locate(config.media_downloader.as_deref()) {
        Some(downloader) => {
            tracing::debug!(program = %downloader.program().display(), "media downloader found");
            Arc::new(downloader)
        }
        None => {
            tracing::warn!("no media downloader found, embedded players cannot be retrieved");
            Arc::new(UnavailableDownloader)
        }
    }
}

/// First Ctrl-C cancels gracefully; a second one exits immediately.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("interrupt received, finishing in-flight work (Ctrl-C again to abort)");
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}
