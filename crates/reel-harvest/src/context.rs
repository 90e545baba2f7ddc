//! Execution context shared by every pipeline stage.
//!
//! Collaborators are passed in explicitly so each one can be swapped for
//! a test double.

use crate::archive::Archiver;
use crate::config::HarvestConfig;
use crate::delegate::MediaDownloader;
use crate::http::Fetcher;
use crate::ledger::{TransferLedger, TransferRecord};
use crate::progress::ProgressSender;
use crate::renderer::Renderer;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct HarvestContext {
    pub config: Arc<HarvestConfig>,
    pub fetcher: Arc<dyn Fetcher>,
    pub renderer: Arc<dyn Renderer>,
    pub downloader: Arc<dyn MediaDownloader>,
    pub archiver: Archiver,
    pub progress: Option<ProgressSender>,
    pub ledger: Option<Arc<Mutex<TransferLedger>>>,
}

impl HarvestContext {
    pub fn new(
        config: HarvestConfig,
        fetcher: Arc<dyn Fetcher>,
        renderer: Arc<dyn Renderer>,
        downloader: Arc<dyn MediaDownloader>,
    ) -> Self {
        let archiver = Archiver::new(config.download_root.clone());
        Self {
            config: Arc::new(config),
            fetcher,
            renderer,
            downloader,
            archiver,
            progress: None,
            ledger: None,
        }
    }

    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn with_ledger(mut self, ledger: TransferLedger) -> Self {
        self.ledger = Some(Arc::new(Mutex::new(ledger)));
        self
    }

    /// Append to the transfer ledger, if one is attached. Never fails.
    pub fn record_transfer(&self, record: &TransferRecord) {
        let Some(ledger) = &self.ledger else {
            return;
        };
        let mut guard = match ledger.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = guard.record(record) {
            tracing::warn!(path = %guard.path().display(), "transfer ledger write failed: {e:#}");
        }
    }
}
