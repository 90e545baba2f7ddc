//! Reel Harvest: catalogue discovery, media resolution and resumable
//! acquisition for an avant-garde film index.

pub mod acquisition;
pub mod archive;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod delegate;
pub mod discovery;
pub mod error;
pub mod html;
pub mod http;
pub mod layout;
pub mod ledger;
pub mod progress;
pub mod renderer;
pub mod resolver;
pub mod types;

pub use acquisition::Acquirer;
pub use archive::Archiver;
pub use config::HarvestConfig;
pub use context::HarvestContext;
pub use coordinator::{BatchReport, Coordinator, CreatorFailure, WorkTally};
pub use delegate::{ExternalDownloader, MediaDownloader, UnavailableDownloader};
pub use discovery::{Catalogue, CreatorPage};
pub use error::{HarvestError, HarvestResult};
pub use http::{Fetcher, HttpClient, HttpPage, MediaStream};
pub use ledger::{TransferLedger, TransferRecord};
pub use progress::{ProgressEvent, ProgressEventKind};
pub use renderer::{NoopRenderer, RenderContext, Renderer};
pub use resolver::Resolver;
pub use types::*;
