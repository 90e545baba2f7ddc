//! Concurrency coordinator: creators run one after another, each
//! creator's works run on a bounded pool.
//!
//! Works are dispatched in discovery order; a permit is taken before each
//! spawn, so at most `max_concurrency` works are in flight. Every spawned
//! unit is awaited before the creator is reported finished, and a failing
//! or panicking unit never cancels its siblings.

use crate::acquisition::Acquirer;
use crate::context::HarvestContext;
use crate::discovery::Catalogue;
use crate::progress::{self, ProgressEventKind};
use crate::resolver::Resolver;
use crate::types::{AcquisitionOutcome, Creator, Work};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A creator whose listing could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct CreatorFailure {
    pub creator: Creator,
    pub kind: String,
    pub message: String,
}

/// Per-outcome counts for a set of works.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkTally {
    pub downloaded: u32,
    pub skipped: u32,
    pub delegated: u32,
    pub failed: u32,
}

impl WorkTally {
    pub fn record(&mut self, outcome: &AcquisitionOutcome) {
        match outcome {
            AcquisitionOutcome::Downloaded(_) => self.downloaded += 1,
            AcquisitionOutcome::Skipped(_) => self.skipped += 1,
            AcquisitionOutcome::Delegated => self.delegated += 1,
            AcquisitionOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: WorkTally) {
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.delegated += other.delegated;
        self.failed += other.failed;
    }

    pub fn total(&self) -> u32 {
        self.downloaded + self.skipped + self.delegated + self.failed
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub creators_processed: u32,
    pub creators_failed: u32,
    pub works: WorkTally,
    pub failed_creators: Vec<CreatorFailure>,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

#[derive(Clone)]
pub struct Coordinator {
    ctx: HarvestContext,
    catalogue: Catalogue,
    resolver: Resolver,
    acquirer: Acquirer,
}

impl Coordinator {
    pub fn new(ctx: HarvestContext) -> Self {
        Self {
            catalogue: Catalogue::new(ctx.clone()),
            resolver: Resolver::new(ctx.clone()),
            acquirer: Acquirer::new(ctx.clone()),
            ctx,
        }
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Process every creator in order, each creator's works on a pool of
    /// `max_concurrency` workers.
    pub async fn run_batch(
        &self,
        creators: &[Creator],
        max_concurrency: usize,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::default();

        for creator in creators {
            if cancel.is_cancelled() {
                tracing::info!("batch cancelled, stopping before {}", creator.name);
                report.cancelled = true;
                break;
            }
            self.run_creator(creator, max_concurrency, cancel, &mut report)
                .await;
        }

        report.cancelled |= cancel.is_cancelled();
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            creators = report.creators_processed,
            creators_failed = report.creators_failed,
            downloaded = report.works.downloaded,
            skipped = report.works.skipped,
            delegated = report.works.delegated,
            failed = report.works.failed,
            "batch complete"
        );
        report
    }

    /// List one creator's works and acquire them on the pool.
    pub async fn run_creator(
        &self,
        creator: &Creator,
        max_concurrency: usize,
        cancel: &CancellationToken,
        report: &mut BatchReport,
    ) {
        let started = Instant::now();
        let mut seq = 0u64;

        let works = match self.catalogue.list_works(creator).await {
            Ok(works) => works,
            Err(e) => {
                tracing::error!(creator = %creator.name, kind = e.kind(), "listing works failed: {e}");
                let mut failed = creator.clone();
                failed.is_unavailable = matches!(
                    e,
                    crate::error::HarvestError::PageUnavailable { .. }
                );
                report.creators_failed += 1;
                report.failed_creators.push(CreatorFailure {
                    creator: failed,
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                });
                return;
            }
        };

        progress::emit(
            &self.ctx.progress,
            &creator.name,
            &mut seq,
            ProgressEventKind::CreatorStarted {
                works: works.len() as u32,
            },
        );

        let tally = self.dispatch(works, max_concurrency, cancel).await;
        report.works.merge(tally);
        report.creators_processed += 1;

        progress::emit(
            &self.ctx.progress,
            &creator.name,
            &mut seq,
            ProgressEventKind::CreatorFinished {
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
        );
    }

    /// Resolve and acquire `works` with at most `max_concurrency` in flight.
    pub async fn dispatch(
        &self,
        works: Vec<Work>,
        max_concurrency: usize,
        cancel: &CancellationToken,
    ) -> WorkTally {
        let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
        let mut set: JoinSet<AcquisitionOutcome> = JoinSet::new();
        let mut tally = WorkTally::default();

        for work in works {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let resolver = self.resolver.clone();
            let acquirer = self.acquirer.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                let _permit = permit;
                let resolved = resolver.resolve(work, &cancel).await;
                acquirer.acquire(&resolved, &cancel).await
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => tally.record(&outcome),
                Err(e) => {
                    tracing::error!("work task aborted: {e}");
                    tally.failed += 1;
                }
            }
        }

        tally
    }

    /// Acquire one creator's works one at a time.
    pub async fn run_creator_sequential(
        &self,
        creator: &Creator,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::default();
        self.run_creator(creator, 1, cancel, &mut report).await;
        report.cancelled = cancel.is_cancelled();
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        report
    }

    /// Acquire one randomly chosen work of one randomly chosen creator.
    pub async fn run_random(
        &self,
        creators: &[Creator],
        cancel: &CancellationToken,
    ) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::default();

        let Some(creator) = creators.choose(&mut rand::thread_rng()) else {
            tracing::info!("no creators to pick from");
            return report;
        };
        tracing::info!(creator = %creator.name, "picked random creator");

        match self.catalogue.list_works(creator).await {
            Ok(mut works) => {
                report.creators_processed = 1;
                if works.is_empty() {
                    return report;
                }
                let index = rand::thread_rng().gen_range(0..works.len());
                let work = works.swap_remove(index);
                tracing::info!(work = %work.label(), "picked random work");
                let resolved = self.resolver.resolve(work, cancel).await;
                let outcome = self.acquirer.acquire(&resolved, cancel).await;
                report.works.record(&outcome);
            }
            Err(e) => {
                tracing::error!(creator = %creator.name, "listing works failed: {e}");
                report.creators_failed = 1;
                report.failed_creators.push(CreatorFailure {
                    creator: creator.clone(),
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                });
            }
        }

        report.cancelled = cancel.is_cancelled();
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        report
    }
}
