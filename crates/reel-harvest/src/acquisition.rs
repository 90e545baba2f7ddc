//! Acquisition engine: stream a resolved work to disk, or hand it to the
//! external media downloader.
//!
//! Direct path: archive the detail page, skip when the destination exists,
//! stream the media body in fixed-size blocks into `<file>.part`, rename
//! into place. Any transport-level failure on that path (unresolved work,
//! sentinel redirect, timeout, connection error) routes into the
//! alternate path. Filesystem failures and cancellation are terminal.

use crate::context::HarvestContext;
use crate::error::{HarvestError, HarvestResult};
use crate::html::{self, MediaContainer};
use crate::layout;
use crate::ledger::TransferRecord;
use crate::progress::{self, ByteCounter, ProgressEventKind};
use crate::renderer;
use crate::types::{
    AcquisitionOutcome, RenderAttempt, ResolutionResult, ResolvedWork, UnresolvedReason, Work,
};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Why the direct path handed over to the alternate path.
#[derive(Debug)]
enum Direct {
    Done(AcquisitionOutcome, u64),
    Fallback(String),
}

#[derive(Clone)]
pub struct Acquirer {
    ctx: HarvestContext,
}

impl Acquirer {
    pub fn new(ctx: HarvestContext) -> Self {
        Self { ctx }
    }

    /// Acquire one resolved work. Never panics on network or disk errors;
    /// every failure is reported as `Failed`.
    pub async fn acquire(
        &self,
        resolved: &ResolvedWork,
        cancel: &CancellationToken,
    ) -> AcquisitionOutcome {
        let work = resolved.work();
        let key = work.label();
        let mut seq = 0u64;
        let started = Instant::now();
        progress::emit(&self.ctx.progress, &key, &mut seq, ProgressEventKind::WorkStarted);

        self.archive_detail_page(resolved).await;

        let (outcome, bytes) = match self.acquire_direct(resolved, cancel, &key, &mut seq).await {
            Direct::Done(outcome, bytes) => (outcome, bytes),
            Direct::Fallback(reason) => {
                tracing::info!(work = %key, reason = %reason, "direct download unavailable, trying alternate acquisition");
                progress::emit(
                    &self.ctx.progress,
                    &key,
                    &mut seq,
                    ProgressEventKind::FallbackTriggered { reason },
                );
                (self.acquire_alternate(resolved, cancel).await, 0)
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            AcquisitionOutcome::Downloaded(path) => {
                tracing::info!(work = %key, path = %path.display(), bytes, "downloaded")
            }
            AcquisitionOutcome::Skipped(path) => {
                tracing::info!(work = %key, path = %path.display(), "file exists, skipping")
            }
            AcquisitionOutcome::Delegated => {
                tracing::info!(work = %key, "retrieved by media downloader")
            }
            AcquisitionOutcome::Failed(e) => {
                tracing::error!(work = %key, kind = e.kind(), "acquisition failed: {e}")
            }
        }

        self.ctx.record_transfer(&TransferRecord::from_outcome(
            work,
            resolved.media_url(),
            &outcome,
            bytes,
            elapsed_ms,
        ));
        progress::emit(
            &self.ctx.progress,
            &key,
            &mut seq,
            ProgressEventKind::WorkFinished {
                outcome: outcome.kind().to_string(),
                elapsed_ms,
            },
        );

        outcome
    }

    async fn archive_detail_page(&self, resolved: &ResolvedWork) {
        let work = resolved.work();
        match resolved.detail_html() {
            Some(body) => self.archive_detail(work, body).await,
            None => tracing::debug!(work = %work.label(), "no detail page to archive"),
        }
    }

    async fn archive_detail(&self, work: &Work, body: &str) {
        self.ctx
            .archiver
            .save_html(
                work.source_url(),
                body,
                Some(&work.creator().slug()),
                Some(&work.slug()),
            )
            .await;
    }

    async fn acquire_direct(
        &self,
        resolved: &ResolvedWork,
        cancel: &CancellationToken,
        key: &str,
        seq: &mut u64,
    ) -> Direct {
        let media_url = match resolved.resolution() {
            ResolutionResult::Resolved(url) => url.as_str(),
            ResolutionResult::Unresolved(UnresolvedReason::Cancelled) => {
                return Direct::Done(AcquisitionOutcome::Failed(HarvestError::Cancelled), 0);
            }
            ResolutionResult::Unresolved(reason) => {
                return Direct::Fallback(format!("unresolved: {reason}"));
            }
        };

        let dest = layout::media_destination(
            &self.ctx.config.download_root,
            resolved.work(),
            media_url,
        );

        // Existence alone gates re-download.
        match tokio::fs::try_exists(&dest).await {
            Ok(true) => return Direct::Done(AcquisitionOutcome::Skipped(dest), 0),
            Ok(false) => {}
            Err(e) => {
                return Direct::Done(
                    AcquisitionOutcome::Failed(HarvestError::filesystem(&dest, e)),
                    0,
                )
            }
        }

        if cancel.is_cancelled() {
            return Direct::Done(AcquisitionOutcome::Failed(HarvestError::Cancelled), 0);
        }

        let stream = match self.ctx.fetcher.stream(media_url).await {
            Ok(stream) => stream,
            Err(e) => return Direct::Fallback(format!("media fetch failed: {e}")),
        };
        if stream.is_sentinel(&self.ctx.config.error_sentinel_url) {
            return Direct::Fallback(format!("{media_url} redirected to the error page"));
        }
        if !stream.is_success() {
            return Direct::Fallback(format!("{media_url} returned HTTP {}", stream.status));
        }

        if let Some(parent) = dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Direct::Done(
                    AcquisitionOutcome::Failed(HarvestError::filesystem(parent, e)),
                    0,
                );
            }
        }

        progress::emit(
            &self.ctx.progress,
            key,
            seq,
            ProgressEventKind::DownloadStarted {
                path: dest.display().to_string(),
                total_bytes: stream.content_length,
            },
        );

        let part = part_path(&dest);
        let mut counter = ByteCounter::new(stream.content_length);
        let written = self
            .write_body(stream.body, &part, &mut counter, cancel, key, seq)
            .await;

        match written {
            Ok(()) => match tokio::fs::rename(&part, &dest).await {
                Ok(()) => Direct::Done(AcquisitionOutcome::Downloaded(dest), counter.written),
                Err(e) => {
                    remove_partial(&part).await;
                    Direct::Done(
                        AcquisitionOutcome::Failed(HarvestError::filesystem(&dest, e)),
                        counter.written,
                    )
                }
            },
            Err(e) => {
                remove_partial(&part).await;
                if e.is_transport() {
                    Direct::Fallback(format!("media stream interrupted: {e}"))
                } else {
                    Direct::Done(AcquisitionOutcome::Failed(e), counter.written)
                }
            }
        }
    }

    /// Write the body to `path` in blocks of the configured size, checking
    /// for cancellation before each block and bounding each chunk wait.
    async fn write_body(
        &self,
        mut body: futures::stream::BoxStream<'static, HarvestResult<bytes::Bytes>>,
        path: &Path,
        counter: &mut ByteCounter,
        cancel: &CancellationToken,
        key: &str,
        seq: &mut u64,
    ) -> HarvestResult<()> {
        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| HarvestError::filesystem(path, e))?;
        let mut writer = tokio::io::BufWriter::new(file);
        let block_size = self.ctx.config.block_size.max(1);
        let timeout = self.ctx.config.fetch_timeout;

        loop {
            if cancel.is_cancelled() {
                return Err(HarvestError::Cancelled);
            }
            let chunk = match tokio::time::timeout(timeout, body.next()).await {
                Ok(Some(chunk)) => chunk?,
                Ok(None) => break,
                Err(_) => {
                    return Err(HarvestError::Timeout {
                        url: path.display().to_string(),
                    })
                }
            };

            for block in chunk.chunks(block_size) {
                if cancel.is_cancelled() {
                    return Err(HarvestError::Cancelled);
                }
                writer
                    .write_all(block)
                    .await
                    .map_err(|e| HarvestError::filesystem(path, e))?;
                if counter.add(block.len() as u64) {
                    progress::emit(
                        &self.ctx.progress,
                        key,
                        seq,
                        ProgressEventKind::BytesWritten {
                            written: counter.written,
                            total: counter.total,
                        },
                    );
                }
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| HarvestError::filesystem(path, e))?;
        progress::emit(
            &self.ctx.progress,
            key,
            seq,
            ProgressEventKind::BytesWritten {
                written: counter.written,
                total: counter.total,
            },
        );
        Ok(())
    }

    /// Alternate acquisition: find the embedded frame and delegate.
    async fn acquire_alternate(
        &self,
        resolved: &ResolvedWork,
        cancel: &CancellationToken,
    ) -> AcquisitionOutcome {
        let work = resolved.work();
        let page_url = work.source_url();

        if cancel.is_cancelled() {
            return AcquisitionOutcome::Failed(HarvestError::Cancelled);
        }

        let src = match self.find_frame_source(resolved).await {
            Ok(Some(src)) => layout::absolutize(page_url, &src),
            Ok(None) => {
                return AcquisitionOutcome::Failed(HarvestError::NoMediaSource {
                    url: page_url.to_string(),
                })
            }
            Err(e) => return AcquisitionOutcome::Failed(e),
        };

        if cancel.is_cancelled() {
            return AcquisitionOutcome::Failed(HarvestError::Cancelled);
        }

        let dir = layout::work_dir(&self.ctx.config.download_root, work);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            return AcquisitionOutcome::Failed(HarvestError::filesystem(dir, e));
        }
        let template = layout::delegate_template(&self.ctx.config.download_root, work);

        let delegated = tokio::select! {
            _ = cancel.cancelled() => Err(HarvestError::Cancelled),
            result = self.ctx.downloader.download(&src, &template) => result,
        };
        match delegated {
            Ok(()) => AcquisitionOutcome::Delegated,
            Err(e) => AcquisitionOutcome::Failed(e),
        }
    }

    /// Frame source from the static container, else from a rendered page.
    ///
    /// Rendering happens only when the container exists without a frame
    /// and resolution did not already try the renderer.
    async fn find_frame_source(&self, resolved: &ResolvedWork) -> HarvestResult<Option<String>> {
        let work = resolved.work();
        let page_url = work.source_url();

        if resolved.resolution()
            == &ResolutionResult::Unresolved(UnresolvedReason::PageUnavailable)
            && resolved.detail_html().is_some()
        {
            return Ok(None);
        }

        let fetched;
        let detail = match resolved.detail_html() {
            Some(body) => body,
            None => {
                let page = self.ctx.fetcher.get(page_url).await?;
                self.archive_detail(work, &page.body).await;
                if page.is_sentinel(&self.ctx.config.error_sentinel_url) || !page.is_success() {
                    return Err(HarvestError::PageUnavailable {
                        url: page_url.to_string(),
                    });
                }
                fetched = page.body;
                &fetched
            }
        };

        match html::inspect_media_container(detail) {
            MediaContainer::Missing => Ok(None),
            MediaContainer::Present {
                frame_src: Some(src),
                ..
            } => Ok(Some(src)),
            MediaContainer::Present {
                frame_src: None, ..
            } => match resolved.render_attempt() {
                RenderAttempt::Rendered(rendered) => Ok(html::find_frame_src(rendered)),
                RenderAttempt::Failed => Ok(None),
                RenderAttempt::NotAttempted => {
                    tracing::info!(work = %work.label(), "frame absent from static page, rendering");
                    match renderer::render_html(
                        self.ctx.renderer.as_ref(),
                        page_url,
                        self.ctx.config.render_timeout,
                    )
                    .await
                    {
                        Ok(rendered) => Ok(html::find_frame_src(&rendered)),
                        Err(e) => {
                            tracing::warn!(work = %work.label(), "render for frame source failed: {e}");
                            Ok(None)
                        }
                    }
                }
            },
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn remove_partial(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %part.display(), "failed to remove partial download: {e}");
        }
    }
}
