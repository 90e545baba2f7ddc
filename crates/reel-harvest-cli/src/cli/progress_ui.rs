//! Terminal progress bars driven by the harvest progress channel.

use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reel_harvest::progress::{ProgressEventKind, ProgressReceiver};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Render progress events until the sender side is dropped.
pub fn spawn(mut rx: ProgressReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        let multi = MultiProgress::new();
        let mut creators: HashMap<String, ProgressBar> = HashMap::new();
        let mut downloads: HashMap<String, ProgressBar> = HashMap::new();

        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "progress display lagging");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            match event.event {
                ProgressEventKind::CreatorStarted { works } => {
                    let bar = multi.add(creator_bar(works as u64));
                    bar.set_message(event.key.clone());
                    creators.insert(event.key, bar);
                }
                ProgressEventKind::CreatorFinished { .. } => {
                    if let Some(bar) = creators.remove(&event.key) {
                        bar.finish_and_clear();
                        let _ = multi.println(format!("  {} done ({} works)", event.key, bar.position()));
                    }
                }
                ProgressEventKind::DownloadStarted { total_bytes, .. } => {
                    let bar = multi.add(download_bar(total_bytes));
                    bar.set_message(event.key.clone());
                    downloads.insert(event.key, bar);
                }
                ProgressEventKind::BytesWritten { written, .. } => {
                    if let Some(bar) = downloads.get(&event.key) {
                        bar.set_position(written);
                    }
                }
                ProgressEventKind::FallbackTriggered { reason } => {
                    let _ = multi.println(format!("  [->] {}: {reason}", event.key));
                }
                ProgressEventKind::Warning { message } => {
                    let _ = multi.println(format!("  [!!] {}: {message}", event.key));
                }
                ProgressEventKind::WorkFinished { outcome, .. } => {
                    if let Some(bar) = downloads.remove(&event.key) {
                        bar.finish_and_clear();
                    }
                    let owner = creators.iter().find(|(name, _)| {
                        event
                            .key
                            .strip_prefix(name.as_str())
                            .is_some_and(|rest| rest.starts_with('/'))
                    });
                    if let Some((_, bar)) = owner {
                        bar.inc(1);
                    }
                    if outcome == "failed" {
                        let _ = multi.println(format!("  [!!] {} failed", event.key));
                    }
                }
                ProgressEventKind::WorkStarted => {}
            }
        }

        for (_, bar) in creators.into_iter().chain(downloads) {
            bar.finish_and_clear();
        }
    })
}

fn creator_bar(works: u64) -> ProgressBar {
    let pb = ProgressBar::new(works);
    pb.set_style(
        ProgressStyle::default_bar()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.green} [{bar:30.green/dim}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn download_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:30.cyan/dim}] {bytes}/{total_bytes} {bytes_per_sec} {msg}")
                    .unwrap()
                    .progress_chars("█▓░"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .template("    {spinner:.cyan} {bytes} {bytes_per_sec} {msg}")
                    .unwrap(),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}
