//! `reel-harvest run`: harvest the whole index or selected creators.

use anyhow::{bail, Result};
use reel_harvest::Creator;

use super::output;
use super::progress_ui;
use super::setup::{self, SessionOptions};

pub async fn run(
    opts: &SessionOptions,
    max_concurrency: Option<usize>,
    only: &[String],
) -> Result<()> {
    let show_progress = !output::is_quiet() && !output::is_json();
    let mut session = setup::open(opts, show_progress).await?;
    let concurrency = max_concurrency
        .unwrap_or(session.config.max_concurrency)
        .max(1);

    let all = session
        .coordinator
        .catalogue()
        .list_creators(&session.config.index_url)
        .await?;
    let creators = select_creators(all, only)?;

    tracing::info!(
        creators = creators.len(),
        concurrency,
        root = %session.config.download_root.display(),
        "starting harvest"
    );

    let ui = session.progress.take().map(progress_ui::spawn);

    let report = session
        .coordinator
        .run_batch(&creators, concurrency, &session.cancel)
        .await;

    // Dropping the session closes the progress channel.
    drop(session);
    if let Some(ui) = ui {
        let _ = ui.await;
    }

    output::print_report(&report);
    Ok(())
}

/// Keep only the creators named on the command line, in index order.
fn select_creators(all: Vec<Creator>, only: &[String]) -> Result<Vec<Creator>> {
    if only.is_empty() {
        return Ok(all);
    }

    let unknown: Vec<&String> = only
        .iter()
        .filter(|name| !all.iter().any(|c| c.name.eq_ignore_ascii_case(name)))
        .collect();
    if !unknown.is_empty() {
        bail!(
            "unknown creator(s): {}",
            unknown
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(all
        .into_iter()
        .filter(|c| only.iter().any(|name| c.name.eq_ignore_ascii_case(name)))
        .collect())
}
