//! `reel-harvest random`: one random work, for sampling the catalogue.

use anyhow::Result;

use super::output;
use super::progress_ui;
use super::setup::{self, SessionOptions};

pub async fn run(opts: &SessionOptions) -> Result<()> {
    let show_progress = !output::is_quiet() && !output::is_json();
    let mut session = setup::open(opts, show_progress).await?;

    let creators = session
        .coordinator
        .catalogue()
        .list_creators(&session.config.index_url)
        .await?;

    let ui = session.progress.take().map(progress_ui::spawn);
    let report = session
        .coordinator
        .run_random(&creators, &session.cancel)
        .await;

    drop(session);
    if let Some(ui) = ui {
        let _ = ui.await;
    }

    output::print_report(&report);
    Ok(())
}
