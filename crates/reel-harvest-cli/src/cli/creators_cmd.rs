//! `reel-harvest creators`: list the creator index.

use anyhow::Result;

use super::output;
use super::setup::{self, SessionOptions};

pub async fn run(opts: &SessionOptions) -> Result<()> {
    // Listing pages are static; no browser needed.
    let opts = SessionOptions {
        no_render: true,
        ..opts.clone()
    };
    let session = setup::open(&opts, false).await?;
    let creators = session
        .coordinator
        .catalogue()
        .list_creators(&session.config.index_url)
        .await?;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&creators)?);
        return Ok(());
    }

    if creators.is_empty() {
        println!("No creators listed on {}", session.config.index_url);
        return Ok(());
    }

    let width = creators.len().to_string().len();
    for (i, creator) in creators.iter().enumerate() {
        println!("{i:>width$}  {}", creator.name);
        if !output::is_quiet() {
            println!("{:>width$}  {}", "", creator.source_url);
        }
    }
    if !output::is_quiet() {
        println!();
        println!("{} creators", creators.len());
    }
    Ok(())
}
