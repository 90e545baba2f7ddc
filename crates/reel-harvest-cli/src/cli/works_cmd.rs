//! `reel-harvest works <index>`: show one creator page.

use anyhow::{anyhow, Result};

use super::output;
use super::setup::{self, SessionOptions};

pub async fn run(opts: &SessionOptions, index: usize) -> Result<()> {
    // Listing pages are static; no browser needed.
    let opts = SessionOptions {
        no_render: true,
        ..opts.clone()
    };
    let session = setup::open(&opts, false).await?;
    let catalogue = session.coordinator.catalogue();
    let creators = catalogue.list_creators(&session.config.index_url).await?;
    let creator = creators.get(index).ok_or_else(|| {
        anyhow!(
            "no creator at position {index} ({} creators listed)",
            creators.len()
        )
    })?;

    let page = catalogue.creator_page(creator).await?;

    if output::is_json() {
        let works: Vec<serde_json::Value> = page
            .works
            .iter()
            .map(|w| serde_json::json!({ "name": w.name(), "source_url": w.source_url() }))
            .collect();
        output::print_json(&serde_json::json!({
            "creator": &*page.creator,
            "works": works,
        }));
        return Ok(());
    }

    println!("{}", page.creator.name);
    println!("{}", "=".repeat(page.creator.name.chars().count()));
    if let Some(description) = &page.creator.description {
        println!();
        println!("{description}");
    }
    if page.creator.is_takedown {
        println!();
        println!("[!!] Some works were removed after a takedown notice.");
    }
    println!();
    if page.works.is_empty() {
        println!("No works listed.");
    }
    for work in &page.works {
        println!("  {}", work.name());
        if !output::is_quiet() {
            println!("    {}", work.source_url());
        }
    }
    Ok(())
}
