//! Environment readiness check.

use anyhow::Result;
use reel_harvest::renderer::chromium::find_chromium;
use reel_harvest::{ExternalDownloader, HarvestConfig};

use super::output;
use super::setup::{self, SessionOptions};

/// Check configuration, download root, Chromium and the media downloader.
pub async fn run(opts: &SessionOptions) -> Result<()> {
    let config = setup::load_config(opts);

    let config_line = match &config {
        Ok(_) => "[OK] Site configuration complete".to_string(),
        Err(e) => format!("[!!] {e:#}"),
    };
    let root_line = match &config {
        Ok(c) => check_root(c).await,
        Err(_) => "[??] Download root not checked".to_string(),
    };

    let explicit_chromium = config.as_ref().ok().and_then(|c| c.chromium_path.clone());
    let chromium = find_chromium(explicit_chromium.as_deref());
    let explicit_downloader = config.as_ref().ok().and_then(|c| c.media_downloader.clone());
    let downloader = ExternalDownloader::locate(explicit_downloader.as_deref());

    let ready = config.is_ok() && downloader.is_some();

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "config_ok": config.is_ok(),
            "config_error": config.as_ref().err().map(|e| format!("{e:#}")),
            "download_root": config.as_ref().ok().map(|c| c.download_root.display().to_string()),
            "chromium": chromium.as_ref().map(|p| p.display().to_string()),
            "media_downloader": downloader.as_ref().map(|d| d.program().display().to_string()),
            "ready": ready,
        }));
        return Ok(());
    }

    println!("Reel Harvest Doctor");
    println!("===================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();
    println!("{config_line}");
    println!("{root_line}");

    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Script-rendered pages will not resolve (set CHROMIUM_PATH)."
        ),
    }
    match &downloader {
        Some(d) => println!("[OK] Media downloader: {}", d.program().display()),
        None => println!(
            "[!!] No media downloader found (tried {}; set MEDIA_DOWNLOADER).",
            reel_harvest::delegate::DOWNLOADER_CANDIDATES.join(", ")
        ),
    }

    println!();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}

async fn check_root(config: &HarvestConfig) -> String {
    let root = &config.download_root;
    if let Err(e) = tokio::fs::create_dir_all(root).await {
        return format!("[!!] Download root {} not creatable: {e}", root.display());
    }
    let probe = root.join(".reel-harvest-probe");
    match tokio::fs::write(&probe, b"ok").await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
            format!("[OK] Download root {} is writable", root.display())
        }
        Err(e) => format!("[!!] Download root {} not writable: {e}", root.display()),
    }
}
