//! Output mode flags and printers shared by every subcommand.

use std::sync::atomic::{AtomicBool, Ordering};

use reel_harvest::BatchReport;

static JSON: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_flags(json: bool, quiet: bool) {
    JSON.store(json, Ordering::Relaxed);
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON.load(Ordering::Relaxed)
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: could not serialize output: {e}"),
    }
}

/// Print a batch summary in the selected output mode.
pub fn print_report(report: &BatchReport) {
    if is_json() {
        match serde_json::to_value(report) {
            Ok(v) => print_json(&v),
            Err(e) => eprintln!("  Error: could not serialize report: {e}"),
        }
        return;
    }

    println!();
    println!("Harvest summary");
    println!("===============");
    println!("Creators processed: {}", report.creators_processed);
    if report.creators_failed > 0 {
        println!("Creators failed:    {}", report.creators_failed);
    }
    println!("Downloaded:         {}", report.works.downloaded);
    println!("Skipped (exists):   {}", report.works.skipped);
    println!("Delegated:          {}", report.works.delegated);
    println!("Failed:             {}", report.works.failed);
    println!("Elapsed:            {}", format_duration(report.elapsed_ms));
    if report.cancelled {
        println!("Interrupted before completion.");
    }

    for failure in &report.failed_creators {
        println!(
            "  [!!] {} ({}): {}",
            failure.creator.name, failure.kind, failure.message
        );
    }
}

pub fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    if secs >= 3600 {
        format!("{}h{:02}m{:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}.{:01}s", secs, (ms % 1000) / 100)
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(1_500), "1.5s");
        assert_eq!(format_duration(125_000), "2m05s");
        assert_eq!(format_duration(3_725_000), "1h02m05s");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
