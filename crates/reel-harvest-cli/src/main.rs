//! Reel Harvest: command-line entry point.

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod cli;

#[derive(Parser)]
#[command(
    name = "reel-harvest",
    about = "Reel Harvest: archive and download a film index, creator by creator",
    version,
    after_help = "Site settings are read from the environment (or a .env file):\n  INDEX_URL, MEDIA_BASE_URL, DOWNLOAD_ROOT, ERROR_SENTINEL_URL"
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Never launch a browser; script-rendered pages fail to resolve
    #[arg(long, global = true)]
    no_render: bool,

    /// Override DOWNLOAD_ROOT
    #[arg(long, global = true)]
    download_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest every creator (or the named ones) in index order
    Run {
        /// Works downloaded in parallel per creator (overrides MAX_CONCURRENCY)
        #[arg(long)]
        max_concurrency: Option<usize>,
        /// Only harvest this creator (case-insensitive name, repeatable)
        #[arg(long = "creator")]
        creators: Vec<String>,
        /// Download one work at a time
        #[arg(long, conflicts_with = "max_concurrency")]
        sequential: bool,
    },
    /// List the creators on the index page
    Creators,
    /// Show one creator's description and works
    Works {
        /// Position in the `creators` listing
        index: usize,
    },
    /// Download one random work of one random creator
    Random,
    /// Check configuration, browser and media downloader
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    cli::output::set_flags(cli.json, cli.quiet);
    init_tracing(&cli.log_level, cli.json_logs);

    let opts = cli::setup::SessionOptions {
        download_root: cli.download_root.clone(),
        no_render: cli.no_render,
    };

    let result = match cli.command {
        Commands::Run {
            max_concurrency,
            creators,
            sequential,
        } => {
            let concurrency = if sequential { Some(1) } else { max_concurrency };
            cli::run_cmd::run(&opts, concurrency, &creators).await
        }
        Commands::Creators => cli::creators_cmd::run(&opts).await,
        Commands::Works { index } => cli::works_cmd::run(&opts, index).await,
        Commands::Random => cli::random_cmd::run(&opts).await,
        Commands::Doctor => cli::doctor::run(&opts).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "reel-harvest", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        tracing::error!("{e:#}");
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !cli::output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
