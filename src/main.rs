//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror offline mirroring tool.

use anyhow::Context;
use clap::Parser;
use site_mirror::config::{load_config_with_hash, resolve, Config};
use site_mirror::output::print_report;
use site_mirror::Mirror;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site-Mirror: mirror a website (HTML + assets) for offline use
///
/// Downloads the start page and the same-host pages and assets reachable
/// within the link depth, rewrites links to relative local paths, and writes
/// the copy under `<outdir>/<host>/`.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version)]
#[command(about = "Mirror a website (HTML + assets) for offline use", long_about = None)]
struct Cli {
    /// Start URL (may instead be given as `start-url` in the config file)
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Recursion depth for page links (0 = only the start page)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Output directory (root for the mirrored site)
    #[arg(short, long, value_name = "DIR")]
    outdir: Option<PathBuf>,

    /// Global and per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Number of parallel downloads
    #[arg(short = 'c', long)]
    parallel: Option<usize>,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let mirror_config = resolve(&config).context("Invalid configuration")?;

    let mirror = Mirror::new(mirror_config).context("Failed to prepare mirror")?;

    match mirror.run().await {
        Ok(report) => {
            tracing::info!("Done. Saved to {}", report.root_dir.display());
            if !cli.quiet {
                print_report(&report);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Merges the optional config file with command-line flags
///
/// Flags win over file values, which win over defaults.
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(url) = &cli.url {
        config.start_url = Some(url.clone());
    }
    if let Some(depth) = cli.depth {
        config.crawler.max_depth = depth;
    }
    if let Some(outdir) = &cli.outdir {
        config.output.directory = outdir.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.crawler.timeout_secs = timeout;
    }
    if let Some(parallel) = cli.parallel {
        config.crawler.concurrency = parallel;
    }

    Ok(config)
}
