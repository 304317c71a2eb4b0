//! # repo-manager CLI Entry Point
//!
//! Loads the manifest(s) named by `--config_file` and fetches every
//! dependency they declare.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use repo_manager::deps::{
    self, FailurePolicy, FetchContext, FetchOptions, HttpDownloader, Orchestrator,
};
use repo_manager::manifest::{DEFAULT_MANIFEST_PATH, Manifest};

#[cfg(windows)]
#[link(name = "kernel32")]
unsafe extern "system" {
    fn SetConsoleOutputCP(wCodePageID: u32) -> i32;
}

#[cfg(windows)]
fn enable_windows_utf8_console() {
    unsafe {
        SetConsoleOutputCP(65001);
    }
}

#[cfg(not(windows))]
fn enable_windows_utf8_console() {}

#[derive(Parser)]
#[command(name = "repo-manager")]
#[command(about = "Fetch the dependencies declared in repo manifests", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Manifest file, or a directory of *.json manifests
    #[arg(long = "config_file", visible_alias = "config-file", default_value = DEFAULT_MANIFEST_PATH)]
    config_file: PathBuf,

    /// Keep fetching after a dependency fails and report all failures at the end
    #[arg(long)]
    keep_going: bool,

    /// Check that existing git checkouts match their manifest entry
    #[arg(long)]
    verify_existing: bool,

    /// Print what would be fetched without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Show debug diagnostics
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            policy: if self.keep_going {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Abort
            },
            verify_existing: self.verify_existing,
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    enable_windows_utf8_console();

    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!("Using manifest path {}", cli.config_file.display());

    let root = std::env::current_dir().context("Could not determine the working directory")?;
    let manifest_path = root.join(&cli.config_file);
    let manifest = Manifest::load_path(&manifest_path)?;

    let downloader = HttpDownloader::default();
    let ctx = FetchContext::new(root, cli.fetch_options(), &downloader);
    let orchestrator = Orchestrator::new(ctx);

    if cli.dry_run {
        let steps = deps::plan(&manifest)?;
        println!("{} {} dependencies planned", "📋".blue(), steps.len());
        for step in &steps {
            let target = step
                .destination(orchestrator.context().root())
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "   {} {} -> {}",
                format!("[{}]", step.strategy.kind()).cyan(),
                step.name.bold(),
                target
            );
        }
        return Ok(());
    }

    let report = orchestrator.run(&manifest)?;
    report.print_summary();
    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
