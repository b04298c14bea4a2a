//! Infrastructure inspection tool.
//!
//! Loads a region/template catalog and a captured frame, runs every configured
//! analyzer over the frame and prints one JSON report entry per analyzer.

mod config;
mod frame;
mod report;

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;

/// Read operator moods, counters and status icons from a captured frame.
#[derive(Parser)]
#[command(name = "infrastbuddy")]
struct Cli {
    /// Captured frame (PNG).
    frame: PathBuf,

    /// Catalog directory (defaults to the configured one).
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Only run the analyzer with this name (repeatable).
    #[arg(long)]
    only: Vec<String>,

    /// Save every configured ROI crop into this directory.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Remember `--catalog` as the default catalog.
    #[arg(long)]
    save: bool,
}

fn main() -> ExitCode {
    // Structured logging. Use `RUST_LOG=debug` etc.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every analyzer succeeded.
fn run(cli: Cli) -> Result<bool> {
    let mut cfg = config::Config::load_or_default();
    if cli.save {
        if let Some(dir) = &cli.catalog {
            cfg.catalog_dir = Some(dir.clone());
        }
        cfg.save().context("save config")?;
    }

    let catalog_dir = cli
        .catalog
        .clone()
        .or_else(|| cfg.catalog_dir.clone())
        .context("no --catalog given and no catalog_dir configured")?;
    let frame = frame::load(&cli.frame, cfg.max_capture_height)?;
    let catalog = catalog::Catalog::load(&catalog_dir)?
        .rescaled_for(frame.height())
        .context("rescale catalog to frame")?;

    if let Some(dir) = &cli.dump_dir {
        let saved = report::dump_rois(&catalog, frame.as_image(), dir)?;
        tracing::info!(saved, dir = %dir.display(), "dumped roi crops");
    }

    let entries = report::run(&catalog, frame.as_image(), &cli.only);
    let json = if cfg.pretty {
        serde_json::to_string_pretty(&entries)
    } else {
        serde_json::to_string(&entries)
    }
    .context("serialize report")?;
    println!("{json}");

    Ok(entries.iter().all(|e| e.ok))
}
