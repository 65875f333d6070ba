// src/main.rs

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueHint};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ulog_csv_render::config::PlotConfig;
use ulog_csv_render::data_input::log_parser::{load_csv_directory, topic_summary};
use ulog_csv_render::page_builder::{generate_plots, get_pid_analysis_plots};

#[derive(Parser, Debug)]
#[command(author, version, about = "Renders flight review charts from a ULog CSV export", long_about = None)]
struct Cli {
    /// Directory with the per-topic CSV files of one log
    #[arg(value_hint = ValueHint::DirPath)]
    input_dir: PathBuf,

    /// Log name prefix of the CSV files (inferred when omitted)
    #[arg(long)]
    stem: Option<String>,

    /// Where the images, manifest and HTML are written (defaults to the input directory)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    output_dir: Option<PathBuf>,

    /// TOML file overriding the plot configuration
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Render the PID analysis page instead of the main page
    #[arg(long, action = ArgAction::SetTrue)]
    pid_analysis: bool,

    /// Only write the manifest and HTML
    #[arg(long, action = ArgAction::SetTrue)]
    no_png: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    // --- Configuration ---
    let config = match &cli.config {
        Some(path) => PlotConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PlotConfig::default(),
    };
    let render_png = config.render_png && !cli.no_png;

    // --- Log Loading ---
    let log = load_csv_directory(&cli.input_dir, cli.stem.as_deref())
        .with_context(|| format!("failed to load log from {}", cli.input_dir.display()))?;
    info!(
        "Loaded '{}': {} datasets, {:.1} s",
        log.name,
        log.datasets.len(),
        log.duration_s()
    );
    for (topic, rows) in topic_summary(&log) {
        debug!("  {}: {} rows", topic, rows);
    }

    // --- Page Generation ---
    let (page, prefix) = if cli.pid_analysis {
        (get_pid_analysis_plots(&log, &config), format!("{}_pid_analysis", log.name))
    } else {
        (generate_plots(&log, &config), log.name.clone())
    };

    // --- Output ---
    let output_dir = cli.output_dir.unwrap_or_else(|| cli.input_dir.clone());
    let written = page
        .write(&output_dir, &prefix, render_png)
        .with_context(|| format!("failed to write output to {}", output_dir.display()))?;
    for path in &written {
        info!("Wrote {}", path.display());
    }
    Ok(())
}
