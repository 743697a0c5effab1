use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use log::{error, info};
use std::path::PathBuf;

use tilestitch::config::PipelineConfig;
use tilestitch::engine::FijiEngine;
use tilestitch::workflow::{self, Outcome};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "tilestitch")]
#[command(
    version,
    about = "Reorganize, background-subtract and stitch tiled microscopy scans"
)]
struct Cli {
    /// Folder to scan (all subfolders are visited)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Fiji launcher (defaults to ~/Fiji.app/<launcher>)
    #[arg(long, value_name = "PATH", env = "FIJI_EXECUTABLE")]
    fiji: Option<PathBuf>,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Parallel background-subtraction jobs per folder
    #[arg(short = 'j', long, value_name = "N")]
    jobs: Option<usize>,

    /// Write the run summary as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();
    builder.init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    }
}

/// Returns whether every folder succeeded
fn run(cli: Cli) -> Result<bool> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(jobs) = cli.jobs {
        config.jobs = jobs;
    }
    config.validate()?;

    if cli.print_config {
        println!("{}", config.to_json()?);
        return Ok(true);
    }

    let engine = FijiEngine::locate(cli.fiji)?;
    info!("🔬 Using Fiji at {}", engine.executable().display());

    let summary = workflow::run(&cli.input, &config, &engine)
        .with_context(|| format!("cannot process {}", cli.input.display()))?;

    if let Some(path) = &cli.report {
        summary
            .write_json(path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        info!("📝 Report written to {}", path.display());
    }

    println!();
    println!(
        "📊 {} stitched, {} skipped, {} failed",
        summary.stitched_count(),
        summary.skipped_count(),
        summary.failed_count()
    );
    for report in &summary.directories {
        match &report.outcome {
            Outcome::Stitched { output, grid, .. } => {
                println!("✅ {} → {} ({} grid)", report.path.display(), output.display(), grid)
            }
            Outcome::Skipped { reason } => {
                println!("⏭️  {}: {}", report.path.display(), reason)
            }
            Outcome::Failed { stage, error } => {
                println!("❌ {} [{}]: {}", report.path.display(), stage, error)
            }
        }
    }

    Ok(!summary.has_failures())
}
