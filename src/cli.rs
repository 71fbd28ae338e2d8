//! Command-line interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};

use crate::analysis::{self, DEFAULT_INTERVAL_MINUTES};
use crate::automation::{self, PipelineConfig};
use crate::correction::{CorrectionSession, run_session};
use crate::ocr::{TesseractEngine, ensure_tesseract};
use crate::store::{ResultStore, StoreSchema, triage};

#[derive(Parser)]
#[command(name = "tally-clock")]
#[command(about = "Reads reporting times off tally-sheet images and aggregates votes over time")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to tally-clock.json in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Results CSV to read and rewrite
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Directory holding the downloaded images
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract timestamps for every record that does not have one yet
    Ocr {
        /// Input CSV used when the results CSV does not exist yet
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Limit number of records to process (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Review and correct timestamps interactively
    Correct {
        /// Start with this record instead of the first unresolved one
        url: Option<String>,
    },

    /// List records without a timestamp
    Unresolved {
        /// Write the list as a one-column CSV
        #[arg(short, long, default_value = "urls_with_nf.csv")]
        out: PathBuf,
        /// Also copy their images into this folder
        #[arg(long)]
        copy_images: Option<PathBuf>,
    },

    /// Aggregate votes over reporting time and export JSON
    Timeline {
        /// Bucket width in minutes
        #[arg(short, long, default_value_t = DEFAULT_INTERVAL_MINUTES)]
        interval: u32,
        /// Output JSON file
        #[arg(short, long, default_value = "timeline.json")]
        out: PathBuf,
        /// Candidate columns, in order (detected when omitted)
        #[arg(short, long, value_delimiter = ',')]
        candidates: Vec<String>,
    },

    /// Locate Tesseract and fetch language data if needed
    Setup,
}

impl Cli {
    /// Loads the config file and applies path overrides from the command line.
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::load(self.config.as_deref());
        if let Some(output) = &self.output {
            config.output_csv = output.clone();
        }
        if let Some(images) = &self.images {
            config.image_dir = images.clone();
        }
        config
    }
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = cli.pipeline_config();

    match cli.command {
        Commands::Ocr { input, limit } => {
            if let Some(input) = input {
                config.input_csv = input;
            }
            cmd_ocr(&config, limit)
        }
        Commands::Correct { url } => cmd_correct(&config, url.as_deref()),
        Commands::Unresolved { out, copy_images } => {
            cmd_unresolved(&config, &out, copy_images.as_ref())
        }
        Commands::Timeline {
            interval,
            out,
            candidates,
        } => cmd_timeline(&config, interval, &out, &candidates),
        Commands::Setup => cmd_setup(&config),
    }
}

fn cmd_ocr(config: &PipelineConfig, limit: usize) -> Result<()> {
    let engine = TesseractEngine::discover(config).context("Tesseract is not available")?;
    let limit = (limit > 0).then_some(limit);

    let summary = automation::run_from_config(config, &engine, limit)?;

    println!(
        "{} processed: {} resolved, {} unresolved, {} rotated, {} missing images, {} already done",
        summary.processed(),
        summary.resolved,
        summary.unresolved,
        summary.rotated,
        summary.skipped_missing,
        summary.skipped_resolved
    );
    Ok(())
}

fn cmd_correct(config: &PipelineConfig, url: Option<&str>) -> Result<()> {
    let engine = TesseractEngine::discover(config).context("Tesseract is not available")?;
    let mut store = automation::open_store(config)?;
    let mut session = CorrectionSession::new(&mut store, &engine, config);

    match url {
        Some(url) => session.open(url)?,
        None => {
            session.next_unresolved()?;
        }
    }
    println!("{}", session.state().summary());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_session(&mut session, stdin.lock(), &mut stdout)
}

fn cmd_unresolved(
    config: &PipelineConfig,
    out: &Path,
    copy_images: Option<&PathBuf>,
) -> Result<()> {
    let store = ResultStore::load(&config.output_csv, StoreSchema::from_config(config))
        .with_context(|| format!("Failed to load results from {}", config.output_csv.display()))?;

    let count = triage::write_unresolved_csv(&store, out)?;
    println!("{} unresolved records listed in {}", count, out.display());

    if let Some(dest) = copy_images {
        let summary = triage::copy_unresolved_images(&store, &config.image_dir, dest)?;
        println!(
            "{} images copied to {}, {} missing",
            summary.copied,
            dest.display(),
            summary.missing
        );
    }
    Ok(())
}

fn cmd_timeline(
    config: &PipelineConfig,
    interval: u32,
    out: &Path,
    candidates: &[String],
) -> Result<()> {
    let report = analysis::generate_timeline(
        &config.output_csv,
        &config.timestamp_column,
        candidates,
        &[config.url_column.as_str()],
        interval,
        out,
    )?;

    println!(
        "{} reports in {} buckets of {} minutes ({} dropped), written to {}",
        report.total_reports,
        report.buckets.len(),
        report.interval_minutes,
        report.dropped_reports,
        out.display()
    );
    Ok(())
}

fn cmd_setup(config: &PipelineConfig) -> Result<()> {
    let paths = ensure_tesseract(config)?;
    println!("Tesseract: {}", paths.executable.display());
    println!("Language data: {}", paths.tessdata.display());
    Ok(())
}
