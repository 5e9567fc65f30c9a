//! Process command - extract a record from a single Bill of Lading.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use lading_core::{BolRecord, RecordStatus, SourceDocument};

use super::export::{format_text, records_csv_string};
use super::{build_orchestrator, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Skip OCR and use only embedded PDF text
    #[arg(long)]
    text_only: bool,

    /// Print processing notes after the record
    #[arg(long)]
    show_notes: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if extension != "pdf" {
        anyhow::bail!("Unsupported file format: {}", extension);
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Loading pipeline...");

    let orchestrator = build_orchestrator(&config, args.model_dir.as_deref(), args.text_only)?;
    let document = SourceDocument::from_path(&args.input)?;

    pb.set_message(format!("Extracting {}...", document.filename));

    let record =
        tokio::task::spawn_blocking(move || orchestrator.process_one(&document.data, &document.filename)).await?;

    pb.finish_and_clear();

    let output = format_record(&record, args.format, args.show_notes)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    if args.show_notes && !matches!(args.format, OutputFormat::Text) {
        print_status(&record);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_record(record: &BolRecord, format: OutputFormat, show_notes: bool) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Csv => records_csv_string(std::slice::from_ref(record)),
        OutputFormat::Text => Ok(format_text(record, show_notes)),
    }
}

fn print_status(record: &BolRecord) {
    let status = match record.status() {
        RecordStatus::Complete => style("complete").green(),
        RecordStatus::Partial => style("partial").yellow(),
        RecordStatus::Failed => style("failed").red(),
    };

    eprintln!();
    eprintln!(
        "{} Status: {} (method: {}, confidence: {})",
        style("ℹ").blue(),
        status,
        record.extraction_method,
        record.extraction_confidence
    );
    for note in &record.processing_notes {
        eprintln!("  - {}", note);
    }
}
