//! Batch command - process many Bills of Lading into one CSV.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use lading_core::{BatchSummary, BolRecord, CancelFlag, SourceDocument};

use super::export::{write_records_csv, write_summary_csv};
use super::{build_orchestrator, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching input PDFs
    #[arg(required = true)]
    input: String,

    /// Output file
    #[arg(short, long, default_value = "bol_records.csv")]
    output: PathBuf,

    /// Also write a processing summary CSV
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Number of parallel workers (default: from config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Skip OCR and use only embedded PDF text
    #[arg(long)]
    text_only: bool,

    /// Write records as JSON instead of CSV
    #[arg(long)]
    json: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No PDF files found for pattern: {}", args.input);
    }

    println!("{} Found {} files to process", style("ℹ").blue(), files.len());

    // Unreadable files keep their slot as a failed record
    let mut slots = Vec::with_capacity(files.len());
    let mut documents = Vec::with_capacity(files.len());
    for path in &files {
        match SourceDocument::from_path(path) {
            Ok(document) => {
                documents.push(document);
                slots.push(None);
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                slots.push(Some(BolRecord::failed(name, format!("Read error: {}", e))));
            }
        }
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.inc(slots.iter().flatten().count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let progress = pb.clone();
    let orchestrator = build_orchestrator(&config, args.model_dir.as_deref(), args.text_only)?
        .with_observer(Arc::new(move |_: &BolRecord| progress.inc(1)));

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing documents in flight");
            on_interrupt.cancel();
        }
    });

    let workers = args.jobs.unwrap_or_else(|| config.batch.effective_workers());
    let total = files.len();
    let processed = Arc::new(orchestrator)
        .process_many_concurrent(documents, workers, cancel.clone())
        .await;
    let records = merge_in_order(slots, processed);

    pb.finish_and_clear();

    write_records(&args, &records)?;
    println!("{} Records written to {}", style("✓").green(), args.output.display());

    let summary = BatchSummary::from_records(&records);
    if let Some(summary_path) = &args.summary {
        write_summary_csv(BufWriter::new(File::create(summary_path)?), &summary)?;
        println!("{} Summary written to {}", style("✓").green(), summary_path.display());
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        records.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(summary.successful).green(),
        style(summary.failed).red()
    );

    if cancel.is_cancelled() && records.len() < total {
        println!(
            "{} Cancelled: {} of {} files not processed",
            style("!").yellow(),
            total - records.len(),
            total
        );
    }

    let failed: Vec<&BolRecord> = records.iter().filter(|r| r.extraction_failed).collect();
    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for record in failed {
            println!(
                "  - {}: {}",
                record.filename,
                record.processing_notes.first().map(String::as_str).unwrap_or("unknown error")
            );
        }
    }

    info!("Batch finished in {:?}", start.elapsed());

    Ok(())
}

fn write_records(args: &BatchArgs, records: &[BolRecord]) -> anyhow::Result<()> {
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let writer = BufWriter::new(File::create(&args.output)?);
    if args.json {
        serde_json::to_writer_pretty(writer, records)?;
    } else {
        write_records_csv(writer, records)?;
    }

    Ok(())
}

/// Interleave processed records with the failed records of unreadable
/// files, in input order. Stops at the first slot a cancelled run never
/// reached.
fn merge_in_order(slots: Vec<Option<BolRecord>>, processed: Vec<BolRecord>) -> Vec<BolRecord> {
    let mut processed = processed.into_iter();
    let mut records = Vec::with_capacity(slots.len());

    for slot in slots {
        match slot {
            Some(record) => records.push(record),
            None => match processed.next() {
                Some(record) => records.push(record),
                None => break,
            },
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_input_order() {
        let slots = vec![None, Some(BolRecord::failed("b.pdf", "Read error: denied")), None];
        let processed = vec![BolRecord::new("a.pdf"), BolRecord::new("c.pdf")];

        let records = merge_in_order(slots, processed);
        let names: Vec<&str> = records.iter().map(|r| r.filename.as_str()).collect();

        assert_eq!(names, ["a.pdf", "b.pdf", "c.pdf"]);
        assert_eq!(records[1].processing_notes, ["Read error: denied"]);
    }

    #[test]
    fn test_merge_stops_where_cancelled_run_stopped() {
        let slots = vec![None, None, Some(BolRecord::failed("c.pdf", "Read error: denied"))];
        let processed = vec![BolRecord::new("a.pdf")];

        let records = merge_in_order(slots, processed);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "a.pdf");
    }
}
