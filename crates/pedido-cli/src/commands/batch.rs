//! Batch command - independent extraction passes over many files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, warn};

use pedido_core::{CaseId, ExtractionEngine, ExtractionReport, RecordStore, WriteSummary};

use super::{InputKind, ProviderArg, case_from_path, load_config, open_store};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input files (images or .txt)
    #[arg(required = true)]
    input: String,

    /// OCR provider (overrides configuration)
    #[arg(short, long, value_enum)]
    provider: Option<ProviderArg>,

    /// SQLite database (overrides configuration)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Extract without writing to the database
    #[arg(long)]
    dry_run: bool,

    /// Write a summary CSV to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileOutcome {
    path: PathBuf,
    case_id: CaseId,
    report: Option<ExtractionReport>,
    error: Option<String>,
    processing_time_ms: u64,
}

/// One line of the summary CSV.
#[derive(Serialize)]
struct SummaryRow<'a> {
    filename: &'a str,
    case_id: &'a str,
    status: &'a str,
    lines_total: Option<usize>,
    table_found: Option<bool>,
    rows_parsed: Option<usize>,
    rows_rejected: Option<usize>,
    fields_written: Option<usize>,
    fields_protected: Option<usize>,
    fields_failed: Option<usize>,
    rows_inserted: Option<usize>,
    rows_failed: Option<usize>,
    total: Option<String>,
    processing_time_ms: u64,
    error: &'a str,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(provider) = args.provider {
        config.ocr.provider = provider.into();
    }

    let files: Vec<(PathBuf, InputKind)> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter_map(|p| InputKind::of(&p).map(|kind| (p, kind)))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    // The provider is loaded once and shared; text-only batches never need one.
    let engine = if files.iter().any(|(_, kind)| *kind == InputKind::Image) {
        ExtractionEngine::from_config(&config)?
    } else {
        ExtractionEngine::new(&config)
    };
    let engine = Arc::new(engine);
    let store = open_store(&config, args.db.as_deref(), args.dry_run)?;

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut handles = Vec::with_capacity(files.len());

    for (path, kind) in files {
        let permit = semaphore.clone().acquire_owned().await?;
        let engine = engine.clone();
        let store = store.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            process_file(path, kind, &engine, store.as_ref())
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let outcome = handle.await?;
        if let Some(error_msg) = &outcome.error {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", outcome.path.display(), error_msg);
            } else {
                error!("Failed to process {}: {}", outcome.path.display(), error_msg);
                anyhow::bail!("Processing failed: {}", error_msg);
            }
        }
        overall_pb.inc(1);
        results.push(outcome);
    }

    overall_pb.finish_with_message("Complete");

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let successful = results.iter().filter(|r| r.report.is_some()).count();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    let mut writes = WriteSummary::default();
    for report in results.iter().filter_map(|r| r.report.as_ref()) {
        writes.absorb(&report.writes);
    }
    println!(
        "   {} fields written, {} protected, {} items inserted",
        writes.fields_written, writes.fields_protected, writes.rows_inserted
    );
    if writes.has_failures() {
        println!(
            "   {} {} field and {} item writes failed",
            style("⚠").yellow(),
            writes.fields_failed,
            writes.rows_failed
        );
    }

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_file(
    path: PathBuf,
    kind: InputKind,
    engine: &ExtractionEngine,
    store: &dyn RecordStore,
) -> FileOutcome {
    let file_start = Instant::now();
    let case_id = CaseId::new(case_from_path(&path));

    let result = match kind {
        InputKind::Text => fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .map(|text| engine.run(&case_id, &text, store)),
        InputKind::Image => fs::read(&path)
            .map_err(anyhow::Error::from)
            .and_then(|image| Ok(engine.process_document(&case_id, &image, store)?)),
    };

    let processing_time_ms = file_start.elapsed().as_millis() as u64;
    let (report, error) = match result {
        Ok(report) => (Some(report), None),
        Err(e) => (None, Some(e.to_string())),
    };

    FileOutcome {
        path,
        case_id,
        report,
        error,
        processing_time_ms,
    }
}

fn write_summary(path: &Path, results: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let report = result.report.as_ref();
        let diagnostics = report.map(|r| &r.result.diagnostics);
        let writes = report.map(|r| &r.writes);

        wtr.serialize(SummaryRow {
            filename,
            case_id: result.case_id.as_str(),
            status: if report.is_some() { "success" } else { "error" },
            lines_total: diagnostics.map(|d| d.lines_total),
            table_found: diagnostics.map(|d| d.table_found),
            rows_parsed: diagnostics.map(|d| d.rows_parsed),
            rows_rejected: diagnostics.map(|d| d.rows_rejected),
            fields_written: writes.map(|w| w.fields_written),
            fields_protected: writes.map(|w| w.fields_protected),
            fields_failed: writes.map(|w| w.fields_failed),
            rows_inserted: writes.map(|w| w.rows_inserted),
            rows_failed: writes.map(|w| w.rows_failed),
            total: report.and_then(|r| r.result.total).map(|t| format!("{:.2}", t)),
            processing_time_ms: result.processing_time_ms,
            error: result.error.as_deref().unwrap_or(""),
        })?;
    }

    wtr.flush()?;
    Ok(())
}
