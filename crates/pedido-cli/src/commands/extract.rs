//! Extract command - run one extraction pass over a single order form.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use pedido_core::extraction::rules::format_brl;
use pedido_core::{CaseId, ExtractionEngine, ExtractionReport};

use super::{InputKind, ProviderArg, case_from_path, load_config, open_store};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (image, or .txt with OCR text)
    #[arg(required = true)]
    input: PathBuf,

    /// Case the records belong to (default: input file name)
    #[arg(long)]
    case: Option<String>,

    /// OCR provider (overrides configuration)
    #[arg(short, long, value_enum)]
    provider: Option<ProviderArg>,

    /// SQLite database (overrides configuration)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Extract without writing to the database
    #[arg(long)]
    dry_run: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Number of normalized lines to include as preview
    #[arg(long)]
    preview: Option<usize>,
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

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(provider) = args.provider {
        config.ocr.provider = provider.into();
    }
    if let Some(lines) = args.preview {
        config.extraction.preview_lines = lines;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let Some(kind) = InputKind::of(&args.input) else {
        anyhow::bail!("Unsupported file format: {}", args.input.display());
    };

    let case_id = CaseId::new(args.case.clone().unwrap_or_else(|| case_from_path(&args.input)));
    info!("Extracting {} as case {}", args.input.display(), case_id);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );

    let store = open_store(&config, args.db.as_deref(), args.dry_run)?;

    let report = match kind {
        InputKind::Text => {
            pb.set_message("Extracting fields...");
            let text = fs::read_to_string(&args.input)?;
            ExtractionEngine::new(&config).run(&case_id, &text, store.as_ref())
        }
        InputKind::Image => {
            pb.set_message(format!("Running OCR ({})...", config.ocr.provider));
            let engine = ExtractionEngine::from_config(&config)?;
            let image = fs::read(&args.input)?;
            engine.process_document(&case_id, &image, store.as_ref())?
        }
    };

    pb.finish_and_clear();

    let output = format_report(&report, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.dry_run {
        eprintln!("{} Dry run, nothing was stored", style("ℹ").blue());
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_report(report: &ExtractionReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => format_csv(report),
        OutputFormat::Text => Ok(format_text(report)),
    }
}

fn format_csv(report: &ExtractionReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    // Item rows carry the parsed amount in `value` and the printed token in
    // `value_raw`; field rows leave the item columns empty.
    wtr.write_record([
        "type",
        "key",
        "value",
        "confidence",
        "code",
        "description",
        "qty",
        "value_raw",
    ])?;

    for field in &report.result.fields {
        if field.key == "ocr_text" {
            continue;
        }
        wtr.write_record([
            "field",
            &field.key,
            &field.value.to_string(),
            &format!("{:.2}", field.confidence),
            "",
            "",
            "",
            "",
        ])?;
    }

    for item in &report.result.items {
        wtr.write_record([
            "item",
            &item.line_no.to_string(),
            &item.value_num.map(|v| v.to_string()).unwrap_or_default(),
            "",
            item.code.as_deref().unwrap_or(""),
            &item.description,
            &item.qty.map(|q| q.to_string()).unwrap_or_default(),
            item.value_raw.as_deref().unwrap_or(""),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &ExtractionReport) -> String {
    let result = &report.result;
    let mut output = String::new();

    output.push_str(&format!("Case: {}\n\n", result.case_id));

    output.push_str("Fields:\n");
    for field in result.fields.iter().filter(|f| f.key != "ocr_text") {
        output.push_str(&format!(
            "  {:<20} {} ({:.0}%)\n",
            field.key,
            field.value,
            field.confidence * 100.0
        ));
    }
    output.push('\n');

    output.push_str(&format!("Items ({}):\n", result.items.len()));
    for item in &result.items {
        let description = item.description.replace('\n', " / ");
        output.push_str(&format!(
            "  {:>2}. {:<8} {:<40} {:>4} {:>12}\n",
            item.line_no,
            item.code.as_deref().unwrap_or("-"),
            description,
            item.qty.map(|q| q.to_string()).unwrap_or_default(),
            item.value_raw.as_deref().unwrap_or("")
        ));
    }

    if let Some(total) = result.total {
        output.push_str(&format!("\nTotal: R$ {}\n", format_brl(total)));
    }

    let d = &result.diagnostics;
    output.push_str(&format!(
        "\nLines: {}, table found: {}, rows parsed: {}, rows rejected: {}\n",
        d.lines_total,
        if d.table_found { "yes" } else { "no" },
        d.rows_parsed,
        d.rows_rejected
    ));

    let w = &report.writes;
    output.push_str(&format!(
        "Fields written: {}, protected: {}, failed: {}; rows inserted: {}, failed: {}\n",
        w.fields_written, w.fields_protected, w.fields_failed, w.rows_inserted, w.rows_failed
    ));

    if !result.preview.is_empty() {
        output.push_str("\nPreview:\n");
        for line in &result.preview {
            output.push_str(&format!("  | {}\n", line));
        }
    }

    output
}
