//! Show command - print what is stored for a case.

use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;

use pedido_core::{CaseId, FieldRecord, LineItem, RecordStore, SqliteStore};

use super::load_config;

/// Arguments for the show command.
#[derive(Args)]
pub struct ShowArgs {
    /// Case to show
    #[arg(long, required = true)]
    case: String,

    /// SQLite database (overrides configuration)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct StoredCase {
    case_id: CaseId,
    fields: Vec<FieldRecord>,
    items: Vec<LineItem>,
}

pub async fn run(args: ShowArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let path = args.db.unwrap_or(config.store.database_path);
    if !path.exists() {
        anyhow::bail!("Database not found: {}", path.display());
    }

    let store = SqliteStore::open(&path)?;
    let case_id = CaseId::new(args.case);
    let stored = StoredCase {
        fields: store.list_fields(&case_id)?,
        items: store.list_items(&case_id)?,
        case_id,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stored)?);
    } else {
        print!("{}", format_case(&stored));
    }

    Ok(())
}

fn format_case(stored: &StoredCase) -> String {
    let mut output = format!("{} {}\n\n", style("Case").bold(), stored.case_id);

    if stored.fields.is_empty() && stored.items.is_empty() {
        output.push_str("No records stored.\n");
        return output;
    }

    output.push_str(&format!("Fields ({}):\n", stored.fields.len()));
    for field in &stored.fields {
        let value = field.value.to_string();
        let value = if field.key == "ocr_text" {
            format!("<{} chars>", value.chars().count())
        } else {
            value
        };
        output.push_str(&format!(
            "  {:<20} {:<40} {:>4.2}  {:<8} {:<12} {}\n",
            field.key,
            value,
            field.confidence,
            field.source.as_str(),
            field.last_updated_by,
            field.updated_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    output.push_str(&format!("\nItems ({}):\n", stored.items.len()));
    for item in &stored.items {
        output.push_str(&format!(
            "  {:>2}. {:<8} {:<40} {:>4} {:>12}\n",
            item.line_no,
            item.code.as_deref().unwrap_or("-"),
            item.description.replace('\n', " / "),
            item.qty.map(|q| q.to_string()).unwrap_or_default(),
            item.value_num.map(|v| v.to_string()).unwrap_or_default()
        ));
    }

    output
}
