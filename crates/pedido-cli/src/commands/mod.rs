//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod show;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use pedido_core::models::config::OcrProviderKind;
use pedido_core::{MemoryStore, PedidoConfig, RecordStore, SqliteStore};

/// OCR provider choice on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ProviderArg {
    /// On-device PaddleOCR models
    Local,
    /// Google Cloud Vision
    Cloud,
}

impl From<ProviderArg> for OcrProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Local => OcrProviderKind::Local,
            ProviderArg::Cloud => OcrProviderKind::Cloud,
        }
    }
}

/// Image extensions routed through OCR.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp"];

/// How an input file is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// Already-recognized OCR text.
    Text,
    /// Scanned image.
    Image,
}

impl InputKind {
    pub fn of(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "txt" => Some(Self::Text),
            ext if IMAGE_EXTENSIONS.contains(&ext) => Some(Self::Image),
            _ => None,
        }
    }
}

/// Load configuration from `path`, else from the default location when it
/// exists, else defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<PedidoConfig> {
    let path = match path {
        Some(p) => PathBuf::from(p),
        None => {
            let default = config::default_config_path();
            if !default.exists() {
                return Ok(PedidoConfig::default());
            }
            default
        }
    };
    debug!("Loading configuration from {}", path.display());
    Ok(PedidoConfig::from_file(&path)?)
}

/// Open the record store: in memory for dry runs, else SQLite at `db` or the
/// configured path.
pub fn open_store(
    config: &PedidoConfig,
    db: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<Arc<dyn RecordStore>> {
    if dry_run {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = db.unwrap_or(&config.store.database_path);
    let store = SqliteStore::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
    Ok(Arc::new(store))
}

/// Case identifier derived from a file name.
pub fn case_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("case")
        .to_string()
}
