use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "postal-ocr",
    version,
    about = "Rebuild the province/district/commune postal code table from scanned pages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Extract(ExtractArgs),
    Validate(ValidateArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = ".cache/postal-ocr")]
    pub cache_root: PathBuf,

    /// Directory holding the page images; defaults to `<cache-root>/pdf_images`.
    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long, default_value = ".cache/postal-ocr")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    #[arg(long)]
    pub inventory_manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub refresh_inventory: bool,

    #[arg(long)]
    pub run_manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    /// Raw OCR text is written here per page, and read back in `cached` mode.
    #[arg(long)]
    pub raw_text_dir: Option<PathBuf>,

    /// SQLite database the table is loaded into; defaults to
    /// `<cache-root>/postal_codes.sqlite`.
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub max_pages: Option<usize>,

    #[arg(long, value_enum, default_value_t = OcrMode::Tesseract)]
    pub ocr_mode: OcrMode,

    #[arg(long, default_value = "khm+eng")]
    pub ocr_lang: String,

    #[arg(long, default_value_t = 6)]
    pub ocr_psm: u8,

    #[arg(long, default_value_t = 120)]
    pub ocr_timeout_secs: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OcrMode {
    Tesseract,
    Cached,
}

impl OcrMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tesseract => "tesseract",
            Self::Cached => "cached",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, default_value = ".cache/postal-ocr")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    /// Fail when any structural invariant is violated.
    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/postal-ocr")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

/// Where every command reads or writes the table unless `--db-path` is given.
pub fn default_db_path(cache_root: &Path) -> PathBuf {
    cache_root.join("postal_codes.sqlite")
}
