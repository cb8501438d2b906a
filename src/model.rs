use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEntry {
    pub filename: String,
    pub page_number: Option<u32>,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub page_count: usize,
    pub pages: Vec<PageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersions {
    pub tesseract: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractPaths {
    pub cache_root: String,
    pub image_dir: String,
    pub inventory_manifest_path: String,
    pub page_report_path: String,
    pub raw_text_dir: String,
    pub output_csv: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractCounts {
    pub page_count: usize,
    pub processed_page_count: usize,
    pub ocr_failed_page_count: usize,
    pub lines_seen: usize,
    pub lines_skipped: usize,
    pub province_count: usize,
    pub district_count: usize,
    pub commune_count: usize,
    pub entries_before_dedupe: usize,
    pub unique_entries: usize,
    pub duplicates_dropped: usize,
    pub row_numbered_matches: usize,
    pub bare_matches: usize,
    pub embedded_matches: usize,
    pub district_without_province_fallbacks: usize,
    pub commune_without_province_fallbacks: usize,
    pub commune_without_district_fallbacks: usize,
    pub db_rows_written: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub ocr_mode: String,
    pub tool_versions: ToolVersions,
    pub paths: ExtractPaths,
    pub counts: ExtractCounts,
    pub source_hashes: Vec<PageEntry>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Processed,
    OcrFailed,
}

/// Outcome of one page image, in reading order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    pub page: String,
    pub status: PageStatus,
    pub lines_seen: usize,
    pub entries: usize,
    pub current_province: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReportManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub pages: Vec<PageReport>,
}
