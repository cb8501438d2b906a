use std::collections::HashMap;

use super::run::{extract_counts, page_paths};
use super::*;
use crate::cli::ValidateArgs;
use crate::commands::validate;
use crate::model::PageEntry;
use crate::util::latest_manifest;

fn record(code: &str, name_local: &str, name_en: &str) -> CandidateRecord {
    CandidateRecord {
        code: code.to_string(),
        name_local: name_local.to_string(),
        name_en: name_en.to_string(),
        postal_code: code.to_string(),
    }
}

fn classify_all(codes: &[&str]) -> (Vec<LocationEntry>, HierarchyContext) {
    let mut context = HierarchyContext::default();
    let entries = codes
        .iter()
        .map(|code| classify(record(code, "ឈ្មោះ", &format!("Place {code}")), &mut context))
        .collect();
    (entries, context)
}

fn entry(postal_code: &str, name_en: &str) -> LocationEntry {
    let mut context = HierarchyContext::default();
    let mut entry = classify(record(postal_code, "ឈ្មោះ", name_en), &mut context);
    entry.name_en = name_en.to_string();
    entry
}

/// Serves fixed text per page filename; pages mapped to `None` fail.
struct ScriptedOcr {
    pages: HashMap<String, Option<String>>,
}

impl ScriptedOcr {
    fn new(pages: &[(&str, Option<&str>)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(name, text)| (name.to_string(), text.map(str::to_string)))
                .collect(),
        }
    }
}

impl OcrSource for ScriptedOcr {
    fn text_for_page(&self, page: &Path) -> Result<String> {
        let name = page
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        match self.pages.get(name) {
            Some(Some(text)) => Ok(text.clone()),
            _ => bail!("tesseract timed out after 120s for {name}"),
        }
    }
}

fn page_list(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|name| PathBuf::from("/scans").join(name)).collect()
}

const PAGE_ONE: &str = "\
ព្រះរាជាណាចក្រកម្ពុជា
No. Code Khmer English Postal
1 010000 បន្ទាយមានជ័យ Banteay Meanchey 010000
1.1 010100 មង្គលបុរី Mongkol Borei 010100
010101 បន្ទាយនាង Banteay Neang 010101
| 010102 បត់ត្រង់ Bat Trang 010102 ~
12
";

const PAGE_TWO: &str = "010103 ចំណោម Chamnaom 010103\n";

const PAGE_THREE: &str = "\
010104 គោកបល្ល័ង្ក Kouk Ballangk 010104
010105 គយម៉ែង Koy Maeng 010105
";

#[test]
fn parse_row_numbered_line_extracts_all_fields() {
    let parser = LineParser::new().expect("parser");
    let (pattern, parsed) = parser
        .parse_with_pattern("1 010000 បន្ទាយមានជ័យ Banteay Meanchey 010000")
        .expect("row should parse");

    assert_eq!(pattern, LinePattern::RowNumbered);
    assert_eq!(parsed.code, "010000");
    assert_eq!(parsed.name_local, "បន្ទាយមានជ័យ");
    assert_eq!(parsed.name_en, "Banteay Meanchey");
    assert_eq!(parsed.postal_code, "010000");
}

#[test]
fn parse_bare_line_keeps_multi_word_khmer_name() {
    let parser = LineParser::new().expect("parser");
    let (pattern, parsed) = parser
        .parse_with_pattern("  020000 ខេត្ត បាត់ដំបង Battambang 020000  ")
        .expect("row should parse");

    assert_eq!(pattern, LinePattern::Bare);
    assert_eq!(parsed.name_local, "ខេត្ត បាត់ដំបង");
    assert_eq!(parsed.name_en, "Battambang");
}

#[test]
fn parse_embedded_line_tolerates_surrounding_noise() {
    let parser = LineParser::new().expect("parser");
    let (pattern, parsed) = parser
        .parse_with_pattern("| 020101 ឃុំ Kampong Preah-Kor 020101 ||")
        .expect("row should parse");

    assert_eq!(pattern, LinePattern::Embedded);
    assert_eq!(parsed.code, "020101");
    assert_eq!(parsed.name_local, "ឃុំ");
    assert_eq!(parsed.name_en, "Kampong Preah-Kor");
    assert_eq!(parsed.postal_code, "020101");
}

#[test]
fn parse_strips_repeated_code_digits_from_khmer_name() {
    let parser = LineParser::new().expect("parser");
    let parsed = parser
        .parse("010000 01 បន្ទាយមានជ័យ Banteay Meanchey 010000")
        .expect("row should parse");

    assert_eq!(parsed.name_local, "បន្ទាយមានជ័យ");
    assert_eq!(parsed.name_en, "Banteay Meanchey");
}

#[test]
fn parse_rejects_short_empty_and_code_only_lines() {
    let parser = LineParser::new().expect("parser");

    assert!(parser.parse("").is_none());
    assert!(parser.parse("      ").is_none());
    assert!(parser.parse("01000").is_none());
    assert!(parser.parse("010000").is_none());
    assert!(parser.parse("010000     010000").is_none());
    assert!(parser.parse("Page 12 of 59 continued").is_none());
}

#[test]
fn parse_prefers_most_specific_pattern() {
    let parser = LineParser::new().expect("parser");
    let line = "3 010200 អូរជ្រៅ O Chrov 010200";

    let embedded = parser
        .match_pattern(LinePattern::Embedded, line)
        .expect("fallback pattern also matches");
    let (pattern, parsed) = parser.parse_with_pattern(line).expect("row should parse");

    assert_eq!(pattern, LinePattern::RowNumbered);
    assert_eq!(parsed, embedded);
    assert!(parser.match_pattern(LinePattern::Bare, line).is_none());
}

#[test]
fn parse_is_deterministic() {
    let parser = LineParser::new().expect("parser");
    let line = "7 030100 បាធាយ Batheay 030100";

    let first = parser.parse_with_pattern(line);
    for _ in 0..10 {
        assert_eq!(parser.parse_with_pattern(line), first);
    }
}

#[test]
fn location_type_depends_only_on_trailing_zeros() {
    assert_eq!(LocationType::from_code("010000"), LocationType::Province);
    assert_eq!(LocationType::from_code("010100"), LocationType::District);
    assert_eq!(LocationType::from_code("010101"), LocationType::Commune);
    assert_eq!(LocationType::from_code("999999"), LocationType::Commune);
}

#[test]
fn province_clears_district_from_previous_province() {
    let (entries, context) = classify_all(&["010000", "010100", "020000", "020101"]);

    let commune = &entries[3];
    assert_eq!(commune.location_type, LocationType::Commune);
    assert_eq!(commune.province_code, "020000");
    assert_eq!(commune.district_code, "020100");
    assert_eq!(commune.province_name_en, "Place 020000");
    assert_eq!(commune.district_name_en, "");
    assert_eq!(commune.district_name_local, "");
    assert!(context.current_district_code.is_empty());
    assert_eq!(context.fallbacks.commune_without_district, 1);
    assert_eq!(context.fallbacks.commune_without_province, 0);
}

#[test]
fn commune_after_new_province_never_reuses_stale_district() {
    let (entries, _) = classify_all(&["010000", "010100", "020000", "020305"]);

    assert_eq!(entries[3].district_code, "020300");
    assert_ne!(entries[3].district_code, "010100");
}

#[test]
fn isolated_commune_derives_ancestors_from_its_code() {
    let (entries, context) = classify_all(&["031203"]);

    assert_eq!(entries[0].province_code, "030000");
    assert_eq!(entries[0].district_code, "031200");
    assert_eq!(entries[0].province_name_en, "");
    assert_eq!(context.fallbacks.commune_without_province, 1);
    assert_eq!(context.fallbacks.commune_without_district, 1);
}

#[test]
fn district_without_province_falls_back_and_becomes_current() {
    let (entries, context) = classify_all(&["050300", "050301"]);

    assert_eq!(entries[0].location_type, LocationType::District);
    assert_eq!(entries[0].province_code, "050000");
    assert_eq!(entries[0].district_code, "050300");
    assert_eq!(entries[1].district_code, "050300");
    assert_eq!(entries[1].district_name_en, "Place 050300");
    assert_eq!(context.fallbacks.district_without_province, 1);
    assert_eq!(context.fallbacks.commune_without_district, 0);
}

#[test]
fn tracked_ancestors_win_over_code_prefix() {
    let (entries, context) = classify_all(&["010000", "020100", "030101"]);

    assert_eq!(entries[1].province_code, "010000");
    assert_eq!(entries[2].province_code, "010000");
    assert_eq!(entries[2].district_code, "020100");
    assert_eq!(context.fallbacks.total(), 0);
}

#[test]
fn only_communes_carry_parent_names() {
    let (entries, _) = classify_all(&["010000", "010100", "010101"]);

    for parent in &entries[..2] {
        assert_eq!(parent.province_name_local, "");
        assert_eq!(parent.province_name_en, "");
        assert_eq!(parent.district_name_local, "");
        assert_eq!(parent.district_name_en, "");
    }
    assert_eq!(entries[0].district_code, "");
    assert_eq!(entries[2].province_name_en, "Place 010000");
    assert_eq!(entries[2].district_name_en, "Place 010100");
    assert_eq!(entries[2].district_name_local, "ឈ្មោះ");
}

#[test]
fn context_reset_forgets_ancestors_and_counters() {
    let (_, mut context) = classify_all(&["010000", "010100", "990101"]);
    context.reset();
    assert_eq!(context, HierarchyContext::default());
}

#[test]
fn dedupe_keeps_first_occurrence_in_order() {
    let input = vec![
        entry("010000", "first"),
        entry("010100", "district"),
        entry("010000", "second"),
        entry("010101", "commune"),
        entry("010100", "repeat"),
    ];

    let unique = dedupe(input);
    let codes: Vec<&str> = unique.iter().map(|e| e.postal_code.as_str()).collect();

    assert_eq!(codes, vec!["010000", "010100", "010101"]);
    assert_eq!(unique[0].name_en, "first");
    assert_eq!(unique[1].name_en, "district");
}

#[test]
fn dedupe_is_idempotent() {
    let input = vec![
        entry("020000", "a"),
        entry("020100", "b"),
        entry("020000", "c"),
        entry("020101", "d"),
    ];

    let once = dedupe(input);
    let twice = dedupe(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn dedupe_leaves_unique_input_untouched() {
    let input = vec![entry("120000", "a"), entry("010000", "b"), entry("120101", "c")];
    assert_eq!(dedupe(input.clone()), input);
}

#[test]
fn pipeline_skips_failed_page_and_keeps_the_rest() {
    let driver = PipelineDriver::new().expect("driver");
    let pages = page_list(&["page-01.png", "page-02.png", "page-03.png"]);
    let ocr = ScriptedOcr::new(&[
        ("page-01.png", Some(PAGE_ONE)),
        ("page-02.png", None),
        ("page-03.png", Some(PAGE_THREE)),
    ]);

    let output = driver.run(&pages, &ocr);

    assert_eq!(output.entries.len(), 4 + 2);
    assert_eq!(output.ocr_failed_pages(), 1);
    assert_eq!(output.pages[1].status, PageStatus::OcrFailed);
    assert_eq!(output.pages[0].entries, 4);
    assert_eq!(output.pages[2].entries, 2);
    assert_eq!(output.warnings.len(), 1);
    assert!(
        output
            .entries
            .iter()
            .all(|entry| entry.postal_code != "010103")
    );
    assert_eq!(
        output.stats,
        TypeCounts {
            province: 1,
            district: 1,
            commune: 4,
        }
    );
}

#[test]
fn pipeline_carries_context_across_pages() {
    let driver = PipelineDriver::new().expect("driver");
    let pages = page_list(&["page-01.png", "page-02.png", "page-03.png"]);
    let ocr = ScriptedOcr::new(&[
        ("page-01.png", Some(PAGE_ONE)),
        ("page-02.png", Some(PAGE_TWO)),
        ("page-03.png", Some(PAGE_THREE)),
    ]);

    let output = driver.run(&pages, &ocr);
    let last = output.entries.last().expect("entries");

    assert_eq!(last.postal_code, "010105");
    assert_eq!(last.province_code, "010000");
    assert_eq!(last.district_code, "010100");
    assert_eq!(last.province_name_en, "Banteay Meanchey");
    assert_eq!(last.district_name_en, "Mongkol Borei");
    assert_eq!(output.fallbacks.total(), 0);
    assert_eq!(output.pages[2].current_province, "Banteay Meanchey");
    // `1.1 010100 ...` is not a plain row number, so it lands on the fallback.
    assert_eq!(
        output.pattern_counts,
        PatternCounts {
            row_numbered: 1,
            bare: 4,
            embedded: 2,
        }
    );
    assert_eq!(output.stats.total(), output.entries.len());
}

#[test]
fn pipeline_dedupes_rescanned_rows() {
    let driver = PipelineDriver::new().expect("driver");
    let pages = page_list(&["page-01.png", "page-01-rescan.png"]);
    let ocr = ScriptedOcr::new(&[
        ("page-01.png", Some(PAGE_ONE)),
        ("page-01-rescan.png", Some(PAGE_ONE)),
    ]);

    let output = driver.run(&pages, &ocr);

    assert_eq!(output.entries_before_dedupe, 8);
    assert_eq!(output.entries.len(), 4);
    assert_eq!(output.stats.total(), 8);
}

#[test]
fn pipeline_runs_are_independent() {
    let driver = PipelineDriver::new().expect("driver");
    let first_pages = page_list(&["page-01.png"]);
    let second_pages = page_list(&["page-03.png"]);
    let ocr = ScriptedOcr::new(&[
        ("page-01.png", Some(PAGE_ONE)),
        ("page-03.png", Some(PAGE_THREE)),
    ]);

    let _ = driver.run(&first_pages, &ocr);
    let second = driver.run(&second_pages, &ocr);

    assert_eq!(second.entries[0].province_name_en, "");
    assert_eq!(second.entries[0].district_code, "010100");
    assert_eq!(second.fallbacks.commune_without_province, 2);
    assert_eq!(second.fallbacks.commune_without_district, 2);
}

#[test]
fn pipeline_with_no_pages_returns_empty_summary() {
    let driver = PipelineDriver::new().expect("driver");
    let output = driver.run(&[], &ScriptedOcr::new(&[]));

    assert!(output.entries.is_empty());
    assert_eq!(output.stats, TypeCounts::default());
    assert!(output.pages.is_empty());
}

#[test]
fn cached_and_recording_sources_share_raw_text_layout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page = PathBuf::from("/scans/page-08.png");
    let recording = RecordingOcr::new(
        ScriptedOcr::new(&[("page-08.png", Some(PAGE_THREE))]),
        dir.path(),
    );

    let recorded = recording.text_for_page(&page).expect("recorded text");
    assert_eq!(recorded, PAGE_THREE);
    assert!(dir.path().join("page-08.txt").exists());

    let cached = CachedTextOcr::new(dir.path());
    assert_eq!(cached.text_for_page(&page).expect("cached text"), PAGE_THREE);
    assert!(cached.text_for_page(Path::new("page-09.png")).is_err());
}

#[test]
fn tesseract_failure_is_reported_as_error() {
    let ocr = TesseractOcr::new("khm+eng", 6, Duration::from_secs(30));
    let missing = std::env::temp_dir().join("postal-ocr-missing-page.png");
    assert!(ocr.text_for_page(&missing).is_err());
}

#[test]
fn timed_command_is_killed_once_timeout_elapses() {
    let mut command = Command::new("sleep");
    command.arg("5");

    let started = Instant::now();
    let err = run_with_timeout(command, Duration::from_millis(200))
        .expect_err("sleep must time out");

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(err.to_string().contains("timed out after 200ms"));
}

#[test]
fn timed_command_returns_output_and_status() {
    let mut command = Command::new("sh");
    command.args(["-c", "echo 010000; echo warn >&2; exit 3"]);

    let output = run_with_timeout(command, Duration::from_secs(10)).expect("output");

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "010000\n");
    assert_eq!(String::from_utf8_lossy(&output.stderr), "warn\n");
}

#[test]
fn kill_and_reap_leaves_no_running_child() {
    let mut child = Command::new("sleep").arg("5").spawn().expect("spawn sleep");

    kill_and_reap(&mut child);

    assert!(child.try_wait().expect("status").is_some());
}

#[test]
fn csv_with_no_entries_still_has_header() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("postal_codes.csv");

    write_csv(&path, &[]).expect("csv");

    assert_eq!(
        fs::read_to_string(&path).expect("read csv").trim_end(),
        CSV_COLUMNS.join(",")
    );
}

#[test]
fn csv_columns_follow_table_layout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out").join("postal_codes.csv");
    let (entries, _) = classify_all(&["010000", "010100", "010101"]);

    write_csv(&path, &entries).expect("csv");

    let written = fs::read_to_string(&path).expect("read csv");
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some(
            "postal_code,name_km,name_en,type,province_code,district_code,\
             province_name_km,province_name_en,district_name_km,district_name_en"
        )
    );
    assert_eq!(
        lines.next(),
        Some("010000,ឈ្មោះ,Place 010000,province,010000,,,,,")
    );
    assert_eq!(lines.count(), 2);
}

#[test]
fn store_replaces_rows_and_rebuilds_search_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut connection = open_store(&dir.path().join("postal_codes.sqlite")).expect("open");
    ensure_schema(&connection).expect("schema");

    let (first, _) = classify_all(&["010000", "010100", "010101"]);
    replace_postal_codes(&mut connection, "run-1", &first).expect("first import");

    let mut context = HierarchyContext::default();
    let second = vec![
        classify(record("020000", "បាត់ដំបង", "Battambang"), &mut context),
        classify(record("020100", "បាណន់", "Banan"), &mut context),
    ];
    let written = replace_postal_codes(&mut connection, "run-2", &second).expect("second import");
    assert_eq!(written, 2);

    let rows: i64 = connection
        .query_row("SELECT COUNT(*) FROM postal_codes", [], |row| row.get(0))
        .expect("count");
    assert_eq!(rows, 2);

    let code: String = connection
        .query_row(
            "SELECT code FROM postal_codes WHERE postal_code = '020100'",
            [],
            |row| row.get(0),
        )
        .expect("code column");
    assert_eq!(code, "020100");

    let hit: String = connection
        .query_row(
            "SELECT postal_code FROM postal_codes_fts WHERE postal_codes_fts MATCH 'Battambang'",
            [],
            |row| row.get(0),
        )
        .expect("fts hit");
    assert_eq!(hit, "020000");

    let run_id: String = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'last_run_id'",
            [],
            |row| row.get(0),
        )
        .expect("run id");
    assert_eq!(run_id, "run-2");
}

#[test]
fn page_paths_follow_inventory_order_and_limit() {
    let inventory = PageInventoryManifest {
        manifest_version: 1,
        generated_at: "2026-01-14T00:00:00Z".to_string(),
        source_directory: "/scans".to_string(),
        page_count: 3,
        pages: ["page-08.png", "page-09.png", "page-10.png"]
            .iter()
            .map(|name| PageEntry {
                filename: name.to_string(),
                page_number: None,
                sha256: String::new(),
            })
            .collect(),
    };

    assert_eq!(
        page_paths(&inventory, Some(2)),
        page_list(&["page-08.png", "page-09.png"])
    );
    assert_eq!(page_paths(&inventory, None).len(), 3);
}

#[test]
fn extract_counts_summarise_pipeline_output() {
    let driver = PipelineDriver::new().expect("driver");
    let pages = page_list(&["page-01.png", "page-02.png", "page-03.png"]);
    let ocr = ScriptedOcr::new(&[
        ("page-01.png", Some(PAGE_ONE)),
        ("page-02.png", None),
        ("page-03.png", Some(PAGE_ONE)),
    ]);

    let output = driver.run(&pages, &ocr);
    let counts = extract_counts(&output, pages.len(), None);

    assert_eq!(counts.processed_page_count, 2);
    assert_eq!(counts.ocr_failed_page_count, 1);
    assert_eq!(counts.unique_entries, 4);
    assert_eq!(counts.duplicates_dropped, 4);
    assert_eq!(counts.province_count, 2);
    assert_eq!(counts.lines_skipped, counts.lines_seen - 8);
}

#[test]
fn run_with_context_resets_stale_state_and_returns_final_context() {
    let driver = PipelineDriver::new().expect("driver");
    let (_, mut context) = classify_all(&["120000", "120100"]);
    let ocr = ScriptedOcr::new(&[("page-03.png", Some(PAGE_THREE))]);

    let output = driver.run_with_context(&page_list(&["page-03.png"]), &ocr, &mut context);

    assert_eq!(output.entries[0].province_code, "010000");
    assert!(context.current_province_code.is_empty());
    assert_eq!(context.fallbacks.commune_without_district, 2);
}

#[test]
fn store_recreates_tables_from_older_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut connection = open_store(&dir.path().join("postal_codes.sqlite")).expect("open");
    connection
        .execute_batch(
            "
            CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);
            INSERT INTO metadata(key, value) VALUES('db_schema_version', '0.1.0');
            CREATE TABLE postal_codes (id INTEGER PRIMARY KEY, postal_code TEXT NOT NULL);
            ",
        )
        .expect("old schema");

    ensure_schema(&connection).expect("schema");
    let (entries, _) = classify_all(&["010000", "010100"]);
    replace_postal_codes(&mut connection, "run-1", &entries).expect("import");

    let version: String = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get(0),
        )
        .expect("version");
    assert_eq!(version, DB_SCHEMA_VERSION);
}

fn cached_extract_args(cache_root: &Path) -> ExtractArgs {
    ExtractArgs {
        cache_root: cache_root.to_path_buf(),
        image_dir: None,
        inventory_manifest_path: None,
        refresh_inventory: false,
        run_manifest_path: None,
        output_csv: None,
        raw_text_dir: None,
        db_path: None,
        max_pages: None,
        ocr_mode: OcrMode::Cached,
        ocr_lang: "khm+eng".to_string(),
        ocr_psm: 6,
        ocr_timeout_secs: 120,
    }
}

#[test]
fn default_extract_loads_the_database_validate_reads() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image_dir = dir.path().join("pdf_images");
    let raw_text_dir = dir.path().join("ocr_raw");
    fs::create_dir_all(&image_dir).expect("image dir");
    fs::create_dir_all(&raw_text_dir).expect("raw text dir");
    fs::write(image_dir.join("page-01.png"), b"scan").expect("page image");
    fs::write(raw_text_dir.join("page-01.txt"), PAGE_ONE).expect("raw text");

    run(cached_extract_args(dir.path())).expect("extract");

    let db_path = dir.path().join("postal_codes.sqlite");
    let connection = Connection::open(&db_path).expect("open db");
    let rows: i64 = connection
        .query_row("SELECT COUNT(*) FROM postal_codes", [], |row| row.get(0))
        .expect("count");
    assert_eq!(rows, 4);

    let manifest_dir = dir.path().join("manifests");
    let manifest_path = latest_manifest(&manifest_dir, "extract_run_")
        .expect("scan manifests")
        .expect("run manifest");
    let manifest: ExtractRunManifest = read_json(&manifest_path).expect("manifest");
    assert_eq!(manifest.status, "completed");
    assert_eq!(manifest.counts.db_rows_written, Some(4));
    assert_eq!(manifest.paths.db_path, db_path.display().to_string());

    validate::run(ValidateArgs {
        cache_root: dir.path().to_path_buf(),
        db_path: None,
        report_path: None,
        strict: true,
    })
    .expect("validate default database");
    assert!(manifest_dir.join("validation_report.json").exists());
}

#[test]
fn extract_with_no_pages_leaves_empty_outputs_and_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("pdf_images")).expect("image dir");

    let err = run(cached_extract_args(dir.path())).expect_err("empty inventory must fail");
    assert!(err.to_string().contains("no pages to extract"));

    let csv = fs::read_to_string(dir.path().join("postal_codes.csv")).expect("csv");
    assert_eq!(csv.trim_end(), CSV_COLUMNS.join(","));

    let manifest_path = latest_manifest(&dir.path().join("manifests"), "extract_run_")
        .expect("scan manifests")
        .expect("run manifest");
    let manifest: ExtractRunManifest = read_json(&manifest_path).expect("manifest");
    assert_eq!(manifest.status, "failed");
    assert_eq!(manifest.counts.page_count, 0);
    assert_eq!(manifest.counts.unique_entries, 0);
    assert_eq!(manifest.counts.db_rows_written, None);
    assert_eq!(manifest.warnings.len(), 1);
    assert!(!dir.path().join("postal_codes.sqlite").exists());
}
