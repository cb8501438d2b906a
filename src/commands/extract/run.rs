use super::*;

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let image_dir = args
        .image_dir
        .clone()
        .unwrap_or_else(|| inventory::default_image_dir(&cache_root));
    let inventory_manifest_path = args
        .inventory_manifest_path
        .clone()
        .unwrap_or_else(|| manifest_dir.join("page_inventory.json"));
    let run_manifest_path = args.run_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "extract_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let page_report_path = manifest_dir.join(format!(
        "extract_pages_{}.json",
        utc_compact_string(started_ts)
    ));
    let output_csv = args
        .output_csv
        .clone()
        .unwrap_or_else(|| cache_root.join("postal_codes.csv"));
    let raw_text_dir = args
        .raw_text_dir
        .clone()
        .unwrap_or_else(|| cache_root.join("ocr_raw"));
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&cache_root));

    info!(cache_root = %cache_root.display(), run_id = %run_id, "starting extract");

    let inventory =
        load_or_refresh_inventory(&image_dir, &inventory_manifest_path, args.refresh_inventory)?;
    let pages = page_paths(&inventory, args.max_pages);

    ensure_directory(&raw_text_dir)?;
    let tool_versions = collect_tool_versions(args.ocr_mode);

    // An empty inventory still leaves a header-only CSV and a failed run
    // manifest behind; the database keeps its previous contents.
    let no_pages_error = pages.is_empty().then(|| {
        format!(
            "inventory {} lists no pages to extract",
            inventory_manifest_path.display()
        )
    });

    let output = match &no_pages_error {
        Some(message) => {
            warn!(path = %inventory_manifest_path.display(), "no pages to extract");
            PipelineOutput {
                warnings: vec![message.clone()],
                ..PipelineOutput::default()
            }
        }
        None => {
            let driver = PipelineDriver::new()?;
            match args.ocr_mode {
                OcrMode::Tesseract => {
                    let ocr = RecordingOcr::new(
                        TesseractOcr::new(
                            &args.ocr_lang,
                            args.ocr_psm,
                            Duration::from_secs(args.ocr_timeout_secs),
                        ),
                        &raw_text_dir,
                    );
                    driver.run(&pages, &ocr)
                }
                OcrMode::Cached => driver.run(&pages, &CachedTextOcr::new(&raw_text_dir)),
            }
        }
    };

    write_csv(&output_csv, &output.entries)?;
    info!(path = %output_csv.display(), rows = output.entries.len(), "wrote postal code csv");

    let db_rows_written = if no_pages_error.is_none() {
        let mut connection = open_store(&db_path)?;
        ensure_schema(&connection)?;
        let written = replace_postal_codes(&mut connection, &run_id, &output.entries)?;
        info!(path = %db_path.display(), rows = written, "loaded postal codes into database");
        Some(written)
    } else {
        None
    };

    let updated_at = now_utc_string();

    write_json_pretty(
        &page_report_path,
        &PageReportManifest {
            manifest_version: 1,
            run_id: run_id.clone(),
            generated_at: updated_at.clone(),
            pages: output.pages.clone(),
        },
    )?;

    let counts = extract_counts(&output, pages.len(), db_rows_written);
    let manifest = ExtractRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: if no_pages_error.is_some() {
            "failed".to_string()
        } else {
            "completed".to_string()
        },
        started_at,
        updated_at,
        command: render_extract_command(&args),
        ocr_mode: args.ocr_mode.as_str().to_string(),
        tool_versions,
        paths: ExtractPaths {
            cache_root: cache_root.display().to_string(),
            image_dir: inventory.source_directory.clone(),
            inventory_manifest_path: inventory_manifest_path.display().to_string(),
            page_report_path: page_report_path.display().to_string(),
            raw_text_dir: raw_text_dir.display().to_string(),
            output_csv: output_csv.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        counts,
        source_hashes: inventory.pages,
        warnings: output.warnings.clone(),
    };

    write_json_pretty(&run_manifest_path, &manifest)?;
    info!(path = %run_manifest_path.display(), "wrote extract run manifest");

    if let Some(message) = no_pages_error {
        bail!(message);
    }

    info!(
        rows_classified = output.stats.total(),
        provinces = output.stats.province,
        districts = output.stats.district,
        communes = output.stats.commune,
        unique_entries = output.entries.len(),
        failed_pages = output.ocr_failed_pages(),
        "extract completed"
    );

    Ok(())
}

fn load_or_refresh_inventory(
    image_dir: &Path,
    inventory_manifest_path: &Path,
    refresh_inventory: bool,
) -> Result<PageInventoryManifest> {
    if refresh_inventory || !inventory_manifest_path.exists() {
        let manifest = inventory::build_manifest(image_dir)?;
        write_json_pretty(inventory_manifest_path, &manifest)?;
        info!(
            path = %inventory_manifest_path.display(),
            page_count = manifest.page_count,
            "refreshed inventory manifest"
        );
        return Ok(manifest);
    }

    let manifest: PageInventoryManifest = read_json(inventory_manifest_path)?;

    info!(
        path = %inventory_manifest_path.display(),
        page_count = manifest.page_count,
        "loaded existing inventory manifest"
    );

    Ok(manifest)
}

/// Page images in manifest order, which is already reading order.
pub fn page_paths(inventory: &PageInventoryManifest, max_pages: Option<usize>) -> Vec<PathBuf> {
    let source = PathBuf::from(&inventory.source_directory);
    inventory
        .pages
        .iter()
        .take(max_pages.unwrap_or(usize::MAX))
        .map(|page| source.join(&page.filename))
        .collect()
}

pub fn extract_counts(
    output: &PipelineOutput,
    page_count: usize,
    db_rows_written: Option<usize>,
) -> ExtractCounts {
    let ocr_failed_page_count = output.ocr_failed_pages();
    ExtractCounts {
        page_count,
        processed_page_count: page_count - ocr_failed_page_count,
        ocr_failed_page_count,
        lines_seen: output.lines_seen,
        lines_skipped: output.lines_skipped,
        province_count: output.stats.province,
        district_count: output.stats.district,
        commune_count: output.stats.commune,
        entries_before_dedupe: output.entries_before_dedupe,
        unique_entries: output.entries.len(),
        duplicates_dropped: output.entries_before_dedupe - output.entries.len(),
        row_numbered_matches: output.pattern_counts.row_numbered,
        bare_matches: output.pattern_counts.bare,
        embedded_matches: output.pattern_counts.embedded,
        district_without_province_fallbacks: output.fallbacks.district_without_province,
        commune_without_province_fallbacks: output.fallbacks.commune_without_province,
        commune_without_district_fallbacks: output.fallbacks.commune_without_district,
        db_rows_written,
    }
}

fn render_extract_command(args: &ExtractArgs) -> String {
    let mut command = vec![
        "postal-ocr".to_string(),
        "extract".to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    if let Some(path) = &args.image_dir {
        command.push("--image-dir".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.inventory_manifest_path {
        command.push("--inventory-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if args.refresh_inventory {
        command.push("--refresh-inventory".to_string());
    }
    if let Some(path) = &args.run_manifest_path {
        command.push("--run-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.output_csv {
        command.push("--output-csv".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.raw_text_dir {
        command.push("--raw-text-dir".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(max_pages) = args.max_pages {
        command.push("--max-pages".to_string());
        command.push(max_pages.to_string());
    }
    command.push("--ocr-mode".to_string());
    command.push(args.ocr_mode.as_str().to_string());
    if args.ocr_mode == OcrMode::Tesseract {
        command.push("--ocr-lang".to_string());
        command.push(args.ocr_lang.clone());
        command.push("--ocr-psm".to_string());
        command.push(args.ocr_psm.to_string());
        command.push("--ocr-timeout-secs".to_string());
        command.push(args.ocr_timeout_secs.to_string());
    }

    command.join(" ")
}
