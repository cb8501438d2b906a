use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::{StatusArgs, default_db_path};
use crate::model::{ExtractRunManifest, PageInventoryManifest};
use crate::util::{latest_manifest, read_json};

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let inventory_path = manifest_dir.join("page_inventory.json");
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&args.cache_root));

    info!(cache_root = %args.cache_root.display(), "status requested");

    if inventory_path.exists() {
        let inventory: PageInventoryManifest = read_json(&inventory_path)?;

        info!(
            generated_at = %inventory.generated_at,
            source = %inventory.source_directory,
            page_count = inventory.page_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    match latest_manifest(&manifest_dir, "extract_run_")? {
        Some(path) => {
            let manifest: ExtractRunManifest = read_json(&path)?;
            let counts = &manifest.counts;

            info!(
                run_id = %manifest.run_id,
                status = %manifest.status,
                ocr_mode = %manifest.ocr_mode,
                updated_at = %manifest.updated_at,
                pages = counts.page_count,
                failed_pages = counts.ocr_failed_page_count,
                provinces = counts.province_count,
                districts = counts.district_count,
                communes = counts.commune_count,
                unique_entries = counts.unique_entries,
                duplicates_dropped = counts.duplicates_dropped,
                "loaded latest extract run manifest"
            );

            let fallbacks = counts.district_without_province_fallbacks
                + counts.commune_without_province_fallbacks
                + counts.commune_without_district_fallbacks;
            if fallbacks > 0 {
                warn!(
                    district_without_province = counts.district_without_province_fallbacks,
                    commune_without_province = counts.commune_without_province_fallbacks,
                    commune_without_district = counts.commune_without_district_fallbacks,
                    "latest run derived ancestor codes from child codes"
                );
            }
            for warning in &manifest.warnings {
                warn!(warning = %warning, "latest run warning");
            }
        }
        None => warn!(path = %manifest_dir.display(), "no extract run manifest found"),
    }

    if db_path.exists() {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let provinces = query_type_count(&conn, "province").unwrap_or(0);
        let districts = query_type_count(&conn, "district").unwrap_or(0);
        let communes = query_type_count(&conn, "commune").unwrap_or(0);

        info!(
            path = %db_path.display(),
            provinces,
            districts,
            communes,
            "database status"
        );
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

fn query_type_count(conn: &Connection, location_type: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM postal_codes WHERE location_type = ?1",
        [location_type],
        |row| row.get(0),
    )?;
    Ok(count)
}
