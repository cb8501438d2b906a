use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{ValidateArgs, default_db_path};
use crate::util::{now_utc_string, write_json_pretty};

/// Placeholder tokens left behind by broken Khmer OCR passes.
const CORRUPTION_MARKERS: &[&str] = &["org"];

#[derive(Debug, Clone, Serialize)]
struct QualityCheck {
    check_id: String,
    name: String,
    result: String,
    violations: i64,
}

#[derive(Debug, Clone, Serialize)]
struct CorruptedName {
    postal_code: String,
    name_km: String,
    reason: String,
}

#[derive(Debug, Default, Clone, Serialize)]
struct RowCounts {
    province: i64,
    district: i64,
    commune: i64,
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    manifest_version: u32,
    generated_at: String,
    db_path: String,
    row_counts: RowCounts,
    checks: Vec<QualityCheck>,
    corrupted_names: Vec<CorruptedName>,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&args.cache_root));
    let report_path = args.report_path.clone().unwrap_or_else(|| {
        args.cache_root
            .join("manifests")
            .join("validation_report.json")
    });

    if !db_path.exists() {
        bail!(
            "database {} not found; run `extract` first",
            db_path.display()
        );
    }

    let connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    let report = build_report(&connection, &db_path)?;

    write_json_pretty(&report_path, &report)?;
    info!(path = %report_path.display(), "wrote validation report");

    for check in &report.checks {
        if check.result == "pass" {
            info!(check = %check.check_id, name = %check.name, "check passed");
        } else {
            warn!(
                check = %check.check_id,
                name = %check.name,
                result = %check.result,
                violations = check.violations,
                "check did not pass"
            );
        }
    }

    let failed = report
        .checks
        .iter()
        .filter(|check| check.result == "failed")
        .count();
    info!(
        provinces = report.row_counts.province,
        districts = report.row_counts.district,
        communes = report.row_counts.commune,
        corrupted_names = report.corrupted_names.len(),
        failed_checks = failed,
        "validation completed"
    );

    if args.strict && failed > 0 {
        bail!("{failed} structural check(s) failed; see {}", report_path.display());
    }

    Ok(())
}

fn build_report(connection: &Connection, db_path: &Path) -> Result<ValidationReport> {
    let row_counts = RowCounts {
        province: count_type(connection, "province")?,
        district: count_type(connection, "district")?,
        commune: count_type(connection, "commune")?,
    };

    let mut checks = vec![
        structural_check(
            "V-001",
            "Postal codes are six digits",
            query_violation_count(
                connection,
                "
                SELECT COUNT(*)
                FROM postal_codes
                WHERE length(postal_code) <> 6
                   OR postal_code GLOB '*[^0-9]*'
                ",
            )?,
        ),
        structural_check(
            "V-002",
            "Postal codes are unique",
            query_violation_count(
                connection,
                "
                SELECT COUNT(*)
                FROM (SELECT postal_code FROM postal_codes GROUP BY postal_code HAVING COUNT(*) > 1)
                ",
            )?,
        ),
        structural_check(
            "V-003",
            "Province codes end in 0000",
            query_violation_count(
                connection,
                "
                SELECT COUNT(*)
                FROM postal_codes
                WHERE province_code NOT GLOB '[0-9][0-9]0000'
                ",
            )?,
        ),
        structural_check(
            "V-004",
            "Commune district codes end in 00 but not 0000",
            query_violation_count(
                connection,
                "
                SELECT COUNT(*)
                FROM postal_codes
                WHERE location_type = 'commune'
                  AND (district_code NOT GLOB '[0-9][0-9][0-9][0-9]00'
                       OR district_code GLOB '[0-9][0-9]0000')
                ",
            )?,
        ),
    ];

    // Orphans usually mean a province or district row was lost to OCR noise.
    let orphan_count = query_violation_count(
        connection,
        "
        SELECT COUNT(*)
        FROM postal_codes child
        WHERE (child.location_type = 'district' AND NOT EXISTS (
                 SELECT 1 FROM postal_codes parent
                 WHERE parent.location_type = 'province'
                   AND parent.postal_code = child.province_code))
           OR (child.location_type = 'commune' AND NOT EXISTS (
                 SELECT 1 FROM postal_codes parent
                 WHERE parent.location_type = 'district'
                   AND parent.postal_code = child.district_code))
        ",
    )?;
    checks.push(advisory_check(
        "V-005",
        "Districts and communes have a stored parent",
        orphan_count,
    ));

    let corrupted_names = collect_corrupted_names(connection)?;
    checks.push(advisory_check(
        "V-006",
        "Khmer names free of corruption markers",
        corrupted_names.len() as i64,
    ));

    Ok(ValidationReport {
        manifest_version: 1,
        generated_at: now_utc_string(),
        db_path: db_path.display().to_string(),
        row_counts,
        checks,
        corrupted_names,
    })
}

fn structural_check(check_id: &str, name: &str, violations: i64) -> QualityCheck {
    QualityCheck {
        check_id: check_id.to_string(),
        name: name.to_string(),
        result: if violations == 0 { "pass" } else { "failed" }.to_string(),
        violations,
    }
}

fn advisory_check(check_id: &str, name: &str, violations: i64) -> QualityCheck {
    QualityCheck {
        check_id: check_id.to_string(),
        name: name.to_string(),
        result: if violations == 0 { "pass" } else { "warning" }.to_string(),
        violations,
    }
}

fn collect_corrupted_names(connection: &Connection) -> Result<Vec<CorruptedName>> {
    let mut statement = connection
        .prepare("SELECT postal_code, name_km FROM postal_codes ORDER BY seq")
        .context("failed to prepare name scan")?;
    let rows = statement.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut corrupted = Vec::new();
    for row in rows {
        let (postal_code, name_km) = row?;
        if let Some(reason) = name_corruption(&name_km) {
            corrupted.push(CorruptedName {
                postal_code,
                name_km,
                reason,
            });
        }
    }

    Ok(corrupted)
}

fn name_corruption(name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return Some("empty".to_string());
    }

    CORRUPTION_MARKERS
        .iter()
        .find(|marker| name.contains(**marker))
        .map(|marker| format!("marker:{marker}"))
}

fn count_type(connection: &Connection, location_type: &str) -> Result<i64> {
    let count = connection.query_row(
        "SELECT COUNT(*) FROM postal_codes WHERE location_type = ?1",
        [location_type],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn query_violation_count(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get::<_, i64>(0))?;
    Ok(count)
}
