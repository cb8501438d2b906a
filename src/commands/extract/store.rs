use super::*;

/// Header row of the CSV output; matches the serde names of [`LocationEntry`].
pub const CSV_COLUMNS: [&str; 10] = [
    "postal_code",
    "name_km",
    "name_en",
    "type",
    "province_code",
    "district_code",
    "province_name_km",
    "province_name_en",
    "district_name_km",
    "district_name_en",
];

/// Writes the header even when `entries` is empty.
pub fn write_csv(path: &Path, entries: &[LocationEntry]) -> Result<()> {
    ensure_parent_directory(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create csv file: {}", path.display()))?;
    writer
        .write_record(CSV_COLUMNS)
        .with_context(|| format!("failed to write csv header to {}", path.display()))?;
    for entry in entries {
        writer
            .serialize(entry)
            .with_context(|| format!("failed to write row {} to {}", entry.postal_code, path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush csv file: {}", path.display()))?;

    Ok(())
}

pub fn open_store(db_path: &Path) -> Result<Connection> {
    ensure_parent_directory(db_path)?;
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );",
        )
        .context("failed to create metadata table")?;

    // Every import replaces the whole table, so an outdated layout is simply
    // dropped and recreated.
    let stored_version = stored_schema_version(connection)?;
    if stored_version.as_deref().is_some_and(|version| version != DB_SCHEMA_VERSION) {
        info!(
            from = stored_version.as_deref().unwrap_or_default(),
            to = DB_SCHEMA_VERSION,
            "recreating postal code tables for new schema"
        );
        connection
            .execute_batch(
                "
                DROP TABLE IF EXISTS postal_codes_fts;
                DROP TABLE IF EXISTS postal_codes;
                ",
            )
            .context("failed to drop outdated postal code tables")?;
    }

    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS postal_codes (
              id INTEGER PRIMARY KEY,
              seq INTEGER NOT NULL,
              code TEXT NOT NULL,
              postal_code TEXT NOT NULL,
              name_km TEXT NOT NULL,
              name_en TEXT NOT NULL,
              location_type TEXT NOT NULL,
              province_code TEXT NOT NULL,
              district_code TEXT NOT NULL,
              province_name_km TEXT NOT NULL,
              province_name_en TEXT NOT NULL,
              district_name_km TEXT NOT NULL,
              district_name_en TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_postal_codes_postal_code ON postal_codes(postal_code);
            CREATE INDEX IF NOT EXISTS idx_postal_codes_location_type ON postal_codes(location_type);
            CREATE INDEX IF NOT EXISTS idx_postal_codes_name_en ON postal_codes(name_en);

            CREATE VIRTUAL TABLE IF NOT EXISTS postal_codes_fts
            USING fts5(postal_code, name_km, name_en, content='postal_codes', content_rowid='id');
            ",
        )
        .context("failed to create postal code schema")?;

    connection
        .execute(
            "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![DB_SCHEMA_VERSION],
        )
        .context("failed to record schema version")?;

    Ok(())
}

fn stored_schema_version(connection: &Connection) -> Result<Option<String>> {
    connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .context("failed to read stored schema version")
}

/// Replaces the whole table with `entries`, keeping their order in `seq`.
pub fn replace_postal_codes(
    connection: &mut Connection,
    run_id: &str,
    entries: &[LocationEntry],
) -> Result<usize> {
    let tx = connection
        .transaction()
        .context("failed to start postal code transaction")?;

    tx.execute("DELETE FROM postal_codes", [])
        .context("failed to clear postal_codes")?;

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO postal_codes (
              seq, code, postal_code, name_km, name_en, location_type,
              province_code, district_code,
              province_name_km, province_name_en, district_name_km, district_name_en
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ",
        )?;

        for (seq, entry) in entries.iter().enumerate() {
            statement
                .execute(params![
                    seq as i64,
                    &entry.code,
                    &entry.postal_code,
                    &entry.name_local,
                    &entry.name_en,
                    entry.location_type.as_str(),
                    &entry.province_code,
                    &entry.district_code,
                    &entry.province_name_local,
                    &entry.province_name_en,
                    &entry.district_name_local,
                    &entry.district_name_en,
                ])
                .with_context(|| format!("failed to insert postal code {}", entry.postal_code))?;
        }
    }

    tx.execute(
        "INSERT INTO metadata(key, value) VALUES('last_run_id', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![run_id],
    )
    .context("failed to record run id")?;

    tx.commit().context("failed to commit postal codes")?;

    sync_fts_index(connection)?;

    Ok(entries.len())
}

fn sync_fts_index(connection: &Connection) -> Result<()> {
    connection
        .execute(
            "INSERT INTO postal_codes_fts(postal_codes_fts) VALUES('rebuild')",
            [],
        )
        .context("failed to rebuild FTS index")?;
    Ok(())
}
