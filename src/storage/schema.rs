//! Database schema for run state

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per scrape
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);

-- Every observation a completed crawl accumulated
CREATE TABLE IF NOT EXISTS partial_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    source TEXT NOT NULL,
    source_id TEXT NOT NULL,
    origin TEXT NOT NULL,
    resource_url TEXT NOT NULL,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_partial_records_run ON partial_records(run_id);
CREATE INDEX IF NOT EXISTS idx_partial_records_identity
    ON partial_records(run_id, source, source_id);
"#;

/// Creates any missing tables and indexes
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
