//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::PartialRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`, creating parent directories
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let open_err = |source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        };
        let conn = Connection::open(path).map_err(open_err)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(open_err)?;

        initialize_schema(&conn).map_err(open_err)?;
        tracing::debug!(path = %path.display(), "Opened state database");

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn set_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        tracing::debug!(run_id, status = status.to_db_string(), "Updated run status");
        Ok(())
    }
}

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<(RunRecord, String)> {
    let status: String = row.get(4)?;
    Ok((
        RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::Running,
        },
        status,
    ))
}

fn with_status((mut run, status): (RunRecord, String)) -> StorageResult<RunRecord> {
    run.status = RunStatus::from_db_string(&status).ok_or(StorageError::InvalidStatus(status))?;
    Ok(run)
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = self.conn.last_insert_rowid();
        tracing::info!(run_id, "Started run");
        Ok(run_id)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;
        with_status(row)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?
            .map(with_status)
            .transpose()
    }

    fn get_latest_completed_run(&self) -> StorageResult<Option<RunRecord>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM runs WHERE status = ?1 ORDER BY id DESC LIMIT 1",
                    RUN_COLUMNS
                ),
                params![RunStatus::Completed.to_db_string()],
                run_from_row,
            )
            .optional()?
            .map(with_status)
            .transpose()
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.set_status(run_id, RunStatus::Completed)
    }

    fn mark_interrupted(&mut self, run_id: i64) -> StorageResult<()> {
        self.set_status(run_id, RunStatus::Interrupted)
    }

    fn mark_failed(&mut self, run_id: i64) -> StorageResult<()> {
        self.set_status(run_id, RunStatus::Failed)
    }

    // ===== Partial Records =====

    fn save_partial_records(
        &mut self,
        run_id: i64,
        records: &[PartialRecord],
    ) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO partial_records
                    (run_id, source, source_id, origin, resource_url, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            for record in records {
                let payload = serde_json::to_string(record)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                stmt.execute(params![
                    run_id,
                    record.identity.source.as_str(),
                    record.identity.source_id,
                    record.origin.as_str(),
                    record.resource_url,
                    payload,
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(run_id, records = records.len(), "Saved partial records");
        Ok(records.len())
    }

    fn load_partial_records(&self, run_id: i64) -> StorageResult<Vec<PartialRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM partial_records WHERE run_id = ?1 ORDER BY id")?;

        let payloads = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|payload| {
                serde_json::from_str(payload)
                    .map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .collect()
    }

    fn count_partial_records(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM partial_records WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
