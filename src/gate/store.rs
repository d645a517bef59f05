//! State store backends for the run gate: SQLite for production, an
//! in-memory map for tests and dry runs.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension, TransactionBehavior};

use super::{GateError, RunKey, RunRecord, RunStatus, StateStore};
use crate::storage::Pool;

/// Durable store backed by the `run_state` table.
///
/// Same-key writers are serialized with an immediate transaction; a busy
/// database surfaces as [`GateError::ConcurrentRunConflict`] so the loser
/// skips instead of spinning.
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// All recorded runs, ordered by key. Used by `owlwatch state list`.
    pub fn list(&self) -> Result<Vec<RunRecord>, GateError> {
        let conn = self
            .pool
            .get()
            .map_err(|e| GateError::StateUnreadable(e.to_string()))?;
        let mut stmt = conn
            .prepare("SELECT run_key, status, completed_at FROM run_state ORDER BY run_key")
            .map_err(|e| GateError::StateUnreadable(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(|e| GateError::StateUnreadable(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let (run_key, status, completed_at) =
                row.map_err(|e| GateError::StateUnreadable(e.to_string()))?;
            records.push(record_from_columns(run_key, &status, completed_at)?);
        }
        Ok(records)
    }
}

impl StateStore for SqliteStore {
    fn load(&self, key: &RunKey) -> Result<Option<RunRecord>, GateError> {
        let conn = self
            .pool
            .get()
            .map_err(|e| GateError::StateUnreadable(e.to_string()))?;

        let row = conn
            .query_row(
                "SELECT status, completed_at FROM run_state WHERE run_key = ?1",
                params![key.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| GateError::StateUnreadable(e.to_string()))?;

        match row {
            Some((status, completed_at)) => Ok(Some(record_from_columns(
                key.to_string(),
                &status,
                completed_at,
            )?)),
            None => Ok(None),
        }
    }

    fn save(
        &self,
        key: &RunKey,
        status: RunStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), GateError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| GateError::StateUnwritable(e.to_string()))?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| map_write_error(e, key))?;

        // A completed record is terminal: a racing second writer leaves it
        // untouched, so exactly one completed record survives per key.
        let existing: Option<String> = tx
            .query_row(
                "SELECT status FROM run_state WHERE run_key = ?1",
                params![key.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| map_write_error(e, key))?;

        if existing.as_deref() == Some(RunStatus::Completed.as_str()) {
            return Ok(());
        }

        tx.execute(
            "INSERT INTO run_state (run_key, status, completed_at, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(run_key) DO UPDATE SET
                 status = excluded.status,
                 completed_at = excluded.completed_at,
                 updated_at = excluded.updated_at",
            params![
                key.to_string(),
                status.as_str(),
                completed_at.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(|e| map_write_error(e, key))?;

        tx.commit().map_err(|e| map_write_error(e, key))
    }
}

fn record_from_columns(
    run_key: String,
    status: &str,
    completed_at: Option<String>,
) -> Result<RunRecord, GateError> {
    let status = RunStatus::parse(status).ok_or_else(|| {
        GateError::StateUnreadable(format!("unknown status '{}' for key {}", status, run_key))
    })?;

    let completed_at = match completed_at {
        Some(ts) => Some(
            DateTime::parse_from_rfc3339(&ts)
                .map_err(|e| {
                    GateError::StateUnreadable(format!(
                        "bad completion timestamp for key {}: {}",
                        run_key, e
                    ))
                })?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(RunRecord {
        run_key,
        status,
        completed_at,
    })
}

fn map_write_error(e: rusqlite::Error, key: &RunKey) -> GateError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
            return GateError::ConcurrentRunConflict {
                key: key.to_string(),
            };
        }
    }
    GateError::StateUnwritable(e.to_string())
}

/// Volatile store for tests and `--dry-run` invocations.
pub struct MemoryStore {
    records: Mutex<HashMap<String, RunRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, key: &RunKey) -> Result<Option<RunRecord>, GateError> {
        let records = self
            .records
            .lock()
            .map_err(|e| GateError::StateUnreadable(e.to_string()))?;
        Ok(records.get(&key.to_string()).cloned())
    }

    fn save(
        &self,
        key: &RunKey,
        status: RunStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), GateError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| GateError::StateUnwritable(e.to_string()))?;
        let run_key = key.to_string();

        if let Some(existing) = records.get(&run_key) {
            if existing.status == RunStatus::Completed {
                return Ok(());
            }
        }

        records.insert(
            run_key.clone(),
            RunRecord {
                run_key,
                status,
                completed_at,
            },
        );
        Ok(())
    }
}
