//! Idempotent run gating -- decides whether a (date, slot) digest has already
//! been delivered, and records completion durably after the caller's side
//! effects succeed.
//!
//! The gate fails open: unreadable or corrupt state is treated as "not yet
//! run", because a duplicate digest is preferable to silently skipping one.

pub mod store;

pub use self::store::{MemoryStore, SqliteStore};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

/// A named recurring execution window within a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Slot {
    Am,
    Pm,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Am => write!(f, "AM"),
            Slot::Pm => write!(f, "PM"),
        }
    }
}

impl FromStr for Slot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AM" => Ok(Slot::Am),
            "PM" => Ok(Slot::Pm),
            other => anyhow::bail!("run slot must be AM or PM, got '{}'", other),
        }
    }
}

/// The unique identifier gating idempotence: calendar date plus run slot.
///
/// The canonical string form is `YYYY-MM-DD:AM`. The `:` separator cannot
/// appear in either component, so distinct (date, slot) pairs never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub date: NaiveDate,
    pub slot: Slot,
}

impl RunKey {
    pub fn new(date: NaiveDate, slot: Slot) -> Self {
        Self { date, slot }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.date.format("%Y-%m-%d"), self.slot)
    }
}

impl FromStr for RunKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date_part, slot_part) = s
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("run key must look like YYYY-MM-DD:AM, got '{}'", s))?;
        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("invalid date in run key '{}': {}", s, e))?;
        let slot = slot_part.parse()?;
        Ok(Self { date, slot })
    }
}

/// Terminal status of a recorded run. A pending run is the absence of a
/// record, so it needs no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// Persisted state for one logical execution.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_key: String,
    pub status: RunStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Store exists but cannot be read or parsed. Callers recover by
    /// treating the key as not yet run.
    #[error("run state unreadable: {0}")]
    StateUnreadable(String),

    /// Completion could not be persisted after the caller's work succeeded.
    /// Must be surfaced as a warning, never masked as overall failure.
    #[error("run state unwritable: {0}")]
    StateUnwritable(String),

    /// Another process holds the record for this key. The loser skips its
    /// work rather than retrying immediately.
    #[error("another process holds the run record for {key}")]
    ConcurrentRunConflict { key: String },
}

/// Date/time source for run-key derivation, overridable in tests.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Production clock reading the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Persistence backend for run records: a flat mapping from run key to
/// record with exclusive read-modify-write per key.
pub trait StateStore: Send + Sync {
    fn load(&self, key: &RunKey) -> Result<Option<RunRecord>, GateError>;

    fn save(
        &self,
        key: &RunKey,
        status: RunStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), GateError>;
}

/// The run gate. Holds an injected store handle so tests can substitute an
/// in-memory store.
pub struct RunGate {
    store: Box<dyn StateStore>,
}

impl RunGate {
    pub fn new(store: Box<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Returns false only when a completed record exists for `key`.
    ///
    /// No store yet, a failed attempt, or unreadable state all yield true:
    /// correctness favors "run again" over silently skipping a scheduled
    /// digest.
    pub fn should_run(&self, key: &RunKey) -> bool {
        match self.store.load(key) {
            Ok(Some(record)) => record.status != RunStatus::Completed,
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "run state unreadable, treating as not yet run");
                true
            }
        }
    }

    /// Record successful completion. Call only after the side-effecting work
    /// has fully succeeded; the write is flushed before this returns.
    pub fn mark_completed(
        &self,
        key: &RunKey,
        completed_at: DateTime<Utc>,
    ) -> Result<(), GateError> {
        self.store.save(key, RunStatus::Completed, Some(completed_at))
    }

    /// Record a failed attempt. Does not block future retries for the key.
    pub fn mark_failed(&self, key: &RunKey) -> Result<(), GateError> {
        self.store.save(key, RunStatus::Failed, None)
    }
}
