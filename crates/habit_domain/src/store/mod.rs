//! Persistence for habits behind one contract, answered either by the
//! ephemeral demo store or by the durable record service.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::habit::{Habit, HabitId};

pub mod durable;
pub mod ephemeral;

pub use durable::{DurableStore, HabitRecord, HabitUpdate, InMemoryRecordService, NewHabitRecord, RecordService};
pub use ephemeral::{EphemeralStore, FileKeyValue, KeyValueStorage, MemoryKeyValue};

/// Which backend answers store calls for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreMode {
    /// Session-scoped storage for demonstrations; nothing survives long.
    Demo,
    /// Authoritative storage shared across sessions and devices.
    Personal,
}

impl StoreMode {
    /// Interpret a demo-mode flag value; only `true`/`1`/`yes` enable demo mode.
    pub fn from_flag(value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()) {
            Some(flag) if matches!(flag.as_str(), "true" | "1" | "yes") => Self::Demo,
            _ => Self::Personal,
        }
    }
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Demo => f.write_str("demo"),
            Self::Personal => f.write_str("personal"),
        }
    }
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "personal" => Ok(Self::Personal),
            other => Err(format!("unknown store mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Read/write contract shared by every backend.
///
/// Implementations report I/O failures as [`StoreUnavailable`](crate::error::StoreUnavailable)
/// and never return an empty list in place of an error.
pub trait HabitStore: Send + Sync {
    fn mode(&self) -> StoreMode;

    fn get_all(&self) -> StoreResult<Vec<Habit>>;

    fn get(&self, id: &HabitId) -> StoreResult<Option<Habit>> {
        Ok(self.get_all()?.into_iter().find(|habit| &habit.id == id))
    }

    /// Create when the id is unassigned or unknown, otherwise replace in full.
    fn upsert(&self, habit: Habit) -> StoreResult<Habit>;

    /// Idempotent: removing an absent id reports [`DeleteOutcome::NotFound`].
    fn delete(&self, id: &HabitId) -> StoreResult<DeleteOutcome>;
}

/// Backend chosen once at startup and shared by every caller.
pub type StoreHandle = Arc<dyn HabitStore>;
