use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::date::DayId;
use crate::error::{StoreResult, StoreUnavailable};
use crate::habit::{Category, Habit, HabitId};
use crate::store::{DeleteOutcome, HabitStore, StoreMode};

/// A habit row as the record service stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitRecord {
    pub id: HabitId,
    #[serde(alias = "title")]
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub streak: u32,
    #[serde(default, alias = "completedDays", alias = "completed_dates")]
    pub completed_days: BTreeSet<DayId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHabitRecord {
    pub name: String,
    pub category: Category,
}

/// Full replacement of a record's completion state, plus optional edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitUpdate {
    pub id: HabitId,
    #[serde(rename = "completedDays")]
    pub completed_days: BTreeSet<DayId>,
    pub streak: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl From<HabitRecord> for Habit {
    fn from(record: HabitRecord) -> Self {
        Habit {
            id: record.id,
            title: record.name,
            category: record.category,
            completed_dates: record.completed_days,
            streak: record.streak,
        }
    }
}

impl From<&Habit> for HabitUpdate {
    fn from(habit: &Habit) -> Self {
        HabitUpdate {
            id: habit.id.clone(),
            completed_days: habit.completed_dates.clone(),
            streak: habit.streak,
            name: Some(habit.title.clone()),
            category: Some(habit.category),
        }
    }
}

/// Request/response boundary of the remote record service.
pub trait RecordService: Send + Sync {
    fn list(&self) -> StoreResult<Vec<HabitRecord>>;

    /// Persist a new record; the service assigns the id, a zero streak and no
    /// completions.
    fn create(&self, record: &NewHabitRecord) -> StoreResult<HabitRecord>;

    /// `None` when the service does not know `update.id`.
    fn update(&self, update: &HabitUpdate) -> StoreResult<Option<HabitRecord>>;

    /// `false` when nothing was deleted.
    fn delete(&self, id: &HabitId) -> StoreResult<bool>;
}

impl<T: RecordService + ?Sized> RecordService for Arc<T> {
    fn list(&self) -> StoreResult<Vec<HabitRecord>> {
        (**self).list()
    }

    fn create(&self, record: &NewHabitRecord) -> StoreResult<HabitRecord> {
        (**self).create(record)
    }

    fn update(&self, update: &HabitUpdate) -> StoreResult<Option<HabitRecord>> {
        (**self).update(update)
    }

    fn delete(&self, id: &HabitId) -> StoreResult<bool> {
        (**self).delete(id)
    }
}

/// Personal-mode store over a [`RecordService`].
pub struct DurableStore<S> {
    service: S,
}

impl<S: RecordService> DurableStore<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn create(&self, habit: Habit) -> StoreResult<Habit> {
        let created = self.service.create(&NewHabitRecord {
            name: habit.title.clone(),
            category: habit.category,
        })?;
        debug!(id = %created.id, "record service assigned id");
        if habit.completed_dates.is_empty() && habit.streak == 0 {
            return Ok(created.into());
        }

        let update = HabitUpdate {
            id: created.id.clone(),
            ..HabitUpdate::from(&habit)
        };
        match self.service.update(&update)? {
            Some(updated) => Ok(updated.into()),
            None => Err(StoreUnavailable::Remote {
                status: 404,
                message: format!("record `{}` vanished right after creation", created.id),
            }),
        }
    }
}

impl<S: RecordService> HabitStore for DurableStore<S> {
    fn mode(&self) -> StoreMode {
        StoreMode::Personal
    }

    fn get_all(&self) -> StoreResult<Vec<Habit>> {
        Ok(self.service.list()?.into_iter().map(Habit::from).collect())
    }

    fn upsert(&self, habit: Habit) -> StoreResult<Habit> {
        if habit.id.is_unassigned() {
            return self.create(habit);
        }
        match self.service.update(&HabitUpdate::from(&habit))? {
            Some(updated) => Ok(updated.into()),
            None => {
                debug!(id = %habit.id, "unknown to record service, creating");
                self.create(habit)
            }
        }
    }

    fn delete(&self, id: &HabitId) -> StoreResult<DeleteOutcome> {
        if self.service.delete(id)? {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }
}

/// Record service held in memory, for tests and offline runs.
#[derive(Debug, Default)]
pub struct InMemoryRecordService {
    state: RwLock<RecordTable>,
}

#[derive(Debug, Default)]
struct RecordTable {
    rows: Vec<HabitRecord>,
    next_id: u64,
}

impl InMemoryRecordService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordService for InMemoryRecordService {
    fn list(&self) -> StoreResult<Vec<HabitRecord>> {
        Ok(self.state.read().rows.clone())
    }

    fn create(&self, record: &NewHabitRecord) -> StoreResult<HabitRecord> {
        let mut table = self.state.write();
        table.next_id += 1;
        let row = HabitRecord {
            id: HabitId::new(format!("rec-{}", table.next_id)),
            name: record.name.clone(),
            category: record.category,
            streak: 0,
            completed_days: BTreeSet::new(),
        };
        table.rows.push(row.clone());
        Ok(row)
    }

    fn update(&self, update: &HabitUpdate) -> StoreResult<Option<HabitRecord>> {
        let mut table = self.state.write();
        let Some(row) = table.rows.iter_mut().find(|row| row.id == update.id) else {
            return Ok(None);
        };
        row.completed_days = update.completed_days.clone();
        row.streak = update.streak;
        if let Some(name) = &update.name {
            row.name = name.clone();
        }
        if let Some(category) = update.category {
            row.category = category;
        }
        Ok(Some(row.clone()))
    }

    fn delete(&self, id: &HabitId) -> StoreResult<bool> {
        let mut table = self.state.write();
        let before = table.rows.len();
        table.rows.retain(|row| &row.id != id);
        Ok(table.rows.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(raw: &str) -> DayId {
        raw.parse().unwrap()
    }

    #[test]
    fn create_returns_server_assigned_record() {
        let store = DurableStore::new(InMemoryRecordService::new());
        let saved = store
            .upsert(Habit::new("Drink Water", Category::Health).unwrap())
            .unwrap();
        assert_eq!(saved.id.as_str(), "rec-1");
        assert_eq!(saved.streak, 0);
        assert!(saved.completed_dates.is_empty());
    }

    #[test]
    fn create_with_history_applies_dates_after_insert() {
        let store = DurableStore::new(InMemoryRecordService::new());
        let mut habit = Habit::new("Drink Water", Category::Health).unwrap();
        habit.toggle(day("2025-11-27"), day("2025-11-27"));
        let saved = store.upsert(habit).unwrap();
        assert_eq!(saved.streak, 1);
        assert!(saved.is_completed_on(day("2025-11-27")));
    }

    #[test]
    fn unknown_id_is_created_rather_than_rejected() {
        let store = DurableStore::new(InMemoryRecordService::new());
        let mut habit = Habit::new("Stretch", Category::Health).unwrap();
        habit.id = HabitId::new("gone");
        let saved = store.upsert(habit).unwrap();
        assert_eq!(saved.id.as_str(), "rec-1");
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn update_replaces_completion_state_and_edits() {
        let store = DurableStore::new(InMemoryRecordService::new());
        let mut saved = store
            .upsert(Habit::new("Read", Category::Productivity).unwrap())
            .unwrap();
        saved.title = "Read 20 Pages".into();
        saved.category = Category::Mindfulness;
        saved.toggle(day("2025-11-26"), day("2025-11-27"));
        let updated = store.upsert(saved.clone()).unwrap();
        assert_eq!(updated, saved);
        assert_eq!(store.get(&saved.id).unwrap(), Some(saved));
    }

    #[test]
    fn delete_reports_missing_rows() {
        let store = DurableStore::new(InMemoryRecordService::new());
        let saved = store
            .upsert(Habit::new("Read", Category::Productivity).unwrap())
            .unwrap();
        assert_eq!(store.delete(&saved.id).unwrap(), DeleteOutcome::Deleted);
        assert_eq!(store.delete(&saved.id).unwrap(), DeleteOutcome::NotFound);
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn record_wire_format_uses_service_field_names() {
        let raw = r#"{"id":"7","name":"Walk","category":"Health","streak":2,"completed_days":["2025-11-26","2025-11-27"]}"#;
        let record: HabitRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.completed_days.len(), 2);

        let update = HabitUpdate::from(&Habit::from(record));
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["completedDays"][1], "2025-11-27");
        assert_eq!(json["streak"], 2);
        assert_eq!(json["name"], "Walk");
    }
}
