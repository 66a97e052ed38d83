use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::date::DayClock;
use crate::error::{StoreResult, StoreUnavailable};
use crate::habit::{Habit, HabitId};
use crate::store::{DeleteOutcome, HabitStore, StoreMode};

/// Roughly what a single browser cookie can hold.
pub const DEFAULT_CAPACITY_BYTES: usize = 4096;
pub const DEFAULT_TTL_HOURS: i64 = 24;
pub const DEFAULT_NAMESPACE: &str = "hb_habits";

/// Text key/value storage scoped to one session or device.
pub trait KeyValueStorage: Send + Sync {
    fn read(&self, key: &str) -> StoreResult<Option<String>>;
    fn write(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Arc<T> {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }
}

/// Process-scoped storage; gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryKeyValue {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryKeyValue {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// One file per key under a session directory, so a demo session outlives a
/// single CLI invocation on the same device.
#[derive(Debug, Clone)]
pub struct FileKeyValue {
    dir: PathBuf,
}

impl FileKeyValue {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn storage_error(err: std::io::Error, path: &Path) -> StoreUnavailable {
        StoreUnavailable::Storage {
            mode: StoreMode::Demo,
            reason: format!("{}: {err}", path.display()),
        }
    }
}

impl KeyValueStorage for FileKeyValue {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::storage_error(err, &path)),
        }
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).map_err(|err| Self::storage_error(err, &self.dir))?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).map_err(|err| Self::storage_error(err, &staging))?;
        fs::rename(&staging, &path).map_err(|err| Self::storage_error(err, &path))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::storage_error(err, &path)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    saved_at: DateTime<Utc>,
    habits: Vec<Habit>,
}

#[derive(Debug)]
enum Session {
    Absent,
    Expired,
    Live(Vec<Habit>),
}

impl Session {
    fn into_habits(self) -> Vec<Habit> {
        match self {
            Session::Live(habits) => habits,
            Session::Absent | Session::Expired => Vec::new(),
        }
    }
}

/// Demo-mode store: the whole collection lives in one size-capped, expiring
/// JSON value.
pub struct EphemeralStore {
    storage: Box<dyn KeyValueStorage>,
    namespace: String,
    capacity: usize,
    ttl: Duration,
    clock: DayClock,
    write_guard: Mutex<()>,
}

impl EphemeralStore {
    pub fn new(storage: impl KeyValueStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            namespace: DEFAULT_NAMESPACE.to_string(),
            capacity: DEFAULT_CAPACITY_BYTES,
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
            clock: DayClock::system(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryKeyValue::new())
    }

    pub fn with_capacity(mut self, bytes: usize) -> Self {
        self.capacity = bytes;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: DayClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store `habits` only when no live session exists, i.e. the key was
    /// never written or has expired. A session emptied by deletes stays empty.
    /// Returns whether anything was written.
    pub fn seed_if_absent(&self, habits: Vec<Habit>) -> StoreResult<bool> {
        let _guard = self.write_guard.lock();
        if let Session::Live(_) = self.read_session()? {
            return Ok(false);
        }
        let habits: Vec<Habit> = habits
            .into_iter()
            .map(|mut habit| {
                if habit.id.is_unassigned() {
                    habit.id = HabitId::generate();
                }
                habit
            })
            .collect();
        self.save(&habits)?;
        Ok(true)
    }

    /// Never mutates storage; expired keys are only evicted by writers.
    fn read_session(&self) -> StoreResult<Session> {
        let Some(raw) = self.storage.read(&self.namespace)? else {
            return Ok(Session::Absent);
        };
        let envelope: Envelope =
            serde_json::from_str(&raw).map_err(|err| StoreUnavailable::Codec {
                mode: StoreMode::Demo,
                reason: err.to_string(),
            })?;
        if self.clock.now() - envelope.saved_at > self.ttl {
            warn!(namespace = %self.namespace, saved_at = %envelope.saved_at, "demo session expired");
            return Ok(Session::Expired);
        }
        Ok(Session::Live(envelope.habits))
    }

    fn save(&self, habits: &[Habit]) -> StoreResult<()> {
        let envelope = Envelope {
            saved_at: self.clock.now(),
            habits: habits.to_vec(),
        };
        let payload = serde_json::to_string(&envelope).map_err(|err| StoreUnavailable::Codec {
            mode: StoreMode::Demo,
            reason: err.to_string(),
        })?;
        if payload.len() > self.capacity {
            return Err(StoreUnavailable::CapacityExceeded {
                mode: StoreMode::Demo,
                size: payload.len(),
                limit: self.capacity,
            });
        }
        debug!(namespace = %self.namespace, bytes = payload.len(), "writing demo session");
        self.storage.write(&self.namespace, &payload)
    }
}

impl HabitStore for EphemeralStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Demo
    }

    fn get_all(&self) -> StoreResult<Vec<Habit>> {
        Ok(self.read_session()?.into_habits())
    }

    fn upsert(&self, mut habit: Habit) -> StoreResult<Habit> {
        let _guard = self.write_guard.lock();
        let mut habits = self.read_session()?.into_habits();
        if habit.id.is_unassigned() {
            habit.id = HabitId::generate();
        }
        match habits.iter_mut().find(|existing| existing.id == habit.id) {
            Some(existing) => *existing = habit.clone(),
            None => habits.push(habit.clone()),
        }
        self.save(&habits)?;
        Ok(habit)
    }

    fn delete(&self, id: &HabitId) -> StoreResult<DeleteOutcome> {
        let _guard = self.write_guard.lock();
        let mut habits = match self.read_session()? {
            Session::Live(habits) => habits,
            Session::Expired => {
                self.storage.remove(&self.namespace)?;
                return Ok(DeleteOutcome::NotFound);
            }
            Session::Absent => return Ok(DeleteOutcome::NotFound),
        };
        let before = habits.len();
        habits.retain(|habit| &habit.id != id);
        if habits.len() == before {
            return Ok(DeleteOutcome::NotFound);
        }
        self.save(&habits)?;
        Ok(DeleteOutcome::Deleted)
    }
}
