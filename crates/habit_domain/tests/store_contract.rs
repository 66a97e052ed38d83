use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use habit_domain::store::{
    DurableStore, EphemeralStore, FileKeyValue, HabitRecord, HabitUpdate, InMemoryRecordService,
    NewHabitRecord, RecordService,
};
use habit_domain::{
    Category, DayClock, DayId, DeleteOutcome, Freshness, HabitError, HabitId, HabitService,
    StoreHandle, StoreMode, StoreUnavailable,
};
use tempfile::tempdir;

const TODAY: &str = "2025-11-27";

fn day(raw: &str) -> DayId {
    raw.parse().expect("valid day")
}

fn clock() -> DayClock {
    DayClock::pinned_to_day(day(TODAY))
}

fn backends() -> Vec<(&'static str, StoreHandle, Option<tempfile::TempDir>)> {
    let dir = tempdir().expect("tempdir");
    let file_store = EphemeralStore::new(FileKeyValue::new(dir.path())).with_clock(clock());
    vec![
        (
            "ephemeral/memory",
            Arc::new(EphemeralStore::in_memory().with_clock(clock())) as StoreHandle,
            None,
        ),
        ("ephemeral/file", Arc::new(file_store) as StoreHandle, Some(dir)),
        (
            "durable/in-memory",
            Arc::new(DurableStore::new(InMemoryRecordService::new())) as StoreHandle,
            None,
        ),
    ]
}

fn service(store: StoreHandle) -> HabitService {
    HabitService::builder(store).with_clock(clock()).build()
}

#[test]
fn empty_store_reads_as_empty_list() {
    for (name, store, _guard) in backends() {
        assert!(store.get_all().expect(name).is_empty(), "{name}");
    }
}

#[test]
fn toggle_round_trips_through_get_all() {
    for (name, store, _guard) in backends() {
        let service = service(store.clone());
        let habit = service
            .create_habit("Morning Meditation", Category::Mindfulness)
            .expect(name);
        assert_eq!(habit.streak, 0, "{name}");
        assert!(habit.completed_dates.is_empty(), "{name}");

        for raw in ["2025-11-25", "2025-11-26", TODAY] {
            service.toggle_completion(&habit.id, day(raw)).expect(name);
        }

        let stored = store
            .get_all()
            .expect(name)
            .into_iter()
            .find(|candidate| candidate.id == habit.id)
            .expect("habit persisted");
        assert_eq!(stored.completed_dates.len(), 3, "{name}");
        assert_eq!(stored.streak, 3, "{name}");
    }
}

#[test]
fn toggling_the_only_completion_off_empties_the_habit() {
    for (name, store, _guard) in backends() {
        let service = service(store.clone());
        let habit = service.create_habit("Drink Water", Category::Health).expect(name);
        service.toggle_today(&habit.id).expect(name);
        let cleared = service.toggle_today(&habit.id).expect(name);
        assert!(cleared.completed_dates.is_empty(), "{name}");
        assert_eq!(cleared.streak, 0, "{name}");
        assert_eq!(store.get(&habit.id).expect(name), Some(cleared), "{name}");
    }
}

#[test]
fn delete_twice_is_not_an_error() {
    for (name, store, _guard) in backends() {
        let service = service(store.clone());
        let keep = service.create_habit("Read", Category::Productivity).expect(name);
        let gone = service.create_habit("No Sugar", Category::Health).expect(name);

        assert_eq!(store.delete(&gone.id).expect(name), DeleteOutcome::Deleted, "{name}");
        assert_eq!(store.delete(&gone.id).expect(name), DeleteOutcome::NotFound, "{name}");

        let remaining: Vec<HabitId> = store
            .get_all()
            .expect(name)
            .into_iter()
            .map(|habit| habit.id)
            .collect();
        assert_eq!(remaining, vec![keep.id], "{name}");
    }
}

#[test]
fn streak_goes_stale_until_next_read() {
    for (name, store, _guard) in backends() {
        let habit = service(store.clone())
            .create_habit("Walk", Category::Health)
            .expect(name);
        for raw in ["2025-11-25", "2025-11-26", TODAY] {
            service(store.clone())
                .toggle_completion(&habit.id, day(raw))
                .expect(name);
        }

        let later = HabitService::builder(store.clone())
            .with_clock(DayClock::pinned_to_day(day("2025-11-29")))
            .build();
        let habits = later.habits().expect(name);
        assert_eq!(habits[0].streak, 0, "{name}");
        assert_eq!(habits[0].completed_dates.len(), 3, "{name}");
    }
}

/// Record service that can be switched off to simulate an outage.
#[derive(Default)]
struct FlakyRecordService {
    inner: InMemoryRecordService,
    down: AtomicBool,
}

impl FlakyRecordService {
    fn check(&self) -> Result<(), StoreUnavailable> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreUnavailable::Transport("connection refused".into()));
        }
        Ok(())
    }
}

impl RecordService for FlakyRecordService {
    fn list(&self) -> Result<Vec<HabitRecord>, StoreUnavailable> {
        self.check()?;
        self.inner.list()
    }

    fn create(&self, record: &NewHabitRecord) -> Result<HabitRecord, StoreUnavailable> {
        self.check()?;
        self.inner.create(record)
    }

    fn update(&self, update: &HabitUpdate) -> Result<Option<HabitRecord>, StoreUnavailable> {
        self.check()?;
        self.inner.update(update)
    }

    fn delete(&self, id: &HabitId) -> Result<bool, StoreUnavailable> {
        self.check()?;
        self.inner.delete(id)
    }
}

#[test]
fn outage_is_reported_and_snapshot_falls_back_to_cache() {
    let remote = Arc::new(FlakyRecordService::default());
    let service = service(Arc::new(DurableStore::new(remote.clone())));
    assert_eq!(service.mode(), StoreMode::Personal);

    remote.down.store(true, Ordering::SeqCst);
    assert!(
        matches!(service.snapshot(), Err(HabitError::Unavailable(_))),
        "nothing cached yet"
    );

    remote.down.store(false, Ordering::SeqCst);
    let habit = service.create_habit("Stretch", Category::Health).expect("create");
    let live = service.snapshot().expect("live snapshot");
    assert_eq!(live.freshness, Freshness::Live);

    remote.down.store(true, Ordering::SeqCst);
    assert!(matches!(
        service.habits(),
        Err(HabitError::Unavailable(StoreUnavailable::Transport(_)))
    ));
    assert!(matches!(
        service.toggle_today(&habit.id),
        Err(HabitError::Unavailable(_))
    ));
    let cached = service.snapshot().expect("cached snapshot");
    assert!(cached.is_stale());
    assert_eq!(cached.habits.len(), 1);
    match cached.freshness {
        Freshness::Cached { reason } => assert!(reason.contains("connection refused")),
        Freshness::Live => panic!("expected cached snapshot"),
    }

    remote.down.store(false, Ordering::SeqCst);
    let after = service.habits().expect("recovered");
    assert!(after[0].completed_dates.is_empty(), "failed write left state unchanged");
}
