use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    date::{DayClock, DayId},
    error::{HabitError, HabitResult, ValidationError},
    habit::{self, Category, Habit, HabitId},
    stats::{self, DashboardStats, WindowAggregator, DEFAULT_PERFECT_DAY_WINDOW},
    store::{DeleteOutcome, StoreHandle, StoreMode},
};

/// Where the habits in a [`HabitSnapshot`] came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Freshness {
    Live,
    /// The store could not be reached; these are the last habits it returned.
    Cached { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitSnapshot {
    pub habits: Vec<Habit>,
    pub freshness: Freshness,
}

impl HabitSnapshot {
    pub fn is_stale(&self) -> bool {
        matches!(self.freshness, Freshness::Cached { .. })
    }
}

pub struct HabitService {
    store: StoreHandle,
    clock: DayClock,
    perfect_day_window: u32,
    last_known: RwLock<Option<Vec<Habit>>>,
}

pub struct HabitServiceBuilder {
    store: StoreHandle,
    clock: DayClock,
    perfect_day_window: u32,
}

impl HabitServiceBuilder {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            clock: DayClock::system(),
            perfect_day_window: DEFAULT_PERFECT_DAY_WINDOW,
        }
    }

    pub fn with_clock(mut self, clock: DayClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_perfect_day_window(mut self, days: u32) -> Self {
        self.perfect_day_window = days;
        self
    }

    pub fn build(self) -> HabitService {
        HabitService {
            store: self.store,
            clock: self.clock,
            perfect_day_window: self.perfect_day_window,
            last_known: RwLock::new(None),
        }
    }
}

impl HabitService {
    pub fn builder(store: StoreHandle) -> HabitServiceBuilder {
        HabitServiceBuilder::new(store)
    }

    pub fn mode(&self) -> StoreMode {
        self.store.mode()
    }

    pub fn today(&self) -> DayId {
        self.clock.today()
    }

    pub fn perfect_day_window(&self) -> u32 {
        self.perfect_day_window
    }

    /// Every habit with its streak recomputed for today.
    pub fn habits(&self) -> HabitResult<Vec<Habit>> {
        let today = self.today();
        let habits: Vec<Habit> = self
            .store
            .get_all()?
            .into_iter()
            .map(|habit| habit.with_streak_for(today))
            .collect();
        *self.last_known.write() = Some(habits.clone());
        Ok(habits)
    }

    pub fn habits_in(&self, category: Option<Category>) -> HabitResult<Vec<Habit>> {
        Ok(stats::filter_by_category(&self.habits()?, category))
    }

    pub fn habit(&self, id: &HabitId) -> HabitResult<Habit> {
        self.load(id)
    }

    /// Live habits when the store answers, otherwise the last list it returned
    /// flagged as cached. Fails only when nothing was ever loaded.
    pub fn snapshot(&self) -> HabitResult<HabitSnapshot> {
        match self.habits() {
            Ok(habits) => Ok(HabitSnapshot {
                habits,
                freshness: Freshness::Live,
            }),
            Err(HabitError::Unavailable(err)) => {
                let cached = self.last_known.read().clone();
                match cached {
                    Some(habits) => {
                        warn!(%err, cached = habits.len(), "store unavailable, serving cached habits");
                        let today = self.today();
                        Ok(HabitSnapshot {
                            habits: habits
                                .into_iter()
                                .map(|habit| habit.with_streak_for(today))
                                .collect(),
                            freshness: Freshness::Cached {
                                reason: err.to_string(),
                            },
                        })
                    }
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self))]
    pub fn create_habit(&self, title: &str, category: Category) -> HabitResult<Habit> {
        let habit = Habit::new(title, category)?;
        let saved = self.store.upsert(habit)?;
        info!(id = %saved.id, "habit created");
        self.remember(&saved);
        Ok(saved)
    }

    /// Rename or recategorise a habit; its completion history is kept.
    #[instrument(skip(self))]
    pub fn edit_habit(&self, id: &HabitId, title: &str, category: Category) -> HabitResult<Habit> {
        let title = habit::validate_title(title)?;
        let mut current = self.load(id)?;
        current.title = title;
        current.category = category;
        current.refresh_streak(self.today());
        let saved = self.store.upsert(current)?;
        info!(id = %saved.id, "habit edited");
        self.remember(&saved);
        Ok(saved)
    }

    /// Flip `day` for one habit, always starting from the state the store
    /// holds right now.
    #[instrument(skip(self))]
    pub fn toggle_completion(&self, id: &HabitId, day: DayId) -> HabitResult<Habit> {
        let today = self.today();
        if day > today {
            return Err(ValidationError::FutureDay { day, today }.into());
        }
        let mut current = self.load(id)?;
        let completed = current.toggle(day, today);
        let saved = self.store.upsert(current)?;
        info!(id = %saved.id, %day, completed, streak = saved.streak, "completion toggled");
        self.remember(&saved);
        Ok(saved)
    }

    pub fn toggle_today(&self, id: &HabitId) -> HabitResult<Habit> {
        self.toggle_completion(id, self.today())
    }

    /// Confirmation is the caller's job; this deletes immediately.
    #[instrument(skip(self))]
    pub fn delete_habit(&self, id: &HabitId) -> HabitResult<DeleteOutcome> {
        let outcome = self.store.delete(id)?;
        info!(?outcome, "habit delete requested");
        if let Some(cached) = self.last_known.write().as_mut() {
            cached.retain(|habit| &habit.id != id);
        }
        Ok(outcome)
    }

    pub fn dashboard(&self) -> HabitResult<DashboardStats> {
        let habits = self.habits()?;
        Ok(WindowAggregator::new(&habits, self.today()).dashboard(self.perfect_day_window))
    }

    fn load(&self, id: &HabitId) -> HabitResult<Habit> {
        self.store
            .get(id)?
            .ok_or_else(|| HabitError::NotFound(id.clone()))
    }

    fn remember(&self, saved: &Habit) {
        if let Some(cached) = self.last_known.write().as_mut() {
            match cached.iter_mut().find(|habit| habit.id == saved.id) {
                Some(existing) => *existing = saved.clone(),
                None => cached.push(saved.clone()),
            }
        }
    }
}
