pub mod date;
pub mod demo;
pub mod error;
pub mod habit;
pub mod service;
pub mod stats;
pub mod store;

pub use crate::date::{days_between, DayClock, DayId, ZonePolicy};
pub use crate::error::{HabitError, HabitResult, StoreUnavailable, ValidationError};
pub use crate::habit::{compute_streak, Category, Habit, HabitId};
pub use crate::service::{Freshness, HabitService, HabitServiceBuilder, HabitSnapshot};
pub use crate::stats::{DashboardStats, Progress, WindowAggregator};
pub use crate::store::{DeleteOutcome, HabitStore, StoreHandle, StoreMode};
