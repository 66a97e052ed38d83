use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::date::DayId;
use crate::habit::{compute_streak, Category, Habit};

/// Perfect days are counted over this many trailing days unless configured otherwise.
pub const DEFAULT_PERFECT_DAY_WINDOW: u32 = 30;
pub const WEEK_STRIP_DAYS: u32 = 7;
/// Four full weeks, so the calendar renders as a 4x7 grid.
pub const CALENDAR_DAYS: u32 = 28;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Share of habits completed, `0.0` for an empty collection.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub today: DayId,
    pub progress: Progress,
    pub percentage: f64,
    pub longest_active_streak: u32,
    pub perfect_days: u32,
    pub perfect_day_window: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarCell {
    pub day: DayId,
    pub weekday: Weekday,
    pub completed: bool,
    pub is_today: bool,
}

/// Read-side statistics over a habit collection as of `today`.
///
/// Nothing is cached: every call walks the collection again, and streaks are
/// recomputed from completion dates rather than trusted from the stored field.
#[derive(Debug, Clone, Copy)]
pub struct WindowAggregator<'a> {
    habits: &'a [Habit],
    today: DayId,
}

impl<'a> WindowAggregator<'a> {
    pub fn new(habits: &'a [Habit], today: DayId) -> Self {
        Self { habits, today }
    }

    pub fn todays_progress(&self) -> Progress {
        let completed = self
            .habits
            .iter()
            .filter(|habit| habit.is_completed_on(self.today))
            .count();
        Progress {
            completed,
            total: self.habits.len(),
        }
    }

    pub fn longest_active_streak(&self) -> u32 {
        self.habits
            .iter()
            .map(|habit| compute_streak(&habit.completed_dates, self.today))
            .max()
            .unwrap_or(0)
    }

    /// Days among the last `window_days` (today included) on which every habit
    /// was completed. An empty collection has no perfect days.
    pub fn perfect_day_count(&self, window_days: u32) -> u32 {
        if self.habits.is_empty() {
            return 0;
        }
        let perfect = self
            .today
            .trailing_window(window_days)
            .filter(|day| self.habits.iter().all(|habit| habit.is_completed_on(*day)))
            .count();
        perfect as u32
    }

    pub fn dashboard(&self, window_days: u32) -> DashboardStats {
        let progress = self.todays_progress();
        DashboardStats {
            today: self.today,
            progress,
            percentage: progress.percentage(),
            longest_active_streak: self.longest_active_streak(),
            perfect_days: self.perfect_day_count(window_days),
            perfect_day_window: window_days,
        }
    }
}

/// Completion state of one habit over the last `days` days, oldest first.
pub fn completion_calendar(habit: &Habit, today: DayId, days: u32) -> Vec<CalendarCell> {
    today
        .trailing_window(days)
        .map(|day| CalendarCell {
            day,
            weekday: day.weekday(),
            completed: habit.is_completed_on(day),
            is_today: day == today,
        })
        .collect()
}

pub fn week_strip(habit: &Habit, today: DayId) -> Vec<CalendarCell> {
    completion_calendar(habit, today, WEEK_STRIP_DAYS)
}

pub fn filter_by_category(habits: &[Habit], category: Option<Category>) -> Vec<Habit> {
    match category {
        None => habits.to_vec(),
        Some(wanted) => habits
            .iter()
            .filter(|habit| habit.category == wanted)
            .cloned()
            .collect(),
    }
}
