use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date::{days_between, DayId};
use crate::error::ValidationError;

/// Opaque habit identifier. Empty means "not yet assigned by a store".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn unassigned() -> Self {
        Self::default()
    }

    pub fn generate() -> Self {
        Self(format!("habit-{}", uuid::Uuid::now_v7()))
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HabitId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Health,
    Productivity,
    Mindfulness,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Health, Self::Productivity, Self::Mindfulness];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::Productivity => "Productivity",
            Self::Mindfulness => "Mindfulness",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::UnknownCategory(input.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub completed_dates: BTreeSet<DayId>,
    /// Cached result of [`compute_streak`]; refreshed on every mutation and read.
    #[serde(default)]
    pub streak: u32,
}

impl Habit {
    /// A fresh habit with no completions. The title is validated and trimmed.
    pub fn new(title: &str, category: Category) -> Result<Self, ValidationError> {
        Ok(Self {
            id: HabitId::unassigned(),
            title: validate_title(title)?,
            category,
            completed_dates: BTreeSet::new(),
            streak: 0,
        })
    }

    pub fn is_completed_on(&self, day: DayId) -> bool {
        self.completed_dates.contains(&day)
    }

    /// Flip membership of `day` and refresh the cached streak. Returns whether
    /// the day is now completed.
    pub fn toggle(&mut self, day: DayId, today: DayId) -> bool {
        let completed = if self.completed_dates.remove(&day) {
            false
        } else {
            self.completed_dates.insert(day);
            true
        };
        self.refresh_streak(today);
        completed
    }

    pub fn refresh_streak(&mut self, today: DayId) {
        self.streak = compute_streak(&self.completed_dates, today);
    }

    pub fn with_streak_for(mut self, today: DayId) -> Self {
        self.refresh_streak(today);
        self
    }
}

pub(crate) fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

/// Current consecutive-day streak ending today or yesterday.
///
/// Days after `today` are ignored. A most recent completion older than
/// yesterday means the streak is broken.
pub fn compute_streak(completed_dates: &BTreeSet<DayId>, today: DayId) -> u32 {
    let mut past = completed_dates.range(..=today).rev();
    let Some(&most_recent) = past.next() else {
        return 0;
    };
    if days_between(most_recent, today) > 1 {
        return 0;
    }

    let mut streak = 1;
    let mut expected = most_recent.minus_days(1);
    for &day in past {
        if day != expected {
            break;
        }
        streak += 1;
        expected = expected.minus_days(1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(raw: &str) -> DayId {
        raw.parse().unwrap()
    }

    fn dates(raw: &[&str]) -> BTreeSet<DayId> {
        raw.iter().map(|d| day(d)).collect()
    }

    #[test]
    fn empty_set_has_no_streak() {
        assert_eq!(compute_streak(&BTreeSet::new(), day("2025-11-27")), 0);
    }

    #[test]
    fn counts_consecutive_days_ending_today() {
        let set = dates(&["2025-11-25", "2025-11-26", "2025-11-27"]);
        assert_eq!(compute_streak(&set, day("2025-11-27")), 3);
    }

    #[test]
    fn yesterday_keeps_the_streak_alive() {
        let set = dates(&["2025-11-25", "2025-11-26", "2025-11-27"]);
        assert_eq!(compute_streak(&set, day("2025-11-28")), 3);
        assert_eq!(compute_streak(&dates(&["2025-11-26"]), day("2025-11-27")), 1);
    }

    #[test]
    fn two_days_without_completion_breaks_the_streak() {
        let set = dates(&["2025-11-25", "2025-11-26", "2025-11-27"]);
        assert_eq!(compute_streak(&set, day("2025-11-29")), 0);
    }

    #[test]
    fn stops_at_the_first_gap() {
        let set = dates(&["2025-11-20", "2025-11-21", "2025-11-24", "2025-11-26", "2025-11-27"]);
        assert_eq!(compute_streak(&set, day("2025-11-27")), 2);
    }

    #[test]
    fn future_days_are_ignored() {
        let set = dates(&["2025-11-26", "2025-11-27", "2025-12-25"]);
        assert_eq!(compute_streak(&set, day("2025-11-27")), 2);
        assert_eq!(compute_streak(&dates(&["2026-01-01"]), day("2025-11-27")), 0);
    }

    #[test]
    fn construction_order_and_duplicates_do_not_matter() {
        let forward: BTreeSet<DayId> = ["2025-11-25", "2025-11-26", "2025-11-27"]
            .iter()
            .map(|d| day(d))
            .collect();
        let shuffled: BTreeSet<DayId> = ["2025-11-27", "2025-11-25", "2025-11-27", "2025-11-26", "2025-11-25"]
            .iter()
            .map(|d| day(d))
            .collect();
        assert_eq!(
            compute_streak(&forward, day("2025-11-27")),
            compute_streak(&shuffled, day("2025-11-27"))
        );
    }

    #[test]
    fn toggling_today_off_clears_the_streak() {
        let today = day("2025-11-27");
        let mut habit = Habit::new("Meditate", Category::Mindfulness).unwrap();
        assert!(habit.toggle(today, today));
        assert_eq!(habit.streak, 1);
        assert!(!habit.toggle(today, today));
        assert!(habit.completed_dates.is_empty());
        assert_eq!(habit.streak, 0);
    }

    #[test]
    fn new_habit_trims_and_validates_title() {
        let habit = Habit::new("  Read 20 Pages ", Category::Productivity).unwrap();
        assert_eq!(habit.title, "Read 20 Pages");
        assert!(habit.id.is_unassigned());
        assert_eq!(habit.streak, 0);
        assert_eq!(
            Habit::new(" \t ", Category::Health),
            Err(ValidationError::EmptyTitle)
        );
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("health".parse::<Category>().unwrap(), Category::Health);
        assert_eq!(" MINDFULNESS ".parse::<Category>().unwrap(), Category::Mindfulness);
        assert_eq!(
            "Fitness".parse::<Category>(),
            Err(ValidationError::UnknownCategory("Fitness".into()))
        );
    }

    #[test]
    fn serialized_habit_collapses_duplicate_days() {
        let raw = r#"{
            "id": "habit-1",
            "title": "Drink Water",
            "category": "Health",
            "completed_dates": ["2025-11-26", "2025-11-27", "2025-11-26"],
            "streak": 9
        }"#;
        let habit: Habit = serde_json::from_str(raw).unwrap();
        assert_eq!(habit.completed_dates.len(), 2);
        let habit = habit.with_streak_for(day("2025-11-27"));
        assert_eq!(habit.streak, 2);
    }
}
