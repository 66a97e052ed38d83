use crate::date::DayId;
use crate::habit::{Category, Habit, HabitId};

/// Sample habits shown to a fresh demo session, dated relative to `today`.
pub fn sample_habits(today: DayId) -> Vec<Habit> {
    vec![
        sample("Morning Meditation", Category::Mindfulness, today, 0..12),
        sample("Drink Water", Category::Health, today, 1..3),
        sample("Read 20 Pages", Category::Productivity, today, 0..25),
        sample("No Sugar", Category::Health, today, 3..4),
    ]
}

fn sample(title: &str, category: Category, today: DayId, days_ago: std::ops::Range<u32>) -> Habit {
    Habit {
        id: HabitId::unassigned(),
        title: title.to_string(),
        category,
        completed_dates: days_ago.map(|offset| today.minus_days(offset)).collect(),
        streak: 0,
    }
    .with_streak_for(today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ephemeral::DEFAULT_CAPACITY_BYTES;
    use crate::store::{EphemeralStore, HabitStore};

    #[test]
    fn samples_cover_active_grace_and_broken_streaks() {
        let today = DayId::from_ymd(2025, 11, 27).unwrap();
        let streaks: Vec<u32> = sample_habits(today).iter().map(|h| h.streak).collect();
        assert_eq!(streaks, vec![12, 2, 25, 0]);
    }

    #[test]
    fn samples_fit_in_a_demo_session() {
        let today = DayId::from_ymd(2025, 11, 27).unwrap();
        let store = EphemeralStore::in_memory().with_capacity(DEFAULT_CAPACITY_BYTES);
        assert!(store.seed_if_absent(sample_habits(today)).unwrap());
        assert_eq!(store.get_all().unwrap().len(), 4);
    }
}
