use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;

use habit_domain::stats::{CalendarCell, CALENDAR_DAYS};
use habit_domain::{Category, DashboardStats, DayId, Habit};

#[derive(Debug, Parser)]
#[command(name = "habits", version, about = "Track daily habits and streaks")]
pub struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List habits with today's state and current streak
    List {
        #[arg(long)]
        category: Option<Category>,
    },
    /// Create a habit
    Add {
        title: String,
        #[arg(long, default_value = "Health")]
        category: Category,
    },
    /// Rename or recategorise a habit
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<Category>,
    },
    /// Flip completion for a day (today when omitted)
    Toggle {
        id: String,
        #[arg(long)]
        day: Option<DayId>,
    },
    /// Remove a habit
    Delete { id: String },
    /// Dashboard figures for today
    Stats,
    /// Last seven days for one habit
    Week { id: String },
    /// Completion calendar for one habit
    Calendar {
        id: String,
        #[arg(long, default_value_t = CALENDAR_DAYS)]
        days: u32,
    },
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_habits(habits: &[Habit], today: DayId) {
    if habits.is_empty() {
        println!("No habits yet.");
        return;
    }
    for habit in habits {
        let mark = if habit.is_completed_on(today) { "x" } else { " " };
        println!(
            "[{mark}] {:<24} {:<13} streak {:>3}  {}",
            habit.title, habit.category, habit.streak, habit.id
        );
    }
}

pub fn print_dashboard(stats: &DashboardStats) {
    println!("Habit Dashboard ({})", stats.today);
    println!("─────────────────────────");
    println!(
        "Today:          {}/{} ({:.0}%)",
        stats.progress.completed, stats.progress.total, stats.percentage
    );
    println!("Longest streak: {} days", stats.longest_active_streak);
    println!(
        "Perfect days:   {} in the last {} days",
        stats.perfect_days, stats.perfect_day_window
    );
}

pub fn print_cells(cells: &[CalendarCell]) {
    for cell in cells {
        let mark = if cell.completed { "■" } else { "·" };
        let today = if cell.is_today { "  <- today" } else { "" };
        println!("{} {} {mark}{today}", cell.weekday, cell.day);
    }
}
