use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use habit_domain::demo::sample_habits;
use habit_domain::stats::{completion_calendar, filter_by_category, week_strip};
use habit_domain::store::ephemeral::DEFAULT_CAPACITY_BYTES;
use habit_domain::store::{DurableStore, EphemeralStore, FileKeyValue};
use habit_domain::{
    DayClock, DeleteOutcome, Freshness, HabitId, HabitService, StoreHandle, StoreMode, ZonePolicy,
};
use habit_remote::{HttpRecordService, DEFAULT_TIMEOUT};

use crate::cli::{self, Command};

/// Process-wide settings, resolved once from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub(crate) mode: StoreMode,
    pub(crate) record_service_url: Option<String>,
    pub(crate) zone: ZonePolicy,
    pub(crate) demo_dir: PathBuf,
    pub(crate) demo_capacity_bytes: usize,
    pub(crate) seed_demo: bool,
    pub(crate) perfect_day_window: u32,
    pub(crate) http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        config.mode = StoreMode::from_flag(lookup("HABIT_DEMO_MODE").as_deref());
        if let Some(url) = lookup("HABIT_RECORD_SERVICE_URL") {
            let url = url.trim();
            if !url.is_empty() {
                config.record_service_url = Some(url.to_string());
            }
        }
        if let Some(zone) = lookup("HABIT_TIMEZONE") {
            config.zone = zone
                .parse()
                .map_err(|err: String| anyhow!(err))
                .context("HABIT_TIMEZONE")?;
        }
        if let Some(dir) = lookup("HABIT_DEMO_DIR") {
            config.demo_dir = PathBuf::from(dir);
        }
        if let Some(capacity) = lookup("HABIT_DEMO_CAPACITY_BYTES") {
            match capacity.trim().parse::<usize>() {
                Ok(value) if value > 0 => config.demo_capacity_bytes = value,
                _ => warn!(%capacity, "ignoring invalid HABIT_DEMO_CAPACITY_BYTES"),
            }
        }
        if let Some(seed) = lookup("HABIT_DEMO_SEED") {
            config.seed_demo = !matches!(seed.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no");
        }
        if let Some(window) = lookup("HABIT_PERFECT_DAY_WINDOW") {
            match window.trim().parse::<u32>() {
                Ok(value) if value > 0 => config.perfect_day_window = value,
                _ => warn!(%window, "ignoring invalid HABIT_PERFECT_DAY_WINDOW"),
            }
        }
        if let Some(timeout) = lookup("HABIT_HTTP_TIMEOUT_SECS") {
            match timeout.trim().parse::<u64>() {
                Ok(value) if value > 0 => config.http_timeout = Duration::from_secs(value),
                _ => warn!(%timeout, "ignoring invalid HABIT_HTTP_TIMEOUT_SECS"),
            }
        }
        Ok(config)
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub fn clock(&self) -> DayClock {
        DayClock::new(self.zone)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: StoreMode::Personal,
            record_service_url: None,
            zone: ZonePolicy::Local,
            demo_dir: std::env::temp_dir().join("habit-demo"),
            demo_capacity_bytes: DEFAULT_CAPACITY_BYTES,
            seed_demo: true,
            perfect_day_window: habit_domain::stats::DEFAULT_PERFECT_DAY_WINDOW,
            http_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Build the one store handle this process will use.
pub fn open_store(config: &AppConfig, clock: DayClock) -> Result<StoreHandle> {
    match config.mode {
        StoreMode::Demo => {
            info!(dir = %config.demo_dir.display(), "opening demo session store");
            let store = EphemeralStore::new(FileKeyValue::new(&config.demo_dir))
                .with_capacity(config.demo_capacity_bytes)
                .with_clock(clock);
            if config.seed_demo && store.seed_if_absent(sample_habits(clock.today()))? {
                info!("seeded demo session with sample habits");
            }
            Ok(Arc::new(store))
        }
        StoreMode::Personal => {
            let url = config
                .record_service_url
                .as_deref()
                .context("HABIT_RECORD_SERVICE_URL must be set unless HABIT_DEMO_MODE=true")?;
            info!(%url, "using record service");
            let remote = HttpRecordService::new(url, config.http_timeout)?;
            Ok(Arc::new(DurableStore::new(remote)))
        }
    }
}

pub fn build_service(config: &AppConfig) -> Result<HabitService> {
    let clock = config.clock();
    let store = open_store(config, clock).context("failed to open habit store")?;
    Ok(HabitService::builder(store)
        .with_clock(clock)
        .with_perfect_day_window(config.perfect_day_window)
        .build())
}

pub fn run(command: Command, json: bool, config: AppConfig) -> Result<()> {
    let service = build_service(&config)?;
    execute(&service, command, json)
}

pub fn execute(service: &HabitService, command: Command, json: bool) -> Result<()> {
    let today = service.today();
    match command {
        Command::List { category } => {
            let snapshot = service.snapshot()?;
            if let Freshness::Cached { reason } = &snapshot.freshness {
                eprintln!("warning: store unavailable ({reason}); showing last known habits");
            }
            let habits = filter_by_category(&snapshot.habits, category);
            if json {
                cli::print_json(&habits)?;
            } else {
                cli::print_habits(&habits, today);
            }
        }
        Command::Add { title, category } => {
            let habit = service.create_habit(&title, category)?;
            if json {
                cli::print_json(&habit)?;
            } else {
                println!("Created {} ({})", habit.title, habit.id);
            }
        }
        Command::Edit { id, title, category } => {
            let id = HabitId::new(id);
            let current = service.habit(&id)?;
            let habit = service.edit_habit(
                &id,
                title.as_deref().unwrap_or(&current.title),
                category.unwrap_or(current.category),
            )?;
            if json {
                cli::print_json(&habit)?;
            } else {
                println!("Updated {} [{}]", habit.title, habit.category);
            }
        }
        Command::Toggle { id, day } => {
            let day = day.unwrap_or(today);
            let habit = service.toggle_completion(&HabitId::new(id), day)?;
            if json {
                cli::print_json(&habit)?;
            } else {
                let state = if habit.is_completed_on(day) { "done" } else { "not done" };
                println!("{} marked {state} for {day}; streak {}", habit.title, habit.streak);
            }
        }
        Command::Delete { id } => {
            let outcome = service.delete_habit(&HabitId::new(id.clone()))?;
            if json {
                cli::print_json(&outcome)?;
            } else {
                match outcome {
                    DeleteOutcome::Deleted => println!("Deleted {id}"),
                    DeleteOutcome::NotFound => println!("{id} was already gone"),
                }
            }
        }
        Command::Stats => {
            let stats = service.dashboard()?;
            if json {
                cli::print_json(&stats)?;
            } else {
                cli::print_dashboard(&stats);
            }
        }
        Command::Week { id } => {
            let habit = service.habit(&HabitId::new(id))?;
            let cells = week_strip(&habit, today);
            if json {
                cli::print_json(&cells)?;
            } else {
                println!("{}", habit.title);
                cli::print_cells(&cells);
            }
        }
        Command::Calendar { id, days } => {
            let habit = service.habit(&HabitId::new(id))?;
            let cells = completion_calendar(&habit, today, days);
            if json {
                cli::print_json(&cells)?;
            } else {
                println!("{} (last {days} days)", habit.title);
                cli::print_cells(&cells);
            }
        }
    }
    Ok(())
}
