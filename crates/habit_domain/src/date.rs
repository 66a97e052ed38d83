//! Calendar-day identity and arithmetic.
//!
//! Every "what day is it" question in the crate goes through a [`DayClock`], so
//! the zone policy is chosen once and applied everywhere.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// A calendar day with no time-of-day component, rendered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayId(NaiveDate);

impl DayId {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        input.parse()
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn minus_days(self, n: u32) -> Self {
        Self(
            self.0
                .checked_sub_days(Days::new(u64::from(n)))
                .unwrap_or(NaiveDate::MIN),
        )
    }

    pub fn plus_days(self, n: u32) -> Self {
        Self(
            self.0
                .checked_add_days(Days::new(u64::from(n)))
                .unwrap_or(NaiveDate::MAX),
        )
    }

    pub fn weekday(self) -> Weekday {
        self.0.weekday()
    }

    /// The `window` days ending at (and including) `self`, oldest first.
    pub fn trailing_window(self, window: u32) -> impl Iterator<Item = DayId> {
        (0..window).rev().map(move |offset| self.minus_days(offset))
    }
}

/// Signed difference `b - a` in whole days.
pub fn days_between(a: DayId, b: DayId) -> i64 {
    b.0.signed_duration_since(a.0).num_days()
}

impl fmt::Display for DayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

impl FromStr for DayId {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        // chrono accepts single-digit months and days; the wire format does not.
        let shape_ok = trimmed.len() == 10
            && trimmed.bytes().enumerate().all(|(idx, byte)| match idx {
                4 | 7 => byte == b'-',
                _ => byte.is_ascii_digit(),
            });
        if !shape_ok {
            return Err(ValidationError::MalformedDay(input.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, DAY_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::MalformedDay(input.to_string()))
    }
}

impl TryFrom<String> for DayId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DayId> for String {
    fn from(value: DayId) -> Self {
        value.to_string()
    }
}

/// Which zone decides where one calendar day ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZonePolicy {
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl FromStr for ZonePolicy {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
            return Ok(Self::Utc);
        }
        trimmed
            .parse::<FixedOffset>()
            .map(Self::Fixed)
            .map_err(|_| format!("unrecognised zone policy `{trimmed}`"))
    }
}

impl fmt::Display for ZonePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Utc => f.write_str("utc"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Source of "now" and "today" under a single zone policy.
///
/// A pinned clock always reports the same instant, which keeps streak and
/// expiry behaviour reproducible in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayClock {
    policy: ZonePolicy,
    pinned: Option<DateTime<Utc>>,
}

impl DayClock {
    pub fn new(policy: ZonePolicy) -> Self {
        Self {
            policy,
            pinned: None,
        }
    }

    pub fn system() -> Self {
        Self::new(ZonePolicy::Local)
    }

    pub fn pinned(policy: ZonePolicy, instant: DateTime<Utc>) -> Self {
        Self {
            policy,
            pinned: Some(instant),
        }
    }

    /// UTC clock frozen at noon of `day`.
    pub fn pinned_to_day(day: DayId) -> Self {
        let noon = day.date().and_time(NaiveTime::MIN) + chrono::Duration::hours(12);
        Self::pinned(ZonePolicy::Utc, Utc.from_utc_datetime(&noon))
    }

    pub fn policy(&self) -> ZonePolicy {
        self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.pinned.unwrap_or_else(Utc::now)
    }

    pub fn today(&self) -> DayId {
        self.day_id(&self.now())
    }

    /// Normalize any timestamp to its calendar day under this clock's policy.
    pub fn day_id<Tz: TimeZone>(&self, timestamp: &DateTime<Tz>) -> DayId {
        let date = match self.policy {
            ZonePolicy::Local => timestamp.with_timezone(&Local).date_naive(),
            ZonePolicy::Utc => timestamp.with_timezone(&Utc).date_naive(),
            ZonePolicy::Fixed(offset) => timestamp.with_timezone(&offset).date_naive(),
        };
        DayId(date)
    }
}

impl Default for DayClock {
    fn default() -> Self {
        Self::system()
    }
}
