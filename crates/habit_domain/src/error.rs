use thiserror::Error;

use crate::date::DayId;
use crate::habit::HabitId;
use crate::store::StoreMode;

/// Input rejected before any store call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("habit title must not be empty")]
    EmptyTitle,
    #[error("unknown habit category `{0}`")]
    UnknownCategory(String),
    #[error("malformed day identifier `{0}`, expected YYYY-MM-DD")]
    MalformedDay(String),
    #[error("cannot record a completion for {day}, today is {today}")]
    FutureDay { day: DayId, today: DayId },
}

/// The backing store failed to answer. Never coerced into "no data".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreUnavailable {
    #[error("{mode} storage failed: {reason}")]
    Storage { mode: StoreMode, reason: String },
    #[error("{mode} storage payload of {size} bytes exceeds the {limit} byte capacity")]
    CapacityExceeded {
        mode: StoreMode,
        size: usize,
        limit: usize,
    },
    #[error("{mode} storage holds an unreadable payload: {reason}")]
    Codec { mode: StoreMode, reason: String },
    #[error("record service unreachable: {0}")]
    Transport(String),
    #[error("record service answered HTTP {status}: {message}")]
    Remote { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HabitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Unavailable(#[from] StoreUnavailable),
    #[error("habit `{0}` not found")]
    NotFound(HabitId),
}

pub type HabitResult<T> = Result<T, HabitError>;
pub type StoreResult<T> = Result<T, StoreUnavailable>;
