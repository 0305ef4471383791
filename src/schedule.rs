use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MINUTES_PER_DAY: i64 = 1440;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// One weekly occupied interval of a course, minutes from midnight,
/// half-open: `[start_minute, end_minute)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSlot {
    pub day: DayOfWeek,
    pub start_minute: i64,
    pub end_minute: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("class slot must satisfy 0 <= start < end <= 1440, got {start}..{end}")]
    InvalidRange { start: i64, end: i64 },
}

impl ClassSlot {
    pub fn new(day: DayOfWeek, start_minute: i64, end_minute: i64) -> Result<Self, SlotError> {
        if start_minute < 0 || start_minute >= end_minute || end_minute > MINUTES_PER_DAY {
            return Err(SlotError::InvalidRange {
                start: start_minute,
                end: end_minute,
            });
        }
        Ok(Self {
            day,
            start_minute,
            end_minute,
        })
    }

    /// Half-open interval intersection on the same weekday. Slots that only
    /// touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &ClassSlot) -> bool {
        self.day == other.day
            && self.start_minute < other.end_minute
            && other.start_minute < self.end_minute
    }
}

/// True if any slot in `a` intersects any slot in `b`.
pub fn overlaps(a: &[ClassSlot], b: &[ClassSlot]) -> bool {
    a.iter().any(|sa| b.iter().any(|sb| sa.overlaps(sb)))
}

/// True if `candidate` collides with any of the already-enrolled slot sets.
pub fn overlaps_any<'a, I>(candidate: &[ClassSlot], existing: I) -> bool
where
    I: IntoIterator<Item = &'a [ClassSlot]>,
{
    existing.into_iter().any(|slots| overlaps(candidate, slots))
}
