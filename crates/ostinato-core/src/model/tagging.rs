use chrono::{DateTime, Datelike};
use serde::{Deserialize, Serialize};

/// Calendar date derived from a tagging timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDate {
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

/// The result of decoding a millisecond-epoch tagging timestamp.
///
/// The source data carries zero, negative, and out-of-range values; a
/// row with an undecodable timestamp is kept, it just has no calendar
/// date. Making the two cases an explicit enum keeps the salvage path
/// visible instead of hiding it behind error suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampOutcome {
    /// The timestamp decoded to a calendar date.
    Dated(TagDate),
    /// The raw value is kept but no date could be derived.
    RawOnly,
}

impl TimestampOutcome {
    /// Decode a millisecond-epoch timestamp.
    ///
    /// Zero and negative values are treated as unusable, matching the
    /// source convention of writing `0` when the capture date is
    /// unknown.
    #[must_use]
    pub fn decode(timestamp_ms: i64) -> Self {
        if timestamp_ms <= 0 {
            return Self::RawOnly;
        }
        match DateTime::from_timestamp_millis(timestamp_ms) {
            Some(dt) => Self::Dated(TagDate {
                day: dt.day(),
                month: dt.month(),
                year: dt.year(),
            }),
            None => Self::RawOnly,
        }
    }

    #[must_use]
    pub const fn date(self) -> Option<TagDate> {
        match self {
            Self::Dated(date) => Some(date),
            Self::RawOnly => None,
        }
    }
}

/// One application of a tag to an artist by a user at a point in time.
///
/// Identity is the full `(user_id, artist_id, tag_id, timestamp)`
/// quadruple. `timestamp` is always present even when it cannot be
/// decoded; `date` is `None` in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggingEvent {
    pub user_id: i64,
    pub artist_id: i64,
    pub tag_id: i64,
    pub timestamp: i64,
    pub date: Option<TagDate>,
}

impl TaggingEvent {
    /// Build a tagging event, deriving the calendar date when the
    /// timestamp allows it.
    #[must_use]
    pub fn new(user_id: i64, artist_id: i64, tag_id: i64, timestamp: i64) -> Self {
        Self {
            user_id,
            artist_id,
            tag_id,
            timestamp,
            date: TimestampOutcome::decode(timestamp).date(),
        }
    }
}
