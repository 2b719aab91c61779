//! # Posting dates
//! Normalization of the posting timestamps the boards hand back.
//!
//! Every source reports its date differently: epoch seconds as a string,
//! RFC 3339, or offset timestamps with optional fractional seconds. All of
//! them funnel through [`parse_posted_date`] and come out as a calendar day
//! or the explicit [`PostedDate::Invalid`] sentinel. An unparseable date is
//! never a reason to drop a posting.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Label used for unparseable dates in artifacts and logs.
pub const INVALID_DATE_LABEL: &str = "Invalid Date";

/// Offset-bearing formats tried after the RFC 3339 fast path.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// A posting date as reported by a source: a calendar day, or a sentinel
/// for values no known format matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostedDate {
    Date(NaiveDate),
    Invalid,
}

impl PostedDate {
    /// The calendar day, if one was recognized.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            PostedDate::Date(d) => Some(*d),
            PostedDate::Invalid => None,
        }
    }

    /// Whether the date falls within the trailing `days` window ending at
    /// `today`. Invalid dates pass: recency filters must not silently drop
    /// postings whose date the board mangled.
    pub fn within_trailing_days(&self, today: NaiveDate, days: i64) -> bool {
        match self {
            PostedDate::Invalid => true,
            PostedDate::Date(d) => *d >= today - Duration::days(days),
        }
    }
}

impl fmt::Display for PostedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostedDate::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            PostedDate::Invalid => f.write_str(INVALID_DATE_LABEL),
        }
    }
}

impl Serialize for PostedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PostedDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == INVALID_DATE_LABEL {
            return Ok(PostedDate::Invalid);
        }
        match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(d) => Ok(PostedDate::Date(d)),
            // Artifacts only ever carry the two canonical forms; anything
            // else is a hand-edited row and keeps the sentinel semantics.
            Err(_) => Ok(PostedDate::Invalid),
        }
    }
}

/// Parse a raw source timestamp into a [`PostedDate`].
///
/// Tried in order: epoch seconds, RFC 3339, then the offset formats with and
/// without fractional seconds. Falls back to [`PostedDate::Invalid`].
pub fn parse_posted_date(raw: &str) -> PostedDate {
    let raw = raw.trim();

    if let Ok(secs) = raw.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(secs, 0) {
            return PostedDate::Date(dt.date_naive());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return PostedDate::Date(dt.date_naive());
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return PostedDate::Date(dt.date_naive());
        }
    }

    PostedDate::Invalid
}
