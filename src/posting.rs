//! Shared posting record produced by every source adapter.

use serde::{Deserialize, Serialize};

use crate::dates::PostedDate;

/// One normalized job posting. Serde renames match the artifact header
/// (`Company, Job, Details, Date/Time Posted, Link, Source`) so rows
/// round-trip through the CSV layer by column name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Job")]
    pub title: String,
    /// Free-text context: location, tags, whatever the board exposes.
    #[serde(rename = "Details")]
    pub details: String,
    #[serde(rename = "Date/Time Posted")]
    pub posted_at: PostedDate,
    /// Canonical application URL; also the dedup identity of the posting.
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Source")]
    pub source: String,
}

impl JobPosting {
    /// Placeholder used when a board omits an optional field.
    pub const UNKNOWN: &'static str = "N/A";
}
