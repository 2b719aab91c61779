//! CSV artifact layer shared by the per-source writers, the aggregator and
//! the combined output.
//!
//! The writer emits the header row itself instead of relying on the first
//! serialized record, so a source that produced nothing still leaves a
//! valid header-only file behind. That empty file doubles as the marker the
//! same-day skip check looks for.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::posting::JobPosting;

/// Column order of every posting artifact.
pub const POSTINGS_HEADER: [&str; 6] = [
    "Company",
    "Job",
    "Details",
    "Date/Time Posted",
    "Link",
    "Source",
];

/// Write postings to `path`, replacing any existing file. Parent directories
/// are created on demand.
pub fn write_postings(path: &Path, postings: &[JobPosting]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating artifact dir {}", parent.display()))?;
    }
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating artifact {}", path.display()))?;
    wtr.write_record(POSTINGS_HEADER)
        .context("writing artifact header")?;
    for p in postings {
        wtr.serialize(p)
            .with_context(|| format!("writing artifact row for {}", p.link))?;
    }
    wtr.flush()
        .with_context(|| format!("flushing artifact {}", path.display()))?;
    Ok(())
}

/// Read postings back from `path`. Individual malformed rows are skipped
/// with a warning; a missing or unopenable file is the caller's problem.
pub fn read_postings(path: &Path) -> Result<Vec<JobPosting>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening artifact {}", path.display()))?;
    let mut out = Vec::new();
    for row in rdr.deserialize::<JobPosting>() {
        match row {
            Ok(p) => out.push(p),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = ?e,
                    "skipping malformed artifact row"
                );
            }
        }
    }
    Ok(out)
}
