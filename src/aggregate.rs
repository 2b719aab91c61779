//! Aggregation: merge per-source artifacts and drop title-excluded rows.
//!
//! Aggregation reads only from disk, never from adapter state, so it works
//! the same whether the scrape phase ran this invocation or earlier today.
//! Missing or unreadable artifacts degrade the result instead of failing
//! the pass.

use std::path::PathBuf;

use metrics::counter;
use tracing::warn;

use crate::artifact::read_postings;
use crate::posting::JobPosting;

/// Case-insensitive substring match of any exclusion keyword in the title.
/// Empty keywords never match anything.
pub fn title_is_excluded(title: &str, exclusion_keywords: &[String]) -> bool {
    let title = title.to_lowercase();
    exclusion_keywords
        .iter()
        .filter(|k| !k.is_empty())
        .any(|k| title.contains(&k.to_lowercase()))
}

/// Concatenate the readable per-source artifacts in order, then apply the
/// title exclusion filter. Within one artifact the row order is preserved.
pub fn combine(paths: &[PathBuf], exclusion_keywords: &[String]) -> Vec<JobPosting> {
    let mut out = Vec::new();
    for path in paths {
        if !path.exists() {
            warn!(path = %path.display(), "per-source artifact missing; skipping");
            continue;
        }
        match read_postings(path) {
            Ok(rows) => out.extend(rows),
            Err(e) => {
                warn!(path = %path.display(), error = ?e, "unreadable per-source artifact; skipping");
            }
        }
    }

    let before = out.len();
    out.retain(|p| !title_is_excluded(&p.title, exclusion_keywords));
    let dropped = before - out.len();
    if dropped > 0 {
        counter!("aggregate_excluded_total").increment(dropped as u64);
    }
    out
}
