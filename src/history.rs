//! History ledger: the cross-run memory of every posting already reported.
//!
//! One CSV per job type under the data root (`CS_historical_jobs.csv`,
//! `DS_historical_jobs.csv`). The link is the identity; company and title
//! ride along for humans reading the file. Reconciliation judges candidates
//! against the ledger as loaded, then folds the new ones in.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::JobType;
use crate::posting::JobPosting;

/// One remembered posting. Serde renames match the ledger header
/// (`Company, Job, Link`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Job")]
    pub title: String,
    #[serde(rename = "Link")]
    pub link: String,
}

impl From<&JobPosting> for HistoryRecord {
    fn from(p: &JobPosting) -> Self {
        Self {
            company: p.company.clone(),
            title: p.title.clone(),
            link: p.link.clone(),
        }
    }
}

const LEDGER_HEADER: [&str; 3] = ["Company", "Job", "Link"];

fn ledger_path(data_dir: &Path, job_type: JobType) -> PathBuf {
    data_dir.join(format!("{}_historical_jobs.csv", job_type.code()))
}

/// In-memory ledger with a link index for O(1) membership checks.
#[derive(Debug, Default)]
pub struct HistoryLedger {
    records: Vec<HistoryRecord>,
    links: HashSet<String>,
}

impl HistoryLedger {
    /// Load the ledger for `job_type` from under `data_dir`. An absent file
    /// is a first run and yields an empty ledger. Duplicate links in the
    /// file collapse to the first occurrence.
    pub fn load(data_dir: &Path, job_type: JobType) -> Result<Self> {
        let path = ledger_path(data_dir, job_type);
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .with_context(|| format!("opening history ledger {}", path.display()))?;
        let mut ledger = Self::default();
        for row in rdr.deserialize::<HistoryRecord>() {
            match row {
                Ok(rec) => {
                    ledger.insert(rec);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = ?e, "skipping malformed ledger row");
                }
            }
        }
        Ok(ledger)
    }

    /// Add a record unless its link is already present. Returns whether the
    /// record was inserted.
    pub fn insert(&mut self, rec: HistoryRecord) -> bool {
        if self.links.contains(&rec.link) {
            return false;
        }
        self.links.insert(rec.link.clone());
        self.records.push(rec);
        true
    }

    pub fn contains_link(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Persist the full ledger. Written to a temp file first and renamed
    /// into place so a crash mid-write cannot truncate the previous ledger.
    pub fn persist(&self, data_dir: &Path, job_type: JobType) -> Result<()> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("creating data dir {}", data_dir.display()))?;
        let path = ledger_path(data_dir, job_type);
        let tmp = path.with_extension("csv.tmp");
        {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp)
                .with_context(|| format!("creating ledger temp file {}", tmp.display()))?;
            wtr.write_record(LEDGER_HEADER)
                .context("writing ledger header")?;
            for rec in &self.records {
                wtr.serialize(rec)
                    .with_context(|| format!("writing ledger row for {}", rec.link))?;
            }
            wtr.flush().context("flushing ledger")?;
        }
        fs::rename(&tmp, &path)
            .with_context(|| format!("replacing history ledger {}", path.display()))?;
        Ok(())
    }
}

/// Result of matching candidates against the ledger.
#[derive(Debug)]
pub struct Reconciled {
    /// Candidates whose link was not in the ledger at load time, in input
    /// order. May contain link duplicates if the sources overlapped.
    pub new_postings: Vec<JobPosting>,
    /// Ledger extended with the new postings, ready to persist.
    pub ledger: HistoryLedger,
}

/// Split candidates into already-seen and new, judged element-wise against
/// the ledger as given, then fold the new postings into it.
pub fn reconcile(candidates: Vec<JobPosting>, mut ledger: HistoryLedger) -> Reconciled {
    let new_postings: Vec<JobPosting> = candidates
        .into_iter()
        .filter(|c| !ledger.contains_link(&c.link))
        .collect();
    for p in &new_postings {
        ledger.insert(HistoryRecord::from(p));
    }
    Reconciled {
        new_postings,
        ledger,
    }
}
