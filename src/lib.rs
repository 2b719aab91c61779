// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod artifact;
pub mod classify;
pub mod config;
pub mod dates;
pub mod delivery;
pub mod history;
pub mod pipeline;
pub mod posting;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::config::{FileConfig, JobType, RunConfig};
pub use crate::dates::PostedDate;
pub use crate::history::{reconcile, HistoryLedger};
pub use crate::pipeline::{run_all, run_pass, RunOutcome};
pub use crate::posting::JobPosting;
