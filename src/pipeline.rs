// src/pipeline.rs
//! Run controller. One pass per category: scrape every source into its
//! per-day artifact, aggregate with title exclusions, reconcile against the
//! history ledger, then write the combined artifact and deliver only when
//! something new turned up.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use once_cell::sync::OnceCell;
use tracing::{error, info, warn};

use crate::aggregate::combine;
use crate::artifact::write_postings;
use crate::classify::{Classifier, DynOracle, GroqOracle, ScriptedOracle};
use crate::config::{source_slug, FileConfig, JobType, RunConfig};
use crate::delivery::{DeliveryMux, RunReport};
use crate::history::{reconcile, HistoryLedger};
use crate::sources::amazon::AmazonSource;
use crate::sources::microsoft::MicrosoftSource;
use crate::sources::venture::VentureSource;
use crate::sources::ycombinator::YCombinatorSource;
use crate::sources::JobSource;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scrape_postings_total", "Search hits parsed from all sources.");
        describe_counter!("scrape_kept_total", "Postings kept after screening, per source.");
        describe_counter!("scrape_source_errors_total", "Source fetch/parse failures.");
        describe_counter!("classify_oracle_errors_total", "Oracle call failures.");
        describe_counter!(
            "aggregate_excluded_total",
            "Rows dropped by title exclusion keywords."
        );
        describe_counter!("history_new_total", "Postings first seen by the history ledger.");
        describe_counter!("delivery_errors_total", "Delivery channel failures.");
        describe_histogram!("source_fetch_ms", "Per-source fetch time in milliseconds.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when a pass last finished.");
    });
}

/// What one category pass did, for logging and the exit code.
#[derive(Debug)]
pub struct RunOutcome {
    pub job_type: JobType,
    /// False when the per-source artifacts for today already existed.
    pub scraped: bool,
    /// Aggregated candidate rows after title exclusion.
    pub candidates: usize,
    pub new_postings: usize,
    /// Combined artifact path, written only when there were new postings.
    pub combined: Option<PathBuf>,
}

pub fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .expect("reqwest client")
}

// Fixture payloads for offline runs.
const VENTURE_SEARCH_FIXTURE: &str = include_str!("../tests/fixtures/venture_search.json");
const VENTURE_DETAIL_FIXTURE: &str = include_str!("../tests/fixtures/venture_detail.html");
const MICROSOFT_SEARCH_FIXTURE: &str = include_str!("../tests/fixtures/microsoft_search.json");
const AMAZON_SEARCH_FIXTURE: &str = include_str!("../tests/fixtures/amazon_search.json");
const YC_LISTING_FIXTURE: &str = include_str!("../tests/fixtures/yc_jobs.html");
const YC_DETAIL_FIXTURE: &str = include_str!("../tests/fixtures/yc_job_detail.html");

/// Adapter roster for one pass, in the same order as
/// [`RunConfig::source_names`].
fn build_sources(
    cfg: &RunConfig,
    http: &reqwest::Client,
    classifier: &Classifier,
) -> Vec<Box<dyn JobSource>> {
    if cfg.offline {
        return build_fixture_sources(cfg, classifier);
    }
    let mut sources: Vec<Box<dyn JobSource>> = Vec::new();
    if cfg.job_type == JobType::Cs {
        sources.push(Box::new(YCombinatorSource::new(
            http.clone(),
            classifier.clone(),
        )));
    }
    for board in &cfg.boards {
        sources.push(Box::new(VentureSource::new(
            board.clone(),
            http.clone(),
            classifier.clone(),
            cfg.job_type_keywords.clone(),
            cfg.venture_page_size,
            cfg.posted_since_days,
        )));
    }
    sources.push(Box::new(MicrosoftSource::new(
        http.clone(),
        classifier.clone(),
        cfg.company_page_size,
        cfg.posted_since_days,
    )));
    sources.push(Box::new(AmazonSource::new(
        http.clone(),
        classifier.clone(),
        cfg.company_page_size,
        cfg.posted_since_days,
    )));
    sources
}

fn build_fixture_sources(cfg: &RunConfig, classifier: &Classifier) -> Vec<Box<dyn JobSource>> {
    let mut sources: Vec<Box<dyn JobSource>> = Vec::new();
    if cfg.job_type == JobType::Cs {
        sources.push(Box::new(YCombinatorSource::from_fixture(
            YC_LISTING_FIXTURE,
            YC_DETAIL_FIXTURE,
            classifier.clone(),
        )));
    }
    if let Some(board) = cfg.boards.first() {
        sources.push(Box::new(VentureSource::from_fixture(
            board.clone(),
            VENTURE_SEARCH_FIXTURE,
            VENTURE_DETAIL_FIXTURE,
            classifier.clone(),
            cfg.job_type_keywords.clone(),
        )));
    }
    sources.push(Box::new(MicrosoftSource::from_fixture(
        MICROSOFT_SEARCH_FIXTURE,
        classifier.clone(),
        cfg.posted_since_days,
    )));
    sources.push(Box::new(AmazonSource::from_fixture(
        AMAZON_SEARCH_FIXTURE,
        classifier.clone(),
        cfg.posted_since_days,
    )));
    sources
}

/// Run one category pass end to end.
///
/// The scrape phase is skipped when every per-source artifact for today is
/// already on disk. Aggregation, ledger reconciliation and persistence run
/// on every invocation; the combined artifact and delivery happen only when
/// the ledger reports new postings.
pub async fn run_pass(
    cfg: &RunConfig,
    oracle: DynOracle,
    http: &reqwest::Client,
    delivery: &DeliveryMux,
) -> Result<RunOutcome> {
    ensure_metrics_described();
    let today = Utc::now().date_naive();
    let paths = cfg.paths_for(today);
    let classifier = Classifier::new(oracle, cfg.llm_model.clone(), cfg.job_type_keywords.clone());

    let scraped = if paths.all_sources_present() {
        info!(
            job_type = %cfg.job_type,
            dir = %paths.dir.display(),
            "per-source artifacts already present; skipping scrape"
        );
        false
    } else {
        for source in build_sources(cfg, http, &classifier) {
            let slug = source_slug(source.name());
            let path = paths.source_path(&slug);
            let started = Instant::now();
            let postings = match source.fetch().await {
                Ok(v) => v,
                Err(e) => {
                    warn!(source = source.name(), error = ?e, "source failed; writing empty artifact");
                    counter!("scrape_source_errors_total").increment(1);
                    Vec::new()
                }
            };
            histogram!("source_fetch_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
            counter!("scrape_kept_total").increment(postings.len() as u64);
            write_postings(&path, &postings)?;
            info!(
                source = source.name(),
                kept = postings.len(),
                path = %path.display(),
                "per-source artifact written"
            );
        }
        true
    };

    let candidates = combine(&paths.per_source, &cfg.exclusion_keywords);
    let candidate_count = candidates.len();

    let ledger = HistoryLedger::load(&cfg.data_dir, cfg.job_type)?;
    let known_before = ledger.len();
    let outcome = reconcile(candidates, ledger);
    outcome.ledger.persist(&cfg.data_dir, cfg.job_type)?;
    counter!("history_new_total").increment(outcome.new_postings.len() as u64);
    gauge!("pipeline_last_run_ts").set(Utc::now().timestamp() as f64);

    if outcome.new_postings.is_empty() {
        info!(
            job_type = %cfg.job_type,
            candidates = candidate_count,
            known = known_before,
            "no new postings; skipping combined artifact and delivery"
        );
        return Ok(RunOutcome {
            job_type: cfg.job_type,
            scraped,
            candidates: candidate_count,
            new_postings: 0,
            combined: None,
        });
    }

    write_postings(&paths.combined, &outcome.new_postings)?;
    info!(
        job_type = %cfg.job_type,
        new = outcome.new_postings.len(),
        path = %paths.combined.display(),
        "combined artifact written"
    );

    let source_names = cfg.source_names();
    let report = RunReport {
        job_type: cfg.job_type,
        run_date: today,
        combined_path: &paths.combined,
        new_postings: &outcome.new_postings,
        source_names: &source_names,
    };
    if delivery.is_empty() {
        info!(job_type = %cfg.job_type, "no delivery channels configured");
    } else {
        delivery.deliver_all(&report).await;
    }

    Ok(RunOutcome {
        job_type: cfg.job_type,
        scraped,
        candidates: candidate_count,
        new_postings: outcome.new_postings.len(),
        combined: Some(paths.combined.clone()),
    })
}

async fn run_category(
    job_type: JobType,
    file_cfg: &FileConfig,
    data_dir: &std::path::Path,
    offline: bool,
    http: &reqwest::Client,
) -> Result<RunOutcome> {
    let cfg = RunConfig::resolve(job_type, file_cfg, data_dir, offline);
    let oracle: DynOracle = if offline {
        Arc::new(ScriptedOracle::fixed("Yes"))
    } else {
        Arc::new(GroqOracle::from_env(http.clone())?)
    };
    let delivery = if offline {
        DeliveryMux::empty()
    } else {
        DeliveryMux::from_env(&cfg)
    };
    run_pass(&cfg, oracle, http, &delivery).await
}

/// Run the requested categories in order. Passes are isolated: a failure in
/// one is reported and does not stop the next.
pub async fn run_all(
    categories: &[JobType],
    file_cfg: &FileConfig,
    data_dir: &std::path::Path,
    offline: bool,
) -> Vec<(JobType, Result<RunOutcome>)> {
    let http = default_http_client();
    let mut results = Vec::with_capacity(categories.len());
    for &job_type in categories {
        info!(job_type = %job_type, offline, "starting pass");
        let result = run_category(job_type, file_cfg, data_dir, offline, &http).await;
        match &result {
            Ok(o) => info!(
                job_type = %job_type,
                scraped = o.scraped,
                candidates = o.candidates,
                new = o.new_postings,
                "pass finished"
            ),
            Err(e) => error!(job_type = %job_type, error = format!("{e:#}"), "pass failed"),
        }
        results.push((job_type, result));
    }
    results
}
