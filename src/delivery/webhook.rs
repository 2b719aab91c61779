// src/delivery/webhook.rs
//! Generic JSON webhook delivery. Posts a small summary of the pass with a
//! sample of the new postings; retries transient failures with exponential
//! backoff before giving up.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use super::{Deliver, RunReport};
use crate::posting::JobPosting;

const SAMPLE_LIMIT: usize = 5;

pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u8,
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    job_type: String,
    date: String,
    new_postings: usize,
    sample: Vec<SampleRow>,
}

#[derive(Debug, Serialize)]
struct SampleRow {
    company: String,
    title: String,
    link: String,
}

impl WebhookPayload {
    fn from_report(report: &RunReport<'_>) -> Self {
        Self {
            job_type: report.job_type.code().to_string(),
            date: report.run_date.to_string(),
            new_postings: report.new_postings.len(),
            sample: report
                .new_postings
                .iter()
                .take(SAMPLE_LIMIT)
                .map(SampleRow::from)
                .collect(),
        }
    }
}

impl From<&JobPosting> for SampleRow {
    fn from(p: &JobPosting) -> Self {
        Self {
            company: p.company.clone(),
            title: p.title.clone(),
            link: p.link.clone(),
        }
    }
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u8) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn post_with_retry(&self, payload: &WebhookPayload) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .post(&self.url)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            match result {
                Ok(resp) => match resp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) if attempt <= self.max_retries => {
                        warn!(attempt, error = ?e, "webhook returned error status; retrying");
                    }
                    Err(e) => return Err(anyhow!("webhook HTTP error: {e}")),
                },
                Err(e) if attempt <= self.max_retries => {
                    warn!(attempt, error = ?e, "webhook request failed; retrying");
                }
                Err(e) => return Err(anyhow!("webhook request failed: {e}")),
            }

            let backoff = Duration::from_millis(500u64 << (attempt - 1));
            tokio::time::sleep(backoff).await;
        }
    }
}

#[async_trait]
impl Deliver for WebhookNotifier {
    async fn deliver(&self, report: &RunReport<'_>) -> Result<()> {
        let payload = WebhookPayload::from_report(report);
        self.post_with_retry(&payload).await
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::NaiveDate;

    use super::*;
    use crate::config::JobType;
    use crate::dates::PostedDate;

    fn posting(n: usize) -> JobPosting {
        JobPosting {
            company: format!("Company {n}"),
            title: format!("Engineer {n}"),
            details: "USA".to_string(),
            posted_at: PostedDate::Invalid,
            link: format!("https://example.com/j/{n}"),
            source: "Amazon".to_string(),
        }
    }

    #[test]
    fn payload_samples_at_most_five_rows() {
        let postings: Vec<JobPosting> = (0..8).map(posting).collect();
        let names: Vec<String> = Vec::new();
        let report = RunReport {
            job_type: JobType::Ds,
            run_date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            combined_path: Path::new("combined.csv"),
            new_postings: &postings,
            source_names: &names,
        };
        let payload = WebhookPayload::from_report(&report);
        assert_eq!(payload.job_type, "DS");
        assert_eq!(payload.date, "2025-03-02");
        assert_eq!(payload.new_postings, 8);
        assert_eq!(payload.sample.len(), SAMPLE_LIMIT);
        assert_eq!(payload.sample[0].company, "Company 0");
        assert_eq!(payload.sample[4].link, "https://example.com/j/4");
    }
}
