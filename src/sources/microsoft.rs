//! Microsoft careers search API (GET, paged JSON).
//!
//! The search is already scoped server-side to US, full-time, students and
//! graduates; the adapter re-checks recency client-side because the API
//! sorts by date but does not bound it. Classification context is title
//! plus primary location, the only substance the search result carries.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::Classifier;
use crate::dates::parse_posted_date;
use crate::posting::JobPosting;
use crate::sources::{JobSource, BROWSER_UA};

const SEARCH_URL: &str = "https://gcsservices.careers.microsoft.com/search/api/v1/search";
const JOB_LINK_PREFIX: &str = "https://jobs.careers.microsoft.com/global/en/job/";
const PORTAL_ORIGIN: &str = "https://jobs.careers.microsoft.com";

pub struct MicrosoftSource {
    classifier: Classifier,
    page_size: u32,
    posted_since_days: i64,
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client },
    Fixture(String),
}

impl MicrosoftSource {
    pub fn new(
        client: reqwest::Client,
        classifier: Classifier,
        page_size: u32,
        posted_since_days: i64,
    ) -> Self {
        Self {
            classifier,
            page_size,
            posted_since_days,
            mode: Mode::Http { client },
        }
    }

    pub fn from_fixture(json: &str, classifier: Classifier, posted_since_days: i64) -> Self {
        Self {
            classifier,
            page_size: 30,
            posted_since_days,
            mode: Mode::Fixture(json.to_string()),
        }
    }

    fn params(&self) -> SearchParams<'_> {
        SearchParams {
            lc: "United States",
            exp: "Students and graduates",
            et: "Full-Time",
            l: "en_us",
            pg: 1,
            pg_sz: self.page_size,
            o: "Recent",
            flt: "true",
        }
    }

    async fn collect(&self, body: SearchEnvelope) -> Result<Vec<JobPosting>> {
        let jobs = body
            .operation_result
            .map(|o| o.result.jobs)
            .unwrap_or_default();
        counter!("scrape_postings_total").increment(jobs.len() as u64);

        let today = Utc::now().date_naive();
        let mut out = Vec::new();
        for job in jobs {
            let posted = parse_posted_date(job.posting_date.as_deref().unwrap_or(""));
            if !posted.within_trailing_days(today, self.posted_since_days) {
                continue;
            }
            let Some(job_id) = job.job_id.filter(|id| !id.is_empty()) else {
                debug!(source = "Microsoft", "skipping search hit without jobId");
                continue;
            };
            let title = job
                .title
                .unwrap_or_else(|| JobPosting::UNKNOWN.to_string());
            let location = job
                .properties
                .and_then(|p| p.primary_location)
                .unwrap_or_else(|| JobPosting::UNKNOWN.to_string());

            let context = format!("{title} {location}");
            if !self.classifier.classify(&context).await {
                continue;
            }

            out.push(JobPosting {
                company: "Microsoft".to_string(),
                title,
                details: location,
                posted_at: posted,
                link: format!("{JOB_LINK_PREFIX}{job_id}"),
                source: "Microsoft".to_string(),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl JobSource for MicrosoftSource {
    async fn fetch(&self) -> Result<Vec<JobPosting>> {
        match &self.mode {
            Mode::Fixture(json) => {
                let body: SearchEnvelope =
                    serde_json::from_str(json).context("parsing Microsoft search fixture")?;
                self.collect(body).await
            }
            Mode::Http { client } => {
                let resp = client
                    .get(SEARCH_URL)
                    .query(&self.params())
                    .header("User-Agent", BROWSER_UA)
                    .header("Accept", "application/json, text/plain, */*")
                    .header("Origin", PORTAL_ORIGIN)
                    .header("Referer", format!("{PORTAL_ORIGIN}/"))
                    .send()
                    .await
                    .context("searching Microsoft careers")?;
                let status = resp.status();
                if !status.is_success() {
                    bail!("Microsoft search returned {status}");
                }
                let body: SearchEnvelope = resp
                    .json()
                    .await
                    .context("decoding Microsoft search response")?;
                self.collect(body).await
            }
        }
    }

    fn name(&self) -> &str {
        "Microsoft"
    }
}

// ------------------------------------------------------------
// Wire shapes
// ------------------------------------------------------------

#[derive(Serialize)]
struct SearchParams<'a> {
    lc: &'a str,
    exp: &'a str,
    et: &'a str,
    l: &'a str,
    pg: u32,
    #[serde(rename = "pgSz")]
    pg_sz: u32,
    o: &'a str,
    flt: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default, rename = "operationResult")]
    operation_result: Option<OperationResult>,
}

#[derive(Debug, Default, Deserialize)]
struct OperationResult {
    #[serde(default)]
    result: SearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    jobs: Vec<MsJob>,
}

#[derive(Debug, Default, Deserialize)]
struct MsJob {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "postingDate")]
    posting_date: Option<String>,
    #[serde(default, rename = "jobId")]
    job_id: Option<String>,
    #[serde(default)]
    properties: Option<MsProperties>,
}

#[derive(Debug, Default, Deserialize)]
struct MsProperties {
    #[serde(default, rename = "primaryLocation")]
    primary_location: Option<String>,
}
