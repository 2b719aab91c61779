//! Amazon jobs search API (POST, JSON).
//!
//! Every interesting field arrives as a single-element list, so the wire
//! structs lean on [`TextOrList`]. The API needs the public api key the
//! amazon.jobs frontend itself sends with every search; it is not a
//! credential. Location is re-checked client-side with the same loose
//! "us" substring the portal uses, and recency with the trailing window.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::Classifier;
use crate::dates::parse_posted_date;
use crate::posting::JobPosting;
use crate::sources::{JobSource, TextOrList, BROWSER_UA};

const SEARCH_URL: &str = "https://www.amazon.jobs/api/jobs/search";
const JOB_LINK_PREFIX: &str = "https://www.amazon.jobs/en/jobs/";
const PORTAL_ORIGIN: &str = "https://www.amazon.jobs";
/// Public key served to every visitor of the jobs portal.
const SEARCH_API_KEY: &str = "PbxxNwIlTi4FP5oijKdtk3IrBF5CLd4R4oPHsKNh";

pub struct AmazonSource {
    classifier: Classifier,
    page_size: u32,
    posted_since_days: i64,
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client },
    Fixture(String),
}

impl AmazonSource {
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

    fn payload(&self) -> SearchPayload<'_> {
        SearchPayload {
            country: ["US"],
            employment_type: ["Full time"],
            facets: ["location"],
            offset: 0,
            size: self.page_size,
        }
    }

    async fn collect(&self, body: SearchEnvelope) -> Result<Vec<JobPosting>> {
        counter!("scrape_postings_total").increment(body.search_hits.len() as u64);

        let today = Utc::now().date_naive();
        let mut out = Vec::new();
        for hit in body.search_hits {
            let f = hit.fields;
            let location = match f.location.first() {
                Some(l) => l.to_string(),
                None => {
                    debug!(source = "Amazon", "skipping search hit without location");
                    continue;
                }
            };
            if !location.to_lowercase().contains("us") {
                continue;
            }
            let posted = parse_posted_date(f.created_date.first().unwrap_or(""));
            if !posted.within_trailing_days(today, self.posted_since_days) {
                continue;
            }
            let Some(job_id) = f.icims_job_id.first().filter(|id| !id.is_empty()) else {
                debug!(source = "Amazon", "skipping search hit without icimsJobId");
                continue;
            };
            let link = format!("{JOB_LINK_PREFIX}{job_id}");

            let quals = f
                .basic_qualifications
                .join(" ")
                .unwrap_or_else(|| JobPosting::UNKNOWN.to_string());
            if !self.classifier.classify(&quals).await {
                continue;
            }

            out.push(JobPosting {
                company: "Amazon".to_string(),
                title: f
                    .title
                    .first()
                    .unwrap_or(JobPosting::UNKNOWN)
                    .to_string(),
                details: location,
                posted_at: posted,
                link,
                source: "Amazon".to_string(),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl JobSource for AmazonSource {
    async fn fetch(&self) -> Result<Vec<JobPosting>> {
        match &self.mode {
            Mode::Fixture(json) => {
                let body: SearchEnvelope =
                    serde_json::from_str(json).context("parsing Amazon search fixture")?;
                self.collect(body).await
            }
            Mode::Http { client } => {
                let resp = client
                    .post(SEARCH_URL)
                    .header("User-Agent", BROWSER_UA)
                    .header("Accept", "application/json")
                    .header("Origin", PORTAL_ORIGIN)
                    .header("x-api-key", SEARCH_API_KEY)
                    .json(&self.payload())
                    .send()
                    .await
                    .context("searching Amazon jobs")?;
                let status = resp.status();
                if !status.is_success() {
                    bail!("Amazon search returned {status}");
                }
                let body: SearchEnvelope = resp
                    .json()
                    .await
                    .context("decoding Amazon search response")?;
                self.collect(body).await
            }
        }
    }

    fn name(&self) -> &str {
        "Amazon"
    }
}

// ------------------------------------------------------------
// Wire shapes
// ------------------------------------------------------------

#[derive(Serialize)]
struct SearchPayload<'a> {
    country: [&'a str; 1],
    employment_type: [&'a str; 1],
    facets: [&'a str; 1],
    offset: u32,
    size: u32,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default, rename = "searchHits")]
    search_hits: Vec<SearchHit>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchHit {
    #[serde(default)]
    fields: HitFields,
}

#[derive(Debug, Default, Deserialize)]
struct HitFields {
    #[serde(default)]
    title: TextOrList,
    #[serde(default)]
    location: TextOrList,
    #[serde(default, rename = "createdDate")]
    created_date: TextOrList,
    #[serde(default, rename = "icimsJobId")]
    icims_job_id: TextOrList,
    #[serde(default, rename = "basicQualifications")]
    basic_qualifications: TextOrList,
}
