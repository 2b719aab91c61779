//! Venture job boards behind the shared `api-boards/search-jobs` API.
//!
//! All configured boards speak the same search dialect; one adapter
//! instance covers one board. Grouped boards (parent companies with nested
//! job arrays) are flattened one level before normalization. Every hit
//! costs an extra fetch of the job detail page, which feeds the
//! qualifications section to the classifier.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classify::Classifier;
use crate::config::VentureBoard;
use crate::dates::parse_posted_date;
use crate::posting::JobPosting;
use crate::sources::{
    html_page_text, qualifications_section, JobSource, TextOrList, BROWSER_UA, HTML_ACCEPT,
};

pub struct VentureSource {
    board: VentureBoard,
    classifier: Classifier,
    /// Terms sent as `query.jobTypes`.
    search_job_types: Vec<String>,
    page_size: u32,
    posted_since_days: i64,
    mode: Mode,
}

enum Mode {
    Http {
        client: reqwest::Client,
    },
    /// Canned search response plus one shared detail page; no network.
    Fixture {
        search_json: String,
        detail_html: String,
    },
}

impl VentureSource {
    pub fn new(
        board: VentureBoard,
        client: reqwest::Client,
        classifier: Classifier,
        search_job_types: Vec<String>,
        page_size: u32,
        posted_since_days: i64,
    ) -> Self {
        Self {
            board,
            classifier,
            search_job_types,
            page_size,
            posted_since_days,
            mode: Mode::Http { client },
        }
    }

    pub fn from_fixture(
        board: VentureBoard,
        search_json: &str,
        detail_html: &str,
        classifier: Classifier,
        search_job_types: Vec<String>,
    ) -> Self {
        Self {
            board,
            classifier,
            search_job_types,
            page_size: 100,
            posted_since_days: 7,
            mode: Mode::Fixture {
                search_json: search_json.to_string(),
                detail_html: detail_html.to_string(),
            },
        }
    }

    fn payload(&self) -> SearchPayload<'_> {
        SearchPayload {
            meta: Meta {
                size: self.page_size,
            },
            board: BoardRef {
                id: &self.board.board_id,
                is_parent: true,
            },
            query: Query {
                job_types: &self.search_job_types,
                locations: ["United States"],
                posted_since: format!("P{}D", self.posted_since_days),
                promote_featured: true,
            },
            grouped: self.board.grouped.then_some(true),
        }
    }

    /// Normalize and classify parsed search hits into postings.
    async fn collect(&self, body: SearchResponse) -> Result<Vec<JobPosting>> {
        let hits = flatten_hits(body, self.board.grouped);
        counter!("scrape_postings_total").increment(hits.len() as u64);

        let mut out = Vec::new();
        for job in hits {
            let Some(link) = job.url.as_deref().filter(|u| !u.is_empty()) else {
                debug!(board = %self.board.name, "skipping search hit without url");
                continue;
            };
            let Some(page_text) = self.detail_page_text(link).await else {
                continue;
            };
            let Some(section) = qualifications_section(&page_text) else {
                debug!(board = %self.board.name, link, "no qualifications section; skipping");
                continue;
            };
            if !self.classifier.classify(&section).await {
                continue;
            }
            out.push(JobPosting {
                company: job
                    .company_name
                    .clone()
                    .unwrap_or_else(|| JobPosting::UNKNOWN.into()),
                title: job
                    .title
                    .clone()
                    .unwrap_or_else(|| JobPosting::UNKNOWN.into()),
                details: job
                    .locations
                    .first()
                    .unwrap_or(JobPosting::UNKNOWN)
                    .to_string(),
                posted_at: parse_posted_date(job.time_stamp.as_deref().unwrap_or("")),
                link: link.to_string(),
                source: self.board.name.clone(),
            });
        }
        Ok(out)
    }

    /// Flattened text of the job detail page, or `None` when the page could
    /// not be fetched. A dead detail page only skips that one posting.
    async fn detail_page_text(&self, url: &str) -> Option<String> {
        match &self.mode {
            Mode::Fixture { detail_html, .. } => Some(html_page_text(detail_html)),
            Mode::Http { client } => {
                let resp = match client
                    .get(url)
                    .header("User-Agent", BROWSER_UA)
                    .header("Accept", HTML_ACCEPT)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(board = %self.board.name, url, error = ?e, "job page fetch failed");
                        return None;
                    }
                };
                if !resp.status().is_success() {
                    warn!(board = %self.board.name, url, status = %resp.status(), "job page returned non-success");
                    return None;
                }
                match resp.text().await {
                    Ok(html) => Some(html_page_text(&html)),
                    Err(e) => {
                        warn!(board = %self.board.name, url, error = ?e, "job page body read failed");
                        None
                    }
                }
            }
        }
    }
}

#[async_trait]
impl JobSource for VentureSource {
    async fn fetch(&self) -> Result<Vec<JobPosting>> {
        match &self.mode {
            Mode::Fixture { search_json, .. } => {
                let body: SearchResponse = serde_json::from_str(search_json)
                    .with_context(|| format!("parsing {} search fixture", self.board.name))?;
                self.collect(body).await
            }
            Mode::Http { client } => {
                let resp = client
                    .post(&self.board.url)
                    .header("User-Agent", BROWSER_UA)
                    .header("Accept", "application/json")
                    .json(&self.payload())
                    .send()
                    .await
                    .with_context(|| format!("searching {}", self.board.name))?;
                let status = resp.status();
                if !status.is_success() {
                    bail!("{} search returned {status}", self.board.name);
                }
                let body: SearchResponse = resp
                    .json()
                    .await
                    .with_context(|| format!("decoding {} search response", self.board.name))?;
                self.collect(body).await
            }
        }
    }

    fn name(&self) -> &str {
        &self.board.name
    }
}

// ------------------------------------------------------------
// Wire shapes
// ------------------------------------------------------------

#[derive(Serialize)]
struct SearchPayload<'a> {
    meta: Meta,
    board: BoardRef<'a>,
    query: Query<'a>,
    /// Top-level switch grouped boards expect alongside the query.
    #[serde(skip_serializing_if = "Option::is_none")]
    grouped: Option<bool>,
}

#[derive(Serialize)]
struct Meta {
    size: u32,
}

#[derive(Serialize)]
struct BoardRef<'a> {
    id: &'a str,
    #[serde(rename = "isParent")]
    is_parent: bool,
}

#[derive(Serialize)]
struct Query<'a> {
    #[serde(rename = "jobTypes")]
    job_types: &'a [String],
    locations: [&'a str; 1],
    #[serde(rename = "postedSince")]
    posted_since: String,
    #[serde(rename = "promoteFeatured")]
    promote_featured: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    jobs: Vec<SearchHit>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchHit {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "companyName")]
    company_name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    locations: TextOrList,
    #[serde(default, rename = "timeStamp")]
    time_stamp: Option<String>,
    /// Present on grouped boards where each hit is a parent company.
    #[serde(default)]
    jobs: Vec<SearchHit>,
}

/// Grouped responses nest the real jobs one level down; plain responses
/// are used as-is.
fn flatten_hits(resp: SearchResponse, grouped: bool) -> Vec<SearchHit> {
    if grouped && resp.jobs.iter().any(|h| !h.jobs.is_empty()) {
        resp.jobs.into_iter().flat_map(|parent| parent.jobs).collect()
    } else {
        resp.jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_the_board_wire_names() {
        let board = VentureBoard {
            name: "Acme".into(),
            url: "https://jobs.acme.vc/api-boards/search-jobs".into(),
            board_id: "acme-ventures".into(),
            grouped: false,
        };
        let src = VentureSource::from_fixture(
            board,
            "{}",
            "",
            test_classifier(),
            vec!["software-engineer".into()],
        );
        let v = serde_json::to_value(src.payload()).unwrap();
        assert_eq!(v["meta"]["size"], 100);
        assert_eq!(v["board"]["id"], "acme-ventures");
        assert_eq!(v["board"]["isParent"], true);
        assert_eq!(v["query"]["jobTypes"][0], "software-engineer");
        assert_eq!(v["query"]["locations"][0], "United States");
        assert_eq!(v["query"]["postedSince"], "P7D");
        assert_eq!(v["query"]["promoteFeatured"], true);
        // Non-grouped boards omit the flag entirely.
        assert!(v.get("grouped").is_none());
    }

    #[test]
    fn grouped_payload_sets_the_top_level_flag() {
        let board = VentureBoard {
            name: "Acme".into(),
            url: "https://jobs.acme.vc/api-boards/search-jobs".into(),
            board_id: "acme-ventures".into(),
            grouped: true,
        };
        let src = VentureSource::from_fixture(
            board,
            "{}",
            "",
            test_classifier(),
            vec!["software-engineer".into()],
        );
        let v = serde_json::to_value(src.payload()).unwrap();
        assert_eq!(v["grouped"], true);
    }

    #[test]
    fn grouped_responses_flatten_one_level() {
        let json = r#"{"jobs": [
            {"companyName": "Parent A", "jobs": [
                {"url": "https://a.example/1", "title": "SWE", "companyName": "Child A"},
                {"url": "https://a.example/2", "title": "SWE II", "companyName": "Child A"}
            ]},
            {"companyName": "Parent B", "jobs": [
                {"url": "https://b.example/1", "title": "SWE", "companyName": "Child B"}
            ]}
        ]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        let hits = flatten_hits(resp, true);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].url.as_deref(), Some("https://a.example/1"));
    }

    #[test]
    fn flat_responses_pass_through() {
        let json = r#"{"jobs": [
            {"url": "https://a.example/1", "title": "SWE", "locations": ["Boston"]},
            {"url": "https://a.example/2", "title": "SWE", "locations": "Remote, US"}
        ]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        let hits = flatten_hits(resp, false);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].locations.first(), Some("Boston"));
        assert_eq!(hits[1].locations.first(), Some("Remote, US"));
    }

    fn test_classifier() -> Classifier {
        use crate::classify::ScriptedOracle;
        use std::sync::Arc;
        Classifier::new(
            Arc::new(ScriptedOracle::fixed("Yes")),
            "test-model",
            vec!["software-engineer".into()],
        )
    }
}
