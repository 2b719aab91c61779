//! Y Combinator job board scrape (HTML, no search API).
//!
//! Supplemental CS-only source. The listing page carries company, title,
//! link and a human-formatted age; each posting's detail page contributes
//! the tag strip and the experience requirement that make up the
//! classification context. DOM parsing stays in sync helpers so the parsed
//! document is never held across an await.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::classify::Classifier;
use crate::dates::parse_posted_date;
use crate::posting::JobPosting;
use crate::sources::JobSource;

const BASE_URL: &str = "https://www.ycombinator.com";
/// The board serves a different shell to non-browser agents.
const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct YCombinatorSource {
    classifier: Classifier,
    mode: Mode,
}

enum Mode {
    Http {
        client: reqwest::Client,
    },
    /// Canned listing page plus one shared detail page; no network.
    Fixture {
        listing_html: String,
        detail_html: String,
    },
}

impl YCombinatorSource {
    pub fn new(client: reqwest::Client, classifier: Classifier) -> Self {
        Self {
            classifier,
            mode: Mode::Http { client },
        }
    }

    pub fn from_fixture(listing_html: &str, detail_html: &str, classifier: Classifier) -> Self {
        Self {
            classifier,
            mode: Mode::Fixture {
                listing_html: listing_html.to_string(),
                detail_html: detail_html.to_string(),
            },
        }
    }

    async fn detail_html(&self, url: &str) -> Option<String> {
        match &self.mode {
            Mode::Fixture { detail_html, .. } => Some(detail_html.clone()),
            Mode::Http { client } => {
                let resp = match client
                    .get(url)
                    .header("User-Agent", DESKTOP_UA)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(source = "Y Combinator", url, error = ?e, "job page fetch failed");
                        return None;
                    }
                };
                if !resp.status().is_success() {
                    warn!(source = "Y Combinator", url, status = %resp.status(), "job page returned non-success");
                    return None;
                }
                match resp.text().await {
                    Ok(html) => Some(html),
                    Err(e) => {
                        warn!(source = "Y Combinator", url, error = ?e, "job page body read failed");
                        None
                    }
                }
            }
        }
    }
}

#[async_trait]
impl JobSource for YCombinatorSource {
    async fn fetch(&self) -> Result<Vec<JobPosting>> {
        let listing_html = match &self.mode {
            Mode::Fixture { listing_html, .. } => listing_html.clone(),
            Mode::Http { client } => {
                let resp = client
                    .get(format!("{BASE_URL}/jobs"))
                    .header("User-Agent", DESKTOP_UA)
                    .send()
                    .await
                    .context("fetching Y Combinator jobs page")?;
                let status = resp.status();
                if !status.is_success() {
                    bail!("Y Combinator jobs page returned {status}");
                }
                resp.text()
                    .await
                    .context("reading Y Combinator jobs page")?
            }
        };

        let items = parse_listing(&listing_html);
        counter!("scrape_postings_total").increment(items.len() as u64);

        let mut out = Vec::new();
        for item in items {
            let Some(href) = item.href else {
                debug!(source = "Y Combinator", company = %item.company, "listing entry without link");
                continue;
            };
            let link = if href.starts_with("http") {
                href
            } else {
                format!("{BASE_URL}{href}")
            };

            let Some(detail) = self.detail_html(&link).await else {
                continue;
            };
            let (details, experience) = parse_detail(&detail);
            let details_joined = details.join(", ");

            let context = format!("{}, {details_joined}, {experience}", item.title);
            if !self.classifier.classify(&context).await {
                continue;
            }

            out.push(JobPosting {
                company: item.company,
                title: item.title,
                details: details_joined,
                posted_at: parse_posted_date(&item.posted),
                link,
                source: "Y Combinator".to_string(),
            });
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "Y Combinator"
    }
}

// ------------------------------------------------------------
// DOM extraction
// ------------------------------------------------------------

struct ListingItem {
    company: String,
    title: String,
    href: Option<String>,
    posted: String,
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn parse_listing(html: &str) -> Vec<ListingItem> {
    let doc = Html::parse_document(html);
    let item_sel = Selector::parse("li.my-2.flex.w-full.flex-col").expect("listing selector");
    let company_sel = Selector::parse("span.block.font-bold").expect("company selector");
    let link_sel = Selector::parse("a.font-semibold.text-linkColor").expect("link selector");
    let date_sel = Selector::parse("span.hidden.text-sm.text-gray-400").expect("date selector");

    let mut items = Vec::new();
    for li in doc.select(&item_sel) {
        let company = li
            .select(&company_sel)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_else(|| JobPosting::UNKNOWN.to_string());
        let link_el = li.select(&link_sel).next();
        let title = link_el
            .map(|el| element_text(&el))
            .unwrap_or_else(|| JobPosting::UNKNOWN.to_string());
        let href = link_el
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);
        let posted = li
            .select(&date_sel)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();
        items.push(ListingItem {
            company,
            title,
            href,
            posted,
        });
    }
    items
}

/// Pull the tag strip and the experience requirement off a detail page.
fn parse_detail(html: &str) -> (Vec<String>, String) {
    let doc = Html::parse_document(html);
    let container_sel =
        Selector::parse("div.flex.flex-row.flex-wrap.justify-center").expect("details selector");
    let div_sel = Selector::parse("div").expect("div selector");
    let span_sel = Selector::parse("span").expect("span selector");

    let mut details = Vec::new();
    if let Some(container) = doc.select(&container_sel).next() {
        for item in container.select(&div_sel) {
            let t = element_text(&item);
            if !t.is_empty() {
                details.push(t);
            }
        }
    }

    let mut experience = JobPosting::UNKNOWN.to_string();
    for div in doc.select(&div_sel) {
        if element_text(&div) == "Experience" {
            if let Some(parent) = div.parent().and_then(ElementRef::wrap) {
                if let Some(span) = parent.select(&span_sel).next() {
                    let t = element_text(&span);
                    if !t.is_empty() {
                        experience = t;
                    }
                }
            }
            break;
        }
    }

    (details, experience)
}
