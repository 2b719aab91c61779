// src/sources/mod.rs
//! Source adapters. Each adapter owns one board's transport and payload
//! shape and hands back normalized, already-classified [`JobPosting`]s.

pub mod amazon;
pub mod microsoft;
pub mod venture;
pub mod ycombinator;

use anyhow::Result;
use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;

use crate::posting::JobPosting;

/// A job board the pipeline can scrape.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Fetch, normalize and classify. Returns only accepted postings; a
    /// posting without a usable link never comes back from here.
    async fn fetch(&self) -> Result<Vec<JobPosting>>;
    /// Display name recorded in the `Source` column.
    fn name(&self) -> &str;
}

/// Browser user agent for the search APIs and job detail pages. Several of
/// the boards reject requests with a default client UA.
pub(crate) const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0";

pub(crate) const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Marker phrases that open a qualifications-like section, in priority
/// order. Broad suffixes ("required") come last so the specific headings
/// win when both occur.
const QUALIFICATION_MARKERS: [&str; 8] = [
    "necessary qualifications",
    "required qualifications",
    "technical skills",
    "you have",
    "about you",
    "requirement",
    "qualification",
    "required",
];

/// Phrases that mark the end of the posting body proper.
const SECTION_END_PHRASES: [&str; 2] = ["ready to apply?", "apply for this job"];

/// Cut the qualifications-relevant section out of a flattened posting page.
///
/// Scans for the first marker in priority order (case-insensitive), keeps
/// everything after its first occurrence, and truncates at the first end
/// phrase. `None` when no marker is present or nothing useful remains; such
/// postings are skipped, not failed.
pub fn qualifications_section(page_text: &str) -> Option<String> {
    let text = page_text.to_lowercase();
    let marker = QUALIFICATION_MARKERS.iter().find(|m| text.contains(*m))?;
    let start = text.find(marker)? + marker.len();
    let mut section = &text[start..];
    for end in SECTION_END_PHRASES {
        if let Some(pos) = section.find(end) {
            section = &section[..pos];
            break;
        }
    }
    let trimmed = section.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalize extracted page text: decode leftover HTML entities, collapse
/// whitespace, trim.
pub fn normalize_page_text(s: &str) -> String {
    let out = html_escape::decode_html_entities(s).to_string();
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Flatten an HTML document to its visible text, space-separated.
/// Synchronous on purpose: the parsed DOM must not be held across awaits.
pub(crate) fn html_page_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let parts: Vec<&str> = doc.root_element().text().collect();
    normalize_page_text(&parts.join(" "))
}

/// JSON fields the boards serve either as a list of strings or as a bare
/// string, depending on the record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum TextOrList {
    Many(Vec<String>),
    One(String),
    #[default]
    Absent,
}

impl TextOrList {
    /// First value, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            TextOrList::Many(v) => v.first().map(String::as_str),
            TextOrList::One(s) => Some(s.as_str()),
            TextOrList::Absent => None,
        }
    }

    /// All values joined with `sep`; `None` when nothing is present.
    pub fn join(&self, sep: &str) -> Option<String> {
        match self {
            TextOrList::Many(v) if !v.is_empty() => Some(v.join(sep)),
            TextOrList::Many(_) => None,
            TextOrList::One(s) => Some(s.clone()),
            TextOrList::Absent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_starts_after_the_marker_and_stops_at_the_end_phrase() {
        let text = "About Acme. Required Qualifications: 1+ years of Rust. \
                    Benefits galore. Ready to apply? Click below.";
        let section = qualifications_section(text).unwrap();
        assert_eq!(section, ": 1+ years of rust. benefits galore.");
    }

    #[test]
    fn marker_priority_follows_list_order() {
        // "you have" outranks plain "required" even though "required"
        // appears first in the text.
        let text = "Required reading: none. What you have: curiosity and a degree.";
        let section = qualifications_section(text).unwrap();
        assert_eq!(section, ": curiosity and a degree.");
    }

    #[test]
    fn no_marker_means_no_section() {
        assert_eq!(qualifications_section("We are hiring! Great perks."), None);
        assert_eq!(qualifications_section(""), None);
    }

    #[test]
    fn empty_tail_after_marker_is_skipped() {
        assert_eq!(qualifications_section("Just the Required Qualifications"), None);
    }

    #[test]
    fn page_text_is_flattened_and_collapsed() {
        let html = "<html><body><h1>Role</h1><p>You  have:\n Rust &amp; Tokio</p></body></html>";
        let text = html_page_text(html);
        assert_eq!(text, "Role You have: Rust & Tokio");
    }

    #[test]
    fn text_or_list_handles_all_shapes() {
        let many: TextOrList = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(many.first(), Some("a"));
        assert_eq!(many.join(" "), Some("a b".to_string()));

        let one: TextOrList = serde_json::from_str(r#""solo""#).unwrap();
        assert_eq!(one.first(), Some("solo"));

        let absent: TextOrList = serde_json::from_str("null").unwrap();
        assert_eq!(absent.first(), None);
        assert_eq!(absent.join(","), None);
    }
}
