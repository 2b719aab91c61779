// src/config.rs
//! Run configuration: job-type categories, venture board roster, scrape
//! tuning, and the per-pass resolved [`RunConfig`].
//!
//! Everything here is plain data loaded from TOML. Secrets (SMTP, oracle
//! key, webhook URL) never live in the file; they come from the environment.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/gradscout.toml";
pub const ENV_CONFIG_PATH: &str = "GRADSCOUT_CONFIG_PATH";

/// The two job-type categories a run can scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    Cs,
    Ds,
}

impl JobType {
    /// Short code used in directory and file names (`CS2024-12-06/...`).
    pub fn code(&self) -> &'static str {
        match self {
            JobType::Cs => "CS",
            JobType::Ds => "DS",
        }
    }

    /// Human-facing category name for email subjects and logs.
    pub fn label(&self) -> &'static str {
        match self {
            JobType::Cs => "Software Engineering",
            JobType::Ds => "Data Scientist/Analyst",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Stable lowercase identifier derived from a source name, used in
/// artifact file names ("Y Combinator" -> "ycombinator").
pub fn source_slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub categories: Categories,
    /// Venture job boards sharing the common search API. An empty list in
    /// the TOML disables the venture adapters entirely.
    #[serde(default = "default_boards")]
    pub boards: Vec<VentureBoard>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            scrape: ScrapeConfig::default(),
            categories: Categories::default(),
            boards: default_boards(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Trailing recency window applied to search queries and date filters.
    pub posted_since_days: i64,
    /// Page size requested from the venture search API.
    pub venture_page_size: u32,
    /// Page size requested from the big-company search APIs.
    pub company_page_size: u32,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            posted_since_days: 7,
            venture_page_size: 100,
            company_page_size: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Categories {
    pub cs: CategoryConfig,
    pub ds: CategoryConfig,
}

impl Default for Categories {
    fn default() -> Self {
        Self {
            cs: CategoryConfig::cs_default(),
            ds: CategoryConfig::ds_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    /// Query terms sent to the boards and echoed into the oracle prompt.
    pub job_type_keywords: Vec<String>,
    /// Title keywords that disqualify a posting at aggregation time.
    pub exclusion_keywords: Vec<String>,
    /// Oracle model id used for this category.
    pub llm_model: String,
    /// Recipients for the combined-artifact email. Empty disables email.
    #[serde(default)]
    pub email_to: Vec<String>,
}

impl CategoryConfig {
    pub fn cs_default() -> Self {
        Self {
            job_type_keywords: vec!["software-engineer".into()],
            exclusion_keywords: ["Sr.", "Staff", "Principal", "lead", "Senior", "intern", "india"]
                .map(String::from)
                .to_vec(),
            llm_model: "llama-3.1-8b-instant".into(),
            email_to: Vec::new(),
        }
    }

    pub fn ds_default() -> Self {
        Self {
            job_type_keywords: vec![
                "data-scientist".into(),
                "data-analyst".into(),
                "Analyst".into(),
            ],
            exclusion_keywords: [
                "Sr.", "Sr", "Staff", "Principal", "lead", "Senior", "PHD", "intern", "india",
            ]
            .map(String::from)
            .to_vec(),
            llm_model: "llama3-8b-8192".into(),
            email_to: Vec::new(),
        }
    }
}

/// One venture job board behind the shared search API.
#[derive(Debug, Clone, Deserialize)]
pub struct VentureBoard {
    pub name: String,
    /// Search endpoint, e.g. `https://jobs.example.vc/api-boards/search-jobs`.
    pub url: String,
    /// Board id sent in the search payload (`"board": {"id": ...}`).
    pub board_id: String,
    /// Grouped boards return parent companies with nested job arrays.
    #[serde(default)]
    pub grouped: bool,
}

fn default_boards() -> Vec<VentureBoard> {
    vec![
        VentureBoard {
            name: "Sequoia".into(),
            url: "https://jobs.sequoiacap.com/api-boards/search-jobs".into(),
            board_id: "sequoia-capital".into(),
            grouped: true,
        },
        VentureBoard {
            name: "NextView".into(),
            url: "https://jobs.nextview.vc/api-boards/search-jobs".into(),
            board_id: "nextview-ventures".into(),
            grouped: false,
        },
        VentureBoard {
            name: "Greylock".into(),
            url: "https://jobs.greylock.com/api-boards/search-jobs".into(),
            board_id: "greylock-partners".into(),
            grouped: false,
        },
        VentureBoard {
            name: "Andreessen Horowitz".into(),
            url: "https://jobs.a16z.com/api-boards/search-jobs".into(),
            board_id: "andreessen-horowitz".into(),
            grouped: false,
        },
    ]
}

impl FileConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let cfg: FileConfig = toml::from_str(toml_str).context("parsing gradscout config")?;
        Ok(cfg)
    }

    /// Load config using explicit path > env var > default path. A missing
    /// default file is not an error; built-in defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path");
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn category(&self, job_type: JobType) -> &CategoryConfig {
        match job_type {
            JobType::Cs => &self.categories.cs,
            JobType::Ds => &self.categories.ds,
        }
    }
}

/* ----------------------------
Resolved per-pass configuration
---------------------------- */

/// Everything one category pass needs, resolved up front and immutable for
/// the duration of the pass.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub job_type: JobType,
    pub job_type_keywords: Vec<String>,
    pub exclusion_keywords: Vec<String>,
    pub llm_model: String,
    pub email_to: Vec<String>,
    pub boards: Vec<VentureBoard>,
    pub posted_since_days: i64,
    pub venture_page_size: u32,
    pub company_page_size: u32,
    /// Root of all artifacts; the history ledger lives directly under it.
    pub data_dir: PathBuf,
    /// Fixture-backed sources, no outbound calls. Delivery stays off.
    pub offline: bool,
}

impl RunConfig {
    pub fn resolve(job_type: JobType, file: &FileConfig, data_dir: &Path, offline: bool) -> Self {
        let cat = file.category(job_type);
        Self {
            job_type,
            job_type_keywords: cat.job_type_keywords.clone(),
            exclusion_keywords: cat.exclusion_keywords.clone(),
            llm_model: cat.llm_model.clone(),
            email_to: cat.email_to.clone(),
            boards: file.boards.clone(),
            posted_since_days: file.scrape.posted_since_days,
            venture_page_size: file.scrape.venture_page_size,
            company_page_size: file.scrape.company_page_size,
            data_dir: data_dir.to_path_buf(),
            offline,
        }
    }

    /// Source display names in scrape order. The adapter roster built by the
    /// pipeline and the artifact file names both derive from this list.
    /// Offline runs exercise a single venture board against fixtures.
    pub fn source_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.job_type == JobType::Cs {
            names.push("Y Combinator".to_string());
        }
        if self.offline {
            if let Some(b) = self.boards.first() {
                names.push(b.name.clone());
            }
        } else {
            for b in &self.boards {
                names.push(b.name.clone());
            }
        }
        names.push("Microsoft".to_string());
        names.push("Amazon".to_string());
        names
    }

    /// Slugs for [`RunConfig::source_names`], in the same order.
    pub fn expected_sources(&self) -> Vec<String> {
        self.source_names().iter().map(|n| source_slug(n)).collect()
    }

    /// Resolve the artifact paths for a given run day.
    pub fn paths_for(&self, today: NaiveDate) -> RunPaths {
        let code = self.job_type.code();
        let dir = self.data_dir.join(format!("{code}{today}"));
        let per_source = self
            .expected_sources()
            .iter()
            .map(|slug| per_source_file(&dir, code, slug, today))
            .collect();
        let combined = dir.join(format!("{code}combined_jobs_{today}.csv"));
        RunPaths {
            code,
            date: today,
            dir,
            per_source,
            combined,
        }
    }
}

fn per_source_file(dir: &Path, code: &str, slug: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{code}{slug}_jobs_{date}.csv"))
}

/// Per-run artifact layout under `<data_dir>/<CODE><date>/`.
#[derive(Debug, Clone)]
pub struct RunPaths {
    code: &'static str,
    date: NaiveDate,
    pub dir: PathBuf,
    pub per_source: Vec<PathBuf>,
    pub combined: PathBuf,
}

impl RunPaths {
    /// Artifact path for one source slug.
    pub fn source_path(&self, slug: &str) -> PathBuf {
        per_source_file(&self.dir, self.code, slug, self.date)
    }

    /// True when every per-source artifact is already on disk, meaning the
    /// scrape phase for this day has run before and can be skipped.
    pub fn all_sources_present(&self) -> bool {
        !self.per_source.is_empty() && self.per_source.iter().all(|p| p.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_both_categories() {
        let cfg = FileConfig::default();
        assert_eq!(cfg.categories.cs.job_type_keywords, vec!["software-engineer"]);
        assert_eq!(cfg.categories.ds.llm_model, "llama3-8b-8192");
        assert!(cfg
            .categories
            .ds
            .exclusion_keywords
            .contains(&"PHD".to_string()));
        assert_eq!(cfg.boards.len(), 4);
        assert!(cfg.boards[0].grouped);
        assert_eq!(cfg.scrape.posted_since_days, 7);
    }

    #[test]
    fn toml_overrides_defaults() {
        let toml = r#"
            [scrape]
            posted_since_days = 3
            venture_page_size = 10
            company_page_size = 5

            [categories.cs]
            job_type_keywords = ["backend-engineer"]
            exclusion_keywords = ["Senior"]
            llm_model = "test-model"
            email_to = ["jobs@example.com"]

            [[boards]]
            name = "Acme"
            url = "https://jobs.acme.vc/api-boards/search-jobs"
            board_id = "acme-ventures"
        "#;
        let cfg = FileConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.scrape.posted_since_days, 3);
        assert_eq!(cfg.boards.len(), 1);
        assert!(!cfg.boards[0].grouped);
        assert_eq!(cfg.categories.cs.llm_model, "test-model");
        // DS section untouched, keeps its defaults.
        assert_eq!(cfg.categories.ds.job_type_keywords.len(), 3);
    }

    #[test]
    fn slugs_strip_non_alphanumerics() {
        assert_eq!(source_slug("Y Combinator"), "ycombinator");
        assert_eq!(source_slug("Andreessen Horowitz"), "andreessenhorowitz");
        assert_eq!(source_slug("Sequoia"), "sequoia");
    }

    #[test]
    fn paths_follow_the_run_layout() {
        let cfg = RunConfig::resolve(
            JobType::Cs,
            &FileConfig::default(),
            Path::new("/tmp/gradscout-data"),
            false,
        );
        let today = NaiveDate::from_ymd_opt(2024, 12, 6).unwrap();
        let paths = cfg.paths_for(today);
        assert_eq!(
            paths.dir,
            PathBuf::from("/tmp/gradscout-data/CS2024-12-06")
        );
        // ycombinator first, boards in order, then the company adapters.
        assert_eq!(paths.per_source.len(), 7);
        assert_eq!(
            paths.per_source[0],
            paths.dir.join("CSycombinator_jobs_2024-12-06.csv")
        );
        assert_eq!(
            paths.combined,
            paths.dir.join("CScombined_jobs_2024-12-06.csv")
        );
        assert_eq!(
            paths.source_path("amazon"),
            paths.dir.join("CSamazon_jobs_2024-12-06.csv")
        );

        // DS pass has no supplemental scrape source.
        let ds = RunConfig::resolve(
            JobType::Ds,
            &FileConfig::default(),
            Path::new("/tmp/gradscout-data"),
            false,
        );
        assert_eq!(ds.expected_sources().first().map(String::as_str), Some("sequoia"));
    }

    #[test]
    fn offline_roster_keeps_one_board() {
        let cfg = RunConfig::resolve(
            JobType::Cs,
            &FileConfig::default(),
            Path::new("/tmp/gradscout-data"),
            true,
        );
        assert_eq!(
            cfg.expected_sources(),
            vec!["ycombinator", "sequoia", "microsoft", "amazon"]
        );
        assert_eq!(cfg.source_names()[0], "Y Combinator");
    }
}
