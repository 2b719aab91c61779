//! gradscout — Binary Entrypoint
//! Batch pipeline: scrape the configured job boards, screen postings with an
//! LLM oracle, dedup against the history ledger and deliver the day's new
//! findings.
//!
//! See `README.md` for quickstart.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gradscout::config::FileConfig;
use gradscout::pipeline::run_all;
use gradscout::JobType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Category {
    Cs,
    Ds,
    All,
}

impl Category {
    fn job_types(self) -> Vec<JobType> {
        match self {
            Category::Cs => vec![JobType::Cs],
            Category::Ds => vec![JobType::Ds],
            // DS first, matching the nightly schedule.
            Category::All => vec![JobType::Ds, JobType::Cs],
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "gradscout", version, about = "New-grad job posting aggregator")]
struct Cli {
    /// Job category to scrape.
    #[arg(long, value_enum, default_value_t = Category::All)]
    category: Category,

    /// TOML config path. Falls back to GRADSCOUT_CONFIG_PATH, then the
    /// default config file, then built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root directory for run artifacts and the history ledgers.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Run against bundled fixtures instead of the network. The oracle is
    /// scripted and delivery stays off.
    #[arg(long)]
    offline: bool,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gradscout=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let file_cfg = match FileConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "failed to load config");
            return ExitCode::FAILURE;
        }
    };

    let categories = cli.category.job_types();
    let results = run_all(&categories, &file_cfg, &cli.data_dir, cli.offline).await;
    if results.iter().any(|(_, r)| r.is_err()) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
