// src/delivery/mod.rs
//! Delivery channels for the combined artifact. A pass only delivers when
//! it found new postings; a channel failure is logged and never aborts the
//! pass or the other channels.

pub mod email;
pub mod webhook;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::counter;
use tracing::{info, warn};

use crate::config::{JobType, RunConfig};
use crate::posting::JobPosting;

/// Everything a channel may want to say about a finished pass.
#[derive(Debug, Clone)]
pub struct RunReport<'a> {
    pub job_type: JobType,
    pub run_date: NaiveDate,
    pub combined_path: &'a Path,
    pub new_postings: &'a [JobPosting],
    /// Display names of the scraped sources, for the email body.
    pub source_names: &'a [String],
}

#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, report: &RunReport<'_>) -> Result<()>;
    /// Channel name for diagnostics/logs.
    fn name(&self) -> &'static str;
}

/// Fan-out over the configured channels.
pub struct DeliveryMux {
    channels: Vec<Box<dyn Deliver>>,
}

impl DeliveryMux {
    pub fn new(channels: Vec<Box<dyn Deliver>>) -> Self {
        Self { channels }
    }

    pub fn empty() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Assemble channels from the environment: email when SMTP settings and
    /// recipients exist, webhook when `NOTIFY_WEBHOOK_URL` is set. A channel
    /// that fails to build is skipped with a warning, not fatal.
    pub fn from_env(cfg: &RunConfig) -> Self {
        let mut channels: Vec<Box<dyn Deliver>> = Vec::new();
        if !cfg.email_to.is_empty() {
            match email::EmailSender::from_env(&cfg.email_to) {
                Ok(sender) => channels.push(Box::new(sender)),
                Err(e) => warn!(error = ?e, "email delivery disabled"),
            }
        }
        if let Ok(url) = std::env::var("NOTIFY_WEBHOOK_URL") {
            if !url.trim().is_empty() {
                channels.push(Box::new(webhook::WebhookNotifier::new(url)));
            }
        }
        Self { channels }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub async fn deliver_all(&self, report: &RunReport<'_>) {
        for ch in &self.channels {
            match ch.deliver(report).await {
                Ok(()) => info!(channel = ch.name(), job_type = %report.job_type, "delivery sent"),
                Err(e) => {
                    warn!(channel = ch.name(), job_type = %report.job_type, error = ?e, "delivery failed");
                    counter!("delivery_errors_total").increment(1);
                }
            }
        }
    }
}
