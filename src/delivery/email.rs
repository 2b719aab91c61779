// src/delivery/email.rs
//! SMTP delivery. Sends the combined CSV as an attachment with a short
//! plain-text summary. Credentials come from the environment; a missing
//! variable disables the channel rather than failing the pass.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Deliver, RunReport};

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailSender {
    /// Reads `SMTP_HOST`, `SMTP_USER`, `SMTP_PASS` and `NOTIFY_EMAIL_FROM`.
    /// Recipients come from config.
    pub fn from_env(recipients: &[String]) -> Result<Self> {
        if recipients.is_empty() {
            bail!("no email recipients configured");
        }
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST not set")?;
        let user = std::env::var("SMTP_USER").context("SMTP_USER not set")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS not set")?;
        let from_addr = std::env::var("NOTIFY_EMAIL_FROM").context("NOTIFY_EMAIL_FROM not set")?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(Credentials::new(user, pass))
            .build();
        let from: Mailbox = from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?;
        let to = recipients
            .iter()
            .map(|r| {
                r.parse::<Mailbox>()
                    .with_context(|| format!("invalid email recipient {r:?}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { mailer, from, to })
    }
}

#[async_trait]
impl Deliver for EmailSender {
    async fn deliver(&self, report: &RunReport<'_>) -> Result<()> {
        let csv_bytes = tokio::fs::read(report.combined_path)
            .await
            .with_context(|| format!("reading {}", report.combined_path.display()))?;
        let filename = report
            .combined_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "combined_jobs.csv".to_string());
        let attachment = Attachment::new(filename).body(
            csv_bytes,
            ContentType::parse("application/octet-stream").context("attachment content type")?,
        );

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject_line(report));
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }
        let message = builder
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body_text(report)),
                    )
                    .singlepart(attachment),
            )
            .context("building email message")?;

        self.mailer.send(message).await.context("sending email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

fn subject_line(report: &RunReport<'_>) -> String {
    format!("{} Job Scraping Results", report.job_type.label())
}

fn body_text(report: &RunReport<'_>) -> String {
    format!(
        "Attached are {new} new job listings scraped on {date} from {sources}.\n\
         Search criteria: {criteria}, 0-2 years of experience, USA.\n\
         Keep in mind the LLM screening can be wrong, so double check the list.\n\
         Thanks!\n",
        new = report.new_postings.len(),
        date = report.run_date,
        sources = report.source_names.join(", "),
        criteria = report.job_type.label().to_lowercase(),
    )
}
