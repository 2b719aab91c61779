//! Relevance classifier: oracle abstraction + the yes/no gate.
//!
//! Every scraped posting is summarized into a context string and put to a
//! chat-completion oracle as a single closed question. The answer is reduced
//! to a boolean by substring check; an oracle failure rejects the posting
//! rather than aborting the scrape.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Chat-completion oracle answering one prompt with free-form text.
pub trait Oracle: Send + Sync {
    fn answer<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
    /// Oracle name for diagnostics/logs.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynOracle = Arc<dyn Oracle>;

/// The classifier owns the per-category prompt inputs and the oracle handle.
#[derive(Clone)]
pub struct Classifier {
    oracle: DynOracle,
    model: String,
    job_type_keywords: Vec<String>,
}

impl Classifier {
    pub fn new(oracle: DynOracle, model: impl Into<String>, job_type_keywords: Vec<String>) -> Self {
        Self {
            oracle,
            model: model.into(),
            job_type_keywords,
        }
    }

    /// Ask the oracle whether a posting described by `context` fits the
    /// category. Errors are logged and counted, never propagated: a posting
    /// the oracle could not judge is treated as not relevant.
    pub async fn classify(&self, context: &str) -> bool {
        let prompt = build_prompt(context, &self.job_type_keywords);
        match self.oracle.answer(&prompt, &self.model).await {
            Ok(answer) => {
                let fit = is_affirmative(&answer);
                debug!(
                    target: "classify",
                    oracle = self.oracle.name(),
                    id = %anon_hash(context),
                    fit,
                    "oracle verdict"
                );
                fit
            }
            Err(e) => {
                warn!(
                    target: "classify",
                    oracle = self.oracle.name(),
                    id = %anon_hash(context),
                    error = ?e,
                    "oracle call failed; rejecting posting"
                );
                counter!("classify_oracle_errors_total").increment(1);
                false
            }
        }
    }
}

/// Build the single closed question sent to the oracle.
pub fn build_prompt(context: &str, job_type_keywords: &[String]) -> String {
    format!(
        "Check the job posting: {} and tell me if it is meant for NEW GRADS \
         or requires 2 or fewer years of experience, is Full Time, is in the \
         USA only, and fits one of: {}. If it fits all of these answer Yes, \
         otherwise answer No. Answer with exactly one word: Yes or No.",
        context,
        job_type_keywords.join(", ")
    )
}

/// Affirmative when the answer contains "yes" in any casing, so chatty
/// replies like "Yes, this fits the criteria." still count.
pub fn is_affirmative(answer: &str) -> bool {
    answer.to_ascii_lowercase().contains("yes")
}

/// Short stable hash for logging without quoting posting text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

// ------------------------------------------------------------
// Concrete oracles
// ------------------------------------------------------------

/// Groq chat-completions oracle. Requires `GROQ_API_KEY`.
pub struct GroqOracle {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

const GROQ_CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

impl GroqOracle {
    /// Build from the environment. Fails when the key is absent so a pass
    /// without classification credentials fails up front instead of
    /// silently rejecting everything.
    pub fn from_env(http: reqwest::Client) -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY").context("GROQ_API_KEY is not set")?;
        if api_key.trim().is_empty() {
            bail!("GROQ_API_KEY is empty");
        }
        Ok(Self {
            http,
            api_key,
            endpoint: GROQ_CHAT_COMPLETIONS_URL.to_string(),
        })
    }

    /// Point the oracle at a different endpoint (tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Oracle for GroqOracle {
    fn answer<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let req = Req {
                model,
                messages: vec![Msg {
                    role: "user",
                    content: prompt,
                }],
            };

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .context("sending oracle request")?;

            let status = resp.status();
            if !status.is_success() {
                bail!("oracle returned {status}");
            }
            let body: Resp = resp.json().await.context("decoding oracle response")?;
            let content = body
                .choices
                .first()
                .map(|c| c.message.content.trim().to_string())
                .unwrap_or_default();
            if content.is_empty() {
                bail!("oracle returned an empty answer");
            }
            Ok(content)
        })
    }

    fn name(&self) -> &'static str {
        "groq"
    }
}

/// Deterministic oracle for tests and offline runs: pops scripted answers,
/// then keeps returning the fallback.
pub struct ScriptedOracle {
    script: Mutex<VecDeque<String>>,
    fallback: String,
}

impl ScriptedOracle {
    pub fn fixed(answer: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: answer.to_string(),
        }
    }

    pub fn with_script<I, S>(answers: I, fallback: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(answers.into_iter().map(Into::into).collect()),
            fallback: fallback.to_string(),
        }
    }
}

impl Oracle for ScriptedOracle {
    fn answer<'a>(
        &'a self,
        _prompt: &'a str,
        _model: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        let next = self
            .script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(async move { Ok(next) })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Always errors; exercises the reject-on-failure path.
pub struct FailingOracle;

impl Oracle for FailingOracle {
    fn answer<'a>(
        &'a self,
        _prompt: &'a str,
        _model: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async { Err(anyhow!("oracle unavailable")) })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmative_is_a_substring_check() {
        assert!(is_affirmative("Yes"));
        assert!(is_affirmative("yes."));
        assert!(is_affirmative("Yes, this fits the criteria."));
        assert!(!is_affirmative("No"));
        assert!(!is_affirmative("maybe"));
        assert!(!is_affirmative(""));
    }

    #[test]
    fn prompt_carries_context_and_keywords() {
        let p = build_prompt(
            "Rust Engineer at Acme, Boston, MA",
            &["software-engineer".to_string()],
        );
        assert!(p.contains("Rust Engineer at Acme"));
        assert!(p.contains("software-engineer"));
        assert!(p.contains("Yes or No"));
    }

    #[tokio::test]
    async fn scripted_answers_then_fallback() {
        let oracle = ScriptedOracle::with_script(["No", "Yes"], "No");
        assert_eq!(oracle.answer("p", "m").await.unwrap(), "No");
        assert_eq!(oracle.answer("p", "m").await.unwrap(), "Yes");
        assert_eq!(oracle.answer("p", "m").await.unwrap(), "No");
    }

    #[tokio::test]
    async fn classifier_maps_answers_to_booleans() {
        let c = Classifier::new(
            Arc::new(ScriptedOracle::with_script(
                ["Yes, this fits the criteria.", "No", "maybe"],
                "No",
            )),
            "test-model",
            vec!["software-engineer".to_string()],
        );
        assert!(c.classify("posting a").await);
        assert!(!c.classify("posting b").await);
        assert!(!c.classify("posting c").await);
    }

    #[tokio::test]
    async fn oracle_failure_rejects_the_posting() {
        let c = Classifier::new(
            Arc::new(FailingOracle),
            "test-model",
            vec!["software-engineer".to_string()],
        );
        assert!(!c.classify("any posting").await);
    }
}
