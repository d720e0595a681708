//! Article summarization.
//!
//! Summaries come from an OpenAI-compatible chat endpoint (through `awful_aj`)
//! when one is configured, otherwise from plain truncation. Either way the
//! pipeline calls [`summarize_or_truncate`], which bounds the input, enforces
//! a minimum summary length and falls back to truncation on any failure.
//!
//! - [`Summarize`]: the summarization collaborator
//! - [`LlmSummarizer`]: chat-template client for the LLM endpoint
//! - [`Retrying`]: exponential backoff with jitter around any [`Summarize`]
//! - [`SummaryBackend`]: the backend chosen at startup

use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Default summary length handed to the summarizer.
pub const DEFAULT_MAX_LENGTH: usize = 150;
/// Texts shorter than this are not worth summarizing.
const MIN_SUMMARIZABLE_CHARS: usize = 100;
/// The summarizer never sees more than this many characters.
const MAX_INPUT_CHARS: usize = 2000;
/// Summaries shorter than this are treated as failures.
const MIN_SUMMARY_CHARS: usize = 30;
/// Length of the truncation fallback, before the ellipsis.
const FALLBACK_CHARS: usize = 200;

/// Produces a short summary of article text.
pub trait Summarize {
    async fn summarize(&self, text: &str, max_length: usize) -> Result<String, Box<dyn Error>>;
}

/// First `n` characters of `text`.
pub fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The truncation fallback: first 200 characters plus an ellipsis when cut.
pub fn naive_summary(text: &str) -> String {
    if text.chars().count() > FALLBACK_CHARS {
        format!("{}...", take_chars(text, FALLBACK_CHARS))
    } else {
        text.to_string()
    }
}

/// Summarize `text`, falling back to truncation if the summarizer fails.
#[instrument(level = "info", skip_all, fields(chars = text.chars().count()))]
pub async fn summarize_or_truncate<S: Summarize>(
    summarizer: &S,
    text: &str,
    max_length: usize,
) -> String {
    if text.chars().count() < MIN_SUMMARIZABLE_CHARS {
        return take_chars(text, FALLBACK_CHARS).to_string();
    }
    let input = take_chars(text, MAX_INPUT_CHARS);
    match summarizer.summarize(input, max_length).await {
        Ok(summary) if summary.trim().chars().count() >= MIN_SUMMARY_CHARS => {
            summary.trim().to_string()
        }
        Ok(summary) => {
            warn!(chars = summary.trim().chars().count(), "Summary too short; using truncation");
            naive_summary(text)
        }
        Err(e) => {
            warn!(error = %e, "Summarization failed; using truncation");
            naive_summary(text)
        }
    }
}

/// Client for an OpenAI-compatible endpoint driven by a chat template.
pub struct LlmSummarizer {
    config: AwfulJadeConfig,
    template: ChatTemplate,
}

impl fmt::Debug for LlmSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSummarizer").finish_non_exhaustive()
    }
}

impl LlmSummarizer {
    /// Load the client config file and the named chat template.
    pub async fn load(config_path: &str, template_name: &str) -> Result<Self, Box<dyn Error>> {
        let config = awful_aj::config::load_config(config_path)
            .map_err(|e| format!("failed to load summarizer config {config_path}: {e}"))?;
        let template = awful_aj::template::load_template(template_name).await?;
        info!(config_path, template_name, "Loaded summarizer");
        Ok(Self { config, template })
    }
}

impl Summarize for LlmSummarizer {
    #[instrument(level = "info", skip_all)]
    async fn summarize(&self, text: &str, max_length: usize) -> Result<String, Box<dyn Error>> {
        let prompt = format!(
            "Summarize the following news article in at most {max_length} words.\n\n{text}"
        );
        let t0 = Instant::now();
        let res = ask(&self.config, prompt, &self.template, None, None).await;
        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "Summarizer call failed");
        }
        res
    }
}

/// Adds exponential backoff with jitter to any [`Summarize`] implementation.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct Retrying<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> Retrying<T> {
    /// Wrap `inner` with retries.
    ///
    /// # Arguments
    ///
    /// * `inner` - The summarizer to retry
    /// * `max_retries` - Retries after the first failed call
    /// * `base_delay` - Delay before the first retry; doubles per attempt up to 30s
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn delay_for(&self, attempt: usize) -> StdDuration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        self.base_delay.saturating_mul(1 << shift).min(self.max_delay)
    }
}

impl<T> fmt::Debug for Retrying<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: Summarize> Summarize for Retrying<T> {
    #[instrument(level = "info", skip_all)]
    async fn summarize(&self, text: &str, max_length: usize) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.summarize(text, max_length).await {
                Ok(summary) => return Ok(summary),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis(),
                            error = %e,
                            "summarize() exhausted retries"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.delay_for(attempt) + StdDuration::from_millis(jitter_ms);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "summarize() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Summarization backend selected at startup.
#[derive(Debug)]
pub enum SummaryBackend {
    Llm(Retrying<LlmSummarizer>),
    Truncate,
}

impl Summarize for SummaryBackend {
    async fn summarize(&self, text: &str, max_length: usize) -> Result<String, Box<dyn Error>> {
        match self {
            Self::Llm(client) => client.summarize(text, max_length).await,
            Self::Truncate => Ok(naive_summary(text)),
        }
    }
}
