//! Error types for fetching, extraction and storage.
//!
//! Every per-URL failure is one of these values. The pipeline converts them
//! into a skip for that URL and keeps going; nothing here aborts a run.

use reqwest::StatusCode;
use thiserror::Error;

/// Network or HTTP failure while fetching a page.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("http error {status}")]
    Http { status: StatusCode },

    #[error("network error: {0}")]
    Network(String),

    #[error("http client setup failed: {0}")]
    Client(String),
}

impl FetchError {
    /// Classify a `reqwest` error as timeout, HTTP status, client setup or
    /// plain network failure.
    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Http { status }
        } else if err.is_builder() {
            Self::Client(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Why an article page did not produce a complete record.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("no title of sufficient length")]
    NoTitle,

    #[error("no publication date found")]
    NoDate,

    #[error("article is {age_hours:.1} hours old")]
    StaleArticle { age_hours: f64 },

    #[error("no body text of sufficient length")]
    NoContent,
}

impl ExtractError {
    /// Short stable tag used in log fields.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch-error",
            Self::NoTitle => "no-title",
            Self::NoDate => "no-date",
            Self::StaleArticle { .. } => "stale-article",
            Self::NoContent => "no-content",
        }
    }
}

/// Failure reading or writing the article store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An article with this source URL is already stored.
    #[error("article already stored: {0}")]
    Conflict(String),

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded.
    #[error("store record error: {0}")]
    Serde(#[from] serde_json::Error),
}
