//! Data models for sources, extracted articles and stored records.
//!
//! - [`CategorySource`]: a listing page and the category its articles belong to
//! - [`ExtractedArticle`]: a complete article recovered from one page
//! - [`StoredArticle`]: what the store persists, including the summary
//! - [`SourceTally`] / [`RunTally`]: per-source and per-run counters

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// A listing page and the category id assigned to every article found on it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategorySource {
    pub url: String,
    pub category_id: i64,
}

/// A fully extracted article.
///
/// Only ever built when title and content both pass their length gates;
/// extraction never hands out a partial record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedArticle {
    pub title: String,
    pub content: String,
    /// Absolute URL of the lead image, when one was found.
    pub featured_image: Option<String>,
    /// Publication time with its offset discarded.
    pub published_at: Option<NaiveDateTime>,
    pub source_url: String,
}

/// Publication state written alongside each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Published,
}

/// A record as handed to the article store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredArticle {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub category_id: i64,
    pub status: ArticleStatus,
    pub published_at: Option<NaiveDateTime>,
    pub source_url: String,
}

impl StoredArticle {
    /// Build the stored form of `article`, marked as published.
    ///
    /// # Arguments
    ///
    /// * `article` - The extracted article
    /// * `summary` - Generated summary, or the full content for verbatim categories
    /// * `category_id` - Category of the listing page the link came from
    pub fn new(article: ExtractedArticle, summary: String, category_id: i64) -> Self {
        Self {
            title: article.title,
            summary,
            content: article.content,
            featured_image: article.featured_image,
            category_id,
            status: ArticleStatus::Published,
            published_at: article.published_at,
            source_url: article.source_url,
        }
    }
}

/// Outcome counts for one listing page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourceTally {
    /// Articles inserted into the store.
    pub new: usize,
    /// Articles already present in the store.
    pub skipped: usize,
    /// Articles that failed extraction or could not be stored.
    pub failed: usize,
}

/// Outcome counts for a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunTally {
    pub new: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Listing pages that could not be fetched.
    pub sources_failed: usize,
}

impl AddAssign<SourceTally> for RunTally {
    fn add_assign(&mut self, source: SourceTally) {
        self.new += source.new;
        self.skipped += source.skipped;
        self.failed += source.failed;
    }
}
