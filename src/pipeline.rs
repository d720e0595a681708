//! Ingestion pipeline.
//!
//! For each category page: discover article links, skip the ones already
//! stored, extract the rest, summarize and store. Work is strictly sequential
//! with a pause after every fetched article and after every category page, so
//! target sites see at most one request at a time from us.
//!
//! Every per-URL failure becomes a skip for that URL. A category page that
//! cannot be fetched is counted and the run moves on.

use crate::config::PipelineSettings;
use crate::error::{ExtractError, StoreError};
use crate::fetch::Fetcher;
use crate::models::{CategorySource, RunTally, SourceTally, StoredArticle};
use crate::scrapers::article::{Recency, extract_article};
use crate::scrapers::discover::discover_links;
use crate::store::ArticleStore;
use crate::summarize::{Summarize, summarize_or_truncate};
use crate::utils::truncate_for_log;
use chrono::Local;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// What happened to one discovered article URL.
#[derive(Debug)]
pub enum ArticleOutcome {
    Inserted(u64),
    AlreadyStored,
    Rejected(ExtractError),
    StoreFailed(StoreError),
}

/// Owns the fetcher, store and summarizer for the duration of a run.
pub struct Pipeline<S, M> {
    fetcher: Fetcher,
    store: S,
    summarizer: M,
    settings: PipelineSettings,
}

impl<S: ArticleStore, M: Summarize> Pipeline<S, M> {
    /// Assemble a pipeline from its collaborators.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Shared HTTP client for listing and article pages
    /// * `store` - Where accepted articles are persisted
    /// * `summarizer` - Summary backend for non-verbatim categories
    /// * `settings` - Recency window, pacing and limits
    pub fn new(fetcher: Fetcher, store: S, summarizer: M, settings: PipelineSettings) -> Self {
        Self {
            fetcher,
            store,
            summarizer,
            settings,
        }
    }

    /// The article store, for reporting totals after a run.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process every source in order and return the aggregate tally.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn run(&mut self, sources: &[CategorySource]) -> RunTally {
        let mut run = RunTally::default();
        for source in sources {
            match self.process_source(source).await {
                Some(tally) => {
                    info!(
                        url = %source.url,
                        new = tally.new,
                        skipped = tally.skipped,
                        failed = tally.failed,
                        "Category summary"
                    );
                    run += tally;
                }
                None => run.sources_failed += 1,
            }
            sleep(self.settings.source_delay).await;
        }
        info!(
            new = run.new,
            skipped = run.skipped,
            failed = run.failed,
            sources_failed = run.sources_failed,
            "Cycle complete"
        );
        run
    }

    /// Process one category page. Returns `None` when the page itself failed.
    #[instrument(level = "info", skip_all, fields(url = %source.url, category_id = source.category_id))]
    pub async fn process_source(&mut self, source: &CategorySource) -> Option<SourceTally> {
        let listing = match Url::parse(&source.url) {
            Ok(listing) => listing,
            Err(e) => {
                error!(error = %e, "Invalid category page url");
                return None;
            }
        };
        let links =
            match discover_links(&self.fetcher, &listing, self.settings.max_links).await {
                Ok(links) => links,
                Err(e) => {
                    warn!(error = %e, "Category page fetch failed; skipping source");
                    return None;
                }
            };

        let mut tally = SourceTally::default();
        for link in links {
            let outcome = self.process_article(&link, source.category_id).await;
            let fetched = !matches!(outcome, ArticleOutcome::AlreadyStored);
            match outcome {
                ArticleOutcome::Inserted(id) => {
                    debug!(id, "Counted new article");
                    tally.new += 1;
                }
                ArticleOutcome::AlreadyStored => tally.skipped += 1,
                ArticleOutcome::StoreFailed(StoreError::Conflict(_)) => tally.skipped += 1,
                ArticleOutcome::Rejected(e) => {
                    debug!(reason = e.tag(), "Counted rejected article");
                    tally.failed += 1;
                }
                ArticleOutcome::StoreFailed(e) => {
                    debug!(error = %e, "Counted store failure");
                    tally.failed += 1;
                }
            }
            if fetched {
                sleep(self.settings.article_delay).await;
            }
        }
        Some(tally)
    }

    /// Check, extract, summarize and store one article URL.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn process_article(&mut self, url: &str, category_id: i64) -> ArticleOutcome {
        match self.store.exists(url).await {
            Ok(true) => {
                debug!("Already stored");
                return ArticleOutcome::AlreadyStored;
            }
            Ok(false) => {}
            Err(e) => {
                error!(error = %e, "Store lookup failed");
                return ArticleOutcome::StoreFailed(e);
            }
        }

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return ArticleOutcome::Rejected(ExtractError::Fetch(
                    crate::error::FetchError::Network(e.to_string()),
                ));
            }
        };
        let recency = Recency::new(Local::now().naive_local(), self.settings.recency_window);
        let article = match extract_article(&self.fetcher, &parsed, &recency).await {
            Ok(article) => article,
            Err(e) => {
                warn!(reason = e.tag(), error = %e, "Skipping article");
                return ArticleOutcome::Rejected(e);
            }
        };

        let summary = if self.settings.is_verbatim(category_id) {
            article.content.clone()
        } else {
            summarize_or_truncate(&self.summarizer, &article.content, self.settings.summary_max_length)
                .await
        };

        let record = StoredArticle::new(article, summary, category_id);
        match self.store.insert(&record).await {
            Ok(id) => {
                info!(
                    id,
                    title = %truncate_for_log(&record.title, 70),
                    published_at = ?record.published_at,
                    has_image = record.featured_image.is_some(),
                    "Stored new article"
                );
                ArticleOutcome::Inserted(id)
            }
            Err(StoreError::Conflict(existing)) => {
                info!(url = %existing, "Article already stored; counting as skipped");
                ArticleOutcome::StoreFailed(StoreError::Conflict(existing))
            }
            Err(e) => {
                error!(error = %e, "Failed to store article");
                ArticleOutcome::StoreFailed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use std::error::Error;
    use std::time::Duration as StdDuration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedSummary;

    impl Summarize for FixedSummary {
        async fn summarize(&self, _text: &str, _max_length: usize) -> Result<String, Box<dyn Error>> {
            Ok("A short machine written summary of the article.".to_string())
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            article_delay: StdDuration::ZERO,
            source_delay: StdDuration::ZERO,
            ..PipelineSettings::default()
        }
    }

    fn pipeline(store: MemoryStore, settings: PipelineSettings) -> Pipeline<MemoryStore, FixedSummary> {
        let fetcher = Fetcher::new(crate::fetch::DEFAULT_TIMEOUT).unwrap();
        Pipeline::new(fetcher, store, FixedSummary, settings)
    }

    fn article_page(title: &str, published_at: &str) -> String {
        let body: String = (0..4)
            .map(|i| format!("<p>Paragraph {i} of the report describes the rising water in detail.</p>"))
            .collect();
        format!(
            r#"<html><head>
            <meta property="og:title" content="{title}">
            <meta property="article:published_time" content="{published_at}">
            <meta property="og:image" content="/media/lead.jpg">
            </head><body><article>{body}</article></body></html>"#
        )
    }

    fn hours_ago(hours: i64) -> String {
        (Local::now() - Duration::hours(hours))
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string()
    }

    fn fresh() -> String {
        hours_ago(1)
    }

    fn stale() -> String {
        hours_ago(72)
    }

    async fn serve(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    /// A listing page with story cards for the given article paths.
    fn listing_page(paths: &[&str]) -> String {
        let cards: String = paths
            .iter()
            .map(|p| format!(r#"<div class="story-item"><a href="{p}">story</a></div>"#))
            .collect();
        format!("<html><body>{cards}</body></html>")
    }

    #[tokio::test]
    async fn test_run_inserts_fresh_and_skips_known() {
        let server = MockServer::start().await;
        let paths = [
            "/national/politics/budget-passed",
            "/national/weather/flood-warning-issued",
            "/national/economy/old-market-report",
        ];
        serve(&server, "/national", listing_page(&paths)).await;
        serve(&server, paths[0], article_page("Parliament passes the annual budget", &fresh())).await;
        serve(&server, paths[1], article_page("Flood Warning Issued for Coastal Districts", &fresh())).await;
        serve(&server, paths[2], article_page("Old market report nobody reads", &stale())).await;

        let known = format!("{}{}", server.uri(), paths[0]);
        let mut pipeline = pipeline(MemoryStore::with_urls(&[&known]), settings());
        let sources = [CategorySource {
            url: format!("{}/national", server.uri()),
            category_id: 1,
        }];

        let tally = pipeline.run(&sources).await;
        assert_eq!(tally.new, 1);
        assert_eq!(tally.skipped, 1);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.sources_failed, 0);

        let stored = pipeline.store().records.last().unwrap();
        assert_eq!(stored.title, "Flood Warning Issued for Coastal Districts");
        assert_eq!(stored.summary, "A short machine written summary of the article.");
        assert_eq!(stored.category_id, 1);
        assert_eq!(
            stored.featured_image.as_deref(),
            Some(format!("{}/media/lead.jpg", server.uri()).as_str())
        );

        // A second pass finds everything that was inserted already stored.
        let again = pipeline.run(&sources).await;
        assert_eq!(again.new, 0);
        assert_eq!(again.skipped, 2);
        assert_eq!(pipeline.store().records.len(), 2);
    }

    #[tokio::test]
    async fn test_verbatim_category_stores_content_as_summary() {
        let server = MockServer::start().await;
        let paths = ["/local/district/road-crash-kills-three"];
        serve(&server, "/local", listing_page(&paths)).await;
        serve(&server, paths[0], article_page("Road crash kills three in district", &fresh())).await;

        let mut settings = settings();
        settings.verbatim_categories.insert(7);
        let mut pipeline = pipeline(MemoryStore::default(), settings);
        let tally = pipeline
            .run(&[CategorySource {
                url: format!("{}/local", server.uri()),
                category_id: 7,
            }])
            .await;

        assert_eq!(tally.new, 1);
        let stored = &pipeline.store().records[0];
        assert_eq!(stored.summary, stored.content);
    }

    #[tokio::test]
    async fn test_failed_listing_does_not_stop_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let paths = ["/world/asia/summit-ends-in-agreement"];
        serve(&server, "/world", listing_page(&paths)).await;
        serve(&server, paths[0], article_page("Regional summit ends in agreement", &fresh())).await;

        let mut pipeline = pipeline(MemoryStore::default(), settings());
        let tally = pipeline
            .run(&[
                CategorySource {
                    url: format!("{}/broken", server.uri()),
                    category_id: 6,
                },
                CategorySource {
                    url: format!("{}/world", server.uri()),
                    category_id: 6,
                },
            ])
            .await;

        assert_eq!(tally.sources_failed, 1);
        assert_eq!(tally.new, 1);
    }

    #[tokio::test]
    async fn test_article_fetch_error_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone/away/missing-article"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut pipeline = pipeline(MemoryStore::default(), settings());
        let url = format!("{}/gone/away/missing-article", server.uri());
        let outcome = pipeline.process_article(&url, 1).await;
        assert!(matches!(outcome, ArticleOutcome::Rejected(ExtractError::Fetch(_))));
        assert!(pipeline.store().records.is_empty());
    }
}
