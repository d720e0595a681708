//! # Brief Bulletin Scraper
//!
//! Ingests recent news from category listing pages of sites that share no
//! markup convention. Each run:
//!
//! 1. **Discovery**: finds candidate article links on every listing page
//! 2. **Extraction**: fetches each new link and recovers title, publication
//!    date, body text and lead image through ranked fallback heuristics
//! 3. **Filtering**: drops anything older than the recency window
//! 4. **Storage**: summarizes accepted articles and appends them to the store
//!
//! ## Usage
//!
//! ```sh
//! brief_bulletin_scraper --sources sources.yaml --store-dir ./store
//! ```

use clap::Parser;
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod pipeline;
mod scrapers;
mod store;
mod summarize;
mod utils;

use cli::Cli;
use config::{PipelineSettings, SourcesFile};
use fetch::Fetcher;
use pipeline::Pipeline;
use store::JsonlStore;
use summarize::{LlmSummarizer, Retrying, SummaryBackend};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("brief_bulletin_scraper starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let sources = SourcesFile::load(&args.sources).await?;
    let settings = PipelineSettings::from_cli(&args, &sources)?;
    info!(
        recency_hours = settings.recency_window.num_hours(),
        max_links = settings.max_links,
        verbatim = ?settings.verbatim_categories,
        "Pipeline settings"
    );

    // Only setup failures are fatal: an unusable store ends the run here.
    let store = JsonlStore::open(&args.store_dir).await?;
    let fetcher = Fetcher::new(Duration::from_secs(args.timeout_secs))?;

    let summarizer = match &args.summarizer_config {
        Some(config_path) => {
            let client = LlmSummarizer::load(config_path, &args.summarizer_template).await?;
            SummaryBackend::Llm(Retrying::new(
                client,
                args.summarizer_retries,
                Duration::from_secs(1),
            ))
        }
        None => {
            warn!("No summarizer config given; summaries will be truncated article text");
            SummaryBackend::Truncate
        }
    };

    let mut pipeline = Pipeline::new(fetcher, store, summarizer, settings);

    loop {
        let start_time = Instant::now();
        let tally = pipeline.run(&sources.sources).await;
        let elapsed = start_time.elapsed();
        info!(
            new = tally.new,
            skipped = tally.skipped,
            failed = tally.failed,
            sources_failed = tally.sources_failed,
            stored_total = pipeline.store().len(),
            secs = elapsed.as_secs(),
            "Run complete"
        );

        match args.interval_secs {
            Some(secs) => {
                info!(wait_secs = secs, "Waiting before next cycle");
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }
            None => break,
        }
    }

    Ok(())
}
