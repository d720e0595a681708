//! Source list and pipeline settings.
//!
//! The source list is a YAML file mapping listing pages to category ids:
//!
//! ```yaml
//! verbatim_categories: [7]
//! sources:
//!   - url: https://www.thedailystar.net/news/bangladesh
//!     category_id: 1
//! ```

use crate::cli::Cli;
use crate::models::CategorySource;
use chrono::TimeDelta;
use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// Contents of the sources file.
#[derive(Debug, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<CategorySource>,
    /// Categories whose full content is stored as the summary.
    #[serde(default)]
    pub verbatim_categories: Vec<i64>,
}

impl SourcesFile {
    /// Parse a sources file and check that every listing URL parses.
    ///
    /// # Arguments
    ///
    /// * `yaml` - Contents of the sources file
    ///
    /// # Returns
    ///
    /// The source list in file order, or an error naming the first bad URL.
    pub fn from_yaml(yaml: &str) -> Result<Self, Box<dyn Error>> {
        let file: SourcesFile = serde_yaml::from_str(yaml)?;
        for source in &file.sources {
            Url::parse(&source.url)
                .map_err(|e| format!("invalid source url {}: {e}", source.url))?;
        }
        Ok(file)
    }

    /// Read and parse the sources file at `path`.
    #[instrument(level = "info")]
    pub async fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("failed to read sources file {path}: {e}"))?;
        let file = Self::from_yaml(&yaml)?;
        info!(count = file.sources.len(), "Loaded sources");
        Ok(file)
    }
}

/// Knobs consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Maximum article age.
    pub recency_window: TimeDelta,
    /// Pause after each fetched article.
    pub article_delay: Duration,
    /// Pause after each listing page.
    pub source_delay: Duration,
    /// Cap on article links taken from one listing page.
    pub max_links: usize,
    /// Length hint handed to the summarizer.
    pub summary_max_length: usize,
    /// Categories whose full content is stored as the summary.
    pub verbatim_categories: HashSet<i64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            recency_window: TimeDelta::hours(24),
            article_delay: Duration::from_secs(3),
            source_delay: Duration::from_secs(10),
            max_links: crate::scrapers::discover::MAX_LINKS,
            summary_max_length: crate::summarize::DEFAULT_MAX_LENGTH,
            verbatim_categories: HashSet::new(),
        }
    }
}

impl PipelineSettings {
    /// Merge CLI flags with the sources file. Verbatim categories are unioned.
    ///
    /// # Errors
    ///
    /// Returns an error when `--recency-hours` is not a positive number of
    /// hours that fits a [`TimeDelta`].
    pub fn from_cli(cli: &Cli, sources: &SourcesFile) -> Result<Self, Box<dyn Error>> {
        let recency_window = TimeDelta::try_hours(cli.recency_hours)
            .filter(|window| *window > TimeDelta::zero())
            .ok_or_else(|| {
                format!(
                    "--recency-hours must be a positive number of hours, got {}",
                    cli.recency_hours
                )
            })?;
        Ok(Self {
            recency_window,
            article_delay: Duration::from_secs(cli.article_delay_secs),
            source_delay: Duration::from_secs(cli.source_delay_secs),
            max_links: cli.max_links,
            summary_max_length: cli.summary_max_length,
            verbatim_categories: sources
                .verbatim_categories
                .iter()
                .chain(cli.verbatim_category.iter())
                .copied()
                .collect(),
        })
    }

    /// Whether articles in `category_id` skip summarization.
    pub fn is_verbatim(&self, category_id: i64) -> bool {
        self.verbatim_categories.contains(&category_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const YAML: &str = r#"
verbatim_categories: [7]
sources:
  - url: https://www.prothomalo.com
    category_id: 7
  - url: https://www.bbc.com/news
    category_id: 6
"#;

    #[test]
    fn test_sources_from_yaml_preserves_order() {
        let file = SourcesFile::from_yaml(YAML).unwrap();
        assert_eq!(file.sources.len(), 2);
        assert_eq!(file.sources[0].url, "https://www.prothomalo.com");
        assert_eq!(file.sources[1].category_id, 6);
        assert_eq!(file.verbatim_categories, vec![7]);
    }

    #[test]
    fn test_verbatim_categories_default_empty() {
        let file = SourcesFile::from_yaml("sources: []").unwrap();
        assert!(file.verbatim_categories.is_empty());
    }

    #[test]
    fn test_invalid_source_url_rejected() {
        let yaml = "sources:\n  - url: not a url\n    category_id: 1\n";
        assert!(SourcesFile::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_settings_merge_cli_and_file() {
        let cli = Cli::parse_from([
            "brief_bulletin_scraper",
            "--sources",
            "sources.yaml",
            "--store-dir",
            "./store",
            "--verbatim-category",
            "3",
            "--recency-hours",
            "12",
        ]);
        let file = SourcesFile::from_yaml(YAML).unwrap();
        let settings = PipelineSettings::from_cli(&cli, &file).unwrap();
        assert!(settings.is_verbatim(7));
        assert!(settings.is_verbatim(3));
        assert!(!settings.is_verbatim(6));
        assert_eq!(settings.recency_window, TimeDelta::hours(12));
        assert_eq!(settings.article_delay, Duration::from_secs(3));
        assert_eq!(settings.max_links, 50);
    }

    fn cli_with_recency(hours: &str) -> Cli {
        Cli::parse_from([
            "brief_bulletin_scraper".to_string(),
            "--sources=sources.yaml".to_string(),
            "--store-dir=./store".to_string(),
            format!("--recency-hours={hours}"),
        ])
    }

    #[test]
    fn test_recency_hours_out_of_range_rejected() {
        let file = SourcesFile::from_yaml(YAML).unwrap();
        for hours in ["0", "-5", "9223372036854775807"] {
            assert!(
                PipelineSettings::from_cli(&cli_with_recency(hours), &file).is_err(),
                "{hours}"
            );
        }
        let settings = PipelineSettings::from_cli(&cli_with_recency("48"), &file).unwrap();
        assert_eq!(settings.recency_window, TimeDelta::hours(48));
    }
}
