//! Command-line interface definitions.
//!
//! Every option can also be supplied through the environment variable named
//! next to it.

use clap::Parser;

/// Command-line arguments for the news ingestion run.
///
/// # Examples
///
/// ```sh
/// # One cycle over the sources file, storing into ./store
/// brief_bulletin_scraper --sources sources.yaml --store-dir ./store
///
/// # Summarize with an LLM endpoint and repeat every 30 minutes
/// brief_bulletin_scraper -s sources.yaml -d ./store \
///     --summarizer-config ~/.config/aj/config.yaml --interval-secs 1800
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// YAML file listing category pages and their category ids
    #[arg(short, long, env = "BULLETIN_SOURCES")]
    pub sources: String,

    /// Directory holding the article store
    #[arg(short = 'd', long, env = "BULLETIN_STORE_DIR")]
    pub store_dir: String,

    /// Maximum article age in hours
    #[arg(long, env = "BULLETIN_RECENCY_HOURS", default_value_t = 24)]
    pub recency_hours: i64,

    /// Pause after each fetched article, in seconds
    #[arg(long, env = "BULLETIN_ARTICLE_DELAY_SECS", default_value_t = 3)]
    pub article_delay_secs: u64,

    /// Pause after each category page, in seconds
    #[arg(long, env = "BULLETIN_SOURCE_DELAY_SECS", default_value_t = 10)]
    pub source_delay_secs: u64,

    /// Maximum article links taken from one category page
    #[arg(long, env = "BULLETIN_MAX_LINKS", default_value_t = 50)]
    pub max_links: usize,

    /// HTTP timeout per request, in seconds
    #[arg(long, env = "BULLETIN_TIMEOUT_SECS", default_value_t = 15)]
    pub timeout_secs: u64,

    /// Config file for the LLM summarizer; truncation is used when absent
    #[arg(long, env = "BULLETIN_SUMMARIZER_CONFIG")]
    pub summarizer_config: Option<String>,

    /// Chat template used by the LLM summarizer
    #[arg(long, env = "BULLETIN_SUMMARIZER_TEMPLATE", default_value = "news_summarizer")]
    pub summarizer_template: String,

    /// Retries for a failed summarizer call
    #[arg(long, env = "BULLETIN_SUMMARIZER_RETRIES", default_value_t = 2)]
    pub summarizer_retries: usize,

    /// Maximum summary length passed to the summarizer
    #[arg(long, env = "BULLETIN_SUMMARY_MAX_LENGTH", default_value_t = 150)]
    pub summary_max_length: usize,

    /// Category id whose full content is stored as its summary (repeatable,
    /// or comma separated)
    #[arg(long, env = "BULLETIN_VERBATIM_CATEGORY", value_delimiter = ',')]
    pub verbatim_category: Vec<i64>,

    /// Repeat the run forever, pausing this many seconds between cycles
    #[arg(long, env = "BULLETIN_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from([
            "brief_bulletin_scraper",
            "--sources",
            "sources.yaml",
            "--store-dir",
            "./store",
        ]);

        assert_eq!(cli.sources, "sources.yaml");
        assert_eq!(cli.store_dir, "./store");
        assert_eq!(cli.recency_hours, 24);
        assert_eq!(cli.article_delay_secs, 3);
        assert_eq!(cli.source_delay_secs, 10);
        assert_eq!(cli.max_links, 50);
        assert_eq!(cli.timeout_secs, 15);
        assert_eq!(cli.summarizer_config, None);
        assert!(cli.verbatim_category.is_empty());
        assert_eq!(cli.interval_secs, None);
    }

    #[test]
    fn test_cli_short_flags_and_repeats() {
        let cli = Cli::parse_from([
            "brief_bulletin_scraper",
            "-s",
            "/etc/bulletin/sources.yaml",
            "-d",
            "/var/lib/bulletin",
            "--verbatim-category",
            "7",
            "--verbatim-category",
            "9",
            "--interval-secs",
            "1800",
        ]);

        assert_eq!(cli.sources, "/etc/bulletin/sources.yaml");
        assert_eq!(cli.store_dir, "/var/lib/bulletin");
        assert_eq!(cli.verbatim_category, vec![7, 9]);
        assert_eq!(cli.interval_secs, Some(1800));
    }

    #[test]
    fn test_every_option_has_env_var() {
        let command = Cli::command();
        let missing: Vec<_> = command
            .get_arguments()
            .filter(|arg| arg.get_long().is_some())
            .filter(|arg| !matches!(arg.get_id().as_str(), "help" | "version"))
            .filter(|arg| arg.get_env().is_none())
            .map(|arg| arg.get_id().to_string())
            .collect();
        assert!(missing.is_empty(), "options without env var: {missing:?}");

        let verbatim = command
            .get_arguments()
            .find(|arg| arg.get_id() == "verbatim_category")
            .unwrap();
        assert_eq!(
            verbatim.get_env(),
            Some(std::ffi::OsStr::new("BULLETIN_VERBATIM_CATEGORY"))
        );
    }

    #[test]
    fn test_verbatim_category_comma_list() {
        let cli = Cli::parse_from([
            "brief_bulletin_scraper",
            "-s",
            "sources.yaml",
            "-d",
            "./store",
            "--verbatim-category",
            "7,9",
        ]);
        assert_eq!(cli.verbatim_category, vec![7, 9]);
    }
}
