//! Candidate article discovery on listing pages.
//!
//! Two strategies feed one deduplicated set:
//!
//! - **Structural**: the first link inside each `<article>`/`<div>` whose class
//!   looks like a content block (`story`, `card`, `post`, ...).
//! - **Fallback**: every link on the page, but only long or dated ones. Runs
//!   only when the structural pass found fewer than [`FALLBACK_THRESHOLD`].
//!
//! Every candidate has its query and fragment stripped and must pass
//! [`is_valid_article_url`].

use super::classify::is_valid_article_url;
use crate::error::FetchError;
use crate::fetch::Fetcher;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument};
use url::Url;

/// Default cap on links returned per listing page.
pub const MAX_LINKS: usize = 50;

/// Structural results below this count trigger the fallback pass.
pub const FALLBACK_THRESHOLD: usize = 5;

/// Fallback candidates must be longer than this, or carry a `/YYYY/` segment.
const FALLBACK_MIN_URL_CHARS: usize = 50;

static CONTAINER_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article, div").expect("static selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));
static CONTAINER_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)story|article|post|news|item|card|content-item").expect("static regex")
});
static YEAR_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d{4}/").expect("static regex"));

/// Fetch a listing page and return candidate article URLs.
///
/// A fetch failure is returned to the caller, which logs it and moves on to
/// the next listing page.
#[instrument(level = "info", skip_all, fields(%listing))]
pub async fn discover_links(
    fetcher: &Fetcher,
    listing: &Url,
    max_links: usize,
) -> Result<Vec<String>, FetchError> {
    let html = fetcher.get_html(listing).await?;
    let links = links_from_html(&html, listing, max_links);
    info!(count = links.len(), "Found valid article links");
    Ok(links)
}

/// Run both discovery strategies over an already fetched listing page.
pub fn links_from_html(html: &str, listing: &Url, max_links: usize) -> Vec<String> {
    let document = Html::parse_document(html);

    let mut accepted: Vec<String> = structural_candidates(&document, listing)
        .filter(|url| is_valid_article_url(url, listing))
        .map(String::from)
        .unique()
        .collect();
    debug!(count = accepted.len(), "Structural strategy accepted links");

    if accepted.len() < FALLBACK_THRESHOLD {
        let mut seen: HashSet<String> = accepted.iter().cloned().collect();
        for url in document
            .select(&LINK_SELECTOR)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| clean_link(href, listing))
            .filter(|url| is_valid_article_url(url, listing) && looks_like_story(url))
        {
            let url = String::from(url);
            if seen.insert(url.clone()) {
                accepted.push(url);
            }
        }
        debug!(count = accepted.len(), "Fallback strategy extended links");
    }

    accepted.truncate(max_links);
    accepted
}

fn structural_candidates<'a>(
    document: &'a Html,
    listing: &'a Url,
) -> impl Iterator<Item = Url> + 'a {
    document
        .select(&CONTAINER_SELECTOR)
        .filter(|el| {
            el.value()
                .attr("class")
                .is_some_and(|class| CONTAINER_CLASS.is_match(class))
        })
        .filter_map(|el| el.select(&LINK_SELECTOR).next())
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| clean_link(href, listing))
}

/// Resolve `href` against the listing page and drop its query and fragment.
///
/// Fragment-only links point back at the listing page itself and are skipped.
pub fn clean_link(href: &str, listing: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let mut url = listing.join(href).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url)
}

fn looks_like_story(url: &Url) -> bool {
    let decoded = urlencoding::decode(url.as_str())
        .map(|cow| cow.chars().count())
        .unwrap_or_else(|_| url.as_str().chars().count());
    decoded > FALLBACK_MIN_URL_CHARS || YEAR_SEGMENT.is_match(url.as_str())
}
