//! Article URL classification.
//!
//! Listing pages link to far more than articles: tag pages, section roots,
//! author pages, media galleries, login screens. [`is_valid_article_url`]
//! applies a fixed sequence of cheap rejections and accepts only what is left.

use url::Url;

/// Substrings marking non-article resources. Matched against the lower-cased URL.
pub const DENY_LIST: &[&str] = &[
    "/tag/", "/tags/", "/category/", "/categories/", "/author/", "/authors/",
    "/page/", "/search", "/login", "/signup", "/subscribe", "/about",
    "/contact", "/privacy", "/terms", "/api/", "/oauth", "/auth",
    "javascript:", "mailto:", "#", ".pdf", ".jpg", ".png", ".gif",
    "/gallery/", "/video/", "/photos/", "/images/",
];

/// Final path segments that name a section rather than a story.
pub const SECTION_NAMES: &[&str] = &[
    "news", "sports", "business", "world", "international",
    "bangladesh", "asia", "entertainment", "lifestyle", "opinion",
];

const MIN_SEGMENTS: usize = 2;
const MIN_PATH_CHARS: usize = 10;

/// Decide whether `candidate`, found on `listing`, plausibly points to an article.
pub fn is_valid_article_url(candidate: &Url, listing: &Url) -> bool {
    same_site(candidate, listing)
        && !is_denied(candidate)
        && {
            let path = decoded_path(candidate);
            let segments: Vec<&str> = path.split('/').collect();
            !path.is_empty()
                && segments.len() >= MIN_SEGMENTS
                && !is_section_root(&segments)
                && path.chars().count() >= MIN_PATH_CHARS
        }
}

fn same_site(candidate: &Url, listing: &Url) -> bool {
    match (candidate.host_str(), listing.host_str()) {
        (Some(candidate_host), Some(listing_host)) => candidate_host.contains(listing_host),
        _ => false,
    }
}

fn is_denied(candidate: &Url) -> bool {
    let lowered = candidate.as_str().to_lowercase();
    DENY_LIST.iter().any(|pattern| lowered.contains(pattern))
}

fn is_section_root(segments: &[&str]) -> bool {
    segments.len() <= MIN_SEGMENTS
        && segments
            .last()
            .is_some_and(|last| SECTION_NAMES.contains(&last.to_lowercase().as_str()))
}

/// Percent-decoded path without leading or trailing slashes.
fn decoded_path(url: &Url) -> String {
    let raw = url.path();
    let decoded = urlencoding::decode(raw)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    decoded.trim_matches('/').to_string()
}
