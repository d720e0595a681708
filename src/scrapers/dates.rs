//! Publication date recovery.
//!
//! Sites embed publish times in many places. [`extract_publication_date`]
//! tries them in a fixed order and returns the first one that parses:
//!
//! 1. `<meta>` tags (`article:published_time`, `og:published_time`, ...)
//! 2. the first `<time datetime="...">`
//! 3. JSON-LD `datePublished` / `publishDate` / `dateCreated`
//! 4. a `/YYYY/M/D/` segment in the article URL

use super::cascade::{Attempt, Miss, Strategy, first_success};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

/// (attribute, value) pairs of `<meta>` tags carrying a publish time, in lookup order.
const META_DATE_TAGS: &[(&str, &str)] = &[
    ("property", "article:published_time"),
    ("name", "article:published_time"),
    ("property", "og:published_time"),
    ("name", "publishdate"),
    ("name", "date"),
    ("itemprop", "datePublished"),
];

const JSON_LD_DATE_FIELDS: &[&str] = &["datePublished", "publishDate", "dateCreated"];

static TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("static selector"));
static JSON_LD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector")
});
static URL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d{4})/(\d{1,2})/(\d{1,2})/").expect("static regex"));

/// A recovered publication time, with its offset when the source gave one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishedAt {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl PublishedAt {
    /// Wall-clock time with any offset discarded.
    pub fn to_naive(&self) -> NaiveDateTime {
        match self {
            Self::Zoned(dt) => dt.naive_local(),
            Self::Naive(naive) => *naive,
        }
    }
}

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parse the date formats news sites commonly put in markup.
pub fn parse_flexible(raw: &str) -> Option<PublishedAt> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(PublishedAt::Zoned(dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(PublishedAt::Zoned(dt));
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(PublishedAt::Zoned(dt));
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(PublishedAt::Naive(naive));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(PublishedAt::Naive(date.and_time(NaiveTime::MIN)));
        }
    }
    None
}

/// Inputs shared by every date strategy.
pub struct DatePage<'a> {
    pub document: &'a Html,
    pub url: &'a Url,
}

/// Recover the publication date of an article page, if any strategy finds one.
pub fn extract_publication_date(document: &Html, url: &Url) -> Option<PublishedAt> {
    let strategies: [Strategy<DatePage<'_>, PublishedAt>; 4] = [
        Strategy::new("meta-tags", from_meta_tags),
        Strategy::new("time-element", from_time_element),
        Strategy::new("json-ld", from_json_ld),
        Strategy::new("url-path", from_url_path),
    ];
    first_success(&strategies, &DatePage { document, url })
}

fn from_meta_tags(page: &DatePage<'_>) -> Attempt<PublishedAt> {
    let mut miss = Miss::Absent;
    for (attr, value) in META_DATE_TAGS {
        let Some(content) = meta_content(page.document, attr, value) else {
            continue;
        };
        match parse_flexible(&content) {
            Some(found) => return Ok(found),
            None => miss = Miss::Unparseable(content),
        }
    }
    Err(miss)
}

fn from_time_element(page: &DatePage<'_>) -> Attempt<PublishedAt> {
    let raw = page
        .document
        .select(&TIME_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("datetime"))
        .ok_or(Miss::Absent)?;
    parse_flexible(raw).ok_or_else(|| Miss::Unparseable(raw.to_string()))
}

fn from_json_ld(page: &DatePage<'_>) -> Attempt<PublishedAt> {
    let mut miss = Miss::Absent;
    for script in page.document.select(&JSON_LD_SELECTOR) {
        let body = script.text().collect::<String>();
        let payload: Value = match serde_json::from_str(body.trim()) {
            Ok(payload) => payload,
            Err(e) => {
                miss = Miss::Unparseable(e.to_string());
                continue;
            }
        };
        let entity = match payload {
            Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
            other => other,
        };
        let Some(raw) = JSON_LD_DATE_FIELDS
            .iter()
            .find_map(|field| entity.get(field))
            .and_then(Value::as_str)
        else {
            continue;
        };
        match parse_flexible(raw) {
            Some(found) => return Ok(found),
            None => miss = Miss::Unparseable(raw.to_string()),
        }
    }
    Err(miss)
}

fn from_url_path(page: &DatePage<'_>) -> Attempt<PublishedAt> {
    let caps = URL_DATE.captures(page.url.as_str()).ok_or(Miss::Absent)?;
    let part = |i: usize| caps[i].parse::<u32>().map_err(|e| Miss::Unparseable(e.to_string()));
    let year = i32::try_from(part(1)?).map_err(|e| Miss::Unparseable(e.to_string()))?;
    NaiveDate::from_ymd_opt(year, part(2)?, part(3)?)
        .map(|date| PublishedAt::Naive(date.and_time(NaiveTime::MIN)))
        .ok_or_else(|| Miss::Unparseable(caps[0].to_string()))
}

/// Non-empty `content` of the first `<meta {attr}="{value}">`.
pub(crate) fn meta_content(document: &Html, attr: &str, value: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[{attr}="{value}"]"#)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}
