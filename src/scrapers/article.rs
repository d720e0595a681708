//! Article page extraction: title, publication date, body text and lead image.
//!
//! Title and date are read from the page as fetched. Body and image are read
//! from a noise-stripped copy (see [`strip_noise`]) so navigation, scripts and
//! forms never leak into the text.

use super::cascade::{Attempt, Miss, Strategy, first_qualifying, first_success};
use super::dates::{extract_publication_date, meta_content};
use crate::error::ExtractError;
use crate::fetch::Fetcher;
use crate::models::ExtractedArticle;
use chrono::{Duration, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

/// Shortest acceptable title, in characters.
pub const MIN_TITLE_CHARS: usize = 10;
/// A body strategy must reach this many characters to end the cascade.
pub const PREFERRED_CONTENT_CHARS: usize = 200;
/// Anything shorter than this after the cascade is a failure.
pub const MIN_CONTENT_CHARS: usize = 100;

const MIN_PARAGRAPHS: usize = 3;
const CONTAINER_PARAGRAPH_CHARS: usize = 20;
const PAGE_PARAGRAPH_CHARS: usize = 30;
const PAGE_PARAGRAPH_LIMIT: usize = 20;

const NOISE_TAGS: &str = "script, style, nav, header, footer, aside, iframe, form";

static NOISE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(NOISE_TAGS).expect("static selector"));
static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("static selector"));
static ARTICLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article").expect("static selector"));
static DIV_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[class]").expect("static selector"));
static P_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));
static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("static selector"));
static BODY_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)article-body|story-body|post-content|entry-content|article-content|story-content",
    )
    .expect("static regex")
});
static LEAD_IMAGE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)featured|hero|main|lead").expect("static regex"));

/// Recency rule applied to a page's publication date.
#[derive(Debug, Clone, Copy)]
pub struct Recency {
    /// Wall-clock "now", naive like the extracted timestamps.
    pub now: NaiveDateTime,
    /// Oldest acceptable age. An article exactly this old is still accepted.
    pub window: Duration,
}

impl Recency {
    /// Accept articles published at most `window` before `now`.
    pub fn new(now: NaiveDateTime, window: Duration) -> Self {
        Self { now, window }
    }

    fn check(&self, published_at: NaiveDateTime) -> Result<(), ExtractError> {
        let age = self.now - published_at;
        if age > self.window {
            Err(ExtractError::StaleArticle {
                age_hours: age.num_seconds() as f64 / 3600.0,
            })
        } else {
            Ok(())
        }
    }
}

/// Fetch `url` and extract a complete article from it.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn extract_article(
    fetcher: &Fetcher,
    url: &Url,
    recency: &Recency,
) -> Result<ExtractedArticle, ExtractError> {
    let html = fetcher.get_html(url).await?;
    let article = extract_from_html(&html, url, recency)?;
    info!(
        chars = article.content.chars().count(),
        has_image = article.featured_image.is_some(),
        "Extracted article"
    );
    Ok(article)
}

/// Extract an article from an already fetched page.
pub fn extract_from_html(
    html: &str,
    url: &Url,
    recency: &Recency,
) -> Result<ExtractedArticle, ExtractError> {
    let document = Html::parse_document(html);

    let title = extract_title(&document).ok_or(ExtractError::NoTitle)?;

    let published_at = extract_publication_date(&document, url)
        .ok_or(ExtractError::NoDate)?
        .to_naive();
    recency.check(published_at)?;

    let cleaned = strip_noise(&document);

    let content = extract_content(&cleaned)
        .filter(|content| content.chars().count() >= MIN_CONTENT_CHARS)
        .ok_or(ExtractError::NoContent)?;

    let featured_image = extract_lead_image(&cleaned).and_then(|src| absolutize(&src, url));

    Ok(ExtractedArticle {
        title,
        content,
        featured_image,
        published_at: Some(published_at),
        source_url: url.to_string(),
    })
}

/// Copy of `document` with script, style, nav, header, footer, aside, iframe
/// and form subtrees removed.
///
/// Detached nodes stay in the tree's arena and `Html::select` still visits
/// them, so the pruned tree is serialized and parsed again.
pub fn strip_noise(document: &Html) -> Html {
    let mut pruned = document.clone();
    let noise: Vec<_> = pruned.select(&NOISE_SELECTOR).map(|el| el.id()).collect();
    for id in noise {
        if let Some(mut node) = pruned.tree.get_mut(id) {
            node.detach();
        }
    }
    Html::parse_document(&pruned.root_element().html())
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

// ---- title ----

fn extract_title(document: &Html) -> Option<String> {
    let strategies: [Strategy<Html, String>; 3] = [
        Strategy::new("h1", title_from_h1),
        Strategy::new("og:title", title_from_og),
        Strategy::new("meta-title", title_from_meta_name),
    ];
    first_success(&strategies, document)
}

fn long_enough_title(title: String) -> Attempt<String> {
    let found = title.chars().count();
    if found >= MIN_TITLE_CHARS {
        Ok(title)
    } else {
        Err(Miss::BelowGate {
            found,
            required: MIN_TITLE_CHARS,
        })
    }
}

fn title_from_h1(document: &Html) -> Attempt<String> {
    let h1 = document.select(&H1_SELECTOR).next().ok_or(Miss::Absent)?;
    long_enough_title(element_text(h1))
}

fn title_from_og(document: &Html) -> Attempt<String> {
    let content = meta_content(document, "property", "og:title").ok_or(Miss::Absent)?;
    long_enough_title(content)
}

fn title_from_meta_name(document: &Html) -> Attempt<String> {
    let content = meta_content(document, "name", "title").ok_or(Miss::Absent)?;
    long_enough_title(content)
}

// ---- body ----

fn extract_content(document: &Html) -> Option<String> {
    let strategies: [Strategy<Html, String>; 3] = [
        Strategy::new("article-paragraphs", content_from_article),
        Strategy::new("body-class-div", content_from_body_div),
        Strategy::new("page-paragraphs", content_from_page),
    ];
    first_qualifying(&strategies, document, |content: &String| {
        content.chars().count() >= PREFERRED_CONTENT_CHARS
    })
}

/// Texts of `<p>` under `root` longer than `min_chars`.
fn paragraphs<'a>(root: ElementRef<'a>, min_chars: usize) -> impl Iterator<Item = String> + 'a {
    root.select(&P_SELECTOR)
        .map(element_text)
        .filter(move |text| text.chars().count() > min_chars)
}

fn joined_paragraphs(texts: Vec<String>) -> Attempt<String> {
    if texts.len() < MIN_PARAGRAPHS {
        return Err(Miss::BelowGate {
            found: texts.len(),
            required: MIN_PARAGRAPHS,
        });
    }
    Ok(texts.join(" "))
}

fn content_from_article(document: &Html) -> Attempt<String> {
    let article = document.select(&ARTICLE_SELECTOR).next().ok_or(Miss::Absent)?;
    joined_paragraphs(paragraphs(article, CONTAINER_PARAGRAPH_CHARS).collect())
}

fn content_from_body_div(document: &Html) -> Attempt<String> {
    let mut miss = Miss::Absent;
    for div in document.select(&DIV_SELECTOR).filter(|div| {
        div.value()
            .attr("class")
            .is_some_and(|class| BODY_CLASS.is_match(class))
    }) {
        match joined_paragraphs(paragraphs(div, CONTAINER_PARAGRAPH_CHARS).collect()) {
            Ok(content) => return Ok(content),
            Err(below) => miss = below,
        }
    }
    Err(miss)
}

fn content_from_page(document: &Html) -> Attempt<String> {
    let texts: Vec<String> = paragraphs(document.root_element(), PAGE_PARAGRAPH_CHARS).collect();
    if texts.len() < MIN_PARAGRAPHS {
        return Err(Miss::BelowGate {
            found: texts.len(),
            required: MIN_PARAGRAPHS,
        });
    }
    Ok(texts.into_iter().take(PAGE_PARAGRAPH_LIMIT).collect::<Vec<_>>().join(" "))
}

// ---- lead image ----

fn extract_lead_image(document: &Html) -> Option<String> {
    let strategies: [Strategy<Html, String>; 4] = [
        Strategy::new("og:image", image_from_og),
        Strategy::new("twitter:image", image_from_twitter),
        Strategy::new("article-img", image_in_article),
        Strategy::new("lead-class-img", image_with_lead_class),
    ];
    let found = first_success(&strategies, document);
    debug!(image = ?found, "Lead image cascade finished");
    found
}

fn image_from_og(document: &Html) -> Attempt<String> {
    meta_content(document, "property", "og:image").ok_or(Miss::Absent)
}

fn image_from_twitter(document: &Html) -> Attempt<String> {
    meta_content(document, "name", "twitter:image").ok_or(Miss::Absent)
}

fn image_source(img: ElementRef<'_>, attrs: &[&str]) -> Attempt<String> {
    attrs
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
        .ok_or(Miss::Absent)
}

fn image_in_article(document: &Html) -> Attempt<String> {
    let article = document.select(&ARTICLE_SELECTOR).next().ok_or(Miss::Absent)?;
    let img = article.select(&IMG_SELECTOR).next().ok_or(Miss::Absent)?;
    image_source(img, &["src", "data-src", "data-lazy-src"])
}

/// Only the first lead-class image is considered; without a source it is a miss.
fn image_with_lead_class(document: &Html) -> Attempt<String> {
    let img = document
        .select(&IMG_SELECTOR)
        .find(|img| {
            img.value()
                .attr("class")
                .is_some_and(|class| LEAD_IMAGE_CLASS.is_match(class))
        })
        .ok_or(Miss::Absent)?;
    image_source(img, &["src", "data-src"])
}

/// Make an image reference absolute. Scheme-relative references get `https:`.
pub fn absolutize(src: &str, page: &Url) -> Option<String> {
    if let Some(rest) = src.strip_prefix("//") {
        return Url::parse(&format!("https://{rest}")).ok().map(String::from);
    }
    page.join(src).ok().map(String::from)
}
