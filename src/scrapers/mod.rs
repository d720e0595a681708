//! Heuristic extraction for news sites that share no markup convention.
//!
//! A run goes through these modules in two phases:
//!
//! 1. **Discovery**: [`discover`] turns a category listing page into candidate
//!    article URLs, filtered through [`classify`].
//! 2. **Extraction**: [`article`] fetches each candidate and recovers its
//!    title, date ([`dates`]), body text and lead image.
//!
//! # Strategies
//!
//! | Field | Strategies, in order |
//! |-------|----------------------|
//! | Links | content-block containers, then long or dated anchors |
//! | Title | `<h1>`, `og:title`, `<meta name="title">` |
//! | Date | meta tags, `<time datetime>`, JSON-LD, `/YYYY/M/D/` in the URL |
//! | Body | `<article>` paragraphs, body-class `<div>` paragraphs, all paragraphs |
//! | Image | `og:image`, `twitter:image`, `<article>` image, lead-class image |
//!
//! Each field's strategies run through [`cascade`].

pub mod article;
pub mod cascade;
pub mod classify;
pub mod dates;
pub mod discover;
