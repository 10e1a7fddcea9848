//! Decides whether a page is worth summarizing before anything is sent anywhere.

use regex::RegexSet;
use scraper::{ElementRef, Html, Selector};
use std::sync::{LazyLock, Mutex, PoisonError};
use tracing::debug;

use super::page::MAIN_REGIONS;

pub const MIN_WORDS: usize = 150;
pub const MIN_PARAGRAPHS: usize = 2;
pub const MAX_LINK_DENSITY: f64 = 0.5;
pub const MIN_TITLE_CHARS: usize = 10;
const WORDS_PER_MINUTE: usize = 200;

static UNSUPPORTED_URLS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"^about:",
        r"^chrome:",
        r"^chrome-extension:",
        r"^moz-extension:",
        r"^file:",
        r"^view-source:",
        r"^https://([^/]+\.)?google\.[^/]+/search",
    ])
    .expect("static patterns compile")
});

/// Internal browser pages and search results never get summarized.
pub fn is_unsupported_url(url: &str) -> bool {
    UNSUPPORTED_URLS.is_match(url)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentStats {
    pub word_count: usize,
    pub paragraph_count: usize,
    pub heading_count: usize,
    pub link_density: f64,
    pub has_structure: bool,
    pub has_metadata: bool,
    pub has_search_form: bool,
    pub read_time_minutes: usize,
    pub content_score: f64,
}

fn sel(s: &str) -> Selector {
    Selector::parse(s).expect("static selector parses")
}

fn text_len(el: ElementRef<'_>) -> usize {
    el.text().map(|t| t.chars().count()).sum()
}

impl ContentStats {
    pub fn from_html(html: &str) -> Self {
        let doc = Html::parse_document(html);
        let p = sel("p");
        let a = sel("a");

        // Readable text comes from the most specific region.
        let region = MAIN_REGIONS
            .iter()
            .filter_map(|s| doc.select(&sel(s)).next())
            .next();
        let (text, paragraph_count) = match region {
            Some(region) => (region.text().collect::<Vec<_>>().join(" "), region.select(&p).count()),
            None => (String::new(), 0),
        };

        // Link density uses whichever landmark comes first in the document, so a
        // `main` listing that wraps `article` teasers is measured as a whole.
        let landmark = doc
            .select(&sel(r#"main, article, [role="main"]"#))
            .next()
            .or_else(|| doc.select(&sel("body")).next());
        let link_density = match landmark {
            Some(landmark) => {
                let total = text_len(landmark);
                let linked: usize = landmark.select(&a).map(text_len).sum();
                if total == 0 { 1.0 } else { linked as f64 / total as f64 }
            }
            None => 1.0,
        };

        let word_count = text.split_whitespace().count();
        let heading_count = doc.select(&sel("h1, h2, h3, h4, h5, h6")).count();
        let has_top_heading = doc.select(&sel("h1, h2")).next().is_some();
        let has_article = doc.select(&sel("article")).next().is_some();
        let has_structure = has_article || (has_top_heading && doc.select(&p).count() >= MIN_PARAGRAPHS);

        let title_len = doc
            .select(&sel("title"))
            .next()
            .map(|t| t.text().collect::<String>().trim().chars().count())
            .unwrap_or(0);
        let has_description = doc.select(&sel(r#"meta[name="description"]"#)).next().is_some();
        let has_metadata = title_len > MIN_TITLE_CHARS && (has_description || has_top_heading);

        let has_search_form = doc.select(&sel(r#"form[role="search"]"#)).next().is_some();

        Self {
            word_count,
            paragraph_count,
            heading_count,
            link_density,
            has_structure,
            has_metadata,
            has_search_form,
            read_time_minutes: word_count.div_ceil(WORDS_PER_MINUTE),
            content_score: text.trim().chars().count() as f64 / 100.0
                + paragraph_count as f64 * 5.0
                + heading_count as f64 * 10.0,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.word_count >= MIN_WORDS
            && self.paragraph_count >= MIN_PARAGRAPHS
            && self.link_density <= MAX_LINK_DENSITY
            && self.has_structure
            && self.has_metadata
            && !self.has_search_form
    }
}

/// Eligibility check with a one-slot memo for the current url.
///
/// The memo is not revalidated when the document mutates in place; only a
/// url change recomputes it.
#[derive(Default)]
pub struct ContentGate {
    memo: Mutex<Option<(String, bool)>>,
}

impl ContentGate {
    pub fn new() -> Self { Self::default() }

    pub fn evaluate(&self, url: &str, html: &str) -> bool {
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_url, result)) = memo.as_ref() {
            if cached_url == url {
                return *result;
            }
        }

        let result = if is_unsupported_url(url) {
            false
        } else {
            let stats = ContentStats::from_html(html);
            debug!(%url, words = stats.word_count, paragraphs = stats.paragraph_count,
                link_density = stats.link_density, score = stats.content_score, "content analyzed");
            stats.is_eligible()
        };
        *memo = Some((url.to_string(), result));
        result
    }
}
