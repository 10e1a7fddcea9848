//! The page as seen by the summarizer core.
//!
//! The browser side owns the DOM; the core only needs the current url and a way
//! to pull readable text out of it.

use scraper::{Html, Selector};
use std::sync::{PoisonError, RwLock};

use crate::error::SummaryError;

/// Regions tried in order when looking for the main content of a document.
pub const MAIN_REGIONS: [&str; 4] = ["article", "main", "[role=\"main\"]", "body"];

pub trait PageSource: Send + Sync {
    /// Url the page shows right now. Single-page apps change it without a reload.
    fn current_url(&self) -> String;

    /// Readable text of the page, for the summarizer.
    fn extract_text(&self) -> Result<String, SummaryError>;
}

/// A page backed by a captured HTML document.
pub struct HtmlPage {
    url: RwLock<String>,
    html: RwLock<String>,
}

impl HtmlPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self { url: RwLock::new(url.into()), html: RwLock::new(html.into()) }
    }

    /// In-page navigation: the url and document change, the page object stays.
    pub fn navigate(&self, url: impl Into<String>, html: impl Into<String>) {
        *self.url.write().unwrap_or_else(PoisonError::into_inner) = url.into();
        *self.html.write().unwrap_or_else(PoisonError::into_inner) = html.into();
    }

    pub fn html(&self) -> String {
        self.html.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl PageSource for HtmlPage {
    fn current_url(&self) -> String {
        self.url.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn extract_text(&self) -> Result<String, SummaryError> {
        let text = main_text(&self.html());
        if text.is_empty() {
            return Err(SummaryError::ExtractionFailed("no readable text on page".into()));
        }
        Ok(text)
    }
}

/// Whitespace-normalized text of the first main-content region found.
pub fn main_text(html: &str) -> String {
    let document = Html::parse_document(html);
    for sel_str in &MAIN_REGIONS {
        if let Ok(sel) = Selector::parse(sel_str) {
            if let Some(el) = document.select(&sel).next() {
                let text = normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "));
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }
    String::new()
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_article_over_body() {
        let html = "<html><body><nav>Menu Home</nav><article><p>Real   story\n text.</p></article></body></html>";
        assert_eq!(main_text(html), "Real story text.");
    }

    #[test]
    fn empty_page_fails_extraction() {
        let page = HtmlPage::new("https://example.com", "<html><body>  </body></html>");
        assert!(matches!(page.extract_text(), Err(SummaryError::ExtractionFailed(_))));
    }

    #[test]
    fn navigate_swaps_url_and_document() {
        let page = HtmlPage::new("https://a.example", "<body>first</body>");
        page.navigate("https://b.example", "<body>second</body>");
        assert_eq!(page.current_url(), "https://b.example");
        assert_eq!(page.extract_text().unwrap(), "second");
    }
}
