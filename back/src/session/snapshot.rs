//! Offline sessions over saved page HTML.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::Session;
use crate::error::{PricewatchError, Result};

/// Replays saved HTML pages keyed by URL. Lookups never wait: an element is
/// either in the document or absent.
#[derive(Debug, Default, Clone)]
pub struct SnapshotSession {
    pages: HashMap<String, String>,
    current: Option<String>,
}

impl SnapshotSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Serve the HTML file at `path` whenever `url` is requested.
    pub async fn with_file(self, url: impl Into<String>, path: &Path) -> Result<Self> {
        let html = tokio::fs::read_to_string(path).await?;
        Ok(self.with_page(url, html))
    }

    fn current_html(&self) -> Option<&str> {
        let url = self.current.as_ref()?;
        self.pages.get(url).map(String::as_str)
    }
}

/// Tags whose content a browser never renders as text.
const NON_RENDERED_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Classes that move content off screen for screen readers only.
const OFFSCREEN_CLASSES: [&str; 2] = ["a-offscreen", "sr-only"];

/// Tags rendered on their own line, so their text never runs into a neighbour's.
const BLOCK_TAGS: [&str; 14] = [
    "div", "p", "br", "li", "ul", "ol", "tr", "td", "th", "table", "section", "h1", "h2", "h3",
];

/// Whether a browser would leave `element` out of the visible text.
fn is_hidden(element: &scraper::node::Element) -> bool {
    if NON_RENDERED_TAGS.contains(&element.name()) || element.attr("hidden").is_some() {
        return true;
    }
    if element.classes().any(|c| OFFSCREEN_CLASSES.contains(&c)) {
        return true;
    }
    element.attr("style").is_some_and(|style| {
        let style = style.split_whitespace().collect::<String>().to_ascii_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            if is_hidden(child.value()) {
                continue;
            }
            let block = BLOCK_TAGS.contains(&child.value().name());
            if block {
                out.push(' ');
            }
            collect_visible_text(child, out);
            if block {
                out.push(' ');
            }
        }
    }
}

/// Visible text of the first element matching `locator`, whitespace collapsed.
/// Hidden descendants are skipped so the result matches what a browser shows.
fn first_match_text(html: &str, locator: &str) -> Option<String> {
    let selector = Selector::parse(locator).ok()?;
    let document = Html::parse_document(html);
    let element = document.select(&selector).next()?;

    let mut text = String::new();
    if !is_hidden(element.value()) {
        collect_visible_text(element, &mut text);
    }
    Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[async_trait]
impl Session for SnapshotSession {
    type Element = String;

    async fn navigate(&mut self, url: &str) -> Result<()> {
        if !self.pages.contains_key(url) {
            return Err(PricewatchError::navigation(url, "no snapshot for this URL"));
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn find_with_timeout(&self, locator: &str, _timeout: Duration) -> Option<String> {
        first_match_text(self.current_html()?, locator)
    }

    async fn element_text(&self, element: &String) -> Result<String> {
        Ok(element.clone())
    }

    async fn page_source(&self) -> Result<String> {
        self.current_html()
            .map(str::to_string)
            .ok_or_else(|| PricewatchError::navigation("", "no page loaded"))
    }

    async fn close(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div id="availability">
            <span>  In stock  </span>
          </div>
          <span class="a-price-whole">79,900</span>
        </body></html>
    "#;

    #[tokio::test]
    async fn finds_first_match_and_collapses_whitespace() {
        let mut session = SnapshotSession::new().with_page("https://shop/p", PAGE);
        session.navigate("https://shop/p").await.unwrap();

        let text = session
            .find_with_timeout("#availability", Duration::from_secs(10))
            .await;
        assert_eq!(text.as_deref(), Some("In stock"));

        let price = session
            .find_with_timeout("span.a-price-whole", Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(session.element_text(&price).await.unwrap(), "79,900");
    }

    #[tokio::test]
    async fn missing_and_invalid_locators_are_absent() {
        let mut session = SnapshotSession::new().with_page("https://shop/p", PAGE);
        session.navigate("https://shop/p").await.unwrap();

        assert!(session.find_with_timeout("div.nope", Duration::ZERO).await.is_none());
        assert!(session.find_with_timeout("div[[", Duration::ZERO).await.is_none());
    }

    #[tokio::test]
    async fn unknown_url_fails_navigation_and_close_is_idempotent() {
        let mut session = SnapshotSession::new().with_page("https://shop/p", PAGE);
        assert!(session.navigate("https://shop/other").await.is_err());
        assert!(session.find_with_timeout("span", Duration::ZERO).await.is_none());

        session.navigate("https://shop/p").await.unwrap();
        session.close().await;
        session.close().await;
        assert!(session.page_source().await.is_err());
    }

    #[tokio::test]
    async fn hidden_descendants_are_left_out_of_text() {
        let html = r#"
            <span class="a-price" data-a-size="xl">
              <span class="a-offscreen">₹72,999.00</span>
              <span aria-hidden="true">₹72,999</span>
            </span>
            <div id="stock">
              <script>var x = 1;</script>
              <span style="display: none">Out of stock</span>
              <span>In stock</span>
            </div>
            <p class="gone" hidden>secret</p>
        "#;
        let mut session = SnapshotSession::new().with_page("https://shop/p", html);
        session.navigate("https://shop/p").await.unwrap();

        let price = session
            .find_with_timeout("span.a-price[data-a-size=xl]", Duration::ZERO)
            .await;
        assert_eq!(price.as_deref(), Some("₹72,999"));

        let stock = session.find_with_timeout("#stock", Duration::ZERO).await;
        assert_eq!(stock.as_deref(), Some("In stock"));

        let hidden = session.find_with_timeout("p.gone", Duration::ZERO).await;
        assert_eq!(hidden.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn inline_text_joins_and_blocks_separate() {
        let html = r#"
            <span class="whole">72,999<span class="decimal">.</span></span>
            <div id="rows"><div>In</div><div>stock</div></div>
        "#;
        let mut session = SnapshotSession::new().with_page("https://shop/p", html);
        session.navigate("https://shop/p").await.unwrap();

        let whole = session.find_with_timeout("span.whole", Duration::ZERO).await;
        assert_eq!(whole.as_deref(), Some("72,999."));

        let rows = session.find_with_timeout("#rows", Duration::ZERO).await;
        assert_eq!(rows.as_deref(), Some("In stock"));
    }
}
