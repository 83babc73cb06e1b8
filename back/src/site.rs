//! Per-site scraping: locator lists, stock heuristics and the scrape sequence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::extract::{
    extract_first_parseable, parse_price, parse_rating, parse_review_count, Extraction,
};
use crate::record::{FieldSource, ProductRecord, ScrapeOutcome, IN_STOCK, OUT_OF_STOCK, UNKNOWN};
use crate::session::Session;

/// How a site exposes stock status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum StockRule {
    /// Free text read from the first matching availability element. Empty
    /// text counts as unparseable, so the field stays "Unknown" instead of "".
    Text { locators: Vec<String> },
    /// "Out of Stock" if the marker element is present, "In Stock" otherwise
    UnavailableMarker { locator: String },
}

impl Default for StockRule {
    fn default() -> Self {
        Self::Text {
            locators: Vec::new(),
        }
    }
}

/// Everything site-specific about scraping one retailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SiteProfile {
    /// Identifier used in targets, e.g. "amazon"
    pub platform: String,
    /// Name written into records, e.g. "Amazon"
    pub display_name: String,
    /// Symbols stripped from price text before parsing
    pub currency_symbols: Vec<String>,
    /// Lower bound of the random wait after navigation
    pub min_delay_ms: u64,
    /// Upper bound of the random wait after navigation
    pub max_delay_ms: u64,
    pub price_locators: Vec<String>,
    pub rating_locators: Vec<String>,
    pub review_count_locators: Vec<String>,
    pub stock: StockRule,
}

fn locators(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl SiteProfile {
    pub fn amazon() -> Self {
        Self {
            platform: "amazon".to_string(),
            display_name: "Amazon".to_string(),
            currency_symbols: locators(&["₹"]),
            min_delay_ms: 4000,
            max_delay_ms: 6000,
            price_locators: locators(&[
                "span.a-price-whole",
                "span.a-price[data-a-size=xl]",
                "div.a-align-center, .aok-align-center",
            ]),
            stock: StockRule::Text {
                locators: locators(&["#availability"]),
            },
            rating_locators: locators(&["span.a-icon-alt"]),
            review_count_locators: locators(&["#acrCustomerReviewText"]),
        }
    }

    pub fn flipkart() -> Self {
        Self {
            platform: "flipkart".to_string(),
            display_name: "Flipkart".to_string(),
            currency_symbols: locators(&["₹"]),
            min_delay_ms: 2000,
            max_delay_ms: 4000,
            price_locators: locators(&["div.C7fEHH", "div.UOCQB1", "div.hl05eU .Nx9bqj"]),
            stock: StockRule::UnavailableMarker {
                locator: "._16FRp0".to_string(),
            },
            rating_locators: locators(&["div.XQDdHH"]),
            review_count_locators: locators(&["span.Y1HWO0"]),
        }
    }

    /// Whether this profile serves `platform`, compared case-insensitively.
    pub fn matches(&self, platform: &str) -> bool {
        self.platform.eq_ignore_ascii_case(platform)
    }

    /// A random settle delay within the profile's bounds.
    pub fn settle_delay(&self) -> Duration {
        let lo = self.min_delay_ms.min(self.max_delay_ms);
        let hi = self.min_delay_ms.max(self.max_delay_ms);
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }
}

/// Scrapes product pages of one site through the session it owns.
pub struct SiteScraper<S: Session> {
    profile: SiteProfile,
    session: S,
    element_timeout: Duration,
    settle: bool,
    snapshot_dir: Option<PathBuf>,
}

impl<S: Session> SiteScraper<S> {
    pub fn new(profile: SiteProfile, session: S, element_timeout: Duration) -> Self {
        Self {
            profile,
            session,
            element_timeout,
            settle: true,
            snapshot_dir: None,
        }
    }

    /// Skip the post-navigation wait (for static pages).
    pub fn without_settle_delay(mut self) -> Self {
        self.settle = false;
        self
    }

    /// Save each scraped page's HTML as `<dir>/<platform>.html`.
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    /// Scrape one product page. Never fails: on error the partially filled
    /// record is returned with `failure` set.
    pub async fn scrape(&mut self, url: &str) -> ScrapeOutcome {
        let name = self.profile.display_name.clone();
        let mut outcome = ScrapeOutcome::new(ProductRecord::new(&name, url));

        match self.scrape_into(url, &mut outcome).await {
            Ok(()) => info!("Successfully scraped {} product: {:?}", name, outcome.record),
            Err(e) => {
                error!("Error scraping {} product: {}", name, e);
                outcome.failure = Some(e.to_string());
            }
        }
        outcome
    }

    async fn scrape_into(&mut self, url: &str, outcome: &mut ScrapeOutcome) -> Result<()> {
        self.session.navigate(url).await?;
        if self.settle {
            let delay = self.profile.settle_delay();
            debug!("Waiting {:?} for {} to settle", delay, self.profile.display_name);
            sleep(delay).await;
        }
        if let Some(dir) = &self.snapshot_dir {
            self.save_snapshot(dir).await;
        }

        let timeout = self.element_timeout;
        let symbols = self.profile.currency_symbols.as_slice();

        let price = extract_first_parseable(
            &self.session,
            &self.profile.price_locators,
            timeout,
            |text| parse_price(text, symbols),
            0.0,
        )
        .await;
        outcome.record.price = price.value;
        outcome.provenance.price = price.source;

        let stock = self.stock_status().await;
        outcome.record.stock_status = stock.value;
        outcome.provenance.stock_status = stock.source;

        let rating = extract_first_parseable(
            &self.session,
            &self.profile.rating_locators,
            timeout,
            parse_rating,
            0.0,
        )
        .await;
        outcome.record.rating = rating.value;
        outcome.provenance.rating = rating.source;

        let reviews = extract_first_parseable(
            &self.session,
            &self.profile.review_count_locators,
            timeout,
            parse_review_count,
            0,
        )
        .await;
        outcome.record.review_count = reviews.value;
        outcome.provenance.review_count = reviews.source;

        Ok(())
    }

    async fn stock_status(&self) -> Extraction<String> {
        match &self.profile.stock {
            StockRule::Text { locators } => {
                extract_first_parseable(
                    &self.session,
                    locators,
                    self.element_timeout,
                    |text| (!text.is_empty()).then(|| text.to_string()),
                    UNKNOWN.to_string(),
                )
                .await
            }
            StockRule::UnavailableMarker { locator } => {
                let marker = self
                    .session
                    .find_with_timeout(locator, self.element_timeout)
                    .await;
                let value = if marker.is_some() { OUT_OF_STOCK } else { IN_STOCK };
                Extraction {
                    value: value.to_string(),
                    source: FieldSource::Inferred {
                        locator: locator.clone(),
                    },
                }
            }
        }
    }

    async fn save_snapshot(&self, dir: &Path) {
        let path = dir.join(format!("{}.html", self.profile.platform));
        let written = match self.session.page_source().await {
            Ok(html) => match tokio::fs::create_dir_all(dir).await {
                Ok(()) => tokio::fs::write(&path, html).await,
                Err(e) => Err(e),
            },
            Err(e) => {
                warn!("Could not read page source for snapshot: {}", e);
                return;
            }
        };
        match written {
            Ok(()) => debug!("Saved snapshot to {}", path.display()),
            Err(e) => warn!("Failed to save snapshot {}: {}", path.display(), e),
        }
    }

    /// Release the owned session.
    pub async fn close(&mut self) {
        self.session.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SnapshotSession;

    const AMAZON_URL: &str = "https://www.amazon.in/dp/TEST";
    const FLIPKART_URL: &str = "https://www.flipkart.com/p/itmTEST";

    fn scraper(profile: SiteProfile, session: SnapshotSession) -> SiteScraper<SnapshotSession> {
        SiteScraper::new(profile, session, Duration::ZERO).without_settle_delay()
    }

    #[tokio::test]
    async fn amazon_page_is_fully_extracted() {
        let html = r#"
            <span class="a-price-whole">79,900.</span>
            <div id="availability"><span>In stock</span></div>
            <span class="a-icon-alt">4.5 out of 5 stars</span>
            <span id="acrCustomerReviewText">1,234 ratings</span>
        "#;
        let session = SnapshotSession::new().with_page(AMAZON_URL, html);
        let mut scraper = scraper(SiteProfile::amazon(), session);

        let outcome = scraper.scrape(AMAZON_URL).await;
        let record = &outcome.record;
        assert_eq!(record.platform, "Amazon");
        assert_eq!(record.url, AMAZON_URL);
        assert_eq!(record.price, 79900.0);
        assert_eq!(record.stock_status, "In stock");
        assert_eq!(record.rating, 4.5);
        assert_eq!(record.review_count, 1234);
        assert_eq!(record.seller, "Unknown");
        assert!(outcome.failure.is_none());
        assert!(outcome.provenance.defaulted().is_empty());
    }

    #[tokio::test]
    async fn amazon_price_falls_back_to_later_locator() {
        let html = r#"
            <span class="a-price-whole">See all buying options</span>
            <span class="a-price" data-a-size="xl">₹72,999</span>
        "#;
        let session = SnapshotSession::new().with_page(AMAZON_URL, html);
        let mut scraper = scraper(SiteProfile::amazon(), session);

        let outcome = scraper.scrape(AMAZON_URL).await;
        assert_eq!(outcome.record.price, 72999.0);
        assert_eq!(
            outcome.provenance.price,
            FieldSource::Found {
                locator: "span.a-price[data-a-size=xl]".into()
            }
        );
        assert_eq!(outcome.record.stock_status, "Unknown");
        assert_eq!(outcome.provenance.stock_status, FieldSource::NotFound);
    }

    #[tokio::test]
    async fn amazon_price_ignores_offscreen_copy() {
        let html = r#"
            <span class="a-price" data-a-size="xl">
              <span class="a-offscreen">₹72,999.00</span>
              <span aria-hidden="true">₹72,999</span>
            </span>
        "#;
        let session = SnapshotSession::new().with_page(AMAZON_URL, html);
        let mut scraper = scraper(SiteProfile::amazon(), session);

        let outcome = scraper.scrape(AMAZON_URL).await;
        assert_eq!(outcome.record.price, 72999.0);
        assert_eq!(
            outcome.provenance.price,
            FieldSource::Found {
                locator: "span.a-price[data-a-size=xl]".into()
            }
        );
    }

    #[tokio::test]
    async fn empty_availability_text_stays_unknown() {
        let html = r#"<span class="a-price-whole">999</span><div id="availability"> </div>"#;
        let session = SnapshotSession::new().with_page(AMAZON_URL, html);
        let mut scraper = scraper(SiteProfile::amazon(), session);

        let outcome = scraper.scrape(AMAZON_URL).await;
        assert_eq!(outcome.record.stock_status, "Unknown");
        assert_eq!(outcome.provenance.stock_status, FieldSource::ParseFailed);
    }

    #[test]
    fn profile_matches_platform_ignoring_case() {
        assert!(SiteProfile::amazon().matches("AMAZON"));
        assert!(!SiteProfile::flipkart().matches("amazon"));
    }

    #[tokio::test]
    async fn flipkart_stock_is_inferred_from_marker() {
        let in_stock = r#"
            <div class="hl05eU"><div class="Nx9bqj">₹65,999</div></div>
            <div class="XQDdHH">4.6</div>
            <span class="Y1HWO0">1,02,331 Ratings &amp; 5,642 Reviews</span>
        "#;
        let out_of_stock = r#"<div class="_16FRp0">Sold Out</div>"#;
        let other = "https://www.flipkart.com/p/itmOTHER";
        let session = SnapshotSession::new()
            .with_page(FLIPKART_URL, in_stock)
            .with_page(other, out_of_stock);
        let mut scraper = scraper(SiteProfile::flipkart(), session);

        let first = scraper.scrape(FLIPKART_URL).await;
        assert_eq!(first.record.platform, "Flipkart");
        assert_eq!(first.record.price, 65999.0);
        assert_eq!(first.record.stock_status, "In Stock");
        assert_eq!(first.record.rating, 4.6);
        assert_eq!(first.record.review_count, 102331);

        let second = scraper.scrape(other).await;
        assert_eq!(second.record.stock_status, "Out of Stock");
        assert_eq!(second.record.price, 0.0);
        assert_eq!(second.provenance.price, FieldSource::NotFound);
    }

    #[tokio::test]
    async fn navigation_failure_returns_partial_record() {
        let mut scraper = scraper(SiteProfile::flipkart(), SnapshotSession::new());

        let outcome = scraper.scrape(FLIPKART_URL).await;
        assert!(outcome.failure.is_some());
        assert_eq!(outcome.record.platform, "Flipkart");
        assert_eq!(outcome.record.url, FLIPKART_URL);
        assert_eq!(outcome.record.price, 0.0);
        assert_eq!(outcome.record.rating, 0.0);
        assert_eq!(outcome.record.review_count, 0);
        assert_eq!(outcome.record.stock_status, "Unknown");
        assert_eq!(outcome.provenance.defaulted().len(), 4);
        assert_eq!(outcome.provenance.price, FieldSource::Skipped);
    }

    #[tokio::test]
    async fn live_scrape_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let session = SnapshotSession::new().with_page(AMAZON_URL, "<p>snapshot body</p>");
        let mut scraper = scraper(SiteProfile::amazon(), session).with_snapshot_dir(dir.path());

        scraper.scrape(AMAZON_URL).await;
        let saved = std::fs::read_to_string(dir.path().join("amazon.html")).unwrap();
        assert!(saved.contains("snapshot body"));
    }

    #[test]
    fn settle_delay_stays_within_bounds() {
        let profile = SiteProfile::flipkart();
        for _ in 0..50 {
            let delay = profile.settle_delay();
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay <= Duration::from_millis(4000));
        }
        let mut fixed = SiteProfile::amazon();
        fixed.min_delay_ms = 0;
        fixed.max_delay_ms = 0;
        assert_eq!(fixed.settle_delay(), Duration::ZERO);
    }
}
