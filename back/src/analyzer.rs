//! Cross-platform comparison: runs every scraper, then summarizes the
//! records that carry a price.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Config, Target};
use crate::error::Result;
use crate::record::{now_timestamp, ProductRecord, ScrapeOutcome};
use crate::session::{BrowserSession, DriverProcess, Session, SnapshotSession};
use crate::site::SiteScraper;

pub const NO_VALID_PRICES: &str = "No valid prices found across platforms";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPrice {
    pub platform: String,
    pub price: f64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighestRated {
    pub platform: String,
    pub rating: f64,
    pub review_count: u64,
    pub url: String,
}

/// Aggregate over one run. The comparison fields are present only when at
/// least one record has a positive price; otherwise `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub timestamp: String,
    pub all_results: Vec<ProductRecord>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_price: Option<BestPrice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_rated: Option<HighestRated>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
}

/// Summarize `records`. Ties on price or rating go to the earliest record.
pub fn build_report(records: Vec<ProductRecord>) -> AnalysisReport {
    let (best_price, highest_rated, average) = {
        let valid: Vec<&ProductRecord> = records.iter().filter(|r| r.has_price()).collect();

        let cheapest = valid
            .iter()
            .copied()
            .reduce(|best, r| if r.price < best.price { r } else { best });
        let top_rated = valid
            .iter()
            .copied()
            .reduce(|best, r| if r.rating > best.rating { r } else { best });

        match (cheapest, top_rated) {
            (Some(cheapest), Some(top_rated)) => (
                Some(BestPrice {
                    platform: cheapest.platform.clone(),
                    price: cheapest.price,
                    url: cheapest.url.clone(),
                }),
                Some(HighestRated {
                    platform: top_rated.platform.clone(),
                    rating: top_rated.rating,
                    review_count: top_rated.review_count,
                    url: top_rated.url.clone(),
                }),
                Some(average_rating(&valid)),
            ),
            _ => (None, None, None),
        }
    };

    AnalysisReport {
        timestamp: now_timestamp(),
        error: best_price.is_none().then(|| NO_VALID_PRICES.to_string()),
        all_results: records,
        best_price,
        highest_rated,
        average_rating: average,
    }
}

/// Mean rating rounded to 2 decimals; 0 when nobody rated the product.
fn average_rating(valid: &[&ProductRecord]) -> f64 {
    if valid.is_empty() || !valid.iter().any(|r| r.rating > 0.0) {
        return 0.0;
    }
    let mean = valid.iter().map(|r| r.rating).sum::<f64>() / valid.len() as f64;
    (mean * 100.0).round() / 100.0
}

/// Owns one scraper (and so one session) per configured site.
pub struct ProductAnalyzer<S: Session> {
    scrapers: Vec<SiteScraper<S>>,
}

impl<S: Session> ProductAnalyzer<S> {
    pub fn new(scrapers: Vec<SiteScraper<S>>) -> Self {
        Self { scrapers }
    }

    pub fn platforms(&self) -> Vec<&str> {
        self.scrapers
            .iter()
            .map(|s| s.profile().platform.as_str())
            .collect()
    }

    /// Scrape every target, close all sessions and build the report.
    pub async fn run(self, targets: &[Target]) -> AnalysisReport {
        self.run_outcomes(targets).await.0
    }

    /// Like [`run`](Self::run), also returning each scrape's field provenance.
    pub async fn run_outcomes(
        mut self,
        targets: &[Target],
    ) -> (AnalysisReport, Vec<ScrapeOutcome>) {
        let outcomes = self.scrape_all(targets).await;
        self.close_all().await;

        let records = outcomes.iter().map(|o| o.record.clone()).collect();
        (build_report(records), outcomes)
    }

    async fn scrape_all(&mut self, targets: &[Target]) -> Vec<ScrapeOutcome> {
        let mut outcomes = Vec::with_capacity(targets.len());

        for target in targets {
            let Some(scraper) = self
                .scrapers
                .iter_mut()
                .find(|s| s.profile().matches(&target.platform))
            else {
                warn!("No scraper configured for platform '{}', skipping", target.platform);
                continue;
            };

            info!("Scraping {} at {}", target.platform, target.url);
            let outcome = scraper.scrape(&target.url).await;

            let defaulted = outcome.provenance.defaulted();
            if !defaulted.is_empty() {
                warn!(
                    "{}: fields left at defaults: {}",
                    outcome.record.platform,
                    defaulted.join(", ")
                );
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Close every session, used this run or not.
    async fn close_all(&mut self) {
        for scraper in &mut self.scrapers {
            scraper.close().await;
        }
    }
}

impl ProductAnalyzer<BrowserSession> {
    /// Open one browser session per configured site on `driver`.
    pub async fn launch(config: &Config, driver: &DriverProcess) -> Result<Self> {
        let mut scrapers: Vec<SiteScraper<BrowserSession>> =
            Vec::with_capacity(config.sites.len());

        for profile in &config.sites {
            let session = match BrowserSession::open(driver.server_url(), &config.driver).await {
                Ok(session) => session,
                Err(e) => {
                    for scraper in &mut scrapers {
                        scraper.close().await;
                    }
                    return Err(e);
                }
            };
            info!("Opened browser session for {}", profile.display_name);

            let mut scraper =
                SiteScraper::new(profile.clone(), session, config.driver.element_timeout());
            if let Some(dir) = &config.snapshot_dir {
                scraper = scraper.with_snapshot_dir(dir);
            }
            scrapers.push(scraper);
        }

        Ok(Self::new(scrapers))
    }
}

impl ProductAnalyzer<SnapshotSession> {
    /// Replay `<dir>/<platform>.html` for each target instead of a browser.
    pub async fn replay(config: &Config, dir: &Path) -> Result<Self> {
        let mut scrapers = Vec::with_capacity(config.sites.len());

        for profile in &config.sites {
            let mut session = SnapshotSession::new();
            let path = dir.join(format!("{}.html", profile.platform));

            for target in config.targets.iter().filter(|t| profile.matches(&t.platform)) {
                if tokio::fs::try_exists(&path).await? {
                    session = session.with_file(&target.url, &path).await?;
                } else {
                    warn!("No snapshot at {} for {}", path.display(), target.url);
                }
            }

            scrapers.push(
                SiteScraper::new(profile.clone(), session, config.driver.element_timeout())
                    .without_settle_delay(),
            );
        }

        Ok(Self::new(scrapers))
    }
}
