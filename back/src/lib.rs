//! pricewatch - compare one product across Amazon and Flipkart
//!
//! Each platform's product page is loaded in its own browser session, price,
//! stock, rating and review count are read through ordered fallback CSS
//! locators, and the records are summarized into a JSON report.
//!
//! - **session**: WebDriver browser sessions and offline HTML replay
//! - **extract**: first-parseable-locator field extraction
//! - **site**: per-retailer profiles and the scrape sequence
//! - **analyzer**: runs the scrapers and builds the comparison
//! - **report**: JSON output and console summary

pub mod analyzer;
pub mod config;
pub mod error;
pub mod extract;
pub mod record;
pub mod report;
pub mod session;
pub mod site;

pub use analyzer::{AnalysisReport, ProductAnalyzer};
pub use config::{Config, Target};
pub use error::{PricewatchError, Result};
pub use record::{ProductRecord, ScrapeOutcome};
