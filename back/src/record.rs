//! Scraped product records and the provenance attached to each field.

use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";
pub const IN_STOCK: &str = "In Stock";
pub const OUT_OF_STOCK: &str = "Out of Stock";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local wall-clock time in the format used by records and reports.
pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// One scraped observation of a product on one platform.
///
/// Every field has a sentinel default, so a record is complete even when
/// nothing could be read from the page. `price == 0.0` means "not found".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub price: f64,
    pub stock_status: String,
    pub rating: f64,
    pub review_count: u64,
    pub seller: String,
    pub platform: String,
    pub url: String,
    pub timestamp: String,
}

impl ProductRecord {
    /// A record with every extracted field at its sentinel value.
    pub fn new(platform: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            price: 0.0,
            stock_status: UNKNOWN.to_string(),
            rating: 0.0,
            review_count: 0,
            seller: UNKNOWN.to_string(),
            platform: platform.into(),
            url: url.into(),
            timestamp: now_timestamp(),
        }
    }

    pub fn has_price(&self) -> bool {
        self.price > 0.0
    }
}

/// How a field of a [`ProductRecord`] got its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FieldSource {
    /// Read and parsed from the element matched by `locator`
    Found { locator: String },
    /// Derived from whether `locator` matched, not from its text
    Inferred { locator: String },
    /// At least one locator matched but none of the texts parsed
    ParseFailed,
    /// No locator matched within the timeout
    NotFound,
    /// The scrape aborted before this field was attempted
    #[default]
    Skipped,
}

impl FieldSource {
    /// True when the field still holds its sentinel default.
    pub fn is_default(&self) -> bool {
        matches!(self, Self::ParseFailed | Self::NotFound | Self::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldProvenance {
    pub price: FieldSource,
    pub stock_status: FieldSource,
    pub rating: FieldSource,
    pub review_count: FieldSource,
}

impl FieldProvenance {
    /// Names of the fields left at their defaults, in record order.
    pub fn defaulted(&self) -> Vec<&'static str> {
        [
            ("price", &self.price),
            ("stock_status", &self.stock_status),
            ("rating", &self.rating),
            ("review_count", &self.review_count),
        ]
        .into_iter()
        .filter(|(_, source)| source.is_default())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Result of scraping one URL: the record plus where each value came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOutcome {
    pub record: ProductRecord,
    pub provenance: FieldProvenance,
    /// Set when the scrape aborted early (navigation failure, driver crash)
    pub failure: Option<String>,
}

impl ScrapeOutcome {
    pub fn new(record: ProductRecord) -> Self {
        Self {
            record,
            provenance: FieldProvenance::default(),
            failure: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_all_sentinels() {
        let record = ProductRecord::new("Amazon", "https://example.com/p/1");
        assert_eq!(record.price, 0.0);
        assert_eq!(record.stock_status, "Unknown");
        assert_eq!(record.rating, 0.0);
        assert_eq!(record.review_count, 0);
        assert_eq!(record.seller, "Unknown");
        assert_eq!(record.platform, "Amazon");
        assert!(!record.has_price());
        assert_eq!(record.timestamp.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn record_serializes_with_snake_case_keys_in_order() {
        let record = ProductRecord::new("Flipkart", "https://example.com");
        let json = serde_json::to_string(&record).unwrap();
        let keys = [
            "\"price\"",
            "\"stock_status\"",
            "\"rating\"",
            "\"review_count\"",
            "\"seller\"",
            "\"platform\"",
            "\"url\"",
            "\"timestamp\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn defaulted_lists_only_unresolved_fields() {
        let provenance = FieldProvenance {
            price: FieldSource::Found {
                locator: "span.a-price-whole".into(),
            },
            stock_status: FieldSource::Inferred {
                locator: "._16FRp0".into(),
            },
            rating: FieldSource::ParseFailed,
            review_count: FieldSource::NotFound,
        };
        assert_eq!(provenance.defaulted(), vec!["rating", "review_count"]);
        assert_eq!(FieldProvenance::default().defaulted().len(), 4);
    }
}
