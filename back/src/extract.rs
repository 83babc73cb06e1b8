//! Field extraction over ordered fallback locator lists.
//!
//! Locators are tried in order; the first one that both matches an element
//! and yields text the parser accepts wins. A match with unparseable text is
//! skipped, not treated as an error.

use std::time::Duration;

use tracing::debug;

use crate::record::FieldSource;
use crate::session::Session;

/// A field value together with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
    pub value: T,
    pub source: FieldSource,
}

/// Trimmed text of `element`, or an empty string if it is absent or unreadable.
pub async fn extract_text<S: Session>(session: &S, element: Option<&S::Element>) -> String {
    let Some(element) = element else {
        return String::new();
    };
    match session.element_text(element).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            debug!("Could not read element text: {}", e);
            String::new()
        }
    }
}

/// Probe `locators` in order and return the first value `parse` accepts,
/// or `default` when every locator is absent or unparseable.
pub async fn extract_first_parseable<S, T, L, F>(
    session: &S,
    locators: &[L],
    timeout: Duration,
    parse: F,
    default: T,
) -> Extraction<T>
where
    S: Session,
    L: AsRef<str>,
    F: Fn(&str) -> Option<T>,
{
    let mut matched_any = false;

    for locator in locators {
        let locator = locator.as_ref();
        let Some(element) = session.find_with_timeout(locator, timeout).await else {
            debug!("Locator '{}' matched nothing", locator);
            continue;
        };
        matched_any = true;

        let text = extract_text(session, Some(&element)).await;
        match parse(&text) {
            Some(value) => {
                return Extraction {
                    value,
                    source: FieldSource::Found {
                        locator: locator.to_string(),
                    },
                };
            }
            None => debug!("Locator '{}' gave unparseable text '{}'", locator, text),
        }
    }

    Extraction {
        value: default,
        source: if matched_any {
            FieldSource::ParseFailed
        } else {
            FieldSource::NotFound
        },
    }
}

/// Parse a price after stripping currency symbols and thousands separators.
pub fn parse_price<S: AsRef<str>>(text: &str, currency_symbols: &[S]) -> Option<f64> {
    let mut cleaned = text.replace(',', "");
    for symbol in currency_symbols {
        cleaned = cleaned.replace(symbol.as_ref(), "");
    }
    let price: f64 = cleaned.trim().parse().ok()?;
    (price.is_finite() && price >= 0.0).then_some(price)
}

/// Parse a 0-5 rating from the first token, e.g. "4.5 out of 5 stars".
pub fn parse_rating(text: &str) -> Option<f64> {
    let rating: f64 = text.split_whitespace().next()?.parse().ok()?;
    (0.0..=5.0).contains(&rating).then_some(rating)
}

/// Parse a count from the first token, e.g. "12,345 ratings".
pub fn parse_review_count(text: &str) -> Option<u64> {
    text.split_whitespace().next()?.replace(',', "").parse().ok()
}
