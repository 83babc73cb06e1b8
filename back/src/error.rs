//! Error types shared by the scraper, the driver plumbing and the report writer.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for pricewatch operations
#[derive(Error, Debug)]
pub enum PricewatchError {
    /// WebDriver protocol or session errors
    #[error("WebDriver error: {0}")]
    Driver(#[from] thirtyfour::error::WebDriverError),

    /// A page could not be loaded
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The driver executable is not where the config says it is
    #[error("Browser driver not found at {}", .0.display())]
    DriverNotFound(PathBuf),

    /// The driver process started but never answered on its status endpoint
    #[error("Browser driver did not become ready within {0}s")]
    DriverStartup(u64),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP errors from the driver status probe
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for pricewatch operations
pub type Result<T> = std::result::Result<T, PricewatchError>;

impl PricewatchError {
    pub fn navigation(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Navigation {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
