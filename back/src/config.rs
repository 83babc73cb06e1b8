//! Configuration for pricewatch
//!
//! Sources, highest priority first: CLI overrides (applied by the binary),
//! a TOML config file, then defaults. Defaults read `PRICEWATCH_*`
//! environment variables, and a `.env` file is honoured.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PricewatchError, Result};
use crate::site::SiteProfile;

pub const DEFAULT_OUTPUT: &str = "product_analysis.json";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the JSON report is written
    pub output: PathBuf,
    /// When set, live runs save each page's HTML here
    pub snapshot_dir: Option<PathBuf>,
    /// Browser driver settings
    pub driver: DriverConfig,
    /// Product pages to compare, scraped in this order
    pub targets: Vec<Target>,
    /// Site profiles (locator lists, delays) keyed by platform
    pub sites: Vec<SiteProfile>,
}

/// One product page on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub platform: String,
    pub url: String,
}

impl Target {
    pub fn new(platform: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            url: url.into(),
        }
    }

    /// Parse a `platform=url` pair as given on the command line.
    pub fn parse_pair(pair: &str) -> Result<Self> {
        match pair.split_once('=') {
            Some((platform, url)) if !platform.trim().is_empty() && !url.trim().is_empty() => {
                Ok(Self::new(platform.trim().to_lowercase(), url.trim()))
            }
            _ => Err(PricewatchError::config(format!(
                "expected platform=url, got '{}'",
                pair
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Edge,
    Chrome,
}

impl std::str::FromStr for Browser {
    type Err = PricewatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "edge" | "msedge" => Ok(Self::Edge),
            "chrome" | "chromium" => Ok(Self::Chrome),
            other => Err(PricewatchError::config(format!(
                "unsupported browser '{}'",
                other
            ))),
        }
    }
}

/// Browser driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Path to the driver executable (msedgedriver / chromedriver)
    pub executable: PathBuf,
    pub browser: Browser,
    /// Port the driver listens on
    pub port: u16,
    /// Run without a visible window
    pub headless: bool,
    /// How long a single element lookup may wait
    pub element_timeout_secs: u64,
    /// Poll interval for element lookups
    pub poll_interval_ms: u64,
    /// How long to wait for the driver's status endpoint after launch
    pub startup_timeout_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            executable: env::var("PRICEWATCH_DRIVER")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./msedgedriver")),
            browser: env::var("PRICEWATCH_BROWSER")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(Browser::Edge),
            port: env::var("PRICEWATCH_DRIVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(9515),
            headless: env::var("PRICEWATCH_HEADLESS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            element_timeout_secs: 10,
            poll_interval_ms: 500,
            startup_timeout_secs: 30,
        }
    }
}

impl DriverConfig {
    pub fn server_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: env::var("PRICEWATCH_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT)),
            snapshot_dir: env::var("PRICEWATCH_SNAPSHOT_DIR").ok().map(PathBuf::from),
            driver: DriverConfig::default(),
            targets: default_targets(),
            sites: vec![SiteProfile::amazon(), SiteProfile::flipkart()],
        }
    }
}

fn default_targets() -> Vec<Target> {
    vec![
        Target::new(
            "amazon",
            "https://www.amazon.in/Apple-iPhone-15-128GB-Black/dp/B0CHX3QBCH",
        ),
        Target::new(
            "flipkart",
            "https://www.flipkart.com/apple-iphone-15-black-128-gb/p/itm6ac6485515ae4",
        ),
    ]
}

impl Config {
    /// Load configuration from an optional file, environment, and defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a TOML file; missing keys fall back to defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PricewatchError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| PricewatchError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs that would make every scrape meaningless.
    pub fn validate(&self) -> Result<()> {
        for site in &self.sites {
            if site.platform.trim().is_empty() {
                return Err(PricewatchError::config("site profile with empty platform"));
            }
            if site.price_locators.is_empty() {
                return Err(PricewatchError::config(format!(
                    "site '{}' has no price locators",
                    site.platform
                )));
            }
        }
        Ok(())
    }

    pub fn default_config_toml() -> String {
        toml::to_string_pretty(&Config::default())
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}
