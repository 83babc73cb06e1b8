//! Live browser sessions over WebDriver.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::Session;
use crate::config::{Browser, DriverConfig};
use crate::error::{PricewatchError, Result};

/// Window and popup flags passed to every browser launch.
const BROWSER_ARGS: [&str; 3] = [
    "--start-maximized",
    "--disable-notifications",
    "--disable-popup-blocking",
];

/// The browser driver executable, running for as long as this value lives.
pub struct DriverProcess {
    child: Option<Child>,
    server_url: String,
}

impl DriverProcess {
    /// Launch the driver and wait until its status endpoint answers.
    pub async fn launch(config: &DriverConfig) -> Result<Self> {
        if !config.executable.exists() {
            return Err(PricewatchError::DriverNotFound(config.executable.clone()));
        }

        info!(
            "Starting browser driver {} on port {}",
            config.executable.display(),
            config.port
        );
        let child = Command::new(&config.executable)
            .arg(format!("--port={}", config.port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PricewatchError::DriverNotFound(config.executable.clone())
                } else {
                    PricewatchError::Io(e)
                }
            })?;

        let process = Self {
            child: Some(child),
            server_url: config.server_url(),
        };
        process.wait_ready(config.startup_timeout_secs).await?;
        Ok(process)
    }

    async fn wait_ready(&self, timeout_secs: u64) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;
        let status_url = format!("{}/status", self.server_url);
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);

        loop {
            match client.get(&status_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("Driver ready at {}", self.server_url);
                    return Ok(());
                }
                Ok(resp) => debug!("Driver status returned {}", resp.status()),
                Err(e) => debug!("Driver not answering yet: {}", e),
            }

            if Instant::now() >= deadline {
                return Err(PricewatchError::DriverStartup(timeout_secs));
            }
            sleep(Duration::from_millis(250)).await;
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Stop the driver process. Errors are logged, not returned.
    pub async fn shutdown(&mut self) {
        if let Some(mut child) = self.child.take() {
            info!("Stopping browser driver");
            if let Err(e) = child.kill().await {
                warn!("Failed to stop browser driver: {}", e);
            }
        }
    }
}

/// One browser window driven over WebDriver.
pub struct BrowserSession {
    driver: Option<WebDriver>,
    poll_interval: Duration,
}

impl BrowserSession {
    /// Open a new browser window on the driver at `server_url`.
    pub async fn open(server_url: &str, config: &DriverConfig) -> Result<Self> {
        let driver = match config.browser {
            Browser::Edge => {
                let mut caps = DesiredCapabilities::edge();
                suppress_automation(&mut caps, config.headless)?;
                WebDriver::new(server_url, caps).await?
            }
            Browser::Chrome => {
                let mut caps = DesiredCapabilities::chrome();
                suppress_automation(&mut caps, config.headless)?;
                WebDriver::new(server_url, caps).await?
            }
        };

        Ok(Self {
            driver: Some(driver),
            poll_interval: config.poll_interval(),
        })
    }

    fn driver(&self) -> Option<&WebDriver> {
        self.driver.as_ref()
    }
}

fn suppress_automation<C>(caps: &mut C, headless: bool) -> WebDriverResult<()>
where
    C: ChromiumLikeCapabilities,
{
    for arg in BROWSER_ARGS {
        caps.add_arg(arg)?;
    }
    if headless {
        caps.add_arg("--headless=new")?;
    }
    caps.add_exclude_switch("enable-automation")?;
    caps.add_experimental_option("useAutomationExtension", false)?;
    Ok(())
}

#[async_trait]
impl Session for BrowserSession {
    type Element = WebElement;

    async fn navigate(&mut self, url: &str) -> Result<()> {
        let driver = self
            .driver()
            .ok_or_else(|| PricewatchError::navigation(url, "session already closed"))?;
        driver
            .goto(url)
            .await
            .map_err(|e| PricewatchError::navigation(url, e))
    }

    async fn find_with_timeout(&self, locator: &str, timeout: Duration) -> Option<WebElement> {
        let driver = self.driver()?;
        match driver
            .query(By::Css(locator))
            .wait(timeout, self.poll_interval)
            .first_opt()
            .await
        {
            Ok(element) => element,
            Err(e) => {
                debug!("Lookup of '{}' failed: {}", locator, e);
                None
            }
        }
    }

    async fn element_text(&self, element: &WebElement) -> Result<String> {
        Ok(element.text().await?)
    }

    async fn page_source(&self) -> Result<String> {
        match self.driver() {
            Some(driver) => Ok(driver.source().await?),
            None => Err(PricewatchError::navigation("", "session already closed")),
        }
    }

    async fn close(&mut self) {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.quit().await {
                debug!("Ignoring error while closing browser session: {}", e);
            }
        }
    }
}
