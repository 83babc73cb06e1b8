//! Page sessions
//!
//! A session is one page-loading context: a live WebDriver browser window
//! ([`browser::BrowserSession`]) or saved HTML replayed offline
//! ([`snapshot::SnapshotSession`]). Scrapers only talk to the [`Session`] trait.

pub mod browser;
pub mod snapshot;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use browser::{BrowserSession, DriverProcess};
pub use snapshot::SnapshotSession;

#[async_trait]
pub trait Session: Send + Sync {
    /// Handle to an element found on the current page
    type Element: Send + Sync;

    /// Load `url` into this session.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Wait up to `timeout` for an element matching the CSS `locator`.
    /// Returns `None` on timeout or an invalid selector; never errors.
    async fn find_with_timeout(&self, locator: &str, timeout: Duration) -> Option<Self::Element>;

    /// Visible text of `element`.
    async fn element_text(&self, element: &Self::Element) -> Result<String>;

    /// HTML source of the current page.
    async fn page_source(&self) -> Result<String>;

    /// Release the session. Calling it again, or on a dead session, is harmless.
    async fn close(&mut self);
}
