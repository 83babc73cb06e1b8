//! Live scrapes through a real browser driver.
//!
//! These need msedgedriver (or PRICEWATCH_DRIVER) and network access, so they
//! are ignored by default: `cargo test -- --ignored`.

use std::time::Duration;

use pricewatch::session::{BrowserSession, DriverProcess, Session};
use pricewatch::{Config, ProductAnalyzer};
use tokio::time::timeout;

#[tokio::test]
#[ignore] // Requires a browser driver executable
async fn test_open_navigate_and_close() {
    let config = Config::default();
    let mut driver = match DriverProcess::launch(&config.driver).await {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Skipping test: {}", e);
            return;
        }
    };

    let mut session = BrowserSession::open(driver.server_url(), &config.driver)
        .await
        .expect("session should open");
    session.navigate("https://example.com").await.unwrap();

    let heading = session
        .find_with_timeout("h1", Duration::from_secs(5))
        .await
        .expect("example.com has a heading");
    assert!(!session.element_text(&heading).await.unwrap().is_empty());
    assert!(
        session
            .find_with_timeout("div.does-not-exist", Duration::from_secs(1))
            .await
            .is_none()
    );

    session.close().await;
    session.close().await;
    driver.shutdown().await;
}

#[tokio::test]
#[ignore] // Requires a browser driver executable and network access
async fn test_full_run_produces_report() {
    let config = Config::default();
    let mut driver = match DriverProcess::launch(&config.driver).await {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Skipping test: {}", e);
            return;
        }
    };

    let analyzer = ProductAnalyzer::launch(&config, &driver).await.unwrap();
    let report = timeout(Duration::from_secs(180), analyzer.run(&config.targets))
        .await
        .expect("run timed out");

    assert_eq!(report.all_results.len(), config.targets.len());
    for record in &report.all_results {
        assert!(record.price >= 0.0);
        assert!((0.0..=5.0).contains(&record.rating));
    }
    driver.shutdown().await;
}
