use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pricewatch::config::Browser;
use pricewatch::session::DriverProcess;
use pricewatch::{report, Config, ProductAnalyzer, Target};

/// Compare one product's price and rating across retailers
#[derive(Parser, Debug)]
#[command(name = "pricewatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Product page as platform=url; repeat to compare several platforms
    #[arg(long = "target", short = 't', value_name = "PLATFORM=URL", value_parser = parse_target)]
    targets: Vec<Target>,

    /// Browser driver executable
    #[arg(long)]
    driver: Option<PathBuf>,

    /// Browser to drive (edge or chrome)
    #[arg(long, value_parser = parse_browser)]
    browser: Option<Browser>,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Scrape saved <platform>.html files from this directory instead of a browser
    #[arg(long, value_name = "DIR")]
    replay: Option<PathBuf>,

    /// Save each scraped page's HTML into this directory
    #[arg(long, value_name = "DIR")]
    save_snapshots: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,
}

fn parse_target(s: &str) -> Result<Target, String> {
    Target::parse_pair(s).map_err(|e| e.to_string())
}

fn parse_browser(s: &str) -> Result<Browser, String> {
    s.parse().map_err(|e: pricewatch::PricewatchError| e.to_string())
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let mut config = Config::load(args.config.as_deref())?;

    if let Some(output) = args.output {
        config.output = output;
    }
    if !args.targets.is_empty() {
        config.targets = args.targets;
    }
    if let Some(driver) = args.driver {
        config.driver.executable = driver;
    }
    if let Some(browser) = args.browser {
        config.driver.browser = browser;
    }
    if args.headless {
        config.driver.headless = true;
    }
    if args.save_snapshots.is_some() {
        config.snapshot_dir = args.save_snapshots;
    }

    println!("🛒 Price Comparison\n");
    println!("{}", "=".repeat(60));
    for target in &config.targets {
        println!("  📦 {}: {}", target.platform, target.url);
    }
    println!("{}", "=".repeat(60));

    let report = match &args.replay {
        Some(dir) => {
            let analyzer = ProductAnalyzer::replay(&config, dir).await?;
            analyzer.run(&config.targets).await
        }
        None => {
            let mut driver = DriverProcess::launch(&config.driver).await?;
            let analyzer = ProductAnalyzer::launch(&config, &driver).await?;
            let report = analyzer.run(&config.targets).await;
            driver.shutdown().await;
            report
        }
    };

    report::write_report(&report, &config.output);
    report::print_summary(&report);

    Ok(())
}
