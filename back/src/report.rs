//! Report output: the JSON file and the console summary.

use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{error, info};

use crate::analyzer::AnalysisReport;
use crate::error::Result;

const RULE_WIDTH: usize = 50;

/// Serialize `report` as 4-space indented JSON. Non-ASCII text is written as is.
pub fn to_json(report: &AnalysisReport) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    report.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write `report` to `path`, returning any IO or serialization error.
pub fn save_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    let json = to_json(report)?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(json.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Write `report` to `path`; failures are logged and otherwise ignored.
pub fn write_report(report: &AnalysisReport, path: &Path) {
    match save_report(report, path) {
        Ok(()) => info!("Analysis saved to {}", path.display()),
        Err(e) => error!("Error saving analysis to {}: {}", path.display(), e),
    }
}

/// `1234567` -> `"1,234,567"`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `79900.0` -> `"₹79,900.00"`
pub fn format_rupees(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let whole = whole.parse::<u64>().map(group_thousands).unwrap_or_else(|_| whole.to_string());
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}₹{}.{}", sign, whole, frac)
}

/// Human-readable summary of `report`.
pub fn format_summary(report: &AnalysisReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_summary(&mut out, report);
    out
}

fn write_summary(out: &mut String, report: &AnalysisReport) -> fmt::Result {
    let rule = "-".repeat(RULE_WIDTH);

    writeln!(out, "\nAnalysis Summary:")?;
    writeln!(out, "{}", rule)?;

    if let Some(err) = &report.error {
        writeln!(out, "Error: {}", err)?;
    } else {
        if let Some(best) = &report.best_price {
            writeln!(out, "\nBest Price:")?;
            writeln!(out, "Platform: {}", best.platform)?;
            writeln!(out, "Price: {}", format_rupees(best.price))?;
        }
        if let Some(rated) = &report.highest_rated {
            writeln!(out, "\nHighest Rated:")?;
            writeln!(out, "Platform: {}", rated.platform)?;
            writeln!(out, "Rating: {:?}/5.0", rated.rating)?;
            writeln!(out, "Review Count: {}", group_thousands(rated.review_count))?;
        }
        if let Some(avg) = report.average_rating {
            writeln!(out, "\nAverage Rating Across Platforms: {:?}/5.0", avg)?;
        }
    }

    writeln!(out, "\nDetailed Results:")?;
    writeln!(out, "{}", rule)?;
    for record in &report.all_results {
        writeln!(out, "\nPlatform: {}", record.platform)?;
        writeln!(out, "Price: {}", format_rupees(record.price))?;
        writeln!(out, "Stock Status: {}", record.stock_status)?;
        writeln!(out, "Rating: {:?}/5.0", record.rating)?;
        writeln!(out, "Review Count: {}", group_thousands(record.review_count))?;
        writeln!(out, "Seller: {}", record.seller)?;
    }

    Ok(())
}

pub fn print_summary(report: &AnalysisReport) {
    print!("{}", format_summary(report));
}
