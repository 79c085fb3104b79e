//! # Panel Output
//!
//! Turns a report into what the user sees for the selected format.

use crate::charts;
use crate::config::OutputFormat;
use crate::error::Result;
use order_analytics::DashboardReport;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Render a report. Markdown and JSON are returned as text; HTML charts
/// are written to `output_dir` and a Markdown summary listing them is
/// returned.
pub fn render(report: &DashboardReport, format: OutputFormat, output_dir: &Path) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(report.to_markdown()),
        OutputFormat::Json => Ok(report.to_json()?),
        OutputFormat::Html => {
            let paths = charts::write_html(report, output_dir)?;
            info!(
                charts = paths.len(),
                dir = %output_dir.display(),
                "Rendered chart panels"
            );

            let mut out = report.to_markdown();
            out.push_str("## Charts\n\n");
            for path in &paths {
                let _ = writeln!(out, "- {}", path.display());
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_analytics::AnalyticsEngine;
    use order_domain::DateRange;

    fn empty_report() -> DashboardReport {
        let engine = AnalyticsEngine::new_in_memory().unwrap();
        let range = DateRange::parse("2023-01-01 2023-01-31").unwrap();
        engine.generate_report(&range).unwrap()
    }

    #[test]
    fn test_json_output_parses() {
        let dir = tempfile::tempdir().unwrap();
        let out = render(&empty_report(), OutputFormat::Json, dir.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["overview"]["total_orders"], 0);
    }

    #[test]
    fn test_html_output_lists_charts() {
        let dir = tempfile::tempdir().unwrap();
        let out = render(&empty_report(), OutputFormat::Html, dir.path()).unwrap();
        assert!(out.contains("## Charts"));
        assert!(out.contains("08-rfm-monetary.html"));
        assert!(dir.path().join("01-daily-orders.html").exists());
    }
}
