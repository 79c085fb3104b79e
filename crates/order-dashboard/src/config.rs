//! # Dashboard Configuration
//!
//! Environment-based configuration; command line flags override it.

use crate::error::DashboardError;
use clap::ValueEnum;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// How the panels are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Markdown tables on stdout
    #[default]
    Markdown,
    /// Full report as JSON on stdout
    Json,
    /// ECharts HTML pages in the output directory, summary on stdout
    Html,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            other => Err(DashboardError::Config(format!("unknown output format: {other}"))),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Order dataset to load
    pub data_path: PathBuf,

    /// Where HTML charts are written
    pub output_dir: PathBuf,

    /// Panel rendering
    pub format: OutputFormat,

    /// Logging level
    pub log_level: String,

    /// Emit logs as JSON
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            data_path: env::var("ORDERS_CSV")
                .unwrap_or_else(|_| "main_data.csv".to_string())
                .into(),

            output_dir: env::var("DASHBOARD_OUTPUT_DIR")
                .unwrap_or_else(|_| "dashboard-out".to_string())
                .into(),

            format: env::var("DASHBOARD_FORMAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            log_json: env::var("LOG_JSON")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
