//! Analytics error types.

use std::path::PathBuf;
use thiserror::Error;

/// Analytics errors.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// DuckDB error
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Dataset could not be loaded
    #[error("Failed to load {path}: {reason}")]
    Load {
        /// File that was being loaded
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Input file lacks required columns
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Data conversion error
    #[error("Data conversion error: {0}")]
    Conversion(String),

    /// Domain rule violated
    #[error(transparent)]
    Domain(#[from] order_domain::DomainError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    /// Whether the error happened while loading the dataset, before any
    /// metric could be computed.
    #[must_use]
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::MissingColumns(_) | Self::Io(_))
    }
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
