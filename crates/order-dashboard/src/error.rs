//! # Dashboard Error Types

use thiserror::Error;

/// Dashboard-level errors
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Analytics(#[from] order_analytics::AnalyticsError),

    #[error(transparent)]
    Domain(#[from] order_domain::DomainError),

    #[error("Chart rendering failed for {chart}: {reason}")]
    Chart { chart: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, DashboardError>;
