//! # Order Dashboard
//!
//! Presentation layer for the order analytics engine: loads the dataset
//! once per session, recomputes every panel whenever the date range
//! changes and renders the result.
//!
//! ## Outputs
//!
//! - Markdown tables
//! - Full JSON report
//! - One interactive ECharts HTML page per chart

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod charts;
pub mod config;
pub mod error;
pub mod output;
pub mod session;

pub use config::{Config, OutputFormat};
pub use error::{DashboardError, Result};
pub use session::{Command, DashboardSession};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
