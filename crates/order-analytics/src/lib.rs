//! # Order Analytics
//!
//! OLAP analytics engine for customer purchase analysis.
//! Uses DuckDB for columnar storage and grouped aggregation over the
//! order dataset, re-run for every date range the user selects.
//!
//! ## Features
//!
//! - Daily order volume
//! - Repeat-purchase rate by region
//! - Product, category and payment method ratings
//! - Delivery time and return rate against review score
//! - RFM (recency, frequency, monetary) customer segmentation

#![forbid(unsafe_code)]
#![warn(clippy::all, missing_docs)]

pub mod engine;
pub mod error;
pub mod queries;
pub mod reports;
pub mod rfm;
pub mod stats;

pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use reports::{DashboardMetrics, DashboardReport};
pub use rfm::RfmRow;
