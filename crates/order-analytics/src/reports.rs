//! Dashboard metric bundle and report generation.

use crate::engine::AnalyticsEngine;
use crate::error::{AnalyticsError, Result};
use crate::queries::{
    self, CustomerPurchases, DailyOrders, DeliveryTimeRow, Overview, RatingRow, RegionRepeatRate,
    ReturnRateRow,
};
use crate::rfm::{self, RfmRow};
use order_domain::DateRange;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Regions shown in the repeat-purchase panel.
pub const TOP_REGIONS: usize = 10;
/// Products and categories shown in the rating bar charts.
pub const TOP_RATED: usize = 10;
/// Rows previewed in rating and RFM tables.
pub const TABLE_PREVIEW: usize = 5;
/// Customers per RFM bar chart.
pub const TOP_RFM: usize = 5;

/// Every aggregate for one date range. Metrics are independent of each
/// other; the whole bundle is recomputed when the range changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    /// Range the metrics were computed for
    pub range: DateRange,
    /// Distinct orders, rows and revenue
    pub overview: Overview,
    /// Orders per purchase day, oldest first
    pub daily_orders: Vec<DailyOrders>,
    /// Purchase count and spend per customer
    pub customers: Vec<CustomerPurchases>,
    /// Every region with at least one repeat customer
    pub regions: Vec<RegionRepeatRate>,
    /// Mean review score per product
    pub product_ratings: Vec<RatingRow>,
    /// Mean review score per category
    pub category_ratings: Vec<RatingRow>,
    /// Mean review score per payment type
    pub payment_ratings: Vec<RatingRow>,
    /// Per-product delivery time and review score
    pub delivery_times: Vec<DeliveryTimeRow>,
    /// Pearson r over `delivery_times`
    pub delivery_review_correlation: Option<f64>,
    /// Per-product return rate, lowest first
    pub return_rates: Vec<ReturnRateRow>,
    /// Pearson r over `return_rates`
    pub return_review_correlation: Option<f64>,
    /// One RFM row per customer
    pub rfm: Vec<RfmRow>,
}

impl DashboardMetrics {
    /// Whether the date range matched no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overview.total_rows == 0
    }
}

/// Panel 1: order volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewPanel {
    /// Distinct orders in the range
    pub total_orders: i64,
    /// Line chart series
    pub daily_orders: Vec<DailyOrders>,
}

/// Panel 3: best rated products and categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingsPanel {
    /// Highest mean score first
    pub top_products: Vec<RatingRow>,
    /// Highest mean score first
    pub top_categories: Vec<RatingRow>,
}

/// Panel 6: delivery time against review score, one point per product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPanel {
    /// Delivered products only
    pub points: Vec<DeliveryTimeRow>,
    /// `None` when undefined
    pub correlation: Option<f64>,
}

/// Panel 7: return rate against review score, one point per product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnPanel {
    /// Lowest return rate first
    pub points: Vec<ReturnRateRow>,
    /// `None` when undefined
    pub correlation: Option<f64>,
}

/// Panel 8: RFM table and best customers per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmPanel {
    /// Full table
    pub customers: Vec<RfmRow>,
    /// Most recent buyers
    pub top_recency: Vec<RfmRow>,
    /// Most distinct orders
    pub top_frequency: Vec<RfmRow>,
    /// Highest spend
    pub top_monetary: Vec<RfmRow>,
}

/// The eight dashboard panels, sliced for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    /// RFC 3339 timestamp
    pub generated_at: String,
    /// Applied date range
    pub range: DateRange,
    /// Panel 1
    pub overview: OverviewPanel,
    /// Panel 2
    pub top_regions: Vec<RegionRepeatRate>,
    /// Panel 3
    pub ratings: RatingsPanel,
    /// Panel 4
    pub spend_vs_frequency: Vec<CustomerPurchases>,
    /// Panel 5
    pub payment_ratings: Vec<RatingRow>,
    /// Panel 6
    pub delivery_vs_review: DeliveryPanel,
    /// Panel 7
    pub returns_vs_review: ReturnPanel,
    /// Panel 8
    pub rfm: RfmPanel,
}

impl DashboardReport {
    /// Slice a metric bundle into panels. Short or empty tables are kept
    /// as they are.
    #[must_use]
    pub fn from_metrics(metrics: &DashboardMetrics) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            range: metrics.range,
            overview: OverviewPanel {
                total_orders: metrics.overview.total_orders,
                daily_orders: metrics.daily_orders.clone(),
            },
            top_regions: head(&metrics.regions, TOP_REGIONS),
            ratings: RatingsPanel {
                top_products: head(&metrics.product_ratings, TOP_RATED),
                top_categories: head(&metrics.category_ratings, TOP_RATED),
            },
            spend_vs_frequency: metrics.customers.clone(),
            payment_ratings: metrics.payment_ratings.clone(),
            delivery_vs_review: DeliveryPanel {
                points: metrics.delivery_times.clone(),
                correlation: metrics.delivery_review_correlation,
            },
            returns_vs_review: ReturnPanel {
                points: metrics.return_rates.clone(),
                correlation: metrics.return_review_correlation,
            },
            rfm: RfmPanel {
                customers: metrics.rfm.clone(),
                top_recency: rfm::top_by_recency(&metrics.rfm, TOP_RFM),
                top_frequency: rfm::top_by_frequency(&metrics.rfm, TOP_RFM),
                top_monetary: rfm::top_by_monetary(&metrics.rfm, TOP_RFM),
            },
        }
    }

    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| AnalyticsError::Conversion(e.to_string()))
    }

    /// Render the report as Markdown tables.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# Customer Purchase Analytics Dashboard\n\n");
        md.push_str(&format!("**Generated:** {}\n\n", self.generated_at));
        md.push_str(&format!("**Date range:** {}\n\n", self.range));

        md.push_str("## Overview\n\n");
        md.push_str(&format!("**Total orders:** {}\n\n", self.overview.total_orders));
        if !self.overview.daily_orders.is_empty() {
            md.push_str("| Date | Orders |\n");
            md.push_str("|------|--------|\n");
            for day in &self.overview.daily_orders {
                md.push_str(&format!("| {} | {} |\n", day.order_date, day.order_count));
            }
            md.push('\n');
        }

        md.push_str("## Top 10 Regions by Repeat Purchases\n\n");
        if self.top_regions.is_empty() {
            md.push_str("_No repeat customers in this range._\n\n");
        } else {
            md.push_str("| Rank | State | City | Avg Purchases | Repeat Customers |\n");
            md.push_str("|------|-------|------|---------------|------------------|\n");
            for (i, region) in self.top_regions.iter().enumerate() {
                md.push_str(&format!(
                    "| {} | {} | {} | {:.2} | {} |\n",
                    i + 1,
                    region.customer_state,
                    region.customer_city,
                    region.avg_purchase_count,
                    region.repeat_customers
                ));
            }
            md.push('\n');
        }

        md.push_str("## Highest Rated Products\n\n");
        push_rating_table(&mut md, "Product", &head(&self.ratings.top_products, TABLE_PREVIEW));
        md.push_str("## Highest Rated Categories\n\n");
        push_rating_table(&mut md, "Category", &head(&self.ratings.top_categories, TABLE_PREVIEW));

        md.push_str("## Total Spend vs Purchase Count\n\n");
        if self.spend_vs_frequency.is_empty() {
            md.push_str("_No customers in this range._\n\n");
        } else {
            md.push_str("| Customer | Purchases | Total Spend |\n");
            md.push_str("|----------|-----------|-------------|\n");
            for customer in self.spend_vs_frequency.iter().take(TABLE_PREVIEW) {
                md.push_str(&format!(
                    "| {} | {} | {:.2} |\n",
                    customer.customer_id, customer.purchase_count, customer.total_spend
                ));
            }
            md.push('\n');
        }

        md.push_str("## Ratings by Payment Method\n\n");
        push_rating_table(&mut md, "Payment Method", &self.payment_ratings);

        md.push_str("## Delivery Time vs Review Score per Product\n\n");
        md.push_str(&format!(
            "**Products:** {} | **Correlation:** {}\n\n",
            self.delivery_vs_review.points.len(),
            format_correlation(self.delivery_vs_review.correlation)
        ));

        md.push_str("## Return Rate vs Review Score per Product\n\n");
        md.push_str(&format!(
            "**Products:** {} | **Correlation:** {}\n\n",
            self.returns_vs_review.points.len(),
            format_correlation(self.returns_vs_review.correlation)
        ));

        md.push_str("## RFM Analysis\n\n");
        if self.rfm.customers.is_empty() {
            md.push_str("_No customers in this range._\n\n");
        } else {
            push_rfm_table(&mut md, &head(&self.rfm.customers, TABLE_PREVIEW));
            md.push_str("### Top 5 Customers by Recency (days)\n\n");
            push_rfm_table(&mut md, &self.rfm.top_recency);
            md.push_str("### Top 5 Customers by Frequency\n\n");
            push_rfm_table(&mut md, &self.rfm.top_frequency);
            md.push_str("### Top 5 Customers by Monetary\n\n");
            push_rfm_table(&mut md, &self.rfm.top_monetary);
        }

        md
    }
}

impl AnalyticsEngine {
    /// Compute every dashboard metric for the range.
    pub fn compute(&self, range: &DateRange) -> Result<DashboardMetrics> {
        let overview = self.overview(range)?;
        if overview.total_rows == 0 {
            warn!(%range, "Date range matches no orders");
        }

        let delivery_times = self.delivery_times(range)?;
        let return_rates = self.return_rates(range)?;

        let metrics = DashboardMetrics {
            range: *range,
            overview,
            daily_orders: self.daily_orders(range)?,
            customers: self.customer_purchases(range)?,
            regions: self.repeat_purchases_by_region(range)?,
            product_ratings: self.product_ratings(range)?,
            category_ratings: self.category_ratings(range)?,
            payment_ratings: self.payment_ratings(range)?,
            delivery_review_correlation: queries::delivery_correlation(&delivery_times),
            delivery_times,
            return_review_correlation: queries::return_correlation(&return_rates),
            return_rates,
            rfm: self.rfm(range)?,
        };

        info!(
            %range,
            orders = metrics.overview.total_orders,
            customers = metrics.customers.len(),
            products = metrics.product_ratings.len(),
            "Computed dashboard metrics"
        );
        Ok(metrics)
    }

    /// Generate the eight-panel report for the range.
    pub fn generate_report(&self, range: &DateRange) -> Result<DashboardReport> {
        Ok(DashboardReport::from_metrics(&self.compute(range)?))
    }

    /// Generate report as JSON string.
    pub fn generate_report_json(&self, range: &DateRange) -> Result<String> {
        self.generate_report(range)?.to_json()
    }

    /// Generate Markdown report.
    pub fn generate_report_markdown(&self, range: &DateRange) -> Result<String> {
        Ok(self.generate_report(range)?.to_markdown())
    }
}

fn head<T: Clone>(rows: &[T], n: usize) -> Vec<T> {
    rows.iter().take(n).cloned().collect()
}

fn format_correlation(r: Option<f64>) -> String {
    r.map(|r| format!("{r:.3}"))
        .unwrap_or_else(|| "N/A".to_string())
}

fn push_rating_table(md: &mut String, label: &str, rows: &[RatingRow]) {
    if rows.is_empty() {
        md.push_str("_No reviews in this range._\n\n");
        return;
    }
    md.push_str(&format!("| {label} | Mean Rating | Reviews |\n"));
    md.push_str("|------|-------------|---------|\n");
    for row in rows {
        md.push_str(&format!("| {} | {:.2} | {} |\n", row.key, row.mean_score, row.reviews));
    }
    md.push('\n');
}

fn push_rfm_table(md: &mut String, rows: &[RfmRow]) {
    md.push_str("| Customer | Recency | Frequency | Monetary |\n");
    md.push_str("|----------|---------|-----------|----------|\n");
    for row in rows {
        md.push_str(&format!(
            "| {} | {} | {} | {:.2} |\n",
            row.customer_id, row.recency, row.frequency, row.monetary
        ));
    }
    md.push('\n');
}
