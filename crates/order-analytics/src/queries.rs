//! Predefined analytical queries over a filtered date range.

use crate::engine::{AnalyticsEngine, FILTERED_ORDERS, range_params};
use crate::error::{AnalyticsError, Result};
use crate::stats;
use chrono::NaiveDate;
use order_domain::{DateRange, OrderStatus, parse_date};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Headline numbers for the filtered dataset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Overview {
    /// Distinct order ids
    pub total_orders: i64,
    /// Line items
    pub total_rows: i64,
    /// Sum of line item prices
    pub total_revenue: f64,
}

/// Orders placed on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyOrders {
    /// Calendar day of purchase
    pub order_date: NaiveDate,
    /// Distinct orders purchased that day
    pub order_count: i64,
}

/// Per-customer purchase count and spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPurchases {
    /// Customer id
    pub customer_id: String,
    /// Line items bought in the range
    pub purchase_count: i64,
    /// Sum of line item prices
    pub total_spend: f64,
}

/// Mean purchase count of repeat customers in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRepeatRate {
    /// State code
    pub customer_state: String,
    /// City name
    pub customer_city: String,
    /// Purchase count averaged over the region's rows of repeat customers
    pub avg_purchase_count: f64,
    /// Distinct customers with more than one purchase
    pub repeat_customers: i64,
}

impl RegionRepeatRate {
    /// `STATE, city` label used on chart axes.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}, {}", self.customer_state, self.customer_city)
    }
}

/// Column a rating table is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingDimension {
    /// `product_id`
    Product,
    /// `product_category_name`
    Category,
    /// `payment_type`
    PaymentType,
}

impl RatingDimension {
    fn column(self) -> &'static str {
        match self {
            Self::Product => "product_id",
            Self::Category => "product_category_name",
            Self::PaymentType => "payment_type",
        }
    }
}

/// Mean review score for one key of a rating table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRow {
    /// Product id, category name or payment type
    pub key: String,
    /// Mean review score
    pub mean_score: f64,
    /// Rows with a review score
    pub reviews: i64,
}

/// Mean delivery time and review score of one product, over delivered
/// rows only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTimeRow {
    /// Product id
    pub product_id: String,
    /// Fractional days from purchase to delivery
    pub mean_delivery_days: f64,
    /// Mean review score of the delivered rows
    pub mean_review_score: f64,
    /// Delivered rows
    pub deliveries: i64,
}

/// Share of a product's rows that were canceled or unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRateRow {
    /// Product id
    pub product_id: String,
    /// Between 0 and 1
    pub return_rate: f64,
    /// `None` when no row of the product has a review score
    pub mean_review_score: Option<f64>,
    /// Rows of the product
    pub orders: i64,
}

impl AnalyticsEngine {
    /// Distinct order count, row count and revenue in the range.
    pub fn overview(&self, range: &DateRange) -> Result<Overview> {
        let query = format!(
            r#"
            {FILTERED_ORDERS}
            SELECT
                COUNT(DISTINCT order_id),
                COUNT(*),
                COALESCE(SUM(price), CAST(0 AS DOUBLE))
            FROM filtered
            "#
        );

        let overview = self
            .conn
            .query_row(&query, duckdb::params_from_iter(range_params(range)), |row| {
                Ok(Overview {
                    total_orders: row.get(0)?,
                    total_rows: row.get(1)?,
                    total_revenue: row.get(2)?,
                })
            })?;
        Ok(overview)
    }

    /// Rows with an order id per purchase day, oldest first.
    pub fn daily_orders(&self, range: &DateRange) -> Result<Vec<DailyOrders>> {
        let query = format!(
            r#"
            {FILTERED_ORDERS}
            SELECT
                strftime(CAST(order_purchase_timestamp AS DATE), '%Y-%m-%d') AS order_date,
                COUNT(order_id) AS order_count
            FROM filtered
            GROUP BY order_date
            ORDER BY order_date
            "#
        );

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(duckdb::params_from_iter(range_params(range)), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(day, order_count)| {
                Ok(DailyOrders {
                    order_date: parse_date(&day)
                        .map_err(|e| AnalyticsError::Conversion(e.to_string()))?,
                    order_count,
                })
            })
            .collect()
    }

    /// Purchase count and total spend per customer, most active first.
    pub fn customer_purchases(&self, range: &DateRange) -> Result<Vec<CustomerPurchases>> {
        let query = format!(
            r#"
            {FILTERED_ORDERS}
            SELECT
                customer_id,
                COUNT(*) AS purchase_count,
                COALESCE(SUM(price), CAST(0 AS DOUBLE)) AS total_spend
            FROM filtered
            WHERE customer_id IS NOT NULL
            GROUP BY customer_id
            ORDER BY purchase_count DESC, customer_id
            "#
        );

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(duckdb::params_from_iter(range_params(range)), |row| {
            Ok(CustomerPurchases {
                customer_id: row.get(0)?,
                purchase_count: row.get(1)?,
                total_spend: row.get(2)?,
            })
        })?;

        let customers = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(customers = customers.len(), "Computed customer purchases");
        Ok(customers)
    }

    /// Mean purchase count of repeat customers (more than one purchase)
    /// per state and city, highest first.
    ///
    /// Each of a repeat customer's rows contributes its purchase count, so
    /// heavier buyers weigh more in the regional mean.
    pub fn repeat_purchases_by_region(&self, range: &DateRange) -> Result<Vec<RegionRepeatRate>> {
        let query = format!(
            r#"
            {FILTERED_ORDERS},
            repeat_customers AS (
                SELECT customer_id, COUNT(*) AS purchase_count
                FROM filtered
                WHERE customer_id IS NOT NULL
                GROUP BY customer_id
                HAVING COUNT(*) > 1
            )
            SELECT
                f.customer_state,
                f.customer_city,
                AVG(r.purchase_count) AS avg_purchase_count,
                COUNT(DISTINCT f.customer_id) AS repeat_customers
            FROM repeat_customers r
            JOIN filtered f ON f.customer_id = r.customer_id
            WHERE f.customer_state IS NOT NULL AND f.customer_city IS NOT NULL
            GROUP BY f.customer_state, f.customer_city
            ORDER BY avg_purchase_count DESC, f.customer_state, f.customer_city
            "#
        );

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(duckdb::params_from_iter(range_params(range)), |row| {
            Ok(RegionRepeatRate {
                customer_state: row.get(0)?,
                customer_city: row.get(1)?,
                avg_purchase_count: row.get(2)?,
                repeat_customers: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)
    }

    /// Mean review score per key, highest first. Keys without any review
    /// score are left out.
    pub fn ratings(&self, range: &DateRange, dimension: RatingDimension) -> Result<Vec<RatingRow>> {
        let column = dimension.column();
        let query = format!(
            r#"
            {FILTERED_ORDERS}
            SELECT
                {column} AS rating_key,
                AVG(review_score) AS mean_score,
                COUNT(review_score) AS reviews
            FROM filtered
            WHERE {column} IS NOT NULL
            GROUP BY {column}
            HAVING COUNT(review_score) > 0
            ORDER BY mean_score DESC, rating_key
            "#
        );

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(duckdb::params_from_iter(range_params(range)), |row| {
            Ok(RatingRow {
                key: row.get(0)?,
                mean_score: row.get(1)?,
                reviews: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)
    }

    /// Mean review score per product.
    pub fn product_ratings(&self, range: &DateRange) -> Result<Vec<RatingRow>> {
        self.ratings(range, RatingDimension::Product)
    }

    /// Mean review score per product category.
    pub fn category_ratings(&self, range: &DateRange) -> Result<Vec<RatingRow>> {
        self.ratings(range, RatingDimension::Category)
    }

    /// Mean review score per payment method.
    pub fn payment_ratings(&self, range: &DateRange) -> Result<Vec<RatingRow>> {
        self.ratings(range, RatingDimension::PaymentType)
    }

    /// Mean delivery days and review score per product. Undelivered rows
    /// have no delivery time and do not take part.
    pub fn delivery_times(&self, range: &DateRange) -> Result<Vec<DeliveryTimeRow>> {
        let query = format!(
            r#"
            {FILTERED_ORDERS}
            SELECT
                product_id,
                AVG(delivery_time) AS mean_delivery_days,
                AVG(review_score) AS mean_review_score,
                COUNT(*) AS deliveries
            FROM filtered
            WHERE product_id IS NOT NULL AND delivery_time IS NOT NULL
            GROUP BY product_id
            HAVING COUNT(review_score) > 0
            ORDER BY product_id
            "#
        );

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(duckdb::params_from_iter(range_params(range)), |row| {
            Ok(DeliveryTimeRow {
                product_id: row.get(0)?,
                mean_delivery_days: row.get(1)?,
                mean_review_score: row.get(2)?,
                deliveries: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)
    }

    /// Pearson correlation between per-product mean delivery time and mean
    /// review score. `None` when it is undefined.
    pub fn delivery_review_correlation(&self, range: &DateRange) -> Result<Option<f64>> {
        Ok(delivery_correlation(&self.delivery_times(range)?))
    }

    /// Return rate and mean review score per product, lowest rate first.
    pub fn return_rates(&self, range: &DateRange) -> Result<Vec<ReturnRateRow>> {
        let returned = OrderStatus::RETURNED
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            r#"
            {FILTERED_ORDERS}
            SELECT
                product_id,
                CAST(AVG(CASE WHEN order_status IN ({returned}) THEN 1 ELSE 0 END) AS DOUBLE)
                    AS return_rate,
                AVG(review_score) AS mean_review_score,
                COUNT(*) AS orders
            FROM filtered
            WHERE product_id IS NOT NULL
            GROUP BY product_id
            ORDER BY return_rate, product_id
            "#
        );

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(duckdb::params_from_iter(range_params(range)), |row| {
            Ok(ReturnRateRow {
                product_id: row.get(0)?,
                return_rate: row.get(1)?,
                mean_review_score: row.get(2)?,
                orders: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)
    }

    /// Pearson correlation between per-product return rate and mean review
    /// score, over products that have a review score.
    pub fn return_review_correlation(&self, range: &DateRange) -> Result<Option<f64>> {
        Ok(return_correlation(&self.return_rates(range)?))
    }
}

pub(crate) fn delivery_correlation(rows: &[DeliveryTimeRow]) -> Option<f64> {
    let (days, scores): (Vec<f64>, Vec<f64>) = rows
        .iter()
        .map(|r| (r.mean_delivery_days, r.mean_review_score))
        .unzip();
    stats::pearson(&days, &scores)
}

pub(crate) fn return_correlation(rows: &[ReturnRateRow]) -> Option<f64> {
    let (rates, scores): (Vec<f64>, Vec<f64>) = rows
        .iter()
        .filter_map(|r| r.mean_review_score.map(|score| (r.return_rate, score)))
        .unzip();
    stats::pearson(&rates, &scores)
}
