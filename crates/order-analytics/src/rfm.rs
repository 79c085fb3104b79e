//! RFM (recency, frequency, monetary) customer segmentation.
//!
//! Recency is measured against the most recent purchase date of the
//! *filtered* dataset, so every customer's baseline moves with the selected
//! date range.

use crate::engine::{AnalyticsEngine, FILTERED_ORDERS, range_params};
use crate::error::{AnalyticsError, Result};
use order_domain::DateRange;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// RFM scores of one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmRow {
    /// Customer identifier
    pub customer_id: String,
    /// Days since the customer's last purchase date
    pub recency: i64,
    /// Distinct orders placed
    pub frequency: i64,
    /// Total price paid
    pub monetary: f64,
}

impl AnalyticsEngine {
    /// RFM scores for every customer in the range, ordered by customer id.
    pub fn rfm(&self, range: &DateRange) -> Result<Vec<RfmRow>> {
        let query = format!(
            r#"
            {FILTERED_ORDERS},
            latest AS (
                SELECT MAX(CAST(order_purchase_timestamp AS DATE)) AS most_recent
                FROM filtered
            )
            SELECT
                customer_id,
                date_diff(
                    'day',
                    MAX(CAST(order_purchase_timestamp AS DATE)),
                    (SELECT most_recent FROM latest)
                ) AS recency,
                COUNT(DISTINCT order_id) AS frequency,
                COALESCE(SUM(total_price), CAST(0 AS DOUBLE)) AS monetary
            FROM filtered
            WHERE customer_id IS NOT NULL
            GROUP BY customer_id
            ORDER BY customer_id
            "#
        );

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(duckdb::params_from_iter(range_params(range)), |row| {
            Ok(RfmRow {
                customer_id: row.get(0)?,
                recency: row.get(1)?,
                frequency: row.get(2)?,
                monetary: row.get(3)?,
            })
        })?;

        let table = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)?;
        debug!(customers = table.len(), "Computed RFM table");
        Ok(table)
    }
}

/// Most recent customers first.
#[must_use]
pub fn top_by_recency(table: &[RfmRow], n: usize) -> Vec<RfmRow> {
    top_by(table, n, |a, b| a.recency.cmp(&b.recency))
}

/// Customers with the most distinct orders first.
#[must_use]
pub fn top_by_frequency(table: &[RfmRow], n: usize) -> Vec<RfmRow> {
    top_by(table, n, |a, b| b.frequency.cmp(&a.frequency))
}

/// Highest spending customers first.
#[must_use]
pub fn top_by_monetary(table: &[RfmRow], n: usize) -> Vec<RfmRow> {
    top_by(table, n, |a, b| b.monetary.total_cmp(&a.monetary))
}

// Ties keep customer id order.
fn top_by<F>(table: &[RfmRow], n: usize, cmp: F) -> Vec<RfmRow>
where
    F: Fn(&RfmRow, &RfmRow) -> Ordering,
{
    let mut sorted = table.to_vec();
    sorted.sort_by(|a, b| cmp(a, b).then_with(|| a.customer_id.cmp(&b.customer_id)));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::*;
    use order_domain::parse_date;

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(parse_date(start).unwrap(), parse_date(end).unwrap()).unwrap()
    }

    fn row(id: &str, recency: i64, frequency: i64, monetary: f64) -> RfmRow {
        RfmRow {
            customer_id: id.to_string(),
            recency,
            frequency,
            monetary,
        }
    }

    #[test]
    fn test_two_customer_example() {
        let engine = AnalyticsEngine::new_in_memory().unwrap();
        engine.ingest_orders_batch(&two_customers()).unwrap();

        let table = engine.rfm(&range("2023-01-01", "2023-01-10")).unwrap();
        assert_eq!(
            table,
            vec![row("C1", 0, 2, 30.0), row("C2", 5, 1, 50.0)]
        );
    }

    #[test]
    fn test_recency_follows_filtered_max_date() {
        let engine = AnalyticsEngine::new_in_memory().unwrap();
        engine.ingest_orders_batch(&two_customers()).unwrap();

        // without 2023-01-10 the latest purchase is C2's on 2023-01-05
        let table = engine.rfm(&range("2023-01-01", "2023-01-09")).unwrap();
        assert_eq!(
            table,
            vec![row("C1", 4, 1, 10.0), row("C2", 0, 1, 50.0)]
        );
    }

    #[test]
    fn test_frequency_counts_distinct_orders() {
        let engine = AnalyticsEngine::new_in_memory().unwrap();
        let orders = vec![
            OrderBuilder::new("C1", "O1", "2023-02-01 10:00:00")
                .product("p1", "moveis")
                .price(10.0)
                .build(),
            OrderBuilder::new("C1", "O1", "2023-02-01 10:00:00")
                .product("p2", "moveis")
                .price(15.0)
                .build(),
        ];
        engine.ingest_orders_batch(&orders).unwrap();

        let table = engine.rfm(&range("2023-02-01", "2023-02-01")).unwrap();
        assert_eq!(table, vec![row("C1", 0, 1, 25.0)]);
    }

    #[test]
    fn test_empty_range() {
        let engine = AnalyticsEngine::new_in_memory().unwrap();
        engine.ingest_orders_batch(&two_customers()).unwrap();
        assert!(engine.rfm(&range("2022-01-01", "2022-12-31")).unwrap().is_empty());
    }

    #[test]
    fn test_top_rankings() {
        let table = vec![
            row("a", 3, 1, 10.0),
            row("b", 0, 4, 5.0),
            row("c", 0, 2, 99.0),
            row("d", 7, 4, 20.0),
        ];

        let ids = |rows: Vec<RfmRow>| rows.into_iter().map(|r| r.customer_id).collect::<Vec<_>>();
        assert_eq!(ids(top_by_recency(&table, 2)), vec!["b", "c"]);
        assert_eq!(ids(top_by_frequency(&table, 3)), vec!["b", "d", "c"]);
        assert_eq!(ids(top_by_monetary(&table, 1)), vec!["c"]);
        assert_eq!(top_by_monetary(&table, 10).len(), 4);
        assert!(top_by_recency(&[], 5).is_empty());
    }
}
