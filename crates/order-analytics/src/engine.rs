//! Analytics engine using DuckDB for OLAP queries.

use crate::error::{AnalyticsError, Result};
use duckdb::{Connection, params};
use order_domain::{DateRange, OrderRecord, REQUIRED_COLUMNS, TIMESTAMP_FORMAT, parse_date};
use std::path::Path;
use tracing::{debug, info};

/// Filtered view of `orders` for one date range, with the two derived
/// columns every metric reads from. Binds `start` and `end` as parameters.
pub(crate) const FILTERED_ORDERS: &str = r#"
    WITH filtered AS (
        SELECT
            *,
            CAST(date_diff('second', order_purchase_timestamp, order_delivered_customer_date) AS DOUBLE)
                / 86400 AS delivery_time,
            price AS total_price
        FROM orders
        WHERE CAST(order_purchase_timestamp AS DATE)
            BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)
    )
"#;

/// DuckDB-based analytics engine over one loaded order dataset.
///
/// Each dashboard session owns its own engine; nothing derived from the
/// dataset is shared across engines.
pub struct AnalyticsEngine {
    pub(crate) conn: Connection,
}

impl AnalyticsEngine {
    /// Create a new in-memory analytics engine with an empty `orders` table.
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let engine = Self { conn };
        engine.initialize_schema()?;
        Ok(engine)
    }

    /// Create an engine and bulk load the given delimited file into it.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let engine = Self::new_in_memory()?;
        engine.load_csv(path)?;
        Ok(engine)
    }

    /// Initialize the analytics schema.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- Order line items fact table
            CREATE TABLE IF NOT EXISTS orders (
                customer_id VARCHAR,
                customer_city VARCHAR,
                customer_state VARCHAR,
                order_id VARCHAR,
                product_id VARCHAR,
                product_category_name VARCHAR,
                payment_type VARCHAR,
                price DOUBLE,
                review_score DOUBLE,
                order_status VARCHAR,
                order_purchase_timestamp TIMESTAMP NOT NULL,
                order_delivered_customer_date TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id);
            CREATE INDEX IF NOT EXISTS idx_orders_product ON orders(product_id);
            CREATE INDEX IF NOT EXISTS idx_orders_purchase ON orders(order_purchase_timestamp);
            "#,
        )?;
        Ok(())
    }

    /// Load a delimited file with a header row into the `orders` table.
    ///
    /// The load is all-or-nothing: a missing column, a timestamp that does
    /// not parse or a non-numeric price or score aborts it and leaves the
    /// table untouched.
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        std::fs::metadata(path)?;

        let source = format!(
            "read_csv('{}', header = true, all_varchar = true)",
            path.display().to_string().replace('\'', "''")
        );

        let load_err = |e: duckdb::Error| AnalyticsError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let columns = self.source_columns(&source).map_err(load_err)?;
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|required| !columns.iter().any(|c| c == *required))
            .map(|c| (*c).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AnalyticsError::MissingColumns(missing));
        }

        let query = format!(
            r#"
            INSERT INTO orders
            SELECT
                customer_id,
                customer_city,
                customer_state,
                order_id,
                product_id,
                product_category_name,
                payment_type,
                CAST(price AS DOUBLE),
                CAST(review_score AS DOUBLE),
                order_status,
                CAST(order_purchase_timestamp AS TIMESTAMP),
                CAST(order_delivered_customer_date AS TIMESTAMP)
            FROM {source}
            "#
        );
        let count = self.conn.execute(&query, []).map_err(load_err)?;

        info!(path = %path.display(), rows = count, "Loaded order dataset");
        Ok(count)
    }

    fn source_columns(&self, source: &str) -> duckdb::Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("DESCRIBE SELECT * FROM {source}"))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect()
    }

    /// Ingest a single order record.
    pub fn ingest_order(&self, order: &OrderRecord) -> Result<()> {
        order.validate()?;
        self.conn.execute(
            r#"
            INSERT INTO orders (
                customer_id, customer_city, customer_state, order_id, product_id,
                product_category_name, payment_type, price, review_score, order_status,
                order_purchase_timestamp, order_delivered_customer_date
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))
            "#,
            params![
                order.customer_id,
                order.customer_city,
                order.customer_state,
                order.order_id,
                order.product_id,
                order.product_category_name,
                order.payment_type,
                order.price,
                order.review_score,
                order.order_status.as_str(),
                order.order_purchase_timestamp.format(TIMESTAMP_FORMAT).to_string(),
                order
                    .order_delivered_customer_date
                    .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()),
            ],
        )?;
        Ok(())
    }

    /// Batch ingest order records.
    pub fn ingest_orders_batch(&self, orders: &[OrderRecord]) -> Result<usize> {
        let mut count = 0;
        for order in orders {
            self.ingest_order(order)?;
            count += 1;
        }
        debug!(rows = count, "Ingested order batch");
        Ok(count)
    }

    /// Number of rows in the full dataset.
    pub fn row_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
        Ok(count)
    }

    /// First and last purchase date of the full dataset, used as the
    /// default date range. `None` when nothing is loaded.
    pub fn date_bounds(&self) -> Result<Option<DateRange>> {
        let (min, max): (Option<String>, Option<String>) = self.conn.query_row(
            r#"
            SELECT
                strftime(MIN(order_purchase_timestamp), '%Y-%m-%d'),
                strftime(MAX(order_purchase_timestamp), '%Y-%m-%d')
            FROM orders
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        match (min, max) {
            (Some(min), Some(max)) => Ok(Some(DateRange::new(parse_date(&min)?, parse_date(&max)?)?)),
            _ => Ok(None),
        }
    }
}

/// Bind values for [`FILTERED_ORDERS`].
pub(crate) fn range_params(range: &DateRange) -> [String; 2] {
    [range.start.to_string(), range.end.to_string()]
}
