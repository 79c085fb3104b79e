//! # Order Analytics - Domain Model
//!
//! Order line items, status classification and the inclusive date range
//! used to filter a dataset. These types are shared by the analytics engine
//! and the dashboard binary.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text layout of purchase and delivery timestamps in the input file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Text layout of calendar dates accepted from users.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Header columns the input file must provide. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 12] = [
    "customer_id",
    "customer_city",
    "customer_state",
    "order_id",
    "product_id",
    "product_category_name",
    "payment_type",
    "price",
    "review_score",
    "order_status",
    "order_purchase_timestamp",
    "order_delivered_customer_date",
];

// =============================================================================
// ENUMS
// =============================================================================

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Approved,
    Invoiced,
    Processing,
    Shipped,
    Delivered,
    Canceled,
    Unavailable,
}

impl OrderStatus {
    /// Statuses counted as a return when computing return rates.
    pub const RETURNED: [Self; 2] = [Self::Canceled, Self::Unavailable];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Approved => "approved",
            Self::Invoiced => "invoiced",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// One order line item, as read from the input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    // Customer
    pub customer_id: String,
    pub customer_city: String,
    pub customer_state: String,

    // Order
    pub order_id: String,
    pub product_id: String,
    pub product_category_name: Option<String>,
    pub payment_type: Option<String>,
    pub price: f64,
    pub review_score: Option<f64>,
    pub order_status: OrderStatus,

    // Timeline
    pub order_purchase_timestamp: NaiveDateTime,
    pub order_delivered_customer_date: Option<NaiveDateTime>,
}

impl OrderRecord {
    /// Purchase must not come after delivery.
    pub fn validate(&self) -> Result<(), DomainError> {
        match self.order_delivered_customer_date {
            Some(delivered) if delivered < self.order_purchase_timestamp => {
                Err(DomainError::DeliveredBeforePurchase {
                    order_id: self.order_id.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

// =============================================================================
// QUERY/FILTER TYPES
// =============================================================================

/// Inclusive calendar date range used to filter orders by purchase date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        if end < start {
            return Err(DomainError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// Parse `YYYY-MM-DD,YYYY-MM-DD` or `YYYY-MM-DD YYYY-MM-DD`.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let mut parts = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty());

        match (parts.next(), parts.next(), parts.next()) {
            (Some(start), Some(end), None) => Self::new(parse_date(start)?, parse_date(end)?),
            _ => Err(DomainError::InvalidDate(s.trim().to_string())),
        }
    }

    /// Number of calendar days covered, both ends included.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| DomainError::InvalidDate(s.trim().to_string()))
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Order {order_id} delivered before it was purchased")]
    DeliveredBeforePurchase { order_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn timestamp(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        let err = DateRange::new(date("2023-02-01"), date("2023-01-01")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_date_range_days_inclusive() {
        let range = DateRange::new(date("2023-01-01"), date("2023-01-10")).unwrap();
        assert_eq!(range.days(), 10);
        assert_eq!(DateRange::single_day(date("2023-01-01")).days(), 1);
        assert_eq!(range.to_string(), "2023-01-01 to 2023-01-10");
    }

    #[test]
    fn test_date_range_parse() {
        let a = DateRange::parse("2023-01-01,2023-01-31").unwrap();
        let b = DateRange::parse("  2023-01-01   2023-01-31 ").unwrap();
        assert_eq!(a, b);
        assert!(DateRange::parse("2023-01-01").is_err());
        assert!(DateRange::parse("2023-01-01,2023-13-01").is_err());
        assert!(DateRange::parse("2023-01-01,2023-01-02,2023-01-03").is_err());
        assert!(matches!(
            DateRange::parse("2023-01-31 2023-01-01"),
            Err(DomainError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_returned_statuses() {
        let returned: Vec<&str> = OrderStatus::RETURNED.iter().map(OrderStatus::as_str).collect();
        assert_eq!(returned, ["canceled", "unavailable"]);
        assert_eq!(OrderStatus::Delivered.to_string(), "delivered");
    }

    #[test]
    fn test_validate_delivery_order() {
        let mut record = OrderRecord {
            customer_id: "c1".to_string(),
            customer_city: "sao paulo".to_string(),
            customer_state: "SP".to_string(),
            order_id: "o1".to_string(),
            product_id: "p1".to_string(),
            product_category_name: Some("perfumaria".to_string()),
            payment_type: Some("credit_card".to_string()),
            price: 10.0,
            review_score: Some(5.0),
            order_status: OrderStatus::Delivered,
            order_purchase_timestamp: timestamp("2023-01-01 00:00:00"),
            order_delivered_customer_date: Some(timestamp("2023-01-03 12:00:00")),
        };
        assert!(record.validate().is_ok());

        record.order_delivered_customer_date = None;
        assert!(record.validate().is_ok());

        record.order_delivered_customer_date = Some(timestamp("2022-12-31 00:00:00"));
        assert!(matches!(
            record.validate(),
            Err(DomainError::DeliveredBeforePurchase { .. })
        ));
    }
}
