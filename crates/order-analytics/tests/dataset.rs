//! End-to-end tests: load a delimited file, filter, aggregate.

use chrono::{Duration, NaiveDate};
use fake::Fake;
use fake::faker::address::en::{CityName, StateAbbr};
use order_analytics::{AnalyticsEngine, AnalyticsError};
use order_domain::{DateRange, OrderRecord, OrderStatus, parse_date};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use tempfile::TempDir;

const HEADER: &str = "customer_id,customer_city,customer_state,order_id,product_id,\
product_category_name,payment_type,price,review_score,order_status,\
order_purchase_timestamp,order_delivered_customer_date";

fn write_csv(dir: &TempDir, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    path
}

fn range(start: &str, end: &str) -> DateRange {
    DateRange::new(parse_date(start).unwrap(), parse_date(end).unwrap()).unwrap()
}

/// Shrink `range` by `days` on each side without crossing over.
fn narrowed(range: &DateRange, days: i64) -> DateRange {
    let step = Duration::days(days.clamp(0, (range.days() - 1) / 2));
    DateRange::new(range.start + step, range.end - step).unwrap()
}

#[test]
fn test_load_and_aggregate_csv() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        &dir,
        "main_data.csv",
        &[
            HEADER,
            "C1,sao paulo,SP,O1,P1,perfumaria,credit_card,10.0,5,delivered,2023-01-01 09:00:00,2023-01-04 09:00:00",
            "C1,sao paulo,SP,O2,P2,esporte_lazer,boleto,20.0,4,delivered,2023-01-10 18:30:00,2023-01-15 10:00:00",
            "C2,rio de janeiro,RJ,O3,P1,perfumaria,credit_card,50.0,3,canceled,2023-01-05 12:00:00,",
        ],
    );

    let engine = AnalyticsEngine::from_csv(&path).unwrap();
    assert_eq!(engine.row_count().unwrap(), 3);

    let bounds = engine.date_bounds().unwrap().unwrap();
    assert_eq!(bounds, range("2023-01-01", "2023-01-10"));

    let metrics = engine.compute(&bounds).unwrap();
    assert_eq!(metrics.overview.total_orders, 3);

    // C2 bought once, so only SP shows up
    assert_eq!(metrics.regions.len(), 1);
    assert_eq!(metrics.regions[0].customer_state, "SP");

    let c2 = metrics.rfm.iter().find(|r| r.customer_id == "C2").unwrap();
    assert_eq!((c2.recency, c2.frequency), (5, 1));
    assert!((c2.monetary - 50.0).abs() < 1e-9);

    // O3 was never delivered: P1 delivery stats come from O1 alone
    let p1 = metrics
        .delivery_times
        .iter()
        .find(|d| d.product_id == "P1")
        .unwrap();
    assert_eq!(p1.deliveries, 1);
    assert!((p1.mean_delivery_days - 3.0).abs() < 1e-9);

    let p1_returns = metrics
        .return_rates
        .iter()
        .find(|r| r.product_id == "P1")
        .unwrap();
    assert!((p1_returns.return_rate - 0.5).abs() < 1e-9);
}

#[test]
fn test_extra_columns_are_ignored() {
    let dir = TempDir::new().unwrap();
    let header = format!("{HEADER},seller_id");
    let path = write_csv(
        &dir,
        "wide.csv",
        &[
            header.as_str(),
            "C1,sao paulo,SP,O1,P1,perfumaria,credit_card,10.0,5,delivered,2023-01-01 09:00:00,,S1",
        ],
    );

    let engine = AnalyticsEngine::from_csv(&path).unwrap();
    assert_eq!(engine.row_count().unwrap(), 1);
}

#[test]
fn test_unparseable_timestamp_fails_whole_load() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        &dir,
        "bad_timestamp.csv",
        &[
            HEADER,
            "C1,sao paulo,SP,O1,P1,perfumaria,credit_card,10.0,5,delivered,2023-01-01 09:00:00,",
            "C2,sao paulo,SP,O2,P1,perfumaria,credit_card,10.0,5,delivered,not-a-timestamp,",
        ],
    );

    let engine = AnalyticsEngine::new_in_memory().unwrap();
    let err = engine.load_csv(&path).unwrap_err();
    assert!(matches!(err, AnalyticsError::Load { .. }));
    assert!(err.is_load_failure());
    assert_eq!(engine.row_count().unwrap(), 0);
}

#[test]
fn test_missing_columns_fail_load() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        &dir,
        "narrow.csv",
        &[
            "customer_id,order_id,price,order_purchase_timestamp",
            "C1,O1,10.0,2023-01-01 09:00:00",
        ],
    );

    let err = AnalyticsEngine::from_csv(&path).err().unwrap();
    match err {
        AnalyticsError::MissingColumns(missing) => {
            assert!(missing.contains(&"review_score".to_string()));
            assert!(missing.contains(&"order_delivered_customer_date".to_string()));
            assert!(!missing.contains(&"price".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn random_orders(count: usize) -> Vec<OrderRecord> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let regions: Vec<(String, String)> = (0..4)
        .map(|_| (StateAbbr().fake(), CityName().fake()))
        .collect();
    let statuses = [
        OrderStatus::Delivered,
        OrderStatus::Shipped,
        OrderStatus::Canceled,
        OrderStatus::Unavailable,
    ];

    (0..count)
        .map(|i| {
            let customer = (0..15).fake::<usize>();
            let (state, city) = regions[customer % regions.len()].clone();
            let purchased = (base + Duration::days((0..90).fake::<i64>()))
                .and_hms_opt((0..24).fake::<u32>(), (0..60).fake::<u32>(), 0)
                .unwrap();
            let delivered = (i % 3 != 0)
                .then(|| purchased + Duration::hours((1..400).fake::<i64>()));

            OrderRecord {
                customer_id: format!("C{customer}"),
                customer_city: city,
                customer_state: state,
                order_id: format!("O{i}"),
                product_id: format!("P{}", (0..8).fake::<usize>()),
                product_category_name: Some(format!("cat{}", (0..3).fake::<usize>())),
                payment_type: Some(["credit_card", "boleto", "voucher"][i % 3].to_string()),
                price: (1.0..500.0).fake::<f64>(),
                review_score: (i % 7 != 0).then(|| f64::from((1..=5).fake::<u8>())),
                order_status: statuses[(0..statuses.len()).fake::<usize>()],
                order_purchase_timestamp: purchased,
                order_delivered_customer_date: delivered,
            }
        })
        .collect()
}

#[test]
fn test_aggregate_invariants_on_random_data() {
    let orders = random_orders(200);
    let engine = AnalyticsEngine::new_in_memory().unwrap();
    engine.ingest_orders_batch(&orders).unwrap();

    let full = engine.date_bounds().unwrap().unwrap();
    let metrics = engine.compute(&full).unwrap();

    let customers: HashSet<&str> = orders.iter().map(|o| o.customer_id.as_str()).collect();
    let products: HashSet<&str> = orders.iter().map(|o| o.product_id.as_str()).collect();
    let regions: HashSet<(&str, &str)> = orders
        .iter()
        .map(|o| (o.customer_state.as_str(), o.customer_city.as_str()))
        .collect();

    assert!(metrics.rfm.iter().all(|r| customers.contains(r.customer_id.as_str())));
    assert!(metrics.product_ratings.iter().all(|r| products.contains(r.key.as_str())));
    assert!(metrics.return_rates.iter().all(|r| products.contains(r.product_id.as_str())));
    assert!(metrics.regions.iter().all(|r| {
        regions.contains(&(r.customer_state.as_str(), r.customer_city.as_str()))
    }));

    // regions are built from repeat customers only, each row weighted by
    // its customer's purchase count
    let region_of: HashMap<&str, (&str, &str)> = orders
        .iter()
        .map(|o| {
            (
                o.customer_id.as_str(),
                (o.customer_state.as_str(), o.customer_city.as_str()),
            )
        })
        .collect();
    let mut expected: HashMap<(&str, &str), (i64, i64, i64)> = HashMap::new();
    for c in metrics.customers.iter().filter(|c| c.purchase_count > 1) {
        let entry = expected
            .entry(region_of[c.customer_id.as_str()])
            .or_default();
        entry.0 += 1;
        entry.1 += c.purchase_count;
        entry.2 += c.purchase_count * c.purchase_count;
    }

    assert_eq!(metrics.regions.len(), expected.len());
    for region in &metrics.regions {
        let key = (region.customer_state.as_str(), region.customer_city.as_str());
        let (repeat_customers, rows, weighted) = expected[&key];
        assert_eq!(region.repeat_customers, repeat_customers);
        assert!((region.avg_purchase_count - weighted as f64 / rows as f64).abs() < 1e-9);
    }

    // the latest buyer has recency zero
    assert_eq!(metrics.rfm.iter().map(|r| r.recency).min(), Some(0));

    let frequency: i64 = metrics.rfm.iter().map(|r| r.frequency).sum();
    assert_eq!(frequency, metrics.overview.total_orders);

    assert!(
        metrics
            .product_ratings
            .windows(2)
            .all(|w| w[0].mean_score >= w[1].mean_score)
    );
}

#[test]
fn test_narrowing_never_increases_totals() {
    let orders = random_orders(150);
    let engine = AnalyticsEngine::new_in_memory().unwrap();
    engine.ingest_orders_batch(&orders).unwrap();

    let full = engine.date_bounds().unwrap().unwrap();
    let wide = engine.compute(&full).unwrap();
    let wide_monetary: f64 = wide.rfm.iter().map(|r| r.monetary).sum();

    for days in [1, 7, 20, 45] {
        let inner = narrowed(&full, days);
        assert!(full.start <= inner.start && inner.end <= full.end);

        let narrow = engine.compute(&inner).unwrap();
        let narrow_monetary: f64 = narrow.rfm.iter().map(|r| r.monetary).sum();

        assert!(narrow.overview.total_orders <= wide.overview.total_orders);
        assert!(narrow_monetary <= wide_monetary + 1e-6);
    }
}
