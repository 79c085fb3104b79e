//! # Dashboard Charts
//!
//! ECharts panels built with Charming and rendered to standalone HTML.

use crate::error::{DashboardError, Result};
use charming::{
    Chart, HtmlRenderer,
    component::{Axis, Grid, Title},
    element::{AxisLabel, AxisType, ItemStyle, LineStyle, Tooltip, Trigger},
    series::{Bar, Line, Scatter},
};
use order_analytics::DashboardReport;
use order_analytics::queries::RatingRow;
use order_analytics::rfm::RfmRow;
use std::path::{Path, PathBuf};
use tracing::debug;

const CHART_WIDTH: u64 = 1000;
const CHART_HEIGHT: u64 = 600;
const ACCENT: &str = "#90CAF9";

/// One chart of a dashboard panel.
pub struct PanelChart {
    /// File stem, e.g. `01-daily-orders`
    pub slug: &'static str,
    /// Page and chart title
    pub title: &'static str,
    /// Chart options, ready to render
    pub chart: Chart,
}

/// Build every chart of the eight panels. Empty tables give empty charts.
#[must_use]
pub fn panel_charts(report: &DashboardReport) -> Vec<PanelChart> {
    let subtitle = report.range.to_string();

    vec![
        PanelChart {
            slug: "01-daily-orders",
            title: "Orders per Day",
            chart: daily_orders_chart(report, &subtitle),
        },
        PanelChart {
            slug: "02-repeat-regions",
            title: "Top 10 Regions by Average Repeat Purchases",
            chart: bar_chart(
                "Top 10 Regions by Average Repeat Purchases",
                &subtitle,
                "Region (State, City)",
                "Average Repeat Purchases",
                report.top_regions.iter().map(|r| (r.label(), r.avg_purchase_count)),
            ),
        },
        PanelChart {
            slug: "03-product-ratings",
            title: "Top 10 Products by Average Rating",
            chart: rating_chart(
                "Top 10 Products by Average Rating",
                &subtitle,
                "Product ID",
                &report.ratings.top_products,
            ),
        },
        PanelChart {
            slug: "03-category-ratings",
            title: "Top 10 Product Categories by Average Rating",
            chart: rating_chart(
                "Top 10 Product Categories by Average Rating",
                &subtitle,
                "Category",
                &report.ratings.top_categories,
            ),
        },
        PanelChart {
            slug: "04-spend-vs-frequency",
            title: "Total Spend vs Purchase Count",
            chart: scatter_chart(
                "Total Spend vs Purchase Count",
                &subtitle,
                "Total Spend",
                "Purchase Count",
                report
                    .spend_vs_frequency
                    .iter()
                    .map(|c| (c.total_spend, c.purchase_count as f64)),
            ),
        },
        PanelChart {
            slug: "05-payment-ratings",
            title: "Average Rating by Payment Method",
            chart: rating_chart(
                "Average Rating by Payment Method",
                &subtitle,
                "Payment Method",
                &report.payment_ratings,
            ),
        },
        PanelChart {
            slug: "06-delivery-vs-review",
            title: "Mean Delivery Time vs Mean Review Score per Product",
            chart: scatter_chart(
                "Mean Delivery Time vs Mean Review Score per Product",
                &with_correlation(&subtitle, report.delivery_vs_review.correlation),
                "Mean Delivery Time (days)",
                "Mean Review Score",
                report
                    .delivery_vs_review
                    .points
                    .iter()
                    .map(|p| (p.mean_delivery_days, p.mean_review_score)),
            ),
        },
        PanelChart {
            slug: "07-returns-vs-review",
            title: "Return Rate vs Average Review Score per Product",
            chart: scatter_chart(
                "Return Rate vs Average Review Score per Product",
                &with_correlation(&subtitle, report.returns_vs_review.correlation),
                "Return Rate",
                "Average Review Score",
                report
                    .returns_vs_review
                    .points
                    .iter()
                    .filter_map(|p| p.mean_review_score.map(|score| (p.return_rate, score))),
            ),
        },
        PanelChart {
            slug: "08-rfm-recency",
            title: "Top 5 Customers by Recency (days)",
            chart: rfm_chart(
                "Top 5 Customers by Recency (days)",
                &subtitle,
                &report.rfm.top_recency,
                |r| r.recency as f64,
            ),
        },
        PanelChart {
            slug: "08-rfm-frequency",
            title: "Top 5 Customers by Frequency",
            chart: rfm_chart(
                "Top 5 Customers by Frequency",
                &subtitle,
                &report.rfm.top_frequency,
                |r| r.frequency as f64,
            ),
        },
        PanelChart {
            slug: "08-rfm-monetary",
            title: "Top 5 Customers by Monetary",
            chart: rfm_chart(
                "Top 5 Customers by Monetary",
                &subtitle,
                &report.rfm.top_monetary,
                |r| r.monetary,
            ),
        },
    ]
}

/// Render every panel chart to `<dir>/<slug>.html`.
pub fn write_html(report: &DashboardReport, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    panel_charts(report)
        .into_iter()
        .map(|panel| {
            let html = HtmlRenderer::new(panel.title, CHART_WIDTH, CHART_HEIGHT)
                .render(&panel.chart)
                .map_err(|e| DashboardError::Chart {
                    chart: panel.slug.to_string(),
                    reason: format!("{e:?}"),
                })?;

            let path = dir.join(format!("{}.html", panel.slug));
            std::fs::write(&path, html)?;
            debug!(path = %path.display(), "Wrote chart");
            Ok(path)
        })
        .collect()
}

fn with_correlation(subtitle: &str, r: Option<f64>) -> String {
    match r {
        Some(r) => format!("{subtitle} | Pearson r = {r:.3}"),
        None => format!("{subtitle} | Pearson r = N/A"),
    }
}

fn base_chart(title: &str, subtitle: &str) -> Chart {
    Chart::new()
        .title(Title::new().text(title).subtext(subtitle).left("center"))
        .grid(Grid::new().left("10%").right("5%").top("15%").bottom("25%"))
}

fn daily_orders_chart(report: &DashboardReport, subtitle: &str) -> Chart {
    let days: Vec<String> = report
        .overview
        .daily_orders
        .iter()
        .map(|d| d.order_date.to_string())
        .collect();
    let counts: Vec<f64> = report
        .overview
        .daily_orders
        .iter()
        .map(|d| d.order_count as f64)
        .collect();

    base_chart(
        "Orders per Day",
        &format!("{subtitle} | {} orders", report.overview.total_orders),
    )
    .tooltip(Tooltip::new().trigger(Trigger::Axis))
    .x_axis(
        Axis::new()
            .type_(AxisType::Category)
            .name("Order Date")
            .data(days),
    )
    .y_axis(Axis::new().type_(AxisType::Value).name("Orders"))
    .series(
        Line::new()
            .name("Orders")
            .data(counts)
            .line_style(LineStyle::new().color(ACCENT).width(2)),
    )
}

fn bar_chart<I>(title: &str, subtitle: &str, x_name: &str, y_name: &str, rows: I) -> Chart
where
    I: IntoIterator<Item = (String, f64)>,
{
    let (labels, values): (Vec<String>, Vec<f64>) = rows.into_iter().unzip();

    base_chart(title, subtitle)
        .tooltip(Tooltip::new().trigger(Trigger::Axis))
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .name(x_name)
                .axis_label(AxisLabel::new().rotate(45.0))
                .data(labels),
        )
        .y_axis(Axis::new().type_(AxisType::Value).name(y_name))
        .series(
            Bar::new()
                .name(y_name)
                .item_style(ItemStyle::new().color(ACCENT))
                .data(values),
        )
}

fn rating_chart(title: &str, subtitle: &str, x_name: &str, rows: &[RatingRow]) -> Chart {
    bar_chart(
        title,
        subtitle,
        x_name,
        "Average Rating",
        rows.iter().map(|r| (r.key.clone(), r.mean_score)),
    )
}

fn rfm_chart<F>(title: &str, subtitle: &str, rows: &[RfmRow], value: F) -> Chart
where
    F: Fn(&RfmRow) -> f64,
{
    bar_chart(
        title,
        subtitle,
        "Customer ID",
        title,
        rows.iter().map(|r| (r.customer_id.clone(), value(r))),
    )
}

fn scatter_chart<I>(title: &str, subtitle: &str, x_name: &str, y_name: &str, points: I) -> Chart
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let data: Vec<Vec<f64>> = points.into_iter().map(|(x, y)| vec![x, y]).collect();

    base_chart(title, subtitle)
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .x_axis(Axis::new().type_(AxisType::Value).name(x_name))
        .y_axis(Axis::new().type_(AxisType::Value).name(y_name))
        .series(Scatter::new().symbol_size(8.0).data(data))
}
