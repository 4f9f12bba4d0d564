use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ReportError;
use crate::report::format::format_grouped;
use crate::report::FinancialReport;
use crate::types::Points;
use crate::ReportResult;

/// Maximum number of value-axis intervals.
const MAX_TICKS: i64 = 7;
const NICE_MULTIPLIERS: [Decimal; 5] = [
    Decimal::ONE,
    Decimal::TWO,
    Decimal::from_parts(25, 0, 0, false, 1),
    Decimal::from_parts(5, 0, 0, false, 0),
    Decimal::TEN,
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The data a chart draws. Values and their labels are the model's literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub metric: String,
    pub title: String,
    /// Category labels (periods)
    pub labels: Vec<String>,
    pub values: Vec<Decimal>,
    /// Literal renderings of `values`, identical to the table cells
    pub value_labels: Vec<String>,
}

/// Placement of one bar inside a rendered image, in pixels from the top left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarGeometry {
    pub label: String,
    pub value: Decimal,
    pub x: u32,
    pub width: u32,
    pub top: u32,
    pub height: u32,
}

/// An uncompressed 8-bit RGB raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartImage {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub pixels: Vec<u8>,
    pub axis_max: Decimal,
    pub axis_step: Decimal,
    pub bars: Vec<BarGeometry>,
}

impl ChartImage {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 3) as usize;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }
}

/// A charting backend. Implementations turn a series into image pixels and
/// know nothing about the report model.
pub trait ChartRenderer {
    fn render(&self, series: &ChartSeries) -> ReportResult<ChartImage>;
}

/// A chart placed in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub heading: String,
    pub caption: String,
    /// Machine-readable restatement of the plotted values
    pub alt_text: String,
    pub series: ChartSeries,
    pub image: ChartImage,
    pub display_width: Points,
    pub display_height: Points,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Chart `metric_name` over the report's periods with `renderer`.
///
/// `figure` numbers the caption ("Figure 1: ...").
pub fn render_chart(
    report: &FinancialReport,
    metric_name: &str,
    figure: usize,
    renderer: &dyn ChartRenderer,
) -> ReportResult<ImageBlock> {
    report.validate()?;
    let metric = report.metric(metric_name).ok_or_else(|| {
        ReportError::invalid(
            format!("charts.{metric_name}"),
            "Chart refers to an unknown metric",
        )
    })?;
    if let Some(v) = metric.values.iter().find(|v| v.is_sign_negative()) {
        return Err(ReportError::invalid(
            format!("charts.{metric_name}"),
            format!("Bar charts need non-negative values, got {v}"),
        ));
    }

    let series = ChartSeries {
        metric: metric.key.clone(),
        title: format!(
            "{} Quarterly {} ({}) - FY {}",
            report.company_name, metric.label, metric.unit, report.fiscal_year
        ),
        labels: report.periods.clone(),
        values: metric.values.clone(),
        value_labels: metric.values.iter().map(|v| metric.display(*v)).collect(),
    };
    let image = renderer.render(&series)?;

    let pairs: Vec<String> = series
        .labels
        .iter()
        .zip(&series.value_labels)
        .map(|(l, v)| format!("{l} {v}"))
        .collect();
    let alt_text = format!(
        "Bar chart of {} by period: {}.",
        metric.header(),
        pairs.join("; ")
    );

    debug!(metric = metric_name, width = image.width, height = image.height, "chart rendered");
    Ok(ImageBlock {
        heading: format!("{} Trend", metric.label),
        caption: format!(
            "Figure {figure}: {} Quarterly {} Trend, FY {}",
            report.company_name, metric.label, report.fiscal_year
        ),
        alt_text,
        series,
        display_width: image.width as Points / 2.0,
        display_height: image.height as Points / 2.0,
        image,
    })
}

/// Value axis for a non-negative series: `(axis_max, step)` with a step of
/// 1, 2, 2.5 or 5 times a power of ten and at most seven intervals.
///
/// `None` when the axis cannot be represented, i.e. the maximum is too small
/// to divide into ticks or the rounded-up axis overflows.
pub fn nice_axis(max: Decimal) -> Option<(Decimal, Decimal)> {
    if max <= Decimal::ZERO {
        return Some((Decimal::ONE, Decimal::ONE));
    }
    let raw = max.checked_div(Decimal::from(MAX_TICKS))?;
    if raw.is_zero() {
        return None;
    }
    let mut magnitude = Decimal::ONE;
    while let Some(next) = magnitude.checked_mul(Decimal::TEN).filter(|m| *m <= raw) {
        magnitude = next;
    }
    while magnitude > raw {
        magnitude = magnitude.checked_div(Decimal::TEN).filter(|m| !m.is_zero())?;
    }

    let step = NICE_MULTIPLIERS
        .iter()
        .filter_map(|m| m.checked_mul(magnitude))
        .find(|s| *s >= raw)?
        .normalize();
    if step.is_zero() {
        return None;
    }
    let intervals = max.checked_div(step)?.ceil();
    Some((intervals.checked_mul(step)?.normalize(), step))
}

/// Tick label at the precision of the step, e.g. `2,500` or `1.5`.
pub fn tick_label(value: Decimal, step: Decimal) -> String {
    format_grouped(value, step.normalize().scale())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::render::raster::BarChartRenderer;
    use crate::report::build_report;
    use rust_decimal_macros::dec;

    fn sample_report() -> FinancialReport {
        build_report(&ReportConfig::default()).unwrap()
    }

    #[test]
    fn test_nice_axis_for_seed_metrics() {
        assert_eq!(nice_axis(dec!(3105)), Some((dec!(3500), dec!(500))));
        assert_eq!(nice_axis(dec!(501)), Some((dec!(600), dec!(100))));
        assert_eq!(nice_axis(dec!(2.61)), Some((dec!(3), dec!(0.5))));
    }

    #[test]
    fn test_nice_axis_exact_multiple() {
        assert_eq!(nice_axis(dec!(3500)), Some((dec!(3500), dec!(500))));
        assert_eq!(nice_axis(dec!(0)), Some((dec!(1), dec!(1))));
    }

    #[test]
    fn test_nice_axis_extremes_do_not_panic() {
        assert_eq!(nice_axis(Decimal::new(1, 28)), None);
        assert_eq!(nice_axis(Decimal::MAX), None);
        let (axis_max, step) = nice_axis(dec!(0.0007)).unwrap();
        assert_eq!((axis_max, step), (dec!(0.0007), dec!(0.0001)));
    }

    #[test]
    fn test_unrepresentable_axis_is_invalid_model() {
        let mut report = sample_report();
        report.metrics[0].values = vec![Decimal::MAX; 4];
        report.metrics[0].decimals = 0;
        let err = render_chart(&report, "revenue", 1, &BarChartRenderer::default()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidModel { ref field, .. } if field == "charts.revenue"));
    }

    #[test]
    fn test_apostrophe_in_company_name_charts() {
        let mut report = sample_report();
        report.company_name = "O'Neil Corp".into();
        let block = render_chart(&report, "revenue", 1, &BarChartRenderer::default()).unwrap();
        assert_eq!(block.series.title, "O'Neil Corp Quarterly Revenue ($M) - FY 2024");
    }

    #[test]
    fn test_tick_labels() {
        assert_eq!(tick_label(dec!(2500), dec!(500)), "2,500");
        assert_eq!(tick_label(dec!(1.5), dec!(0.5)), "1.5");
        assert_eq!(tick_label(dec!(2), dec!(0.5)), "2.0");
    }

    #[test]
    fn test_series_uses_table_literals() {
        let report = sample_report();
        let block = render_chart(&report, "revenue", 1, &BarChartRenderer::default()).unwrap();
        assert_eq!(block.series.values, report.metric("revenue").unwrap().values);
        assert_eq!(
            block.series.value_labels,
            vec!["2,450", "2,610", "2,847", "3,105"]
        );
        assert_eq!(block.series.labels, report.periods);
    }

    #[test]
    fn test_alt_text_and_caption() {
        let report = sample_report();
        let block = render_chart(&report, "revenue", 1, &BarChartRenderer::default()).unwrap();
        assert_eq!(
            block.alt_text,
            "Bar chart of Revenue ($M) by period: Q1 2024 2,450; Q2 2024 2,610; Q3 2024 2,847; Q4 2024 3,105."
        );
        assert_eq!(block.caption, "Figure 1: Acme Corp Quarterly Revenue Trend, FY 2024");
        assert_eq!(block.heading, "Revenue Trend");
    }

    #[test]
    fn test_unknown_metric() {
        let report = sample_report();
        let err = render_chart(&report, "ebitda", 1, &BarChartRenderer::default()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidModel { ref field, .. } if field == "charts.ebitda"));
    }

    #[test]
    fn test_negative_values_rejected() {
        let mut report = sample_report();
        report.metrics[1].values[0] = dec!(-10);
        assert!(render_chart(&report, "net_income", 1, &BarChartRenderer::default()).is_err());
    }

    /// A backend that records what it was asked to draw.
    struct EchoRenderer;

    impl ChartRenderer for EchoRenderer {
        fn render(&self, series: &ChartSeries) -> ReportResult<ChartImage> {
            Ok(ChartImage {
                width: 2,
                height: 2,
                pixels: vec![255; 12],
                axis_max: series.values.iter().copied().max().unwrap_or_default(),
                axis_step: Decimal::ONE,
                bars: Vec::new(),
            })
        }
    }

    #[test]
    fn test_backend_is_swappable() {
        let report = sample_report();
        let block = render_chart(&report, "eps", 2, &EchoRenderer).unwrap();
        assert_eq!(block.image.axis_max, dec!(2.61));
        assert_eq!(block.display_width, 1.0);
        assert!(block.caption.starts_with("Figure 2:"));
    }
}
