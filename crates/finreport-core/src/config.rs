use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Points};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default artifact location, relative to the working directory.
pub const DEFAULT_OUTPUT_PATH: &str = "data/sample_financial_report.pdf";

const LETTER_WIDTH: Points = 612.0;
const LETTER_HEIGHT: Points = 792.0;
const ONE_INCH: Points = 72.0;

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Immutable description of the fixture. Everything the generated document
/// contains is derived from this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub company_name: String,
    pub fiscal_year: i32,
    /// Publication date shown on the cover page
    pub published: NaiveDate,
    /// Period labels in chronological order, e.g. "Q1 2024"
    pub periods: Vec<String>,
    pub metrics: Vec<MetricConfig>,
    pub guidance: GuidanceConfig,
    #[serde(default)]
    pub narrative: Vec<NarrativeConfig>,
    /// Metric keys rendered as bar charts, in order
    #[serde(default = "default_charts")]
    pub charts: Vec<String>,
    #[serde(default)]
    pub layout: PageSetup,
    /// Questions the fixture must answer, with answers derived from the model
    #[serde(default)]
    pub queries: Vec<AnswerQuery>,
}

/// One financial metric and its per-period values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Stable identifier, e.g. "revenue", "net_income", "eps"
    pub key: String,
    /// Display label, e.g. "Net Income"
    pub label: String,
    /// Display unit, e.g. "$M" or "$"
    pub unit: String,
    /// Decimal places shown in every rendering of this metric
    pub decimals: u32,
    /// Values aligned positionally with `periods`
    pub values: Vec<Money>,
}

/// Forward-looking range for a period after the reported ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceConfig {
    pub metric: String,
    pub period: String,
    pub low: Money,
    pub high: Money,
}

/// A prose section. Paragraphs may reference model values with placeholders
/// such as `{revenue@Q3 2024}` or `{total:revenue}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeConfig {
    pub heading: String,
    pub paragraphs: Vec<String>,
}

/// A fact a downstream consumer should be able to recover from the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerQuery {
    /// The value of a metric in one period
    Value { metric: String, period: String },
    /// Change of a metric from the prior period into `period`
    Change { metric: String, period: String },
    /// Sum of a metric over the reported periods
    Total { metric: String },
    /// The forward-looking guidance range
    Guidance,
}

/// Page geometry in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    pub width: Points,
    pub height: Points,
    pub margin_left: Points,
    pub margin_right: Points,
    pub margin_top: Points,
    pub margin_bottom: Points,
    /// Generation fails with a layout overflow beyond this many pages
    pub max_pages: usize,
}

impl PageSetup {
    pub fn content_width(&self) -> Points {
        self.width - self.margin_left - self.margin_right
    }

    pub fn content_height(&self) -> Points {
        self.height - self.margin_top - self.margin_bottom
    }
}

impl Default for PageSetup {
    /// US Letter with one-inch margins.
    fn default() -> Self {
        Self {
            width: LETTER_WIDTH,
            height: LETTER_HEIGHT,
            margin_left: ONE_INCH,
            margin_right: ONE_INCH,
            margin_top: ONE_INCH,
            margin_bottom: ONE_INCH,
            max_pages: 10,
        }
    }
}

fn default_charts() -> Vec<String> {
    vec!["revenue".to_string()]
}

// ---------------------------------------------------------------------------
// Fixture constants
// ---------------------------------------------------------------------------

impl Default for ReportConfig {
    /// The Acme Corp FY2024 quarterly earnings fixture.
    fn default() -> Self {
        Self {
            company_name: "Acme Corp".into(),
            fiscal_year: 2024,
            published: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap_or_default(),
            periods: ["Q1 2024", "Q2 2024", "Q3 2024", "Q4 2024"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            metrics: vec![
                MetricConfig {
                    key: "revenue".into(),
                    label: "Revenue".into(),
                    unit: "$M".into(),
                    decimals: 0,
                    values: vec![dec!(2450), dec!(2610), dec!(2847), dec!(3105)],
                },
                MetricConfig {
                    key: "net_income".into(),
                    label: "Net Income".into(),
                    unit: "$M".into(),
                    decimals: 0,
                    values: vec![dec!(342), dec!(389), dec!(456), dec!(501)],
                },
                MetricConfig {
                    key: "eps".into(),
                    label: "EPS".into(),
                    unit: "$".into(),
                    decimals: 2,
                    values: vec![dec!(1.56), dec!(1.95), dec!(2.28), dec!(2.61)],
                },
            ],
            guidance: GuidanceConfig {
                metric: "revenue".into(),
                period: "Q1 2025".into(),
                low: dec!(3300),
                high: dec!(3500),
            },
            narrative: vec![NarrativeConfig {
                heading: "Executive Summary".into(),
                paragraphs: vec![
                    "{company} delivered record-breaking results in fiscal year {year}, \
                     driven by strong demand across our cloud computing and enterprise \
                     AI product lines. Total annual revenue reached ${total:revenue} million. \
                     The company continued to invest in next-generation GPU architectures \
                     and expanded its data centre footprint in three new regions."
                        .into(),
                    "Third-quarter performance was particularly notable, with revenue of \
                     ${revenue@Q3 2024} million and net income of ${net_income@Q3 2024} million, \
                     up ${change:net_income@Q3 2024} million ({change_pct:net_income@Q3 2024}%) \
                     from the second quarter. Earnings per share for Q3 came in at \
                     ${eps@Q3 2024}, exceeding consensus estimates by $0.12."
                        .into(),
                    "Looking ahead, management expects continued momentum in Q1 2025, \
                     with revenue guidance of ${guidance} million. The company announced \
                     a $2 billion share repurchase programme and increased its quarterly \
                     dividend by 15%."
                        .into(),
                ],
            }],
            charts: default_charts(),
            layout: PageSetup::default(),
            queries: vec![
                AnswerQuery::Value {
                    metric: "revenue".into(),
                    period: "Q3 2024".into(),
                },
                AnswerQuery::Change {
                    metric: "net_income".into(),
                    period: "Q3 2024".into(),
                },
                AnswerQuery::Value {
                    metric: "eps".into(),
                    period: "Q4 2024".into(),
                },
                AnswerQuery::Total {
                    metric: "revenue".into(),
                },
                AnswerQuery::Guidance,
            ],
        }
    }
}

impl ReportConfig {
    pub fn metric(&self, key: &str) -> Option<&MetricConfig> {
        self.metrics.iter().find(|m| m.key == key)
    }

    /// Sum of a metric across all configured periods.
    pub fn metric_total(&self, key: &str) -> Option<Decimal> {
        self.metric(key).map(|m| m.values.iter().copied().sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fixture_seed_values() {
        let cfg = ReportConfig::default();
        assert_eq!(cfg.periods.len(), 4);
        assert_eq!(cfg.metric_total("revenue"), Some(dec!(11012)));
        assert_eq!(cfg.metric_total("net_income"), Some(dec!(1688)));
        assert_eq!(cfg.metric("eps").map(|m| m.values[3]), Some(dec!(2.61)));
        assert_eq!(cfg.guidance.low, dec!(3300));
        assert_eq!(cfg.guidance.high, dec!(3500));
    }

    #[test]
    fn test_letter_content_box() {
        let page = PageSetup::default();
        assert_eq!(page.content_width(), 468.0);
        assert_eq!(page.content_height(), 648.0);
    }

    #[test]
    fn test_json_round_trip_applies_defaults() {
        let cfg = ReportConfig::default();
        let mut value = serde_json::to_value(&cfg).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("charts");
        obj.remove("layout");
        obj.remove("queries");
        let parsed: ReportConfig = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.charts, vec!["revenue".to_string()]);
        assert_eq!(parsed.layout, PageSetup::default());
        assert_eq!(parsed.metrics, cfg.metrics);
        assert!(parsed.queries.is_empty());
    }

    #[test]
    fn test_query_tagging() {
        let json = r#"[{"kind":"value","metric":"revenue","period":"Q3 2024"},{"kind":"guidance"}]"#;
        let queries: Vec<AnswerQuery> = serde_json::from_str(json).unwrap();
        assert_eq!(queries[1], AnswerQuery::Guidance);
        assert_eq!(&queries[..1], &ReportConfig::default().queries[..1]);
    }
}
