use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::report::format::{format_grouped, format_range, is_exact_at};
use crate::report::narrative;
use crate::report::period::period_ordinal;
use crate::types::Money;
use crate::ReportResult;

// ---------------------------------------------------------------------------
// Model types
// ---------------------------------------------------------------------------

/// A metric series aligned with the report's periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub label: String,
    pub unit: String,
    pub decimals: u32,
    pub values: Vec<Money>,
}

impl Metric {
    /// Column header, e.g. `Revenue ($M)`.
    pub fn header(&self) -> String {
        format!("{} ({})", self.label, self.unit)
    }

    /// Literal rendering of a value at this metric's display precision.
    pub fn display(&self, value: Money) -> String {
        format_grouped(value, self.decimals)
    }

    pub fn total(&self) -> Money {
        self.values.iter().copied().sum()
    }
}

/// Forward-looking range for a period not covered by the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guidance {
    pub metric: String,
    pub period: String,
    pub low: Money,
    pub high: Money,
}

/// A model value a narrative paragraph refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRef {
    pub metric: String,
    /// `None` for whole-year references such as totals
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSection {
    pub heading: String,
    /// Paragraph text with every placeholder resolved
    pub paragraphs: Vec<String>,
    pub metric_refs: Vec<MetricRef>,
}

/// The in-memory document model. Built once, rendered, discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    pub company_name: String,
    pub fiscal_year: i32,
    pub published: NaiveDate,
    pub periods: Vec<String>,
    pub metrics: Vec<Metric>,
    pub guidance: Guidance,
    pub narrative_sections: Vec<NarrativeSection>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build and validate the report described by `config`.
///
/// Narrative placeholders are resolved against the validated metrics, so a
/// paragraph can never quote a number that differs from the table.
pub fn build_report(config: &ReportConfig) -> ReportResult<FinancialReport> {
    let mut report = FinancialReport {
        company_name: config.company_name.clone(),
        fiscal_year: config.fiscal_year,
        published: config.published,
        periods: config.periods.clone(),
        metrics: config
            .metrics
            .iter()
            .map(|m| Metric {
                key: m.key.clone(),
                label: m.label.clone(),
                unit: m.unit.clone(),
                decimals: m.decimals,
                values: m.values.clone(),
            })
            .collect(),
        guidance: Guidance {
            metric: config.guidance.metric.clone(),
            period: config.guidance.period.clone(),
            low: config.guidance.low,
            high: config.guidance.high,
        },
        narrative_sections: Vec::new(),
    };
    report.validate()?;

    for (idx, section) in config.narrative.iter().enumerate() {
        let expanded = narrative::expand_section(&report, section)
            .map_err(|e| prefix_field(e, &format!("narrative[{idx}]")))?;
        report.narrative_sections.push(expanded);
    }

    debug!(
        company = %report.company_name,
        periods = report.periods.len(),
        metrics = report.metrics.len(),
        sections = report.narrative_sections.len(),
        "report model built"
    );
    Ok(report)
}

impl FinancialReport {
    /// Check every model invariant. Called before any rendering.
    pub fn validate(&self) -> ReportResult<()> {
        if self.company_name.trim().is_empty() {
            return Err(ReportError::invalid("company_name", "Must not be empty"));
        }
        validate_periods(&self.periods)?;

        if self.metrics.is_empty() {
            return Err(ReportError::invalid(
                "metrics",
                "Must contain at least one metric",
            ));
        }
        let mut keys = HashSet::new();
        for metric in &self.metrics {
            let field = format!("metrics.{}", metric.key);
            if metric.key.trim().is_empty() {
                return Err(ReportError::invalid("metrics", "Metric key must not be empty"));
            }
            if !keys.insert(metric.key.as_str()) {
                return Err(ReportError::invalid(field, "Duplicate metric key"));
            }
            if metric.values.len() != self.periods.len() {
                return Err(ReportError::invalid(
                    format!("{field}.values"),
                    format!(
                        "Expected {} values (one per period), got {}",
                        self.periods.len(),
                        metric.values.len()
                    ),
                ));
            }
            for (value, period) in metric.values.iter().zip(&self.periods) {
                if !is_exact_at(*value, metric.decimals) {
                    return Err(ReportError::invalid(
                        format!("{field}.values"),
                        format!(
                            "Value {value} for {period} cannot be displayed at {} decimal places without rounding",
                            metric.decimals
                        ),
                    ));
                }
            }
        }

        self.validate_guidance()
    }

    fn validate_guidance(&self) -> ReportResult<()> {
        let g = &self.guidance;
        let metric = self.metric(&g.metric).ok_or_else(|| {
            ReportError::invalid(
                "guidance.metric",
                format!("Unknown metric '{}'", g.metric),
            )
        })?;
        if g.low > g.high {
            return Err(ReportError::invalid(
                "guidance",
                format!("Low ({}) exceeds high ({})", g.low, g.high),
            ));
        }
        if !is_exact_at(g.low, metric.decimals) || !is_exact_at(g.high, metric.decimals) {
            return Err(ReportError::invalid(
                "guidance",
                format!(
                    "Range cannot be displayed at {} decimal places without rounding",
                    metric.decimals
                ),
            ));
        }
        if self.periods.iter().any(|p| p == &g.period) {
            return Err(ReportError::invalid(
                "guidance.period",
                format!("'{}' is a reported period, guidance must be forward-looking", g.period),
            ));
        }
        let last = self.periods.last().and_then(|p| period_ordinal(p));
        if let (Some(last), Some(next)) = (last, period_ordinal(&g.period)) {
            if next <= last {
                return Err(ReportError::invalid(
                    "guidance.period",
                    format!("'{}' does not follow the last reported period", g.period),
                ));
            }
        }
        Ok(())
    }

    pub fn metric(&self, key: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.key == key)
    }

    pub fn period_index(&self, label: &str) -> Option<usize> {
        self.periods.iter().position(|p| p == label)
    }

    /// Value of `metric` in `period`.
    pub fn value(&self, metric: &str, period: &str) -> ReportResult<Money> {
        let m = self.require_metric(metric)?;
        let idx = self.require_period(period)?;
        Ok(m.values[idx])
    }

    /// Literal rendering of `metric` in `period`, exactly as the table shows it.
    pub fn display_value(&self, metric: &str, period: &str) -> ReportResult<String> {
        let m = self.require_metric(metric)?;
        let idx = self.require_period(period)?;
        Ok(m.display(m.values[idx]))
    }

    /// Sum of `metric` over all reported periods.
    pub fn total(&self, metric: &str) -> ReportResult<Money> {
        Ok(self.require_metric(metric)?.total())
    }

    /// Change of `metric` from the period before `period` to `period`.
    pub fn change(&self, metric: &str, period: &str) -> ReportResult<Money> {
        let m = self.require_metric(metric)?;
        let idx = self.require_period(period)?;
        if idx == 0 {
            return Err(ReportError::invalid(
                period,
                "The first period has no prior period to compare against",
            ));
        }
        Ok(m.values[idx] - m.values[idx - 1])
    }

    /// Percentage change of `metric` into `period`, unrounded.
    pub fn change_pct(&self, metric: &str, period: &str) -> ReportResult<Decimal> {
        let delta = self.change(metric, period)?;
        let idx = self.require_period(period)?;
        let prior = self.require_metric(metric)?.values[idx - 1];
        if prior.is_zero() {
            return Err(ReportError::invalid(
                format!("metrics.{metric}"),
                format!("Prior value before {period} is zero, percentage change undefined"),
            ));
        }
        Ok(delta / prior * Decimal::ONE_HUNDRED)
    }

    /// Guidance range literal, e.g. `3,300–3,500`.
    pub fn guidance_range(&self) -> ReportResult<String> {
        let m = self.require_metric(&self.guidance.metric)?;
        Ok(format_range(self.guidance.low, self.guidance.high, m.decimals))
    }

    fn require_metric(&self, key: &str) -> ReportResult<&Metric> {
        self.metric(key)
            .ok_or_else(|| ReportError::invalid(key, "Unknown metric"))
    }

    fn require_period(&self, label: &str) -> ReportResult<usize> {
        self.period_index(label)
            .ok_or_else(|| ReportError::invalid(label, "Unknown period"))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_periods(periods: &[String]) -> ReportResult<()> {
    if periods.is_empty() {
        return Err(ReportError::invalid(
            "periods",
            "Must contain at least one period",
        ));
    }
    let mut seen = HashSet::new();
    for p in periods {
        if p.trim().is_empty() {
            return Err(ReportError::invalid("periods", "Period label must not be empty"));
        }
        if !seen.insert(p.as_str()) {
            return Err(ReportError::invalid(
                "periods",
                format!("Duplicate period '{p}'"),
            ));
        }
    }

    // Dated labels must be strictly increasing. Free-form labels are taken in
    // the order given, so the two kinds cannot be mixed.
    let parsed: Vec<_> = periods.iter().map(|p| period_ordinal(p)).collect();
    let dated = parsed.iter().filter(|o| o.is_some()).count();
    if dated > 0 && dated < periods.len() {
        let free = periods
            .iter()
            .zip(&parsed)
            .find(|(_, o)| o.is_none())
            .map(|(p, _)| p.as_str())
            .unwrap_or_default();
        return Err(ReportError::invalid(
            "periods",
            format!("'{free}' is not a dated period; dated and free-form labels cannot be mixed"),
        ));
    }
    let ordinals: Option<Vec<_>> = parsed.into_iter().collect();
    if let Some(ordinals) = ordinals {
        for (i, pair) in ordinals.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(ReportError::invalid(
                    "periods",
                    format!(
                        "'{}' does not follow '{}' chronologically",
                        periods[i + 1],
                        periods[i]
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn prefix_field(err: ReportError, prefix: &str) -> ReportError {
    match err {
        ReportError::InvalidModel { field, reason } => ReportError::InvalidModel {
            field: format!("{prefix}: {field}"),
            reason,
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_report() -> FinancialReport {
        build_report(&ReportConfig::default()).unwrap()
    }

    fn assert_invalid(result: ReportResult<FinancialReport>, expected_field: &str) {
        match result {
            Err(ReportError::InvalidModel { field, .. }) => {
                assert!(
                    field.contains(expected_field),
                    "expected field containing '{expected_field}', got '{field}'"
                );
            }
            other => panic!("expected InvalidModel, got {other:?}"),
        }
    }

    // --------------------------------------------------
    // Seed scenario
    // --------------------------------------------------

    #[test]
    fn test_q3_revenue_literal() {
        let report = sample_report();
        assert_eq!(report.value("revenue", "Q3 2024").unwrap(), dec!(2847));
        assert_eq!(report.display_value("revenue", "Q3 2024").unwrap(), "2,847");
    }

    #[test]
    fn test_net_income_growth_q2_to_q3() {
        let report = sample_report();
        // 456 - 389 = 67
        assert_eq!(report.change("net_income", "Q3 2024").unwrap(), dec!(67));
        let pct = report.change_pct("net_income", "Q3 2024").unwrap();
        assert_eq!(pct.round_dp(1), dec!(17.2));
    }

    #[test]
    fn test_q4_eps_literal() {
        let report = sample_report();
        assert_eq!(report.display_value("eps", "Q4 2024").unwrap(), "2.61");
    }

    #[test]
    fn test_fy_revenue_total() {
        let report = sample_report();
        // 2,450 + 2,610 + 2,847 + 3,105
        assert_eq!(report.total("revenue").unwrap(), dec!(11012));
    }

    #[test]
    fn test_guidance_range_literal() {
        let report = sample_report();
        assert_eq!(report.guidance_range().unwrap(), "3,300–3,500");
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(sample_report(), sample_report());
    }

    #[test]
    fn test_narrative_quotes_model_values() {
        let report = sample_report();
        let text = report.narrative_sections[0].paragraphs.join(" ");
        assert!(text.contains("$11,012 million"));
        assert!(text.contains("$2,847 million"));
        assert!(text.contains("$67 million (17.2%)"));
        assert!(text.contains("$3,300–3,500 million"));
        assert!(!text.contains('{'));
    }

    // --------------------------------------------------
    // Invariant violations
    // --------------------------------------------------

    #[test]
    fn test_short_metric_series_rejected() {
        let mut cfg = ReportConfig::default();
        cfg.metrics[1].values.pop();
        assert_invalid(build_report(&cfg), "metrics.net_income.values");
    }

    #[test]
    fn test_validate_on_hand_built_model() {
        let mut report = sample_report();
        report.metrics[0].values.truncate(2);
        match report.validate() {
            Err(ReportError::InvalidModel { field, .. }) => {
                assert_eq!(field, "metrics.revenue.values")
            }
            other => panic!("expected InvalidModel, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_guidance_rejected() {
        let mut cfg = ReportConfig::default();
        cfg.guidance.low = dec!(3600);
        assert_invalid(build_report(&cfg), "guidance");
    }

    #[test]
    fn test_guidance_must_be_future_period() {
        let mut cfg = ReportConfig::default();
        cfg.guidance.period = "Q4 2024".into();
        assert_invalid(build_report(&cfg), "guidance.period");

        cfg.guidance.period = "Q2 2023".into();
        assert_invalid(build_report(&cfg), "guidance.period");
    }

    #[test]
    fn test_periods_must_increase() {
        let mut cfg = ReportConfig::default();
        cfg.periods.swap(1, 2);
        assert_invalid(build_report(&cfg), "periods");
    }

    #[test]
    fn test_duplicate_period_rejected() {
        let mut cfg = ReportConfig::default();
        cfg.periods[3] = "Q3 2024".into();
        assert_invalid(build_report(&cfg), "periods");
    }

    #[test]
    fn test_value_finer_than_display_precision_rejected() {
        let mut cfg = ReportConfig::default();
        cfg.metrics[2].values[0] = dec!(1.555);
        assert_invalid(build_report(&cfg), "metrics.eps.values");
    }

    #[test]
    fn test_duplicate_metric_rejected() {
        let mut cfg = ReportConfig::default();
        cfg.metrics[1].key = "revenue".into();
        assert_invalid(build_report(&cfg), "metrics.revenue");
    }

    #[test]
    fn test_mixed_period_labels_rejected() {
        let mut cfg = ReportConfig::default();
        cfg.periods = vec!["Q3 2024".into(), "Q1 2024".into(), "Q2 2024".into(), "Year end".into()];
        cfg.narrative.clear();
        cfg.queries.clear();
        assert_invalid(build_report(&cfg), "periods");

        cfg.periods = vec!["Q1 2024".into(), "Q2 2024".into(), "Q3 2024".into(), "Year end".into()];
        assert_invalid(build_report(&cfg), "periods");
    }

    #[test]
    fn test_free_form_periods_keep_given_order() {
        let mut cfg = ReportConfig::default();
        cfg.periods = vec!["Winter".into(), "Spring".into(), "Summer".into(), "Autumn".into()];
        cfg.narrative.clear();
        let report = build_report(&cfg).unwrap();
        assert_eq!(report.period_index("Summer"), Some(2));
    }

    #[test]
    fn test_change_from_first_period_is_an_error() {
        let report = sample_report();
        assert!(report.change("revenue", "Q1 2024").is_err());
    }
}
