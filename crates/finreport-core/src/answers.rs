use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::AnswerQuery;
use crate::error::ReportError;
use crate::report::format::{format_grouped, format_percent};
use crate::report::FinancialReport;
use crate::ReportResult;

/// A question about the fixture and the literal answer the document supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedAnswer {
    pub question: String,
    /// Answer as the document prints it
    pub answer: String,
    /// Exact numeric value, when the answer is a single number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
}

/// Derive the expected answer to each query from the report model.
pub fn expected_answers(
    report: &FinancialReport,
    queries: &[AnswerQuery],
) -> ReportResult<Vec<ExpectedAnswer>> {
    queries.iter().map(|q| answer(report, q)).collect()
}

fn answer(report: &FinancialReport, query: &AnswerQuery) -> ReportResult<ExpectedAnswer> {
    match query {
        AnswerQuery::Value { metric, period } => {
            let m = report
                .metric(metric)
                .ok_or_else(|| ReportError::invalid(format!("queries.{metric}"), "Unknown metric"))?;
            let value = report.value(metric, period)?;
            Ok(ExpectedAnswer {
                question: format!(
                    "What was {}'s {} ({}) in {}?",
                    report.company_name, m.label, m.unit, period
                ),
                answer: m.display(value),
                value: Some(value),
            })
        }
        AnswerQuery::Change { metric, period } => {
            let m = report
                .metric(metric)
                .ok_or_else(|| ReportError::invalid(format!("queries.{metric}"), "Unknown metric"))?;
            let delta = report.change(metric, period)?;
            let pct = report.change_pct(metric, period)?;
            let prior = report
                .period_index(period)
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| report.periods.get(i))
                .cloned()
                .unwrap_or_default();
            Ok(ExpectedAnswer {
                question: format!(
                    "How much did {}'s {} ({}) grow from {} to {}?",
                    report.company_name, m.label, m.unit, prior, period
                ),
                answer: format!(
                    "{} ({}%)",
                    format_grouped(delta, m.decimals),
                    format_percent(pct, 1)
                ),
                value: Some(delta),
            })
        }
        AnswerQuery::Total { metric } => {
            let m = report
                .metric(metric)
                .ok_or_else(|| ReportError::invalid(format!("queries.{metric}"), "Unknown metric"))?;
            let total = m.total();
            Ok(ExpectedAnswer {
                question: format!(
                    "What was {}'s total FY {} {} ({})?",
                    report.company_name, report.fiscal_year, m.label, m.unit
                ),
                answer: m.display(total),
                value: Some(total),
            })
        }
        AnswerQuery::Guidance => {
            let g = &report.guidance;
            let label = report
                .metric(&g.metric)
                .map(|m| m.header())
                .unwrap_or_else(|| g.metric.clone());
            Ok(ExpectedAnswer {
                question: format!(
                    "What is {}'s {} guidance for {}?",
                    report.company_name, label, g.period
                ),
                answer: report.guidance_range()?,
                value: None,
            })
        }
    }
}
