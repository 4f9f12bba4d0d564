//! Placeholder expansion for narrative paragraphs.
//!
//! Supported placeholders:
//!
//! | placeholder | expands to |
//! |---|---|
//! | `{company}` | company name |
//! | `{year}` | fiscal year |
//! | `{<metric>@<period>}` | literal value, as shown in the table |
//! | `{total:<metric>}` | sum over all reported periods |
//! | `{change:<metric>@<period>}` | change from the prior period |
//! | `{change_pct:<metric>@<period>}` | percentage change, one decimal |
//! | `{guidance}` | guidance range, e.g. `3,300–3,500` |

use crate::config::NarrativeConfig;
use crate::error::ReportError;
use crate::report::format::{format_grouped, format_percent};
use crate::report::model::{FinancialReport, MetricRef, NarrativeSection};
use crate::ReportResult;

const PERCENT_DECIMALS: u32 = 1;

pub fn expand_section(
    report: &FinancialReport,
    section: &NarrativeConfig,
) -> ReportResult<NarrativeSection> {
    let mut refs = Vec::new();
    let paragraphs = section
        .paragraphs
        .iter()
        .map(|p| expand_paragraph(report, p, &mut refs))
        .collect::<ReportResult<Vec<_>>>()?;

    Ok(NarrativeSection {
        heading: section.heading.clone(),
        paragraphs,
        metric_refs: refs,
    })
}

fn expand_paragraph(
    report: &FinancialReport,
    template: &str,
    refs: &mut Vec<MetricRef>,
) -> ReportResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            ReportError::invalid("paragraph", format!("Unclosed placeholder in \"{template}\""))
        })?;
        let token = after[..close].trim();
        out.push_str(&resolve(report, token, refs)?);
        rest = &after[close + 1..];
    }
    if rest.contains('}') {
        return Err(ReportError::invalid(
            "paragraph",
            format!("Unmatched '}}' in \"{template}\""),
        ));
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve(report: &FinancialReport, token: &str, refs: &mut Vec<MetricRef>) -> ReportResult<String> {
    match token {
        "company" => return Ok(report.company_name.clone()),
        "year" => return Ok(report.fiscal_year.to_string()),
        "guidance" => {
            push_ref(refs, &report.guidance.metric, Some(&report.guidance.period));
            return report.guidance_range();
        }
        _ => {}
    }

    let (func, target) = match token.split_once(':') {
        Some((f, t)) => (Some(f.trim()), t.trim()),
        None => (None, token),
    };

    if func == Some("total") {
        let metric = report.metric(target).ok_or_else(|| unknown(token))?;
        push_ref(refs, target, None);
        return Ok(metric.display(metric.total()));
    }

    let (metric_key, period) = target.split_once('@').ok_or_else(|| unknown(token))?;
    let (metric_key, period) = (metric_key.trim(), period.trim());
    let metric = report.metric(metric_key).ok_or_else(|| unknown(token))?;
    if report.period_index(period).is_none() {
        return Err(unknown(token));
    }
    push_ref(refs, metric_key, Some(period));

    match func {
        None => report.display_value(metric_key, period),
        Some("change") => {
            let delta = report.change(metric_key, period)?;
            Ok(format_grouped(delta, metric.decimals))
        }
        Some("change_pct") => {
            let pct = report.change_pct(metric_key, period)?;
            Ok(format_percent(pct, PERCENT_DECIMALS))
        }
        Some(_) => Err(unknown(token)),
    }
}

fn push_ref(refs: &mut Vec<MetricRef>, metric: &str, period: Option<&str>) {
    let r = MetricRef {
        metric: metric.to_string(),
        period: period.map(str::to_string),
    };
    if !refs.contains(&r) {
        refs.push(r);
    }
}

fn unknown(token: &str) -> ReportError {
    ReportError::invalid("paragraph", format!("Unknown placeholder '{{{token}}}'"))
}
