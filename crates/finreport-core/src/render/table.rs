use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::fonts::{text_width, Font};
use crate::report::period::period_ordinal;
use crate::report::FinancialReport;
use crate::types::Points;
use crate::ReportResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const HEADER_FONT_SIZE: Points = 11.0;
pub const BODY_FONT_SIZE: Points = 10.0;
pub const CELL_PADDING_X: Points = 8.0;
pub const HEADER_PADDING_Y: Points = 10.0;
pub const BODY_PADDING_Y: Points = 7.0;
const MIN_COLUMN_WIDTH: Points = 72.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Structural role of a cell, mapped to TH (headers) or TD (data) in the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellRole {
    /// Column header in the first row
    Header,
    /// Period label in the first column
    RowHeader,
    Data,
}

/// The (metric, period) fact a data cell shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellKey {
    pub metric: String,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub row: usize,
    pub col: usize,
    pub text: String,
    pub role: CellRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<CellKey>,
}

/// A grid of individually addressable cells.
///
/// Orientation: one row per period, one column per metric, with a header row
/// of metric labels and a first column of period labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub caption: String,
    pub rows: Vec<Vec<TableCell>>,
    pub column_widths: Vec<Points>,
    /// Rows drawn in bold, e.g. a totals row
    pub emphasised_rows: Vec<usize>,
}

impl TableBlock {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// The data cell showing `metric` in `period`.
    pub fn cell_for(&self, metric: &str, period: &str) -> Option<&TableCell> {
        self.rows.iter().flatten().find(|c| {
            c.key
                .as_ref()
                .is_some_and(|k| k.metric == metric && k.period == period)
        })
    }

    /// Cell texts row by row.
    pub fn texts(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| r.iter().map(|c| c.text.clone()).collect())
            .collect()
    }

    pub fn width(&self) -> Points {
        self.column_widths.iter().sum()
    }

    pub fn row_height(&self, row: usize) -> Points {
        if row == 0 {
            HEADER_FONT_SIZE + 2.0 * HEADER_PADDING_Y
        } else {
            BODY_FONT_SIZE + 2.0 * BODY_PADDING_Y
        }
    }

    pub fn height(&self) -> Points {
        (0..self.row_count()).map(|r| self.row_height(r)).sum()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Quarterly highlights grid: `len(periods) + 1` rows by `len(metrics) + 1` columns.
pub fn render_table(report: &FinancialReport) -> ReportResult<TableBlock> {
    report.validate()?;

    let mut header = vec![header_cell(0, corner_label(report))];
    for (j, metric) in report.metrics.iter().enumerate() {
        header.push(header_cell(j + 1, metric.header()));
    }

    let mut rows = vec![header];
    for (i, period) in report.periods.iter().enumerate() {
        let row_idx = i + 1;
        let mut row = vec![TableCell {
            row: row_idx,
            col: 0,
            text: period.clone(),
            role: CellRole::RowHeader,
            key: None,
        }];
        for (j, metric) in report.metrics.iter().enumerate() {
            row.push(TableCell {
                row: row_idx,
                col: j + 1,
                text: metric.display(metric.values[i]),
                role: CellRole::Data,
                key: Some(CellKey {
                    metric: metric.key.clone(),
                    period: period.clone(),
                }),
            });
        }
        rows.push(row);
    }

    let caption = format!(
        "Table 1: {} Quarterly Financial Highlights, FY {}",
        report.company_name, report.fiscal_year
    );
    let table = finish(caption, rows, Vec::new())?;
    debug!(
        rows = table.row_count(),
        columns = table.column_count(),
        "highlights table rendered"
    );
    Ok(table)
}

/// Fiscal-year totals grid: a header row plus one `FY <year> Total` row.
pub fn render_totals_table(report: &FinancialReport) -> ReportResult<TableBlock> {
    report.validate()?;

    let total_label = format!("FY {} Total", report.fiscal_year);
    let mut header = vec![header_cell(0, "Fiscal Year".to_string())];
    let mut row = vec![TableCell {
        row: 1,
        col: 0,
        text: total_label,
        role: CellRole::RowHeader,
        key: None,
    }];
    for (j, metric) in report.metrics.iter().enumerate() {
        header.push(header_cell(j + 1, metric.header()));
        row.push(TableCell {
            row: 1,
            col: j + 1,
            text: metric.display(metric.total()),
            role: CellRole::Data,
            key: Some(CellKey {
                metric: metric.key.clone(),
                period: format!("FY {}", report.fiscal_year),
            }),
        });
    }

    let caption = format!(
        "Table 2: {} Fiscal Year {} Totals",
        report.company_name, report.fiscal_year
    );
    finish(caption, vec![header, row], vec![1])
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn header_cell(col: usize, text: String) -> TableCell {
    TableCell {
        row: 0,
        col,
        text,
        role: CellRole::Header,
        key: None,
    }
}

fn corner_label(report: &FinancialReport) -> String {
    let all_quarters = report
        .periods
        .iter()
        .all(|p| p.starts_with('Q') && period_ordinal(p).is_some());
    if all_quarters { "Quarter" } else { "Period" }.to_string()
}

fn finish(
    caption: String,
    rows: Vec<Vec<TableCell>>,
    emphasised_rows: Vec<usize>,
) -> ReportResult<TableBlock> {
    let columns = rows.first().map_or(0, Vec::len);
    let mut column_widths = vec![MIN_COLUMN_WIDTH; columns];
    for row in &rows {
        for cell in row {
            let (font, size) = cell_font(cell, &emphasised_rows);
            let w = text_width(font, size, &cell.text)? + 2.0 * CELL_PADDING_X;
            if w > column_widths[cell.col] {
                column_widths[cell.col] = w;
            }
        }
    }
    Ok(TableBlock {
        caption,
        rows,
        column_widths,
        emphasised_rows,
    })
}

/// Font used to draw a cell.
pub fn cell_font(cell: &TableCell, emphasised_rows: &[usize]) -> (Font, Points) {
    match cell.role {
        CellRole::Header => (Font::HelveticaBold, HEADER_FONT_SIZE),
        _ if emphasised_rows.contains(&cell.row) => (Font::HelveticaBold, BODY_FONT_SIZE),
        _ => (Font::Helvetica, BODY_FONT_SIZE),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::error::ReportError;
    use crate::report::build_report;
    use pretty_assertions::assert_eq;

    fn sample_report() -> FinancialReport {
        build_report(&ReportConfig::default()).unwrap()
    }

    #[test]
    fn test_grid_dimensions() {
        let report = sample_report();
        let table = render_table(&report).unwrap();
        assert_eq!(table.row_count(), report.periods.len() + 1);
        assert_eq!(table.column_count(), report.metrics.len() + 1);
        assert!(table.rows.iter().all(|r| r.len() == table.column_count()));
    }

    #[test]
    fn test_grid_contents() {
        let table = render_table(&sample_report()).unwrap();
        assert_eq!(
            table.texts(),
            vec![
                vec!["Quarter", "Revenue ($M)", "Net Income ($M)", "EPS ($)"],
                vec!["Q1 2024", "2,450", "342", "1.56"],
                vec!["Q2 2024", "2,610", "389", "1.95"],
                vec!["Q3 2024", "2,847", "456", "2.28"],
                vec!["Q4 2024", "3,105", "501", "2.61"],
            ]
        );
    }

    #[test]
    fn test_every_fact_has_its_own_cell() {
        let report = sample_report();
        let table = render_table(&report).unwrap();
        for metric in &report.metrics {
            for (i, period) in report.periods.iter().enumerate() {
                let cell = table.cell_for(&metric.key, period).unwrap();
                assert_eq!(cell.text, metric.display(metric.values[i]));
                assert_eq!(cell.role, CellRole::Data);
                assert!(!cell.text.is_empty());
            }
        }
        assert_eq!(table.cell_for("revenue", "Q3 2024").unwrap().text, "2,847");
        assert_eq!(table.cell_for("eps", "Q4 2024").unwrap().text, "2.61");
    }

    #[test]
    fn test_cell_coordinates_match_position() {
        let table = render_table(&sample_report()).unwrap();
        for (r, row) in table.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                assert_eq!((cell.row, cell.col), (r, c));
            }
        }
    }

    #[test]
    fn test_totals_table() {
        let table = render_totals_table(&sample_report()).unwrap();
        assert_eq!(
            table.texts(),
            vec![
                vec!["Fiscal Year", "Revenue ($M)", "Net Income ($M)", "EPS ($)"],
                vec!["FY 2024 Total", "11,012", "1,688", "8.40"],
            ]
        );
        assert_eq!(table.emphasised_rows, vec![1]);
    }

    #[test]
    fn test_columns_fit_their_text() {
        let table = render_table(&sample_report()).unwrap();
        for row in &table.rows {
            for cell in row {
                let (font, size) = cell_font(cell, &table.emphasised_rows);
                let w = text_width(font, size, &cell.text).unwrap();
                assert!(w + 2.0 * CELL_PADDING_X <= table.column_widths[cell.col] + 1e-3);
            }
        }
        assert!(table.width() < 468.0);
    }

    #[test]
    fn test_invalid_model_rejected_before_rendering() {
        let mut report = sample_report();
        report.metrics[0].values.pop();
        assert!(matches!(
            render_table(&report),
            Err(ReportError::InvalidModel { .. })
        ));
    }
}
