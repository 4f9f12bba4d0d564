use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::answers::{expected_answers, ExpectedAnswer};
use crate::config::{PageSetup, ReportConfig};
use crate::layout::{paginate, Block, TextStyle};
use crate::pdf::{write_pdf, PdfMetadata};
use crate::render::{render_chart, render_table, render_totals_table, ChartRenderer, ImageBlock, TableBlock};
use crate::report::{build_report, FinancialReport};
use crate::types::Points;
use crate::ReportResult;

const COVER_TOP_SPACE: Points = 144.0;
const COVER_GAP: Points = 36.0;
const SECTION_GAP: Points = 21.6;
const CHART_GAP: Points = 28.8;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Rendering choices that are not part of the financial model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeOptions {
    /// Metric keys charted after the tables, in order
    pub charts: Vec<String>,
    pub layout: PageSetup,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for ComposeOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            charts: config.charts.clone(),
            layout: config.layout,
        }
    }
}

/// The finished PDF plus the structured blocks it was rendered from.
#[derive(Debug, Clone)]
pub struct DocumentArtifact {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub tables: Vec<TableBlock>,
    pub charts: Vec<ImageBlock>,
}

/// What `generate` produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSummary {
    pub output_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers_path: Option<PathBuf>,
    pub size_bytes: usize,
    pub page_count: usize,
    pub table_count: usize,
    pub chart_count: usize,
    pub answers: Vec<ExpectedAnswer>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lay out and serialise the whole report.
///
/// Block order: cover page, narrative sections, quarterly highlights table,
/// fiscal-year totals, outlook, then one section per chart.
pub fn compose_document(
    report: &FinancialReport,
    options: &ComposeOptions,
    renderer: &dyn ChartRenderer,
) -> ReportResult<DocumentArtifact> {
    report.validate()?;

    let mut blocks = cover_blocks(report);

    for section in &report.narrative_sections {
        blocks.push(Block::text(section.heading.clone(), TextStyle::SECTION_HEAD));
        for paragraph in &section.paragraphs {
            blocks.push(Block::text(paragraph.clone(), TextStyle::BODY));
        }
    }
    blocks.push(Block::Spacer(SECTION_GAP));

    let table = render_table(report)?;
    let totals = render_totals_table(report)?;
    blocks.push(Block::text("Quarterly Financial Highlights", TextStyle::SECTION_HEAD));
    blocks.push(Block::Table(table.clone()));
    blocks.push(Block::text(table.caption.clone(), TextStyle::CAPTION));
    blocks.push(Block::Table(totals.clone()));
    blocks.push(Block::text(totals.caption.clone(), TextStyle::CAPTION));

    blocks.push(Block::text("Outlook", TextStyle::SECTION_HEAD));
    blocks.push(Block::text(guidance_statement(report)?, TextStyle::BODY));

    let mut charts = Vec::with_capacity(options.charts.len());
    for (i, metric) in options.charts.iter().enumerate() {
        let chart = render_chart(report, metric, i + 1, renderer)?;
        blocks.push(Block::Spacer(CHART_GAP));
        blocks.push(Block::text(chart.heading.clone(), TextStyle::SECTION_HEAD));
        blocks.push(Block::Image(chart.clone()));
        blocks.push(Block::text(chart.caption.clone(), TextStyle::CAPTION));
        charts.push(chart);
    }

    let pages = paginate(&blocks, &options.layout)?;
    let meta = PdfMetadata {
        title: format!(
            "{} Quarterly Earnings Report FY {}",
            report.company_name, report.fiscal_year
        ),
        author: report.company_name.clone(),
        subject: "Quarterly financial highlights".into(),
    };
    let bytes = write_pdf(&pages, &options.layout, &meta)?;

    debug!(blocks = blocks.len(), pages = pages.len(), size = bytes.len(), "document composed");
    Ok(DocumentArtifact {
        bytes,
        page_count: pages.len(),
        tables: vec![table, totals],
        charts,
    })
}

/// Write `bytes` to `path` atomically.
///
/// The data goes to a temporary file in the target directory and is renamed
/// into place only after a successful sync; on failure the temporary file is
/// removed and `path` is left untouched.
pub fn write_artifact(bytes: &[u8], path: &Path) -> ReportResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), size = bytes.len(), "artifact written");
    Ok(())
}

/// Build, compose and write the report described by `config`, optionally
/// with a JSON sidecar of expected answers.
pub fn generate(
    config: &ReportConfig,
    output: &Path,
    answers_path: Option<&Path>,
    renderer: &dyn ChartRenderer,
) -> ReportResult<GenerateSummary> {
    let report = build_report(config)?;
    let answers = expected_answers(&report, &config.queries)?;
    let artifact = compose_document(&report, &ComposeOptions::from(config), renderer)?;

    write_artifact(&artifact.bytes, output)?;
    if let Some(path) = answers_path {
        write_artifact(&serde_json::to_vec_pretty(&answers)?, path)?;
    }

    info!(
        path = %output.display(),
        pages = artifact.page_count,
        size = artifact.bytes.len(),
        "report generated"
    );
    Ok(GenerateSummary {
        output_path: output.to_path_buf(),
        answers_path: answers_path.map(Path::to_path_buf),
        size_bytes: artifact.bytes.len(),
        page_count: artifact.page_count,
        table_count: artifact.tables.len(),
        chart_count: artifact.charts.len(),
        answers,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn cover_blocks(report: &FinancialReport) -> Vec<Block> {
    vec![
        Block::Spacer(COVER_TOP_SPACE),
        Block::text(report.company_name.clone(), TextStyle::COVER_TITLE),
        Block::text(
            format!("Quarterly Earnings Report — Fiscal Year {}", report.fiscal_year),
            TextStyle::COVER_SUBTITLE,
        ),
        Block::Spacer(COVER_GAP),
        Block::text("Prepared for Investors and Analysts", TextStyle::BODY_CENTERED),
        Block::text(
            format!("Published: {}", report.published.format("%B %-d, %Y")),
            TextStyle::BODY_CENTERED,
        ),
        Block::PageBreak,
    ]
}

/// "Q1 2025 revenue guidance: $3,300–3,500 million."
fn guidance_statement(report: &FinancialReport) -> ReportResult<String> {
    let g = &report.guidance;
    let label = report
        .metric(&g.metric)
        .map(|m| (m.label.to_lowercase(), m.unit.clone()))
        .unwrap_or_else(|| (g.metric.clone(), String::new()));
    let range = report.guidance_range()?;
    let amount = match label.1.as_str() {
        "$M" => format!("${range} million"),
        "$B" => format!("${range} billion"),
        "$" => format!("${range}"),
        "" => range,
        unit => format!("{range} {unit}"),
    };
    Ok(format!("{} {} guidance: {}.", g.period, label.0, amount))
}
