use clap::Args;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;

use finreport_core::compose;
use finreport_core::config::DEFAULT_OUTPUT_PATH;
use finreport_core::render::BarChartRenderer;
use finreport_core::with_metadata;

use crate::input;

/// Arguments for generating the report PDF
#[derive(Args)]
pub struct GenerateArgs {
    /// Path to a JSON or YAML report configuration (defaults to the built-in fixture)
    #[arg(long)]
    pub config: Option<String>,

    /// Where to write the PDF
    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output: String,

    /// Also write the expected answers as JSON to this path
    #[arg(long)]
    pub answers: Option<String>,
}

pub fn run_generate(args: GenerateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let config = input::load_config(args.config.as_deref())?;
    let summary = compose::generate(
        &config,
        Path::new(&args.output),
        args.answers.as_deref().map(Path::new),
        &BarChartRenderer::default(),
    )?;
    let output = with_metadata(
        "Deterministic tagged PDF: cover, narrative, structured tables, bar chart",
        Vec::new(),
        start.elapsed().as_micros() as u64,
        summary,
    );
    Ok(serde_json::to_value(output)?)
}
