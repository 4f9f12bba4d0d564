use clap::Args;
use serde_json::Value;
use std::time::Instant;

use finreport_core::pdf::inspect_pdf;
use finreport_core::with_metadata;

use crate::input;

/// Arguments for reading a generated PDF back through its tags
#[derive(Args)]
pub struct InspectArgs {
    /// Path to the PDF
    pub pdf: String,
}

pub fn run_inspect(args: InspectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let bytes = input::file::read_bytes(&args.pdf)?;
    let doc = inspect_pdf(&bytes)?;

    let mut warnings = Vec::new();
    if doc.tables.is_empty() {
        warnings.push("No tagged tables found".to_string());
    }
    if doc.image_count != doc.figures.len() {
        warnings.push(format!(
            "{} images but {} tagged figures",
            doc.image_count,
            doc.figures.len()
        ));
    }
    let output = with_metadata(
        "Structure tree walk; cell text recovered per marked-content sequence",
        warnings,
        start.elapsed().as_micros() as u64,
        doc,
    );
    Ok(serde_json::to_value(output)?)
}
