use clap::Args;
use serde_json::Value;
use std::time::Instant;

use finreport_core::answers::expected_answers;
use finreport_core::report::build_report;
use finreport_core::with_metadata;

use crate::input;

/// Arguments for printing the fixture's expected answers
#[derive(Args)]
pub struct AnswersArgs {
    /// Path to a JSON or YAML report configuration (defaults to the built-in fixture)
    #[arg(long)]
    pub config: Option<String>,
}

pub fn run_answers(args: AnswersArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let config = input::load_config(args.config.as_deref())?;
    let report = build_report(&config)?;
    let answers = expected_answers(&report, &config.queries)?;

    let mut warnings = Vec::new();
    if answers.is_empty() {
        warnings.push("Configuration defines no queries".to_string());
    }
    let output = with_metadata(
        "Answers derived from the validated report model",
        warnings,
        start.elapsed().as_micros() as u64,
        answers,
    );
    Ok(serde_json::to_value(output)?)
}
