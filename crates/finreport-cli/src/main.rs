mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::answers::AnswersArgs;
use commands::generate::GenerateArgs;
use commands::inspect::InspectArgs;

/// Deterministic synthetic financial report fixtures
#[derive(Parser)]
#[command(
    name = "finreport",
    version,
    about = "Generate and inspect synthetic financial report PDFs",
    long_about = "Builds a quarterly earnings report from a fixed configuration and renders \
                  it as a tagged PDF with a cover page, narrative, structured tables and a \
                  bar chart. Every number is exact and the output is byte-for-byte \
                  reproducible, so it can serve as a test fixture for document pipelines."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output_format: OutputFormat,

    /// Log debug events to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the report PDF (and optionally its expected answers)
    Generate(GenerateArgs),
    /// Print the questions the fixture answers and their expected answers
    Answers(AnswersArgs),
    /// Read a generated PDF back through its structure tree
    Inspect(InspectArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Generate(args) => commands::generate::run_generate(args),
        Commands::Answers(args) => commands::answers::run_answers(args),
        Commands::Inspect(args) => commands::inspect::run_inspect(args),
        Commands::Version => {
            println!("finreport {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output_format, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
