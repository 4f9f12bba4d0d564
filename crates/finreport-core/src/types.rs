use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary and per-share values. Exact decimals, never f64.
pub type Money = Decimal;

/// Typographic points (1/72 inch), the unit of every layout coordinate.
pub type Points = f32;

/// Standard command output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub warnings: Vec<String>,
    pub metadata: ReportMetadata,
}

/// Metadata attached to every command result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ReportOutput<T> {
    ReportOutput {
        result,
        methodology: methodology.to_string(),
        warnings,
        metadata: ReportMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
