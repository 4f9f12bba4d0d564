pub mod format;
pub mod model;
pub mod narrative;
pub mod period;

pub use model::{build_report, FinancialReport, Guidance, Metric, MetricRef, NarrativeSection};
