pub mod answers;
pub mod compose;
pub mod config;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod render;
pub mod report;
pub mod types;

pub use error::ReportError;
pub use types::*;

/// Standard result type for all report operations
pub type ReportResult<T> = Result<T, ReportError>;
