use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid model: {field} — {reason}")]
    InvalidModel { field: String, reason: String },

    #[error("Layout overflow: {block} — {reason}")]
    LayoutOverflow { block: String, reason: String },

    #[error("Unsupported glyph {ch:?} in {context}")]
    UnsupportedGlyph { ch: char, context: String },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ReportError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ReportError::InvalidModel {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(block: impl Into<String>, reason: impl Into<String>) -> Self {
        ReportError::LayoutOverflow {
            block: block.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self {
        ReportError::Serialization(e.to_string())
    }
}

impl From<lopdf::Error> for ReportError {
    fn from(e: lopdf::Error) -> Self {
        ReportError::Pdf(e.to_string())
    }
}
