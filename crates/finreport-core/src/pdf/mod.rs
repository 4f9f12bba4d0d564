pub mod inspect;
pub mod writer;

pub use inspect::{extract_tables, inspect_pdf, InspectedDocument, TaggedBlock};
pub use writer::{write_pdf, PdfMetadata};
