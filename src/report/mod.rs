//! Report rendering and persistence.
//!
//! Three renderings of the same [`RunResult`]: canonical JSON for machines,
//! CSV for spreadsheets, and a human-readable text summary. The writer
//! persists all three under `<run_id>.<ext>`.

pub mod human;
pub mod json;
pub mod table;
pub mod writer;

pub use writer::ReportWriter;
