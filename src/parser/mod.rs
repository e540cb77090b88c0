pub mod extract;
pub mod segment;

use crate::models::StudentRecord;

pub use segment::SEAT_ANCHOR;

/// Fixed column offsets of a subject row, counted in whitespace tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    /// First token of the course name.
    pub name_start: usize,
    /// Tokens taken for the course name, truncated at the end of the row.
    pub name_width: usize,
    /// The grade is this many tokens from the end of the row.
    pub grade_from_end: usize,
    /// Rows with fewer tokens are skipped.
    pub min_tokens: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            name_start: 1,
            name_width: 3,
            grade_from_end: 5,
            min_tokens: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    pub anchor: String,
    pub columns: ColumnLayout,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            anchor: SEAT_ANCHOR.to_string(),
            columns: ColumnLayout::default(),
        }
    }
}

/// Two-pass pipeline: raw text → per-student blocks → records.
///
/// Blocks the extractor rejects are logged and skipped; the rest keep their
/// order in `text`.
pub fn parse_records(text: &str, config: &ParserConfig) -> Vec<StudentRecord> {
    let blocks = segment::segment(text, &config.anchor);
    let mut records = Vec::with_capacity(blocks.len());

    for (idx, block) in blocks.iter().enumerate() {
        match extract::extract(block, config) {
            Ok(record) => records.push(record),
            Err(err) => tracing::warn!(block = idx, "skipping unparseable block: {err:#}"),
        }
    }

    tracing::debug!(
        blocks = blocks.len(),
        records = records.len(),
        "parsed result sheet text"
    );
    records
}
