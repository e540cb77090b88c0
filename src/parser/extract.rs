use std::sync::LazyLock;

use anyhow::bail;
use regex::Regex;

use super::{ColumnLayout, ParserConfig};
use crate::models::{StudentRecord, SubjectGrade, UNKNOWN};

static SEAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SEAT NO\.:\s*([A-Z0-9]+)").unwrap());
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"NAME\s*:\s*(.*?)\s+MOTHER").unwrap());
static MOTHER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"MOTHER\s*:\s*(.*?)\s+PRN").unwrap());
static PRN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"PRN\s*:\s*([A-Z0-9]+)").unwrap());
static SGPA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:FIRST|SECOND|THIRD|FOURTH)?\s*YEAR\s*SGPA\s*:\s*([0-9.]+|--)").unwrap()
});
static CREDITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"TOTAL CREDITS EARNED\s*:\s*(\d+)").unwrap());
static SUBJECT_ROW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5,}[A-Z]?").unwrap());

const DEFAULT_SGPA: &str = "0.0";

/// A named pattern whose first capture group is the field value.
struct FieldRule {
    field: &'static str,
    pattern: &'static LazyLock<Regex>,
}

impl FieldRule {
    fn find<'a>(&self, block: &'a str) -> Option<&'a str> {
        let value = self
            .pattern
            .captures(block)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim());
        if value.is_none() {
            tracing::trace!(field = self.field, "field not found in block");
        }
        value
    }
}

static SEAT: FieldRule = FieldRule { field: "seat_number", pattern: &SEAT_RE };
static NAME: FieldRule = FieldRule { field: "name", pattern: &NAME_RE };
static MOTHER: FieldRule = FieldRule { field: "mother_name", pattern: &MOTHER_RE };
static PRN: FieldRule = FieldRule { field: "prn", pattern: &PRN_RE };
static SGPA: FieldRule = FieldRule { field: "sgpa", pattern: &SGPA_RE };
static CREDITS: FieldRule = FieldRule { field: "credits", pattern: &CREDITS_RE };

fn text_or_unknown(rule: &FieldRule, block: &str) -> String {
    rule.find(block).unwrap_or(UNKNOWN).to_string()
}

/// Builds a record from one segmented block.
///
/// Every field is looked up independently; a missing field takes its
/// default instead of failing the record. Only a block that does not carry
/// the configured anchor is rejected.
pub fn extract(block: &str, config: &ParserConfig) -> anyhow::Result<StudentRecord> {
    if !block.contains(config.anchor.as_str()) {
        bail!("block does not contain the {:?} anchor", config.anchor);
    }

    let sgpa_raw = SGPA.find(block).unwrap_or(DEFAULT_SGPA).to_string();
    let credits = CREDITS
        .find(block)
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(StudentRecord::new(
        text_or_unknown(&SEAT, block),
        text_or_unknown(&NAME, block),
        text_or_unknown(&MOTHER, block),
        text_or_unknown(&PRN, block),
        sgpa_raw,
        credits,
        parse_subject_grades(block, &config.columns),
    ))
}

/// Reads subject rows out of a block, keeping their order.
///
/// A row is any trimmed line that starts with a course code of five or more
/// digits. Columns are addressed by fixed offsets from `layout`.
pub fn parse_subject_grades(block: &str, layout: &ColumnLayout) -> Vec<SubjectGrade> {
    let mut subjects = Vec::new();

    for line in block.lines() {
        let line = line.trim();
        if !SUBJECT_ROW_RE.is_match(line) {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < layout.min_tokens {
            continue;
        }
        let Some(grade_idx) = tokens.len().checked_sub(layout.grade_from_end) else {
            continue;
        };

        let name_start = layout.name_start.min(tokens.len());
        let name_end = (layout.name_start + layout.name_width).min(tokens.len());

        subjects.push(SubjectGrade {
            course_code: tokens[0].to_string(),
            course_name: tokens[name_start..name_end].join(" "),
            grade: tokens[grade_idx].to_string(),
        });
    }

    subjects
}
