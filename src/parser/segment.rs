/// Literal marker that opens every student's block on a result sheet.
pub const SEAT_ANCHOR: &str = "SEAT NO.:";

/// Splits `text` before every occurrence of `anchor`.
///
/// Each returned block starts at an anchor. Text before the first anchor is
/// dropped, and no anchors at all gives an empty vector.
pub fn segment<'a>(text: &'a str, anchor: &str) -> Vec<&'a str> {
    if anchor.is_empty() {
        return Vec::new();
    }

    let starts: Vec<usize> = text.match_indices(anchor).map(|(idx, _)| idx).collect();
    let mut blocks = Vec::with_capacity(starts.len());

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        blocks.push(&text[start..end]);
    }

    blocks
}
