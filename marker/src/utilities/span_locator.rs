//! # Span Locator
//!
//! Finds where a quoted phrase from the model ("the incorrect text") occurs in the
//! submission. Models rarely reproduce spacing or capitalisation exactly, so matching is
//! case-insensitive and any whitespace run in the phrase matches any whitespace run in
//! the text. Each accepted match must start and end on a word boundary or whitespace so
//! that `"art"` is not highlighted inside `"start"`.
//!
//! Offsets are character (Unicode scalar) indices, `[start, end)`.

use crate::types::Span;
use regex::{Regex, RegexBuilder};
use tracing::debug;

/// Builds the whitespace-tolerant, case-insensitive pattern for `phrase`.
///
/// Returns `None` for a phrase that is empty after trimming.
pub fn phrase_pattern(phrase: &str) -> Option<Regex> {
    let pieces: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    if pieces.is_empty() {
        return None;
    }
    RegexBuilder::new(&pieces.join(r"\s+"))
        .case_insensitive(true)
        .build()
        .ok()
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether the boundary between `before` and `after` is a valid match edge.
fn bounded(before: Option<char>, after: Option<char>) -> bool {
    match (before, after) {
        (None, _) | (_, None) => true,
        (Some(b), Some(a)) => b.is_whitespace() || a.is_whitespace() || is_word(b) != is_word(a),
    }
}

/// Every non-overlapping, boundary-respecting occurrence of `phrase` in `text`, in order.
pub fn locate_spans(text: &str, phrase: &str) -> Vec<Span> {
    let Some(pattern) = phrase_pattern(phrase) else {
        return Vec::new();
    };

    let mut spans = Vec::new();
    let mut search_from = 0;
    // incremental byte -> char conversion; matches arrive in increasing order
    let mut counted_bytes = 0;
    let mut counted_chars = 0;
    let mut char_offset = |byte: usize| {
        counted_chars += text[counted_bytes..byte].chars().count();
        counted_bytes = byte;
        counted_chars
    };

    while search_from <= text.len() {
        let Some(found) = pattern.find_at(text, search_from) else {
            break;
        };
        let (start, end) = (found.start(), found.end());
        let before = text[..start].chars().next_back();
        let first = text[start..].chars().next();
        let last = text[..end].chars().next_back();
        let after = text[end..].chars().next();

        if start < end && bounded(before, first) && bounded(last, after) {
            let char_start = char_offset(start);
            let char_end = char_offset(end);
            spans.push(Span::new(char_start, char_end));
            search_from = end;
        } else {
            // retry one character later so an overlapping valid candidate is still found
            search_from = start + first.map_or(1, char::len_utf8);
        }
    }

    spans.dedup();
    debug!(phrase, matches = spans.len(), "located phrase");
    spans
}
