//! # Highlight Merge & Render
//!
//! Collapses the located spans of many records into non-overlapping coloured runs.
//! Where spans overlap, the active colours are blended by per-channel mean
//! ([`Rgb::blend`]); adjacent stretches with the same composite colour form one run.
//!
//! Renderers never modify the submission text, they only wrap runs of it.

use crate::types::{FeedbackRecord, Rgb};
use colored::Colorize;
use std::collections::BTreeSet;

/// A `[start, end)` character range drawn in a single (possibly blended) colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRun {
    pub start: usize,
    pub end: usize,
    pub colour: Rgb,
}

/// Merges the spans of `records` over a text of `text_len` characters.
///
/// Spans are clamped to the text; empty ranges and records without spans are ignored.
pub fn merge_highlights(text_len: usize, records: &[FeedbackRecord]) -> Vec<HighlightRun> {
    let ranges: Vec<(usize, usize, Rgb)> = records
        .iter()
        .filter_map(|r| r.spans.as_ref().map(|spans| (spans, r.colour.rgb())))
        .flat_map(|(spans, rgb)| {
            spans
                .iter()
                .map(move |s| (s.start.min(text_len), s.end.min(text_len), rgb))
        })
        .filter(|(start, end, _)| start < end)
        .collect();

    let boundaries: BTreeSet<usize> = ranges.iter().flat_map(|(s, e, _)| [*s, *e]).collect();
    let boundaries: Vec<usize> = boundaries.into_iter().collect();

    let mut runs: Vec<HighlightRun> = Vec::new();
    for window in boundaries.windows(2) {
        let (seg_start, seg_end) = (window[0], window[1]);
        let active: Vec<Rgb> = ranges
            .iter()
            .filter(|(s, e, _)| *s <= seg_start && seg_end <= *e)
            .map(|(_, _, rgb)| *rgb)
            .collect();
        let Some(colour) = Rgb::blend(&active) else {
            continue;
        };
        match runs.last_mut() {
            Some(last) if last.end == seg_start && last.colour == colour => last.end = seg_end,
            _ => runs.push(HighlightRun {
                start: seg_start,
                end: seg_end,
                colour,
            }),
        }
    }
    runs
}

/// Splits `text` into `(segment, colour)` pieces following `runs`.
fn segments<'a>(text: &'a str, runs: &[HighlightRun]) -> Vec<(&'a str, Option<Rgb>)> {
    let byte_at: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = byte_at.len() - 1;
    let byte = |c: usize| byte_at[c.min(char_len)];

    let mut pieces = Vec::new();
    let mut cursor = 0;
    for run in runs {
        let (start, end) = (run.start.min(char_len), run.end.min(char_len));
        if start < cursor || start >= end {
            continue;
        }
        if cursor < start {
            pieces.push((&text[byte(cursor)..byte(start)], None));
        }
        pieces.push((&text[byte(start)..byte(end)], Some(run.colour)));
        cursor = end;
    }
    if cursor < char_len {
        pieces.push((&text[byte(cursor)..], None));
    }
    pieces
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML-escaped text with each run wrapped in a coloured `<mark>`.
pub fn render_html(text: &str, runs: &[HighlightRun]) -> String {
    segments(text, runs)
        .into_iter()
        .map(|(piece, colour)| match colour {
            Some(rgb) => format!(
                "<mark style=\"background-color: {rgb}\">{}</mark>",
                escape_html(piece)
            ),
            None => escape_html(piece),
        })
        .collect()
}

/// Text with each run given a 24-bit ANSI background.
pub fn render_terminal(text: &str, runs: &[HighlightRun]) -> String {
    segments(text, runs)
        .into_iter()
        .map(|(piece, colour)| match colour {
            Some(rgb) => piece.black().on_truecolor(rgb.r, rgb.g, rgb.b).to_string(),
            None => piece.to_string(),
        })
        .collect()
}
