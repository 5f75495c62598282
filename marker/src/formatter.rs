//! # Feedback Formatter
//!
//! Turns raw per-category model output into [`FeedbackRecord`]s:
//!
//! 1. [`OutputParser`] repairs and parses the reply into bullet strings.
//! 2. [`BulletParser`] strips markers and extracts the citation.
//! 3. The category's [`BulletShape`] decides between an `incorrect -> correct` pair and a
//!    plain comment.
//! 4. Correction pairs are located in text submissions with [`locate_spans`].
//!
//! A category whose output cannot be parsed is reported to the caller and contributes no
//! records; it never affects the other categories.

use crate::error::MarkerError;
use crate::parsers::bullet_parser::BulletParser;
use crate::parsers::output_parser::OutputParser;
use crate::traits::parser::Parser;
use crate::types::{
    BulletShape, FeedbackCategory, FeedbackRecord, RawCategoryOutput, Submission,
};
use crate::utilities::span_locator::locate_spans;
use crate::utilities::text_cleanup::clean_part;
use std::collections::HashSet;
use tracing::warn;

/// Separator between the incorrect phrase and its correction.
pub const CORRECTION_SEPARATOR: &str = " -> ";

/// Formats one category's raw reply.
///
/// # Errors
///
/// Returns the [`MarkerError`] from the output parser when no fallback could make sense of
/// the reply. Individual malformed bullets are dropped with a warning instead.
pub fn format_category_output(
    category: FeedbackCategory,
    raw: &str,
    submission: &Submission,
) -> Result<Vec<FeedbackRecord>, MarkerError> {
    let bullets = OutputParser.parse(raw)?;
    let mut seen: HashSet<(Option<String>, String)> = HashSet::new();
    let mut records = Vec::with_capacity(bullets.len());

    for bullet in &bullets {
        let parsed = BulletParser.parse(bullet)?;

        let (incorrect_text, feedback_text) = match category.shape() {
            BulletShape::Correction => {
                let Some((incorrect, correct)) = parsed.text.split_once(CORRECTION_SEPARATOR)
                else {
                    warn!(%category, bullet = %bullet, "dropping bullet without '->' separator");
                    continue;
                };
                let incorrect = clean_part(incorrect);
                if incorrect.is_empty() {
                    warn!(%category, bullet = %bullet, "dropping bullet with empty incorrect text");
                    continue;
                }
                (Some(incorrect.to_string()), clean_part(correct).to_string())
            }
            BulletShape::Comment => {
                if parsed.text.is_empty() {
                    continue;
                }
                (None, parsed.text)
            }
        };

        if !seen.insert((incorrect_text.clone(), feedback_text.clone())) {
            continue;
        }

        let spans = match (&incorrect_text, submission) {
            (Some(phrase), Submission::Text(text)) => Some(locate_spans(text, phrase)),
            _ => None,
        };

        records.push(FeedbackRecord {
            category,
            incorrect_text,
            feedback_text,
            citation: parsed.citation,
            spans,
            colour: category.colour(),
        });
    }

    Ok(records)
}

/// All records from a batch of category outputs, plus the categories that failed to parse.
#[derive(Debug, Default)]
pub struct FormattedFeedback {
    pub records: Vec<FeedbackRecord>,
    pub failed_categories: Vec<FeedbackCategory>,
}

/// Formats every output in order. Parse failures are logged and collected, not propagated.
pub fn format_outputs(outputs: &[RawCategoryOutput], submission: &Submission) -> FormattedFeedback {
    let mut formatted = FormattedFeedback::default();
    for output in outputs {
        match format_category_output(output.category, &output.text, submission) {
            Ok(records) => formatted.records.extend(records),
            Err(e) => {
                warn!(category = %output.category, error = %e, "could not parse category output");
                formatted.failed_categories.push(output.category);
            }
        }
    }
    formatted
}
