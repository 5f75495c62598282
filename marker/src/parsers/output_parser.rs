//! # Output Parser
//!
//! Turns one category's raw model reply into its ordered list of bullet strings.
//!
//! The model is asked for `{"<category title>": ["- bullet", ...]}` but routinely wraps
//! it in code fences, surrounds it with prose, mixes quote styles or leaves trailing
//! commas. Parsing is an explicit fallback chain, first success wins:
//!
//! 1. strict `serde_json` on the fence-stripped text;
//! 2. strict `serde_json` on the output of [`repair_json`];
//! 3. the permissive [`LiteralParser`];
//! 4. plain `- bullet` lines, for replies that ignored the JSON contract entirely.
//!
//! If all four fail the category is reported as [`MarkerError::InvalidJson`].

use crate::error::MarkerError;
use crate::parsers::literal_parser::LiteralParser;
use crate::traits::parser::Parser;
use serde_json::Value;
use tracing::{debug, warn};

/// Parses a raw category reply into bullet strings (markers still attached).
#[derive(Debug, Default)]
pub struct OutputParser;

impl<'a> Parser<&'a str, Vec<String>> for OutputParser {
    fn parse(&self, raw: &'a str) -> Result<Vec<String>, MarkerError> {
        let stripped = strip_code_fences(raw);
        if stripped.is_empty() {
            return Err(MarkerError::EmptyOutput);
        }
        let candidate = isolate_json(stripped);

        let strict_error = match serde_json::from_str::<Value>(candidate) {
            Ok(value) => return extract_bullets(value),
            Err(e) => e.to_string(),
        };
        debug!(error = %strict_error, "strict parse failed, repairing");

        let repaired = repair_json(candidate);
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            return extract_bullets(value);
        }

        match LiteralParser.parse(candidate) {
            Ok(value) => return extract_bullets(value),
            Err(e) => debug!(error = %e, "literal parse failed"),
        }

        if let Some(bullets) = bullet_lines(stripped) {
            warn!(count = bullets.len(), "model ignored JSON contract, using bullet lines");
            return Ok(bullets);
        }

        Err(MarkerError::InvalidJson(strict_error))
    }
}

/// Removes a surrounding Markdown code fence (```` ```json ... ``` ````) and outer whitespace.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // drop the info string (`json`, `JSON`, ...) up to the first newline
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Narrows `text` to the outermost `{...}` when prose surrounds the JSON object.
fn isolate_json(text: &str) -> &str {
    if text.starts_with('{') || text.starts_with('[') {
        return text;
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Next index at or after `from` that is not whitespace.
fn next_significant(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len()).find(|&i| !chars[i].is_whitespace())
}

/// Whether a quote at `idx` ends the current string rather than sitting inside it.
///
/// A closing quote is followed by `:`, `]`, `}`, end of input, or a comma that is
/// itself followed by the start of another element or a closing bracket.
fn closes_string(chars: &[char], idx: usize) -> bool {
    let Some(next) = next_significant(chars, idx + 1) else {
        return true;
    };
    match chars[next] {
        ':' | ']' | '}' => true,
        ',' => match next_significant(chars, next + 1) {
            None => true,
            Some(after) => matches!(chars[after], '"' | '\'' | ']' | '}' | '{' | '['),
        },
        _ => false,
    }
}

/// Whether the next unescaped `"` after `idx` would itself end a string.
fn later_double_quote_closes(chars: &[char], idx: usize) -> bool {
    (idx + 1..chars.len())
        .find(|&j| chars[j] == '"' && chars[j - 1] != '\\')
        .is_some_and(|j| closes_string(chars, j))
}

/// Best-effort rewrite of near-JSON into JSON.
///
/// - single-quote string delimiters become double quotes, apostrophes inside words stay;
/// - a `'` only ends a `"`-opened string when no later `"` would end it instead;
/// - quotes that do not close their string are escaped;
/// - `\'` becomes `'`, raw control characters inside strings are escaped;
/// - trailing commas before `]` / `}` are dropped.
pub fn repair_json(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut delimiter: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match delimiter {
            None => match c {
                '"' | '\'' => {
                    delimiter = Some(c);
                    out.push('"');
                }
                ',' => {
                    let trailing = next_significant(&chars, i + 1)
                        .is_some_and(|j| matches!(chars[j], ']' | '}'));
                    if !trailing {
                        out.push(',');
                    }
                }
                _ => out.push(c),
            },
            Some(_) => match c {
                '\\' => {
                    match chars.get(i + 1) {
                        Some('\'') => out.push('\''),
                        Some(&n) if matches!(n, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u') => {
                            out.push('\\');
                            out.push(n);
                        }
                        _ => {
                            out.push_str("\\\\");
                            i += 1;
                            continue;
                        }
                    }
                    i += 2;
                    continue;
                }
                '"' if closes_string(&chars, i) => {
                    delimiter = None;
                    out.push('"');
                }
                '\'' if closes_string(&chars, i)
                    && (delimiter == Some('\'') || !later_double_quote_closes(&chars, i)) =>
                {
                    delimiter = None;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                _ => out.push(c),
            },
        }
        i += 1;
    }

    if delimiter.is_some() {
        out.push('"');
    }
    out
}

/// Pulls the bullet list out of a parsed reply.
///
/// Uses the first key of an object (later keys are ignored), descends into a nested
/// object under that key, and accepts a bare top-level array.
pub fn extract_bullets(value: Value) -> Result<Vec<String>, MarkerError> {
    match value {
        Value::Object(map) => {
            let key_count = map.len();
            let Some((key, inner)) = map.into_iter().next() else {
                return Err(MarkerError::UnexpectedStructure(
                    "object has no feedback key".into(),
                ));
            };
            if key_count > 1 {
                debug!(%key, ignored = key_count - 1, "using first key only");
            }
            match inner {
                Value::String(single) => Ok(vec![single]),
                other => extract_bullets(other),
            }
        }
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                other => {
                    warn!(item = %other, "skipping non-string bullet");
                    None
                }
            })
            .collect()),
        other => Err(MarkerError::UnexpectedStructure(format!(
            "expected an object or array, got {}",
            match other {
                Value::Null => "null",
                Value::Bool(_) => "a boolean",
                Value::Number(_) => "a number",
                _ => "a string",
            }
        ))),
    }
}

fn is_bullet_start(line: &str) -> bool {
    ["- ", "* ", "• "].iter().any(|m| line.starts_with(m))
}

/// Collects `- item` lines from free text. A bullet runs until the next bullet or a blank line.
fn bullet_lines(text: &str) -> Option<Vec<String>> {
    let mut bullets: Vec<String> = Vec::new();
    let mut open = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if is_bullet_start(trimmed) {
            bullets.push(trimmed.to_string());
            open = true;
        } else if trimmed.is_empty() {
            open = false;
        } else if open {
            if let Some(last) = bullets.last_mut() {
                last.push(' ');
                last.push_str(trimmed);
            }
        }
    }
    if bullets.is_empty() { None } else { Some(bullets) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Vec<String>, MarkerError> {
        OutputParser.parse(raw)
    }

    #[test]
    fn well_formed_json_round_trips() {
        let raw = r#"{"Spelling, Punctuation and Grammar": ["- importent -> important", "- policys -> policies"]}"#;
        assert_eq!(
            parse(raw).unwrap(),
            vec!["- importent -> important", "- policys -> policies"]
        );
    }

    #[test]
    fn strips_json_code_fence() {
        let raw = "```json\n{\n    \"Marking\": [\n        \"- Level 2\"\n    ]\n}\n```";
        assert_eq!(parse(raw).unwrap(), vec!["- Level 2"]);
    }

    #[test]
    fn quoted_words_inside_a_bullet_stay_in_one_string() {
        assert_eq!(
            parse(r#"{"Overall": ["- Use 'however', 'therefore' to link ideas", ]}"#).unwrap(),
            vec!["- Use 'however', 'therefore' to link ideas"]
        );
    }

    #[test]
    fn mixed_quote_delimiter_is_repaired_without_touching_apostrophes() {
        let raw = "```json\n{\n    \"SPaG\": [\n        \"- its seen -> It's seen\",\n        \"- this was -> this',\n        \"- critisicm -> criticism\"\n    ]\n}\n```";
        assert_eq!(
            parse(raw).unwrap(),
            vec![
                "- its seen -> It's seen",
                "- this was -> this",
                "- critisicm -> criticism"
            ]
        );
    }

    #[test]
    fn single_quoted_keys_and_trailing_commas() {
        let raw = "{'SPaG': ['- teh -> the', '- It's -> Its',],}";
        assert_eq!(parse(raw).unwrap(), vec!["- teh -> the", "- It's -> Its"]);
    }

    #[test]
    fn unescaped_inner_quotes_are_escaped() {
        let raw = r#"{"Overall": ["- Spell "Afghanistan" consistently", "- Use topic sentences"]}"#;
        assert_eq!(
            parse(raw).unwrap(),
            vec![
                "- Spell \"Afghanistan\" consistently",
                "- Use topic sentences"
            ]
        );
    }

    #[test]
    fn prose_around_object_is_ignored() {
        let raw = "Here is the feedback:\n{\"Marking\": [\"- 6 out of 8\"]}\nHope this helps!";
        assert_eq!(parse(raw).unwrap(), vec!["- 6 out of 8"]);
    }

    #[test]
    fn only_first_key_is_used() {
        let raw = r#"{"Marking": ["- a"], "Extra": ["- b"]}"#;
        assert_eq!(parse(raw).unwrap(), vec!["- a"]);
    }

    #[test]
    fn nested_object_under_key_is_descended() {
        let raw = r#"{"Overall Comments": {"items": ["- be precise"]}}"#;
        assert_eq!(parse(raw).unwrap(), vec!["- be precise"]);
    }

    #[test]
    fn plain_bullet_text_fallback() {
        let raw = "1. Spelling, Punctuation and Grammar:\n\n- `Afganistan` -> `Afghanistan`\n- `Afgan` -> `Afghan`\n\nThis enhances clarity.";
        assert_eq!(
            parse(raw).unwrap(),
            vec!["- `Afganistan` -> `Afghanistan`", "- `Afgan` -> `Afghan`"]
        );
    }

    #[test]
    fn hopeless_output_is_an_error() {
        assert!(matches!(
            parse("I cannot help with that."),
            Err(MarkerError::InvalidJson(_))
        ));
        assert_eq!(parse("```json\n```"), Err(MarkerError::EmptyOutput));
    }

    #[test]
    fn non_string_items_are_skipped() {
        assert_eq!(parse(r#"["- a", 3, null, "- b"]"#).unwrap(), vec!["- a", "- b"]);
    }

    #[test]
    fn repair_escapes_raw_newlines() {
        assert_eq!(repair_json("{'a': ['x\ny']}"), "{\"a\": [\"x\\ny\"]}");
    }
}
