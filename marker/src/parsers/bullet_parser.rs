//! # Bullet Parser
//!
//! Normalizes a single bullet string: drops the list marker, pulls out the first
//! `【...】` citation and strips wrapping noise. The category-specific split into
//! correction halves happens later in [`crate::formatter`].

use crate::error::MarkerError;
use crate::traits::parser::Parser;
use crate::utilities::text_cleanup::strip_wrapping;
use once_cell::sync::Lazy;
use regex::Regex;

static CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"【([^】]+)】").unwrap());

/// A bullet with its marker and citations removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBullet {
    pub text: String,
    pub citation: Option<String>,
}

#[derive(Debug, Default)]
pub struct BulletParser;

impl<'a> Parser<&'a str, ParsedBullet> for BulletParser {
    fn parse(&self, bullet: &'a str) -> Result<ParsedBullet, MarkerError> {
        let citation = CITATION
            .captures(bullet)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string());
        let without_citations = CITATION.replace_all(bullet, "");
        let text = strip_wrapping(strip_marker(without_citations.trim()));
        Ok(ParsedBullet {
            text: text.to_string(),
            citation,
        })
    }
}

/// Removes one leading `-`, `*` or `•` when followed by whitespace (or nothing).
fn strip_marker(text: &str) -> &str {
    for marker in ['-', '*', '•'] {
        if let Some(rest) = text.strip_prefix(marker) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ParsedBullet {
        BulletParser.parse(s).unwrap()
    }

    #[test]
    fn strips_marker_and_whitespace() {
        assert_eq!(parse("  - importent -> important ").text, "importent -> important");
        assert_eq!(parse("* note").text, "note");
        assert_eq!(parse("•\tnote").text, "note");
    }

    #[test]
    fn dash_without_space_is_content() {
        assert_eq!(parse("-5 marks").text, "-5 marks");
    }

    #[test]
    fn extracts_first_citation_and_removes_all() {
        let bullet = parse("- Level 2 response【15:0†markscheme.pdf】 see also【16:2†source】");
        assert_eq!(bullet.citation.as_deref(), Some("15:0†markscheme.pdf"));
        assert_eq!(bullet.text, "Level 2 response see also");
    }

    #[test]
    fn no_citation_is_none() {
        assert_eq!(parse("- fine").citation, None);
    }

    #[test]
    fn strips_backticks_and_ellipses() {
        assert_eq!(parse("- `...the war ended...`").text, "the war ended");
    }
}
