//! Trimming helpers for bullet text and correction parts.

const ELLIPSES: [&str; 2] = ["...", "…"];
const QUOTES: [char; 6] = ['\'', '"', '‘', '’', '“', '”'];

/// Strips surrounding whitespace, backticks and leading/trailing ellipses, repeatedly,
/// until nothing more comes off.
pub fn strip_wrapping(text: &str) -> &str {
    strip_until_stable(text, false)
}

/// Like [`strip_wrapping`], but also removes stray quote characters from both ends.
///
/// Used on the two halves of an `incorrect -> correct` bullet.
pub fn clean_part(text: &str) -> &str {
    strip_until_stable(text, true)
}

fn strip_until_stable(text: &str, quotes: bool) -> &str {
    let mut current = text;
    loop {
        let mut next = current.trim().trim_matches('`');
        for ellipsis in ELLIPSES {
            next = next.strip_prefix(ellipsis).unwrap_or(next);
            next = next.strip_suffix(ellipsis).unwrap_or(next);
        }
        if quotes {
            next = next.trim_matches(&QUOTES[..]);
        }
        if next.len() == current.len() {
            return next;
        }
        current = next;
    }
}
