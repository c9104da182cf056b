//! Markdown-ish quote normalization for text-matching fallbacks.
//!
//! Quoted text attached to a highlight is usually copied from the markdown
//! source, so it still carries syntax the rendered leaves don't have.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// `[text](url)` and `![alt](url)`, capturing the visible part.
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[(?P<text>[^\]]*)\]\([^)]*\)").unwrap());

/// Strip emphasis/strong/strikethrough/code markers, unescape `\x`, and
/// collapse links to their text.
///
/// Underscores inside words (`snake_case`) are content, not emphasis, and
/// are kept.
pub fn normalize_quote(quote: &str) -> String {
    let unlinked: Cow<'_, str> = LINK_RE.replace_all(quote, "$text");
    let chars: Vec<char> = unlinked.chars().collect();
    let mut out = String::with_capacity(unlinked.len());

    let mut idx = 0;
    while idx < chars.len() {
        let ch = chars[idx];
        let next = chars.get(idx + 1).copied();
        match ch {
            '\\' if next.is_some_and(|n| n.is_ascii_punctuation()) => {
                out.extend(next);
                idx += 2;
                continue;
            }
            '*' | '`' => {}
            '~' if next == Some('~') => {
                idx += 2;
                continue;
            }
            '_' => {
                let prev = idx.checked_sub(1).map(|p| chars[p]);
                if is_word_char(prev) && is_word_char(next) {
                    out.push('_');
                }
            }
            _ => out.push(ch),
        }
        idx += 1;
    }
    out
}

fn is_word_char(ch: Option<char>) -> bool {
    ch.is_some_and(char::is_alphanumeric)
}

/// First line of an already-normalized quote, if it is long enough
/// (strictly more than `min_len` chars) to be a trustworthy partial match.
pub fn first_line_prefix(normalized: &str, min_len: usize) -> Option<&str> {
    let line = normalized.split('\n').next()?.trim();
    (crate::text::char_len(line) > min_len).then_some(line)
}
