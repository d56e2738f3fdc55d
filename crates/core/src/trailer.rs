//! Commit-message trailer parsing.
//!
//! Trailers are the `Key: Value` lines at the end of a commit message,
//! separated from the body by a blank line. [`ParsedMessage`] splits a raw
//! message into its body and trailer block; [`append_trailers`] adds new
//! trailer lines below the existing block without rewriting the text above
//! them.

use serde::{Deserialize, Serialize};

/// Trailer key for a DCO sign-off.
pub const SIGNED_OFF_BY: &str = "Signed-off-by";
/// Trailer key naming who executed a sign-off on the author's behalf.
pub const SIGN_OFF_EXECUTED_BY: &str = "Sign-off-executed-by";
/// Trailer key carrying the approval URL for a behalf sign-off.
pub const APPROVED_AT: &str = "Approved-at";

/// A single `Key: Value` trailer line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Trailer {
    pub key: String,
    pub value: String,
}

impl Trailer {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// Render as a `Key: Value` line without a trailing newline.
    pub fn render(&self) -> String {
        format!("{}: {}", self.key, self.value)
    }
}

/// A commit message split into its free-form body and trailer block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Body text without the trailer block or trailing blank lines.
    pub body: String,
    /// Trailers in message order; empty when the message has no block.
    pub trailers: Vec<Trailer>,
}

impl ParsedMessage {
    /// Split `message` into body and trailer block.
    ///
    /// The trailer block is the maximal trailing run of trailer-shaped lines
    /// preceded by a blank line, with at least one non-blank body line above
    /// it. A trailer-shaped line with no body above it is a subject line,
    /// not a block.
    pub fn parse(message: &str) -> Self {
        let lines: Vec<&str> = message.lines().collect();

        // Ignore trailing blank lines when locating the block.
        let mut end = lines.len();
        while end > 0 && lines[end - 1].trim().is_empty() {
            end -= 1;
        }

        // Walk backwards over trailer-shaped lines.
        let mut start = end;
        while start > 0 && parse_trailer_line(lines[start - 1]).is_some() {
            start -= 1;
        }

        let has_block = start < end
            && start > 0
            && lines[start - 1].trim().is_empty()
            && lines[..start - 1].iter().any(|l| !l.trim().is_empty());

        if has_block {
            let trailers = lines[start..end]
                .iter()
                .filter_map(|l| parse_trailer_line(l))
                .collect();
            Self {
                body: join_lines(&lines[..start - 1]),
                trailers,
            }
        } else {
            Self {
                body: join_lines(&lines[..end]),
                trailers: Vec::new(),
            }
        }
    }
}

/// Append trailer lines to `message`.
///
/// The new lines go directly below an existing trailer block, or after
/// exactly one blank line when the message has none. The original message
/// text is kept as written; only trailing whitespace is normalized so the
/// result ends in exactly one newline.
pub fn append_trailers(message: &str, new: &[Trailer]) -> String {
    let content = message.trim_end();
    let has_block = !ParsedMessage::parse(message).trailers.is_empty();

    let mut out = String::with_capacity(message.len() + 64);
    out.push_str(content);
    out.push_str(if has_block { "\n" } else { "\n\n" });
    for trailer in new {
        out.push_str(&trailer.render());
        out.push('\n');
    }
    out
}

/// Whether `message` already carries a `Signed-off-by` trailer from anyone.
pub fn contains_signoff(message: &str) -> bool {
    ParsedMessage::parse(message)
        .trailers
        .iter()
        .any(|t| t.key.eq_ignore_ascii_case(SIGNED_OFF_BY))
}

/// Parse one `Key: Value` line. Keys start with an ASCII letter and continue
/// with letters, digits, or `-`; the value must be non-empty.
fn parse_trailer_line(line: &str) -> Option<Trailer> {
    let colon = line.find(':')?;
    let key = &line[..colon];
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return None,
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }
    let value = line[colon + 1..].trim();
    if value.is_empty() {
        return None;
    }
    Some(Trailer::new(key, value))
}

fn join_lines(lines: &[&str]) -> String {
    lines.join("\n").trim_end().to_string()
}
