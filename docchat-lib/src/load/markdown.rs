use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::load::{Page, Parser};
use crate::Result;

/// Markdown reduced to plain text.
///
/// Markup is stripped so that embeddings see prose rather than syntax;
/// the text of links, images and emphasis is kept.
pub struct MarkdownParser;

/// `(pattern, replacement)` pairs, applied in order.
static RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        // fence lines go, fenced code stays
        (r"(?m)^[ \t]*(?:```|~~~).*$", ""),
        (r"(?s)<!--.*?-->", ""),
        (r"</?[A-Za-z][^>\n]*>", ""),
        (r"!\[([^\]]*)\]\([^)]*\)", "${1}"),
        (r"\[([^\]]+)\]\([^)]*\)", "${1}"),
        (r"(?m)^[ \t]*\[[^\]]+\]:\s*\S+.*$", ""),
        (r"(?m)^[ \t]{0,3}#{1,6}[ \t]+(.*?)[ \t#]*$", "${1}"),
        (r"(?m)^[ \t]*(?:-{3,}|\*{3,}|_{3,}|={3,})[ \t]*$", ""),
        (r"(?m)^[ \t]*>[ \t]?", ""),
        (r"(?m)^[ \t]*(?:[-*+]|\d+[.)])[ \t]+", ""),
        (r"\*\*([^*\n]+)\*\*", "${1}"),
        (r"\b__([^_\n]+)__\b", "${1}"),
        (r"\*([^*\n]+)\*", "${1}"),
        (r"\b_([^_\n]+)_\b", "${1}"),
        (r"~~([^~\n]+)~~", "${1}"),
        (r"`([^`\n]+)`", "${1}"),
        (r"\n{3,}", "\n\n"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("static regex"), replacement))
    .collect()
});

/// Strip Markdown syntax, keeping the readable text.
#[must_use]
pub fn strip_markdown(source: &str) -> String {
    let mut text = source.replace("\r\n", "\n");
    for (re, replacement) in RULES.iter() {
        text = re.replace_all(&text, *replacement).into_owned();
    }
    text.trim().to_string()
}

impl Parser for MarkdownParser {
    fn name(&self) -> &str {
        "markdown"
    }

    fn parse(&self, _path: &Path, bytes: &[u8]) -> Result<Vec<Page>> {
        Ok(vec![Page::unnumbered(strip_markdown(&String::from_utf8_lossy(bytes)))])
    }
}
