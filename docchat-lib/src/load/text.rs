use std::path::Path;

use crate::load::{Page, Parser};
use crate::Result;

/// Plain text, decoded as UTF-8 with invalid sequences replaced.
pub struct TextParser;

impl Parser for TextParser {
    fn name(&self) -> &str {
        "text"
    }

    fn parse(&self, _path: &Path, bytes: &[u8]) -> Result<Vec<Page>> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        Ok(vec![Page::unnumbered(text)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let pages = TextParser.parse(Path::new("a.txt"), b"caf\xe9 menu").unwrap();
        assert_eq!(pages, vec![Page::unnumbered("caf\u{fffd} menu")]);
    }

    #[test]
    fn test_bom_stripped() {
        let pages = TextParser.parse(Path::new("a.txt"), "\u{feff}hello".as_bytes()).unwrap();
        assert_eq!(pages[0].text, "hello");
    }
}
