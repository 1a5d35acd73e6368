use crate::chunk::{Chunker, FixedSizeChunker, Fragment, FragmentMetadata};

/// Paragraph chunker - splits on paragraph boundaries
///
/// Good for: prose documents, policies, notes
///
/// Parameters:
/// - min_size: merge small paragraphs until at least this many bytes
/// - max_size: never emit a fragment larger than this; oversized
///   paragraphs are cut into fixed windows
/// - overlap: overlap of those fixed windows
pub struct ParagraphChunker {
    pub min_size: usize,
    pub max_size: usize,
    pub overlap: usize,
}

impl Default for ParagraphChunker {
    fn default() -> Self {
        Self {
            min_size: 200,
            max_size: 1000,
            overlap: 200,
        }
    }
}

/// Paragraph text accumulated until it is large enough to emit.
struct Pending<'a> {
    start: usize,
    parts: Vec<&'a str>,
    len: usize,
}

impl<'a> Pending<'a> {
    fn new() -> Self {
        Self {
            start: 0,
            parts: Vec::new(),
            len: 0,
        }
    }

    /// Length after appending `p`, counting the blank-line separator.
    fn len_with(&self, p: &str) -> usize {
        match self.parts.len() {
            0 => p.len(),
            _ => self.len + 2 + p.len(),
        }
    }

    fn push(&mut self, offset: usize, p: &'a str) {
        if self.parts.is_empty() {
            self.start = offset;
        }
        self.len = self.len_with(p);
        self.parts.push(p);
    }

    fn take(&mut self) -> Option<(usize, String)> {
        if self.parts.is_empty() {
            return None;
        }
        let text = self.parts.join("\n\n");
        self.parts.clear();
        self.len = 0;
        Some((self.start, text))
    }
}

impl Chunker for ParagraphChunker {
    fn name(&self) -> &str {
        "paragraph"
    }

    fn chunk(&self, content: &str, metadata: FragmentMetadata) -> Vec<Fragment> {
        let base = metadata.position;
        let fallback = FixedSizeChunker {
            chunk_size: self.max_size,
            overlap: self.overlap,
        };

        // (offset, text) pieces in document order
        let mut pieces: Vec<(usize, String)> = Vec::new();
        let mut pending = Pending::new();

        for (offset, p) in Paragraphs::from(content) {
            if p.len() > self.max_size {
                pieces.extend(pending.take());
                let mut m = metadata.clone();
                m.position = base + offset;
                pieces.extend(
                    fallback
                        .chunk(p, m)
                        .into_iter()
                        .map(|f| (f.metadata.position - base, f.content)),
                );
                continue;
            }

            if pending.len_with(p) > self.max_size {
                pieces.extend(pending.take());
            }
            pending.push(offset, p);

            if pending.len >= self.min_size {
                pieces.extend(pending.take());
            }
        }

        // flush trailing paragraphs even when below min_size
        pieces.extend(pending.take());

        let total = pieces.len();
        pieces
            .into_iter()
            .map(|(offset, text)| {
                let mut m = metadata.clone();
                m.position = base + offset;
                m.total_chunks = Some(total);
                Fragment::new(text, m)
            })
            .collect()
    }
}

/// Iterator over `(byte_offset, paragraph)` pairs.
///
/// Paragraphs are runs of non-blank lines; trailing whitespace is trimmed.
struct Paragraphs<'a> {
    s: &'a str,
    offset: usize,
}

impl<'a> Paragraphs<'a> {
    fn from(s: &'a str) -> Self {
        Self { s, offset: 0 }
    }
}

impl<'a> Iterator for Paragraphs<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        // Skip blank lines before the paragraph.
        loop {
            if self.s.is_empty() {
                return None;
            }
            let (line, rest) = split_first_line(self.s);
            if !is_blank(line) {
                break;
            }
            self.offset += line.len();
            self.s = rest;
        }

        // Extend until a blank line or end of input.
        let mut len = 0;
        loop {
            let (line, _) = split_first_line(&self.s[len..]);
            if line.is_empty() || is_blank(line) {
                break;
            }
            len += line.len();
        }

        let start = self.offset;
        let paragraph = &self.s[..len];
        self.s = &self.s[len..];
        self.offset += len;
        Some((start, paragraph.trim_end()))
    }
}

fn is_blank(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}

fn split_first_line(s: &str) -> (&str, &str) {
    let len = match s.find('\n') {
        Some(i) => i + 1,
        None => s.len(),
    };
    s.split_at(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> FragmentMetadata {
        FragmentMetadata::new("guide.md", None)
    }

    fn chunker(min_size: usize, max_size: usize) -> ParagraphChunker {
        ParagraphChunker {
            min_size,
            max_size,
            overlap: 0,
        }
    }

    #[test]
    fn test_single_paragraph() {
        let chunks = chunker(0, 1000).chunk("This is a single paragraph.", meta());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "This is a single paragraph.");
    }

    #[test]
    fn test_multiple_paragraphs() {
        let content = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunker(0, 1000).chunk(content, meta());

        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].content.contains("First"));
        assert!(chunks[1].content.contains("Second"));
        assert!(chunks[2].content.contains("Third"));
        assert!(chunks.iter().all(|c| c.metadata.total_chunks == Some(3)));
    }

    #[test]
    fn test_min_size_merging() {
        let content = "Short.\n\nAlso short.\n\nThis one is a bit longer paragraph.";
        let chunks = chunker(50, 1000).chunk(content, meta());

        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].content,
            "Short.\n\nAlso short.\n\nThis one is a bit longer paragraph."
        );
    }

    #[test]
    fn test_max_size_flushes_before_overflow() {
        let content = "aaaaaaaaaa\n\nbbbbbbbbbb\n\ncccccccccc";
        let chunks = chunker(100, 25).chunk(content, meta());

        // two paragraphs plus separator fit in 25 bytes, the third does not
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "aaaaaaaaaa\n\nbbbbbbbbbb");
        assert_eq!(chunks[1].content, "cccccccccc");
        assert!(chunks.iter().all(|c| c.content.len() <= 25));
    }

    #[test]
    fn test_oversized_paragraph_split() {
        let long = "x".repeat(25);
        let content = format!("intro\n\n{long}\n\noutro");
        let chunks = chunker(0, 10).chunk(&content, meta());

        assert_eq!(chunks[0].content, "intro");
        assert_eq!(chunks.last().unwrap().content, "outro");
        assert!(chunks.iter().all(|c| c.content.len() <= 10));
        let xs: usize = chunks.iter().map(|c| c.content.matches('x').count()).sum();
        assert_eq!(xs, 25);
    }

    #[test]
    fn test_trailing_content_flushed() {
        let content = "Short para one.\n\nShort para two.";
        let chunks = chunker(100, 1000).chunk(content, meta());

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("one"));
        assert!(chunks[0].content.contains("two"));
    }

    #[test]
    fn test_positions_are_byte_offsets() {
        let content = "\n\nFirst.\n\n\nSecond.\n";
        let chunks = chunker(0, 1000).chunk(content, meta());

        assert_eq!(chunks.len(), 2);
        assert_eq!(&content[chunks[0].metadata.position..][..6], "First.");
        assert_eq!(&content[chunks[1].metadata.position..][..7], "Second.");
    }

    #[test]
    fn test_empty_content() {
        assert!(chunker(0, 1000).chunk("", meta()).is_empty());
    }

    #[test]
    fn test_whitespace_only() {
        assert!(chunker(0, 1000).chunk("\n\n\n   \n\n", meta()).is_empty());
    }

    #[test]
    fn test_paragraphs_iterator() {
        let content = "Para one.\nstill one.\n\nPara two.\n\nPara three.";
        let paras: Vec<_> = Paragraphs::from(content).collect();

        assert_eq!(paras.len(), 3);
        assert_eq!(paras[0], (0, "Para one.\nstill one."));
        assert_eq!(paras[1].1, "Para two.");
    }

    #[test]
    fn test_unique_ids() {
        let content = "First unique paragraph.\n\nSecond unique paragraph.";
        let chunks = chunker(0, 1000).chunk(content, meta());

        assert_eq!(chunks.len(), 2);
        assert_ne!(chunks[0].id, chunks[1].id);
    }
}
