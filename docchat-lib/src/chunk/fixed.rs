use crate::chunk::{ceil_char_boundary, floor_char_boundary, Chunker, Fragment, FragmentMetadata};

/// Fixed-size chunker - splits by byte count on char boundaries
///
/// Good for: unstructured text with no paragraph breaks, and as the
/// fallback for paragraphs larger than the paragraph chunker allows.
///
/// Windows advance by `chunk_size - overlap`; the last window ends at the
/// end of the content.
pub struct FixedSizeChunker {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl FixedSizeChunker {
    fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap).max(1)
    }
}

impl Chunker for FixedSizeChunker {
    fn name(&self) -> &str {
        "fixed"
    }

    fn chunk(&self, content: &str, metadata: FragmentMetadata) -> Vec<Fragment> {
        if content.trim().is_empty() || self.chunk_size == 0 {
            return Vec::new();
        }

        let stride = self.stride();
        let base = metadata.position;

        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = ceil_char_boundary(content, start + self.chunk_size);
            windows.push((start, end));
            if end >= content.len() {
                break;
            }
            let next = floor_char_boundary(content, start + stride);
            // a window narrower than one char would stall on multi-byte input
            start = if next > start { next } else { end };
        }

        let windows: Vec<_> = windows
            .into_iter()
            .filter(|(s, e)| !content[*s..*e].trim().is_empty())
            .collect();
        let total = windows.len();

        windows
            .into_iter()
            .map(|(s, e)| {
                let mut m = metadata.clone();
                m.position = base + s;
                m.total_chunks = Some(total);
                Fragment::new(&content[s..e], m)
            })
            .collect()
    }
}
