//! Text chunking for long documents

/// A break point is only used if it keeps at least this share of the window
const MIN_BREAK_RATIO: f64 = 0.6;

/// Splits text into bounded chunks, preferring natural boundaries
pub struct TextChunker {
    max_chunk_size: usize,
}

impl TextChunker {
    /// Create a new text chunker
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
        }
    }

    /// Chunk the given text
    ///
    /// Each chunk is at most `max_chunk_size` bytes. Breaks fall on the last
    /// paragraph break in the window, else the last sentence end, provided
    /// that point is at least 60% into the window; otherwise the window is
    /// cut at the limit (on a character boundary).
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut remaining = text.trim();

        while remaining.len() > self.max_chunk_size {
            let cut = self.break_point(remaining);
            let chunk = remaining[..cut].trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            remaining = remaining[cut..].trim_start();
        }

        if !remaining.is_empty() {
            chunks.push(remaining.to_string());
        }

        chunks
    }

    /// Byte offset at which to end the next chunk
    fn break_point(&self, text: &str) -> usize {
        let limit = floor_char_boundary(text, self.max_chunk_size);
        let window = &text[..limit];
        let min_break = (self.max_chunk_size as f64 * MIN_BREAK_RATIO) as usize;

        if let Some(pos) = window.rfind("\n\n") {
            if pos >= min_break {
                return pos;
            }
        }
        if let Some(pos) = window.rfind(". ") {
            if pos >= min_break {
                // Keep the period with its sentence
                return pos + 1;
            }
        }

        if limit == 0 {
            // A single character wider than the limit still has to go somewhere
            return text.chars().next().map(char::len_utf8).unwrap_or(text.len());
        }
        limit
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(crate::config::GeneratorConfig::default().max_chunk_size)
    }
}

/// Largest char boundary at or below `index`
fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut index = index;
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_chunking_needed_for_small_text() {
        let chunker = TextChunker::new(100);
        let chunks = chunker.chunk("  Short text here.  ");
        assert_eq!(chunks, vec!["Short text here."]);
    }

    #[test]
    fn test_empty_text() {
        let chunker = TextChunker::new(100);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk(" \n\n ").is_empty());
    }

    #[test]
    fn test_breaks_at_paragraph() {
        let chunker = TextChunker::new(40);
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = chunker.chunk(&text);
        assert_eq!(chunks, vec!["a".repeat(30), "b".repeat(30)]);
    }

    #[test]
    fn test_breaks_at_sentence() {
        let chunker = TextChunker::new(40);
        let text = format!("{}. {}", "a".repeat(30), "b".repeat(30));
        let chunks = chunker.chunk(&text);
        assert_eq!(chunks[0], format!("{}.", "a".repeat(30)));
        assert_eq!(chunks[1], "b".repeat(30));
    }

    #[test]
    fn test_early_break_is_ignored() {
        let chunker = TextChunker::new(40);
        // The paragraph break sits at 10%, below the 60% floor
        let text = format!("{}\n\n{}", "a".repeat(4), "b".repeat(60));
        let chunks = chunker.chunk(&text);
        assert_eq!(chunks[0].len(), 40);
    }

    #[test]
    fn test_very_long_single_paragraph() {
        let chunker = TextChunker::new(20);
        let chunks = chunker.chunk(&"a".repeat(100));
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|chunk| chunk.len() == 20));
    }

    #[test]
    fn test_multibyte_text_is_not_split_mid_char() {
        let chunker = TextChunker::new(5);
        let chunks = chunker.chunk("ééééééé");
        assert!(chunks.iter().all(|chunk| chunk.len() <= 5));
        assert_eq!(chunks.concat(), "ééééééé");
    }

    proptest! {
        #[test]
        fn prop_chunks_never_exceed_limit(text in "[a-zé .\\n]{0,500}", max in 8usize..120) {
            let chunker = TextChunker::new(max);
            for chunk in chunker.chunk(&text) {
                prop_assert!(chunk.len() <= max);
                prop_assert!(!chunk.is_empty());
            }
        }
    }
}
