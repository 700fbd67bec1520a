//! Reassembles streamed transcript segments into one utterance.

use std::collections::BTreeMap;

/// Collects `(index, text)` segments that may arrive out of order or repeated.
///
/// A repeated index overwrites the earlier text. Build a fresh assembler per
/// dictation attempt, or call [`clear`](Self::clear) to reuse one.
#[derive(Debug, Default, Clone)]
pub struct TranscriptAssembler {
    segments: BTreeMap<u64, String>,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, index: u64, text: impl Into<String>) {
        self.segments.insert(index, text.into());
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Join trimmed, non-empty segments in ascending index order.
    pub fn finalize(self) -> String {
        self.segments
            .values()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(pairs: &[(u64, &str)]) -> String {
        let mut assembler = TranscriptAssembler::new();
        for (index, text) in pairs {
            assembler.ingest(*index, *text);
        }
        assembler.finalize()
    }

    #[test]
    fn orders_segments_and_drops_empty_ones() {
        assert_eq!(assemble(&[(2, "world"), (0, "hello"), (1, "")]), "hello world");
    }

    #[test]
    fn ingest_order_does_not_matter() {
        let pairs = [(0, "one"), (1, " two "), (5, "three"), (10, "four")];
        let expected = "one two three four";
        let permutations: [[usize; 4]; 5] = [
            [0, 1, 2, 3],
            [3, 2, 1, 0],
            [2, 0, 3, 1],
            [1, 3, 0, 2],
            [3, 0, 2, 1],
        ];
        for order in permutations {
            let shuffled: Vec<(u64, &str)> = order.iter().map(|&i| pairs[i]).collect();
            assert_eq!(assemble(&shuffled), expected, "order {order:?}");
        }
    }

    #[test]
    fn numeric_not_lexical_ordering() {
        assert_eq!(assemble(&[(10, "b"), (9, "a"), (100, "c")]), "a b c");
    }

    #[test]
    fn repeated_index_keeps_last_text() {
        assert_eq!(
            assemble(&[(0, "helo"), (1, "there"), (0, "hello")]),
            "hello there"
        );
        assert_eq!(assemble(&[(0, "hello"), (0, "")]), "");
    }

    #[test]
    fn whitespace_only_segments_contribute_nothing() {
        assert_eq!(assemble(&[(0, "  "), (1, "\t\n"), (2, " ok ")]), "ok");
        assert_eq!(TranscriptAssembler::new().finalize(), "");
    }

    #[test]
    fn clear_allows_reuse() {
        let mut assembler = TranscriptAssembler::new();
        assembler.ingest(0, "stale");
        assembler.clear();
        assert!(assembler.is_empty());
        assembler.ingest(3, "fresh");
        assert_eq!(assembler.len(), 1);
        assert_eq!(assembler.finalize(), "fresh");
    }
}
