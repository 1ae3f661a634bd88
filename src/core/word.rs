//! Whole-word segmentation on the whitespace sentinel.

use super::model::{split_into_words, EncodeResult, SegmenterBase};

/// Splits the normalized input at the whitespace sentinel and looks each
/// token up directly; tokens absent from the vocabulary fall back to the
/// unknown id.
pub struct WordSegmenter {
    base: SegmenterBase,
}

impl WordSegmenter {
    pub fn new(base: SegmenterBase) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &SegmenterBase {
        &self.base
    }

    pub fn encode<'a>(&self, normalized: &'a str) -> EncodeResult<'a> {
        if self.base.status().is_err() || normalized.is_empty() {
            return Vec::new();
        }
        split_into_words(normalized, self.base.treat_whitespace_as_suffix())
            .into_iter()
            .map(|word| (word, self.base.piece_to_id(word)))
            .collect()
    }
}
