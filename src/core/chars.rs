//! Character-level segmentation.

use super::model::{EncodeResult, SegmenterBase};

/// Emits one `(scalar, id)` pair per Unicode scalar of the normalized
/// input; scalars absent from the vocabulary fall back to the unknown
/// id.
pub struct CharSegmenter {
    base: SegmenterBase,
}

impl CharSegmenter {
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
        normalized
            .char_indices()
            .map(|(i, ch)| {
                let piece = &normalized[i..i + ch.len_utf8()];
                (piece, self.base.piece_to_id(piece))
            })
            .collect()
    }
}
