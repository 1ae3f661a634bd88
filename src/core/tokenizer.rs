//! Top-level tokenizer: normalization plus segmentation.
//!
//! [`Tokenizer`] wires a [`Normalizer`] to the segmenter named by the
//! model spec. Dispatch happens once here, on the model type; the
//! segmenters themselves are plain structs over a shared
//! [`SegmenterBase`], not a trait hierarchy.
//!
//! Construction never panics and never fails loudly: invalid specs latch
//! a status and every encode call degrades to empty output, which keeps
//! a tokenizer embeddable where an early `?` is not an option.

use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use super::bpe::BpeSegmenter;
use super::chars::CharSegmenter;
use super::config::ModelSpec;
use super::model::{EncodeResult, ModelError, ModelType, SegmenterBase};
use super::normalizer::{Normalized, Normalizer, NormalizerError};
use super::word::WordSegmenter;

/// First construction failure of a [`Tokenizer`].
#[derive(Error, Debug, Clone)]
pub enum TokenizerError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Normalizer(#[from] NormalizerError),
}

enum SegmenterKind {
    Bpe(BpeSegmenter),
    Word(WordSegmenter),
    Char(CharSegmenter),
}

/// Encodes raw text into `(piece, id)` sequences and back to piece
/// strings.
///
/// Immutable after construction; one instance may serve many threads.
pub struct Tokenizer {
    normalizer: Normalizer,
    segmenter: Option<SegmenterKind>,
    status: Option<TokenizerError>,
}

impl Tokenizer {
    /// Builds a tokenizer from a model spec. Errors are latched: check
    /// [`status`](Self::status), or just encode and get empty output.
    pub fn from_spec(spec: &ModelSpec) -> Self {
        let normalizer = Normalizer::new(&spec.normalizer);
        let mut status: Option<TokenizerError> =
            normalizer.status().err().cloned().map(Into::into);

        let segmenter = match spec.model_type {
            ModelType::Bpe | ModelType::Word | ModelType::Char => {
                debug!(
                    model_type = ?spec.model_type,
                    pieces = spec.pieces.len(),
                    "building segmenter"
                );
                let base = SegmenterBase::from_spec(spec);
                if status.is_none() {
                    status = base.status().err().cloned().map(Into::into);
                }
                Some(match spec.model_type {
                    ModelType::Bpe => SegmenterKind::Bpe(BpeSegmenter::new(base)),
                    ModelType::Word => SegmenterKind::Word(WordSegmenter::new(base)),
                    _ => SegmenterKind::Char(CharSegmenter::new(base)),
                })
            }
            ModelType::Unigram => {
                if status.is_none() {
                    status = Some(TokenizerError::Model(ModelError::UnsupportedModelType(
                        ModelType::Unigram,
                    )));
                }
                None
            }
        };

        Self {
            normalizer,
            segmenter,
            status,
        }
    }

    /// `Ok` iff construction fully succeeded.
    pub fn status(&self) -> Result<(), &TokenizerError> {
        match &self.status {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Encodes `text` into `(piece, id)` pairs. Concatenating the pieces
    /// reproduces `normalize(text).text`.
    pub fn encode(&self, text: &str) -> Vec<(String, u32)> {
        self.encode_bytes(text.as_bytes())
    }

    /// Same as [`encode`](Self::encode) over raw bytes; malformed UTF-8
    /// is replaced with U+FFFD byte by byte during normalization.
    pub fn encode_bytes(&self, input: &[u8]) -> Vec<(String, u32)> {
        if self.status.is_some() {
            return Vec::new();
        }
        let normalized = self.normalizer.normalize(input);
        self.segment(&normalized.text)
            .into_iter()
            .map(|(piece, id)| (piece.to_string(), id))
            .collect()
    }

    /// Encodes `text` into vocabulary ids only.
    pub fn encode_ids(&self, text: &str) -> Vec<u32> {
        if self.status.is_some() {
            return Vec::new();
        }
        let normalized = self.normalizer.normalize(text.as_bytes());
        self.segment(&normalized.text)
            .into_iter()
            .map(|(_, id)| id)
            .collect()
    }

    /// Batch encode in parallel across texts.
    pub fn encode_batch(&self, texts: &[String]) -> Vec<Vec<(String, u32)>> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Batch encode to ids in parallel across texts.
    pub fn encode_ids_batch(&self, texts: &[String]) -> Vec<Vec<u32>> {
        texts.par_iter().map(|text| self.encode_ids(text)).collect()
    }

    /// Runs only the normalization stage, exposing the alignment back to
    /// the original input.
    pub fn normalize(&self, text: &str) -> Normalized {
        self.normalizer.normalize(text.as_bytes())
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Vocab id of `piece`; the unknown id for anything absent.
    pub fn piece_to_id(&self, piece: &str) -> u32 {
        self.base().map(|base| base.piece_to_id(piece)).unwrap_or(0)
    }

    /// Surface string of `id`; empty when no segmenter was built.
    pub fn id_to_piece(&self, id: u32) -> &str {
        self.base().map(|base| base.id_to_piece(id)).unwrap_or("")
    }

    pub fn piece_count(&self) -> usize {
        self.base().map(|base| base.piece_count()).unwrap_or(0)
    }

    pub fn unk_id(&self) -> u32 {
        self.base().map(|base| base.unk_id()).unwrap_or(0)
    }

    fn segment<'a>(&self, normalized: &'a str) -> EncodeResult<'a> {
        match &self.segmenter {
            Some(SegmenterKind::Bpe(segmenter)) => segmenter.encode(normalized),
            Some(SegmenterKind::Word(segmenter)) => segmenter.encode(normalized),
            Some(SegmenterKind::Char(segmenter)) => segmenter.encode(normalized),
            None => Vec::new(),
        }
    }

    fn base(&self) -> Option<&SegmenterBase> {
        match &self.segmenter {
            Some(SegmenterKind::Bpe(segmenter)) => Some(segmenter.base()),
            Some(SegmenterKind::Word(segmenter)) => Some(segmenter.base()),
            Some(SegmenterKind::Char(segmenter)) => Some(segmenter.base()),
            None => None,
        }
    }
}
