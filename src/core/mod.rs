//! Core tokenization engine for morsel.
//!
//! This module contains the SentencePiece-style subword pipeline:
//! - Trie-driven text normalization with a byte alignment back to the
//!   original input and whitespace escaping to U+2581
//! - Agenda-driven BPE segmentation over a doubly-linked symbol list
//!   (priority-queue merges with O(1) stale-entry detection)
//! - Word and character segmenters as trivial fallbacks
//! - Shared piece/id bookkeeping with latched construction status
//!
//! # Architecture
//!
//! The pipeline is one-directional at encode time:
//!
//! ```text
//! raw text -> Normalizer -> normalized text + alignment ->
//!             segmenter (BPE | word | char) -> [(piece, id)]
//! ```
//!
//! - [`Tokenizer`]: entry point; owns the normalizer and dispatches on
//!   the model type
//! - [`Normalizer`]: compiled-charsmap rewriting, whitespace policy,
//!   U+FFFD recovery for malformed bytes
//! - [`BpeSegmenter`] / [`WordSegmenter`] / [`CharSegmenter`]: the
//!   segmentation engines over a shared [`SegmenterBase`]
//! - [`DoubleArrayTrie`]: byte-keyed common-prefix search backing the
//!   charsmap
//! - [`PrefixMatcher`]: anchored longest-match lookup for user-defined
//!   symbols
//!
//! # Performance notes
//!
//! - FxHashMap for all piece/id tables and the per-encode reverse-merge
//!   table
//! - Zero-copy piece views: symbols slice one contiguous normalized
//!   buffer, so merging is pointer arithmetic, not concatenation
//! - Rayon parallelism across texts in the batch entry points; each
//!   encode itself is single-threaded and allocation-light

pub mod bpe;
pub mod chars;
pub mod config;
pub mod matcher;
pub mod model;
pub mod normalizer;
pub mod script;
pub mod tokenizer;
pub mod trie;
pub mod vocab;
pub mod word;

pub use bpe::BpeSegmenter;
pub use chars::CharSegmenter;
pub use config::{merge_spec_args, ModelSpec, NormalizerSpec, SpecError};
pub use matcher::PrefixMatcher;
pub use model::{
    split_into_words, EncodeResult, ModelError, ModelType, Piece, PieceType, SegmenterBase,
};
pub use normalizer::{
    compile_chars_map, decode_chars_map, encode_chars_map, Normalized, Normalizer,
    NormalizerError, SPACE_SYMBOL,
};
pub use script::{script_of, Script};
pub use tokenizer::{Tokenizer, TokenizerError};
pub use trie::{DoubleArrayTrie, TrieError, TrieMatch};
pub use vocab::{load_vocab, load_vocab_file, VocabError};
pub use word::WordSegmenter;
