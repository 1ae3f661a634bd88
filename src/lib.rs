//! Morsel - SentencePiece-style subword tokenizer core
//!
//! A lossless subword tokenization pipeline:
//! - Unicode-aware normalization driven by a compiled character map
//!   (double-array trie over raw bytes) with a byte-level alignment
//!   back to the original input
//! - Whitespace escaping to the U+2581 sentinel, dummy-prefix and
//!   extra-whitespace policies
//! - Agenda-driven BPE merging over a doubly-linked symbol list with
//!   stable tie-breaking and stale-entry discard
//! - Word / character segmentation fallbacks sharing the same piece
//!   tables
//! - Unknown-piece fallback and re-expansion of vocabulary pieces
//!   disabled at inference time
//!
//! Encoding is deterministic and zero-copy up to the public boundary:
//! the concatenation of the returned pieces always equals the
//! normalized input.

pub mod core;

pub use crate::core::{
    compile_chars_map, decode_chars_map, encode_chars_map, load_vocab, load_vocab_file,
    merge_spec_args, script_of, split_into_words, BpeSegmenter, CharSegmenter, DoubleArrayTrie,
    EncodeResult, ModelError, ModelSpec, ModelType, Normalized, Normalizer, NormalizerError,
    NormalizerSpec, Piece, PieceType, PrefixMatcher, Script, SegmenterBase, SpecError, Tokenizer,
    TokenizerError, TrieError, TrieMatch, VocabError, WordSegmenter, SPACE_SYMBOL,
};
