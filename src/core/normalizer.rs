//! Trie-driven text normalization with byte-level alignment.
//!
//! The normalizer rewrites raw input into its canonical form by looking
//! up the longest matching rule in a compiled character map, applies the
//! whitespace policy (escaping to the U+2581 sentinel, dummy prefix,
//! extra-whitespace removal), and records for every output byte the
//! input offset its source character began at.
//!
//! The compiled map is a single blob: a 4-byte little-endian trie size,
//! the serialized trie, then a run of NUL-terminated UTF-8 replacement
//! strings. Trie values are byte offsets into that last region.

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::info;

use super::config::NormalizerSpec;
use super::matcher::PrefixMatcher;
use super::trie::{DoubleArrayTrie, TrieError};

/// Whitespace sentinel (U+2581 LOWER ONE EIGHTH BLOCK, `E2 96 81`).
pub const SPACE_SYMBOL: &str = "\u{2581}";
pub(crate) const SPACE_SYMBOL_CHAR: char = '\u{2581}';

/// Emitted for each malformed input byte (`EF BF BD`).
const REPLACEMENT_CHAR: &str = "\u{FFFD}";

/// Errors latched by [`Normalizer::new`] or returned by the charsmap
/// codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizerError {
    #[error("charsmap blob for normalization is broken")]
    CorruptCharsMap,
    #[error(transparent)]
    Trie(#[from] TrieError),
    #[error("normalization rule {0:?} is invalid")]
    BadRule(String),
    #[error("failed to build the user-defined symbol matcher: {0}")]
    Matcher(String),
}

/// Normalized text plus the byte alignment back into the original input.
///
/// `alignment[i]` is the input offset at which the source character of
/// output byte `i` began; the final entry is the total number of input
/// bytes consumed, so `alignment.len() == text.len() + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub alignment: Vec<usize>,
}

/// Frames a trie and a normalized-strings region as one charsmap blob.
pub fn encode_chars_map(trie_bytes: &[u8], normalized: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(4 + trie_bytes.len() + normalized.len());
    blob.extend_from_slice(&(trie_bytes.len() as u32).to_le_bytes());
    blob.extend_from_slice(trie_bytes);
    blob.extend_from_slice(normalized);
    blob
}

/// Splits a charsmap blob into its trie and normalized-strings regions.
/// Fails when the blob is shorter than the header or the declared trie
/// size is not smaller than the remainder.
pub fn decode_chars_map(blob: &[u8]) -> Result<(&[u8], &[u8]), NormalizerError> {
    if blob.len() < 4 {
        return Err(NormalizerError::CorruptCharsMap);
    }
    let trie_size = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
    if trie_size >= blob.len() - 4 {
        return Err(NormalizerError::CorruptCharsMap);
    }
    let body = &blob[4..];
    Ok((&body[..trie_size], &body[trie_size..]))
}

/// Compiles `(source, replacement)` rules into a charsmap blob that
/// [`Normalizer::new`] accepts. Replacements are deduplicated into the
/// NUL-terminated strings region; sources become trie keys whose values
/// point at their replacement.
pub fn compile_chars_map<'a, I>(rules: I) -> Result<Vec<u8>, NormalizerError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut region: Vec<u8> = Vec::new();
    let mut offsets: FxHashMap<&str, u32> = FxHashMap::default();
    let mut records: Vec<(&[u8], u32)> = Vec::new();

    for (source, replacement) in rules {
        if replacement.as_bytes().contains(&0) {
            return Err(NormalizerError::BadRule(replacement.to_string()));
        }
        let offset = *offsets.entry(replacement).or_insert_with(|| {
            let offset = region.len() as u32;
            region.extend_from_slice(replacement.as_bytes());
            region.push(0);
            offset
        });
        records.push((source.as_bytes(), offset));
    }

    let trie = DoubleArrayTrie::build(&records)?;
    Ok(encode_chars_map(&trie.to_bytes(), &region))
}

/// Unicode-aware character-mapping engine; see the module docs.
///
/// A constructed normalizer is immutable; `normalize` holds no shared
/// mutable state and may be called from many threads at once.
pub struct Normalizer {
    trie: Option<DoubleArrayTrie>,
    normalized_region: Vec<u8>,
    matcher: PrefixMatcher,
    add_dummy_prefix: bool,
    remove_extra_whitespaces: bool,
    escape_whitespaces: bool,
    treat_whitespace_as_suffix: bool,
    status: Option<NormalizerError>,
}

impl Normalizer {
    /// Builds a normalizer from a spec. An empty charsmap blob yields
    /// the identity mapping; a corrupt one latches an error status under
    /// which `normalize` returns empty output.
    pub fn new(spec: &NormalizerSpec) -> Self {
        let mut status = None;
        let mut trie = None;
        let mut normalized_region = Vec::new();

        if spec.precompiled_chars_map.is_empty() {
            info!("precompiled charsmap is empty; using identity normalization");
        } else {
            match decode_chars_map(&spec.precompiled_chars_map) {
                Ok((trie_bytes, region)) => match DoubleArrayTrie::from_bytes(trie_bytes) {
                    Ok(parsed) => {
                        trie = Some(parsed);
                        normalized_region = region.to_vec();
                    }
                    Err(_) => status = Some(NormalizerError::CorruptCharsMap),
                },
                Err(err) => status = Some(err),
            }
        }

        let matcher = match PrefixMatcher::new(&spec.user_defined_symbols) {
            Ok(matcher) => matcher,
            Err(err) => {
                if status.is_none() {
                    status = Some(NormalizerError::Matcher(err.to_string()));
                }
                PrefixMatcher::default()
            }
        };

        Self {
            trie,
            normalized_region,
            matcher,
            add_dummy_prefix: spec.add_dummy_prefix,
            remove_extra_whitespaces: spec.remove_extra_whitespaces,
            escape_whitespaces: spec.escape_whitespaces,
            treat_whitespace_as_suffix: spec.treat_whitespace_as_suffix,
            status,
        }
    }

    /// `Ok` iff construction succeeded.
    pub fn status(&self) -> Result<(), &NormalizerError> {
        match &self.status {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Rewrites `input` into its canonical form. Accepts raw bytes;
    /// malformed UTF-8 degrades to U+FFFD one byte at a time.
    pub fn normalize(&self, input: &[u8]) -> Normalized {
        let mut text = String::new();
        let mut alignment = Vec::new();

        if self.status.is_some() {
            alignment.push(0);
            return Normalized { text, alignment };
        }

        let mut input = input;
        let mut consumed = 0usize;

        // Ignore heading whitespace.
        if self.remove_extra_whitespaces {
            while !input.is_empty() {
                let (piece, len) = self.normalize_prefix(input);
                if piece != " " {
                    break;
                }
                input = &input[len..];
                consumed += len;
            }
        }

        if input.is_empty() {
            alignment.push(consumed);
            return Normalized { text, alignment };
        }

        text.reserve(input.len() * 3);
        alignment.reserve(input.len() * 3);

        if !self.treat_whitespace_as_suffix && self.add_dummy_prefix {
            self.push_ws(&mut text, &mut alignment, consumed);
        }

        let mut is_prev_space = self.remove_extra_whitespaces;
        while !input.is_empty() {
            let (piece, len) = self.normalize_prefix(input);

            // Drop heading spaces of this piece if the previous one ended
            // with whitespace.
            let mut sp = piece;
            while is_prev_space {
                match sp.strip_prefix(' ') {
                    Some(stripped) => sp = stripped,
                    None => break,
                }
            }

            if !sp.is_empty() {
                for ch in sp.chars() {
                    if self.escape_whitespaces && ch == ' ' {
                        text.push_str(SPACE_SYMBOL);
                        for _ in 0..SPACE_SYMBOL.len() {
                            alignment.push(consumed);
                        }
                    } else {
                        text.push(ch);
                        for _ in 0..ch.len_utf8() {
                            alignment.push(consumed);
                        }
                    }
                }
                is_prev_space = sp.ends_with(' ');
            }

            consumed += len;
            input = &input[len..];
            if !self.remove_extra_whitespaces {
                is_prev_space = false;
            }
        }

        // Ignore tailing whitespace, rewinding consumed to the cut.
        if self.remove_extra_whitespaces {
            let space = if self.escape_whitespaces {
                SPACE_SYMBOL
            } else {
                " "
            };
            while text.ends_with(space) {
                let length = text.len() - space.len();
                consumed = alignment[length];
                text.truncate(length);
                alignment.truncate(length);
            }
        }

        if self.treat_whitespace_as_suffix && self.add_dummy_prefix {
            self.push_ws(&mut text, &mut alignment, consumed);
        }

        alignment.push(consumed);
        debug_assert_eq!(alignment.len(), text.len() + 1);
        Normalized { text, alignment }
    }

    /// Normalizes the head of `input`: the replacement string and the
    /// number of input bytes it stands for.
    ///
    /// Resolution order: user-defined symbol (verbatim), longest
    /// charsmap rule, one validated UTF-8 scalar (identity), or U+FFFD
    /// consuming exactly one malformed byte.
    pub fn normalize_prefix<'a>(&'a self, input: &'a [u8]) -> (&'a str, usize) {
        if input.is_empty() {
            return ("", 0);
        }

        let (len, found) = self.matcher.prefix_match(input);
        if found {
            if let Ok(symbol) = std::str::from_utf8(&input[..len]) {
                return (symbol, len);
            }
        }

        if let Some(trie) = &self.trie {
            // Matches arrive shortest first; the last one is the longest
            // rule.
            if let Some(longest) = trie.common_prefix_search(input).last() {
                if let Some(replacement) = self.normalized_str(longest.value as usize) {
                    return (replacement, longest.end_byte);
                }
            }
        }

        match valid_scalar_prefix(input) {
            Some((scalar, len)) => (scalar, len),
            None => (REPLACEMENT_CHAR, 1),
        }
    }

    /// NUL-terminated replacement string at `offset` in the
    /// normalized-strings region.
    fn normalized_str(&self, offset: usize) -> Option<&str> {
        let tail = self.normalized_region.get(offset..)?;
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        std::str::from_utf8(&tail[..end]).ok()
    }

    fn push_ws(&self, text: &mut String, alignment: &mut Vec<usize>, consumed: usize) {
        if self.escape_whitespaces {
            text.push_str(SPACE_SYMBOL);
            for _ in 0..SPACE_SYMBOL.len() {
                alignment.push(consumed);
            }
        } else {
            text.push(' ');
            alignment.push(consumed);
        }
    }
}

/// One leading UTF-8 scalar of `input`, or `None` when the head byte
/// starts no well-formed sequence.
fn valid_scalar_prefix(input: &[u8]) -> Option<(&str, usize)> {
    let len = match *input.first()? {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return None,
    };
    let bytes = input.get(..len)?;
    let scalar = std::str::from_utf8(bytes).ok()?;
    Some((scalar, len))
}
