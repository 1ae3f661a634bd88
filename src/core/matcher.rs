//! Longest-prefix matching over a set of user-defined symbols.
//!
//! User-defined pieces must be carved out of the input before any
//! normalization rule or merge can touch them. The matcher answers one
//! question: which key, if any, is the longest prefix of the input?
//! An anchored leftmost-longest Aho-Corasick automaton gives exactly
//! that in a single pass.

use aho_corasick::{AhoCorasick, Anchored, Input, MatchKind, StartKind};

/// Byte length of the leading UTF-8 scalar judged from the lead byte
/// alone, capped at the input length. Continuation and stray bytes
/// count as one so the caller always advances.
fn one_char_len(input: &[u8]) -> usize {
    const LEN: [u8; 16] = [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 3, 4];
    debug_assert!(!input.is_empty());
    input.len().min(LEN[(input[0] >> 4) as usize] as usize)
}

/// Longest-prefix lookup over a set of byte strings, plus global
/// replacement of every occurrence.
#[derive(Default)]
pub struct PrefixMatcher {
    automaton: Option<AhoCorasick>,
}

impl PrefixMatcher {
    /// Builds a matcher from a key set. An empty set (or one containing
    /// only empty strings) yields a matcher that never matches.
    pub fn new<I, P>(keys: I) -> Result<Self, aho_corasick::BuildError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let patterns: Vec<Vec<u8>> = keys
            .into_iter()
            .map(|key| key.as_ref().to_vec())
            .filter(|key| !key.is_empty())
            .collect();
        if patterns.is_empty() {
            return Ok(Self::default());
        }
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .start_kind(StartKind::Anchored)
            .build(&patterns)?;
        Ok(Self {
            automaton: Some(automaton),
        })
    }

    /// Returns the byte length of the longest key that prefixes `input`
    /// and whether any key matched. On a miss the length is the leading
    /// UTF-8 scalar's, so a non-empty input never yields zero.
    pub fn prefix_match(&self, input: &[u8]) -> (usize, bool) {
        if input.is_empty() {
            return (0, false);
        }
        if let Some(automaton) = &self.automaton {
            if let Some(m) = automaton.find(Input::new(input).anchored(Anchored::Yes)) {
                return (m.end(), true);
            }
        }
        (one_char_len(input), false)
    }

    /// Replaces every key occurrence in `input` with `replacement`,
    /// copying unmatched scalars verbatim.
    pub fn global_replace(&self, input: &str, replacement: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let bytes = input.as_bytes();
        let mut offset = 0;
        while offset < bytes.len() {
            let (len, found) = self.prefix_match(&bytes[offset..]);
            if found {
                out.push_str(replacement);
            } else {
                out.push_str(&input[offset..offset + len]);
            }
            offset += len;
        }
        out
    }
}
