//! Agenda-driven BPE segmentation.
//!
//! Symbols live in a doubly-linked list over the normalized buffer; a
//! max-priority queue of candidate merges drains until no adjacent pair
//! forms a vocabulary piece. Merging left neighbors in place makes
//! queued candidates go stale; a size check detects and discards them in
//! O(1). Pieces marked unused are re-expanded into their recorded
//! components during the final walk.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use super::model::{EncodeResult, SegmenterBase};

/// Typical sentences queue well under this many candidates; reserving
/// up front avoids rehashing the agenda mid-merge.
const AGENDA_RESERVE: usize = 256;

/// One entry of the symbol list: a byte range of the normalized buffer
/// plus linked-list neighbors. `prev`/`next` are indices into the symbol
/// vector, `-1` for BOS/EOS. An empty range marks a symbol merged away.
#[derive(Debug, Clone, Copy)]
struct Symbol {
    prev: i32,
    next: i32,
    /// Set for user-defined matches; frozen symbols never merge.
    freeze: bool,
    start: usize,
    end: usize,
}

impl Symbol {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// A candidate merge of two adjacent symbols. `size` is the byte length
/// the merged piece had when queued; a mismatch at pop time means the
/// entry went stale.
#[derive(Debug, Clone, Copy)]
struct MergeCandidate {
    left: i32,
    right: i32,
    score: f32,
    size: usize,
}

impl PartialEq for MergeCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeCandidate {}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCandidate {
    /// Max-heap order: higher score first; equal scores fall back to the
    /// smaller left index so merges stay stable left-to-right.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.left.cmp(&self.left))
    }
}

/// Greedy merge segmenter over a vocabulary of scored merge rules.
pub struct BpeSegmenter {
    base: SegmenterBase,
}

impl BpeSegmenter {
    pub fn new(base: SegmenterBase) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &SegmenterBase {
        &self.base
    }

    /// Segments `normalized` into `(piece, id)` pairs whose
    /// concatenation equals the input. Empty when the model status is
    /// bad or the input is empty.
    pub fn encode<'a>(&self, normalized: &'a str) -> EncodeResult<'a> {
        if self.base.status().is_err() || normalized.is_empty() {
            return Vec::new();
        }

        let bytes = normalized.as_bytes();
        let mut symbols: Vec<Symbol> = Vec::with_capacity(normalized.chars().count());
        let mut agenda: BinaryHeap<MergeCandidate> = BinaryHeap::with_capacity(AGENDA_RESERVE);
        // Merged piece -> the two views it was built from, kept so pieces
        // disabled at inference time can be re-expanded on output.
        let mut rev_merge: FxHashMap<&'a str, (&'a str, &'a str)> = FxHashMap::default();

        // Seed the list: user-defined spans become frozen symbols, the
        // rest one symbol per scalar.
        let mut pos = 0;
        while pos < bytes.len() {
            let (len, found) = self.base.matcher().prefix_match(&bytes[pos..]);
            let index = symbols.len() as i32;
            symbols.push(Symbol {
                prev: index - 1,
                next: if pos + len >= bytes.len() { -1 } else { index + 1 },
                freeze: found,
                start: pos,
                end: pos + len,
            });
            pos += len;
        }
        if symbols.is_empty() {
            return Vec::new();
        }

        for i in 1..symbols.len() {
            self.maybe_enqueue(
                normalized,
                &symbols,
                &mut agenda,
                &mut rev_merge,
                i as i32 - 1,
                i as i32,
            );
        }

        while let Some(top) = agenda.pop() {
            let left = top.left as usize;
            let right = top.right as usize;

            // Either endpoint merged away, or one of them changed size,
            // since this candidate was queued.
            if symbols[left].len() == 0
                || symbols[right].len() == 0
                || symbols[left].len() + symbols[right].len() != top.size
            {
                continue;
            }

            // Extend the left symbol over both ranges and splice the
            // right one out of the list.
            symbols[left].end = symbols[right].end;
            symbols[left].next = symbols[right].next;
            let successor = symbols[right].next;
            if successor >= 0 {
                symbols[successor as usize].prev = top.left;
            }
            symbols[right].end = symbols[right].start;

            let prev = symbols[left].prev;
            let next = symbols[left].next;
            self.maybe_enqueue(normalized, &symbols, &mut agenda, &mut rev_merge, prev, top.left);
            self.maybe_enqueue(normalized, &symbols, &mut agenda, &mut rev_merge, top.left, next);
        }

        let mut output = Vec::with_capacity(symbols.len());
        let mut index = 0i32;
        while index != -1 {
            let symbol = &symbols[index as usize];
            self.resegment(&normalized[symbol.start..symbol.end], &rev_merge, &mut output);
            index = symbol.next;
        }
        output
    }

    /// Queues the pair `(left, right)` when their concatenation is a
    /// vocabulary piece. Sentinels and frozen symbols never pair.
    fn maybe_enqueue<'a>(
        &self,
        normalized: &'a str,
        symbols: &[Symbol],
        agenda: &mut BinaryHeap<MergeCandidate>,
        rev_merge: &mut FxHashMap<&'a str, (&'a str, &'a str)>,
        left: i32,
        right: i32,
    ) {
        if left == -1 || right == -1 {
            return;
        }
        let l = left as usize;
        let r = right as usize;
        if symbols[l].freeze || symbols[r].freeze {
            return;
        }

        // The two views are adjacent in the normalized buffer, so the
        // concatenation is just the covering slice.
        let merged = &normalized[symbols[l].start..symbols[r].end];
        let Some(id) = self.base.find_piece(merged) else {
            return;
        };

        agenda.push(MergeCandidate {
            left,
            right,
            score: self.base.score(id),
            size: merged.len(),
        });

        if self.base.is_unused(id) {
            let left_piece = &normalized[symbols[l].start..symbols[l].end];
            let right_piece = &normalized[symbols[r].start..symbols[r].end];
            rev_merge.insert(merged, (left_piece, right_piece));
        }
    }

    /// Emits `piece`, expanding it through the reverse-merge table when
    /// it resolves to an unknown or unused id.
    fn resegment<'a>(
        &self,
        piece: &'a str,
        rev_merge: &FxHashMap<&'a str, (&'a str, &'a str)>,
        output: &mut EncodeResult<'a>,
    ) {
        let id = self.base.piece_to_id(piece);
        if id != self.base.unk_id() && !self.base.is_unused(id) {
            output.push((piece, id));
            return;
        }
        match rev_merge.get(piece) {
            Some(&(left, right)) => {
                self.resegment(left, rev_merge, output);
                self.resegment(right, rev_merge, output);
            }
            // A raw scalar that never entered the vocabulary.
            None => output.push((piece, id)),
        }
    }
}
