//! Piece inventory and the bookkeeping shared by every segmenter.
//!
//! [`SegmenterBase`] owns the piece/id tables, the unknown-piece
//! fallback, the user-defined-symbol matcher, and the latched
//! construction status. The segmenters hold one apiece and stay thin.

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::warn;

use super::config::{
    ModelSpec, DEFAULT_BOS_PIECE, DEFAULT_EOS_PIECE, DEFAULT_PAD_PIECE, DEFAULT_UNK_PIECE,
};
use super::matcher::PrefixMatcher;
use super::normalizer::SPACE_SYMBOL_CHAR;

/// Classification of a vocabulary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceType {
    Normal,
    Unknown,
    Control,
    /// Still in the vocabulary but disabled at inference time; merges
    /// into an unused piece are re-expanded on output.
    Unused,
    /// Carved out of the input verbatim and never merged.
    UserDefined,
}

/// One vocabulary entry: surface string, score (log probability), and
/// classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    pub piece: String,
    pub score: f32,
    pub kind: PieceType,
}

impl Piece {
    pub fn new(piece: impl Into<String>, score: f32, kind: PieceType) -> Self {
        Self {
            piece: piece.into(),
            score,
            kind,
        }
    }

    pub fn normal(piece: impl Into<String>, score: f32) -> Self {
        Self::new(piece, score, PieceType::Normal)
    }

    pub fn unknown(piece: impl Into<String>) -> Self {
        Self::new(piece, 0.0, PieceType::Unknown)
    }

    pub fn control(piece: impl Into<String>) -> Self {
        Self::new(piece, 0.0, PieceType::Control)
    }

    pub fn unused(piece: impl Into<String>, score: f32) -> Self {
        Self::new(piece, score, PieceType::Unused)
    }

    pub fn user_defined(piece: impl Into<String>) -> Self {
        Self::new(piece, 0.0, PieceType::UserDefined)
    }
}

/// Segmentation algorithm recorded in the model spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Unigram,
    Bpe,
    Word,
    Char,
}

/// Sequence of `(piece, id)` pairs whose concatenation reproduces the
/// normalized input.
pub type EncodeResult<'a> = Vec<(&'a str, u32)>;

/// Invalid-model conditions latched at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("piece {0:?} is defined twice")]
    DuplicatePiece(String),
    #[error("piece {0} is empty")]
    EmptyPiece(u32),
    #[error("no piece has the unknown type")]
    MissingUnknown,
    #[error("the unknown piece is defined twice")]
    MultipleUnknown,
    #[error("failed to build the user-defined symbol matcher: {0}")]
    Matcher(String),
    #[error("model type {0:?} has no segmenter")]
    UnsupportedModelType(ModelType),
}

/// Piece/id bookkeeping shared by the BPE, word, and char segmenters.
///
/// Construction failures are latched: `status()` reports the first
/// error and the owning segmenter degrades to empty output.
pub struct SegmenterBase {
    pieces: Vec<Piece>,
    piece_to_id: FxHashMap<String, u32>,
    reserved: FxHashMap<String, u32>,
    unk_id: u32,
    matcher: PrefixMatcher,
    treat_whitespace_as_suffix: bool,
    unk_piece: String,
    bos_piece: String,
    eos_piece: String,
    pad_piece: String,
    status: Option<ModelError>,
}

impl SegmenterBase {
    pub fn from_spec(spec: &ModelSpec) -> Self {
        let (piece_to_id, reserved, unk_id, matcher, status) = match Self::build_tables(spec) {
            Ok((piece_to_id, reserved, unk_id, matcher)) => {
                (piece_to_id, reserved, unk_id, matcher, None)
            }
            Err(err) => {
                warn!("invalid model: {err}");
                (
                    FxHashMap::default(),
                    FxHashMap::default(),
                    0,
                    PrefixMatcher::default(),
                    Some(err),
                )
            }
        };
        fn resolve(value: &Option<String>, default: &str) -> String {
            value.clone().unwrap_or_else(|| default.to_string())
        }
        Self {
            pieces: spec.pieces.clone(),
            piece_to_id,
            reserved,
            unk_id,
            matcher,
            treat_whitespace_as_suffix: spec.normalizer.treat_whitespace_as_suffix,
            unk_piece: resolve(&spec.unk_piece, DEFAULT_UNK_PIECE),
            bos_piece: resolve(&spec.bos_piece, DEFAULT_BOS_PIECE),
            eos_piece: resolve(&spec.eos_piece, DEFAULT_EOS_PIECE),
            pad_piece: resolve(&spec.pad_piece, DEFAULT_PAD_PIECE),
            status,
        }
    }

    fn build_tables(
        spec: &ModelSpec,
    ) -> Result<(FxHashMap<String, u32>, FxHashMap<String, u32>, u32, PrefixMatcher), ModelError>
    {
        let mut piece_to_id = FxHashMap::default();
        let mut reserved = FxHashMap::default();
        let mut unk_id = None;
        let mut user_defined = Vec::new();

        for (id, piece) in spec.pieces.iter().enumerate() {
            let id = id as u32;
            if piece.piece.is_empty() {
                return Err(ModelError::EmptyPiece(id));
            }
            if piece_to_id.contains_key(&piece.piece) || reserved.contains_key(&piece.piece) {
                return Err(ModelError::DuplicatePiece(piece.piece.clone()));
            }
            match piece.kind {
                PieceType::Unknown => {
                    if unk_id.is_some() {
                        return Err(ModelError::MultipleUnknown);
                    }
                    unk_id = Some(id);
                    reserved.insert(piece.piece.clone(), id);
                }
                PieceType::Control => {
                    reserved.insert(piece.piece.clone(), id);
                }
                PieceType::Normal | PieceType::Unused => {
                    piece_to_id.insert(piece.piece.clone(), id);
                }
                PieceType::UserDefined => {
                    piece_to_id.insert(piece.piece.clone(), id);
                    user_defined.push(piece.piece.as_str());
                }
            }
        }

        let unk_id = unk_id.ok_or(ModelError::MissingUnknown)?;
        let matcher = PrefixMatcher::new(user_defined)
            .map_err(|err| ModelError::Matcher(err.to_string()))?;
        Ok((piece_to_id, reserved, unk_id, matcher))
    }

    /// `Ok` iff the model passed validation; encode operations check this
    /// on entry.
    pub fn status(&self) -> Result<(), &ModelError> {
        match &self.status {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Vocab id of `piece`; the unknown id for anything not in the
    /// tables, including the empty string.
    pub fn piece_to_id(&self, piece: &str) -> u32 {
        if let Some(&id) = self.reserved.get(piece) {
            return id;
        }
        if let Some(&id) = self.piece_to_id.get(piece) {
            return id;
        }
        self.unk_id
    }

    /// Exact lookup in the non-reserved table; `None` on a miss. This is
    /// what the merge loop uses: a candidate is only mergeable if the
    /// concatenation is itself a normal/unused/user-defined piece.
    pub fn find_piece(&self, piece: &str) -> Option<u32> {
        self.piece_to_id.get(piece).copied()
    }

    /// Surface string of `id`. `id` must be below `piece_count()`.
    pub fn id_to_piece(&self, id: u32) -> &str {
        &self.pieces[id as usize].piece
    }

    /// Score (log probability) of `id`.
    pub fn score(&self, id: u32) -> f32 {
        self.pieces[id as usize].score
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn unk_id(&self) -> u32 {
        self.unk_id
    }

    pub fn is_unknown(&self, id: u32) -> bool {
        self.pieces[id as usize].kind == PieceType::Unknown
    }

    pub fn is_control(&self, id: u32) -> bool {
        self.pieces[id as usize].kind == PieceType::Control
    }

    pub fn is_unused(&self, id: u32) -> bool {
        self.pieces[id as usize].kind == PieceType::Unused
    }

    pub fn is_user_defined(&self, id: u32) -> bool {
        self.pieces[id as usize].kind == PieceType::UserDefined
    }

    /// Matcher over the user-defined pieces.
    pub fn matcher(&self) -> &PrefixMatcher {
        &self.matcher
    }

    pub fn treat_whitespace_as_suffix(&self) -> bool {
        self.treat_whitespace_as_suffix
    }

    pub fn unk_piece(&self) -> &str {
        &self.unk_piece
    }

    pub fn bos_piece(&self) -> &str {
        &self.bos_piece
    }

    pub fn eos_piece(&self) -> &str {
        &self.eos_piece
    }

    pub fn pad_piece(&self) -> &str {
        &self.pad_piece
    }
}

/// Splits `text` at the whitespace sentinel into zero-copy segments.
///
/// With `add_ws_as_suffix` false each segment starts with the sentinel
/// where one is present; with it true each segment ends with one. Runs
/// of sentinels produce sentinel-only segments, and joining the result
/// always reproduces `text`.
pub fn split_into_words(text: &str, add_ws_as_suffix: bool) -> Vec<&str> {
    let mut out = Vec::new();
    let mut begin = 0;
    for (i, ch) in text.char_indices() {
        if ch == SPACE_SYMBOL_CHAR {
            if add_ws_as_suffix {
                out.push(&text[begin..i + ch.len_utf8()]);
                begin = i + ch.len_utf8();
            } else if i > begin {
                out.push(&text[begin..i]);
                begin = i;
            }
        }
    }
    if begin < text.len() {
        out.push(&text[begin..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::NormalizerSpec;

    const WS: &str = "\u{2581}";

    fn base_spec() -> ModelSpec {
        ModelSpec {
            pieces: vec![
                Piece::unknown("<unk>"),
                Piece::control("<s>"),
                Piece::control("</s>"),
            ],
            ..ModelSpec::default()
        }
    }

    fn add(spec: &mut ModelSpec, piece: &str, score: f32) {
        spec.pieces.push(Piece::normal(piece, score));
    }

    #[test]
    fn test_piece_to_id() {
        let mut spec = base_spec();
        add(&mut spec, "a", 0.1);
        add(&mut spec, "b", 0.2);
        add(&mut spec, "c", 0.3);
        add(&mut spec, "d", 0.4);
        add(&mut spec, "e", 0.5);
        spec.pieces[6].kind = PieceType::Unused;
        spec.pieces[7].kind = PieceType::UserDefined;

        let base = SegmenterBase::from_spec(&spec);
        assert!(base.status().is_ok());

        assert_eq!(base.piece_to_id("<unk>"), 0);
        assert_eq!(base.piece_to_id("<s>"), 1);
        assert_eq!(base.piece_to_id("</s>"), 2);
        assert_eq!(base.piece_to_id("a"), 3);
        assert_eq!(base.piece_to_id("e"), 7);
        assert_eq!(base.piece_to_id("f"), 0);
        assert_eq!(base.piece_to_id(""), 0);

        assert_eq!(base.id_to_piece(0), "<unk>");
        assert_eq!(base.id_to_piece(7), "e");
        assert_eq!(base.piece_count(), 8);

        assert!(base.is_unknown(0));
        assert!(!base.is_unknown(3));
        assert!(base.is_control(1));
        assert!(base.is_control(2));
        assert!(base.is_unused(6));
        assert!(!base.is_unused(5));
        assert!(base.is_user_defined(7));
        assert!(!base.is_user_defined(6));

        assert!((base.score(3) - 0.1).abs() < 1e-4);
        assert!((base.score(7) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_normal_piece_round_trip() {
        let mut spec = base_spec();
        for piece in ["hello", "world", "wo", "rld"] {
            add(&mut spec, piece, 0.0);
        }
        let base = SegmenterBase::from_spec(&spec);
        for id in 3..base.piece_count() as u32 {
            assert_eq!(base.piece_to_id(base.id_to_piece(id)), id);
        }
    }

    #[test]
    fn test_reserved_pieces_are_not_findable() {
        let mut spec = base_spec();
        add(&mut spec, "a", 0.0);
        let base = SegmenterBase::from_spec(&spec);
        assert_eq!(base.find_piece("a"), Some(3));
        assert_eq!(base.find_piece("<s>"), None);
        assert_eq!(base.find_piece("<unk>"), None);
        assert_eq!(base.find_piece("zz"), None);
    }

    #[test]
    fn test_default_and_overridden_reserved_pieces() {
        let mut spec = base_spec();
        add(&mut spec, "a", 0.0);
        let base = SegmenterBase::from_spec(&spec);
        assert_eq!(base.unk_piece(), "<unk>");
        assert_eq!(base.bos_piece(), "<s>");
        assert_eq!(base.eos_piece(), "</s>");
        assert_eq!(base.pad_piece(), "<pad>");

        spec.unk_piece = Some("UNK".to_string());
        spec.bos_piece = Some("BOS".to_string());
        spec.eos_piece = Some("EOS".to_string());
        spec.pad_piece = Some("PAD".to_string());
        let base = SegmenterBase::from_spec(&spec);
        assert_eq!(base.unk_piece(), "UNK");
        assert_eq!(base.bos_piece(), "BOS");
        assert_eq!(base.eos_piece(), "EOS");
        assert_eq!(base.pad_piece(), "PAD");
    }

    #[test]
    fn test_invalid_models_latch_status() {
        // Empty piece.
        let mut spec = base_spec();
        add(&mut spec, "", 0.0);
        assert!(matches!(
            SegmenterBase::from_spec(&spec).status(),
            Err(ModelError::EmptyPiece(3))
        ));

        // Duplicated piece.
        let mut spec = base_spec();
        add(&mut spec, "a", 0.0);
        add(&mut spec, "a", 0.0);
        assert!(matches!(
            SegmenterBase::from_spec(&spec).status(),
            Err(ModelError::DuplicatePiece(_))
        ));

        // Reserved/normal collision.
        let mut spec = base_spec();
        add(&mut spec, "<s>", 0.0);
        assert!(matches!(
            SegmenterBase::from_spec(&spec).status(),
            Err(ModelError::DuplicatePiece(_))
        ));

        // Multiple unknowns.
        let mut spec = base_spec();
        spec.pieces[1] = Piece::unknown("<unk2>");
        assert!(matches!(
            SegmenterBase::from_spec(&spec).status(),
            Err(ModelError::MultipleUnknown)
        ));

        // No unknown.
        let mut spec = base_spec();
        spec.pieces[0] = Piece::control("<pad>");
        assert!(matches!(
            SegmenterBase::from_spec(&spec).status(),
            Err(ModelError::MissingUnknown)
        ));
    }

    #[test]
    fn test_whitespace_suffix_flag_comes_from_spec() {
        let mut spec = base_spec();
        spec.normalizer = NormalizerSpec {
            treat_whitespace_as_suffix: true,
            ..NormalizerSpec::default()
        };
        assert!(SegmenterBase::from_spec(&spec).treat_whitespace_as_suffix());
    }

    #[test]
    fn test_split_into_words_prefix_mode() {
        let joined = format!("{WS}this{WS}is{WS}a{WS}pen");
        assert_eq!(
            split_into_words(&joined, false),
            vec![
                format!("{WS}this"),
                format!("{WS}is"),
                format!("{WS}a"),
                format!("{WS}pen")
            ]
        );

        let leading_bare = format!("this{WS}is");
        assert_eq!(
            split_into_words(&leading_bare, false),
            vec!["this".to_string(), format!("{WS}is")]
        );

        let doubled = format!("{WS}this{WS}{WS}is");
        assert_eq!(
            split_into_words(&doubled, false),
            vec![format!("{WS}this"), WS.to_string(), format!("{WS}is")]
        );

        assert_eq!(split_into_words("", false), Vec::<&str>::new());
        assert_eq!(split_into_words("hello", false), vec!["hello"]);
    }

    #[test]
    fn test_split_into_words_suffix_mode() {
        let input = format!("this{WS}is{WS}{WS}is");
        assert_eq!(
            split_into_words(&input, true),
            vec![
                format!("this{WS}"),
                format!("is{WS}"),
                WS.to_string(),
                "is".to_string()
            ]
        );

        let trailing = format!("hello{WS}{WS}");
        assert_eq!(
            split_into_words(&trailing, true),
            vec![format!("hello{WS}"), WS.to_string()]
        );

        let surrounded = format!("{WS}{WS}hello{WS}{WS}");
        assert_eq!(
            split_into_words(&surrounded, true),
            vec![
                WS.to_string(),
                WS.to_string(),
                format!("hello{WS}"),
                WS.to_string()
            ]
        );

        assert_eq!(split_into_words("", true), Vec::<&str>::new());
        assert_eq!(split_into_words("hello", true), vec!["hello"]);
    }

    #[test]
    fn test_split_round_trip() {
        for text in [
            format!("{WS}a{WS}{WS}b{WS}"),
            "plain".to_string(),
            format!("{WS}{WS}{WS}"),
        ] {
            assert_eq!(split_into_words(&text, false).concat(), text);
            assert_eq!(split_into_words(&text, true).concat(), text);
        }
    }
}
