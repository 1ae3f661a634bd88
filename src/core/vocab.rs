//! Vocabulary loading from the tab-separated listing format.
//!
//! Each line is `piece<TAB>score[<TAB>type]`. The optional third column
//! tags the piece type (`normal`, `unknown`, `control`, `unused`,
//! `user_defined`); lines without it default to `normal`.
//!
//! # Example
//!
//! ```text
//! <unk>	0	unknown
//! <s>	0	control
//! ▁the	-2.5
//! ▁of	-3.1
//! ```

use thiserror::Error;

use super::model::{Piece, PieceType};

/// Errors that can occur while parsing a vocabulary listing.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("line {0}: missing score column")]
    MissingScore(usize),
    #[error("line {0}: invalid score {1:?}")]
    InvalidScore(usize, String),
    #[error("line {0}: unknown piece type {1:?}")]
    UnknownType(usize, String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses a vocabulary listing into pieces, preserving line order as the
/// id order. Blank lines are skipped.
pub fn load_vocab(data: &str) -> Result<Vec<Piece>, VocabError> {
    let mut pieces = Vec::new();
    for (index, line) in data.lines().enumerate() {
        let lineno = index + 1;
        if line.is_empty() {
            continue;
        }
        let mut columns = line.split('\t');
        let piece = columns.next().unwrap_or("");
        let score_column = columns.next().ok_or(VocabError::MissingScore(lineno))?;
        let score: f32 = score_column
            .trim()
            .parse()
            .map_err(|_| VocabError::InvalidScore(lineno, score_column.to_string()))?;
        let kind = match columns.next() {
            None | Some("") | Some("normal") => PieceType::Normal,
            Some("unknown") => PieceType::Unknown,
            Some("control") => PieceType::Control,
            Some("unused") => PieceType::Unused,
            Some("user_defined") => PieceType::UserDefined,
            Some(other) => return Err(VocabError::UnknownType(lineno, other.to_string())),
        };
        pieces.push(Piece::new(piece, score, kind));
    }
    Ok(pieces)
}

/// Loads a vocabulary listing from a file path.
pub fn load_vocab_file(path: &str) -> Result<Vec<Piece>, VocabError> {
    let data = std::fs::read_to_string(path)?;
    load_vocab(&data)
}
