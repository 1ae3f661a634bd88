//! Specification records and `key=value` overrides.
//!
//! A [`ModelSpec`] is the in-memory form of the model record: the piece
//! inventory, the segmentation algorithm, reserved-piece overrides, and
//! the normalizer configuration. [`merge_spec_args`] patches a spec from
//! a whitespace-separated `--key=value` string, the same surface the
//! original trainer exposes.

use thiserror::Error;

use super::model::{ModelType, Piece};

/// Default reserved-piece strings used when the spec carries no override.
pub const DEFAULT_UNK_PIECE: &str = "<unk>";
pub const DEFAULT_BOS_PIECE: &str = "<s>";
pub const DEFAULT_EOS_PIECE: &str = "</s>";
pub const DEFAULT_PAD_PIECE: &str = "<pad>";

/// Normalization configuration: the compiled character map plus the
/// whitespace policy and the user-defined symbol set.
#[derive(Debug, Clone)]
pub struct NormalizerSpec {
    /// Compiled charsmap blob; empty means identity normalization.
    pub precompiled_chars_map: Vec<u8>,
    pub add_dummy_prefix: bool,
    pub remove_extra_whitespaces: bool,
    pub escape_whitespaces: bool,
    pub treat_whitespace_as_suffix: bool,
    pub user_defined_symbols: Vec<String>,
}

impl Default for NormalizerSpec {
    fn default() -> Self {
        Self {
            precompiled_chars_map: Vec::new(),
            add_dummy_prefix: true,
            remove_extra_whitespaces: true,
            escape_whitespaces: true,
            treat_whitespace_as_suffix: false,
            user_defined_symbols: Vec::new(),
        }
    }
}

/// The model record: pieces, algorithm, reserved-piece overrides, and
/// normalizer spec.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub pieces: Vec<Piece>,
    pub model_type: ModelType,
    /// Reserved-piece overrides; `None` falls back to `<unk>`, `<s>`,
    /// `</s>`, `<pad>`.
    pub unk_piece: Option<String>,
    pub bos_piece: Option<String>,
    pub eos_piece: Option<String>,
    pub pad_piece: Option<String>,
    pub normalizer: NormalizerSpec,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            pieces: Vec::new(),
            model_type: ModelType::Bpe,
            unk_piece: None,
            bos_piece: None,
            eos_piece: None,
            pad_piece: None,
            normalizer: NormalizerSpec::default(),
        }
    }
}

/// Errors from [`merge_spec_args`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// The key names no field in the spec.
    #[error("unknown spec field {0:?}")]
    NotFound(String),
    #[error("invalid value {value:?} for spec field {key:?}")]
    InvalidValue { key: String, value: String },
}

/// Merges whitespace-separated `--key=value` overrides into `spec`.
/// A leading `--` on each token is optional; a key naming no field in
/// the spec fails with [`SpecError::NotFound`].
pub fn merge_spec_args(args: &str, spec: &mut ModelSpec) -> Result<(), SpecError> {
    for arg in args.split_whitespace() {
        let arg = arg.strip_prefix("--").unwrap_or(arg);
        let (key, value) = match arg.split_once('=') {
            Some((key, value)) => (key, value),
            None => (arg, ""),
        };
        match key {
            "add_dummy_prefix" => spec.normalizer.add_dummy_prefix = parse_bool(key, value)?,
            "remove_extra_whitespaces" => {
                spec.normalizer.remove_extra_whitespaces = parse_bool(key, value)?;
            }
            "escape_whitespaces" => spec.normalizer.escape_whitespaces = parse_bool(key, value)?,
            "treat_whitespace_as_suffix" => {
                spec.normalizer.treat_whitespace_as_suffix = parse_bool(key, value)?;
            }
            "user_defined_symbols" => {
                spec.normalizer.user_defined_symbols = value
                    .split(',')
                    .filter(|symbol| !symbol.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "model_type" => spec.model_type = parse_model_type(value)?,
            "unk_piece" => spec.unk_piece = Some(value.to_string()),
            "bos_piece" => spec.bos_piece = Some(value.to_string()),
            "eos_piece" => spec.eos_piece = Some(value.to_string()),
            "pad_piece" => spec.pad_piece = Some(value.to_string()),
            _ => return Err(SpecError::NotFound(key.to_string())),
        }
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, SpecError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(SpecError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_model_type(value: &str) -> Result<ModelType, SpecError> {
    match value {
        "unigram" => Ok(ModelType::Unigram),
        "bpe" => Ok(ModelType::Bpe),
        "word" => Ok(ModelType::Word),
        "char" => Ok(ModelType::Char),
        _ => Err(SpecError::InvalidValue {
            key: "model_type".to_string(),
            value: value.to_string(),
        }),
    }
}
