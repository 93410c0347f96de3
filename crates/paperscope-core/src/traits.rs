//! Parser and Transformer traits.

use crate::{ConversionResult, Document};

/// Default bound on brace and environment nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// What to do with a key cited twice inside one citation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DuplicateKeys {
    /// Keep every key in source order (`a,b,a` stays three keys).
    #[default]
    Preserve,
    /// Keep the first occurrence of each key (`a,b,a` becomes `a,b`).
    Collapse,
}

/// Options for parsing.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParseOptions {
    /// Record source byte spans on sections, blocks and citations.
    pub preserve_spans: bool,
    pub duplicate_keys: DuplicateKeys,
    /// Inputs nested deeper than this are rejected as unparseable.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            preserve_spans: false,
            duplicate_keys: DuplicateKeys::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Error during parsing.
///
/// Only input that cannot be read at all ends up here; anything recoverable
/// is reported as an [`Issue`](crate::Issue) instead.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("input is not valid UTF-8 text (first bad byte at {0})")]
    NotText(usize),
    #[error("nesting depth {depth} exceeds limit {limit} at byte {offset}")]
    NestingTooDeep {
        depth: usize,
        limit: usize,
        offset: usize,
    },
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during transformation.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("transform failed: {0}")]
    Failed(String),
}

/// Parse a format into the document model.
pub trait Parser: Send + Sync {
    /// Formats this parser can handle.
    fn formats(&self) -> &[&str];

    /// Parse bytes into a document.
    fn parse(
        &self,
        input: &[u8],
        options: &ParseOptions,
    ) -> Result<ConversionResult<Document>, ParseError>;
}

/// Transform a document in place (same model, rewritten content).
pub trait Transformer: Send + Sync {
    /// Name of this transformer.
    fn name(&self) -> &str;

    fn transform(&self, doc: Document) -> Result<ConversionResult<Document>, TransformError>;
}

/// Compare a target document against the source it was converted from.
///
/// Scoring never fails and never mutates its inputs: an empty target is a
/// low score, not an error.
pub trait Scorer: Send + Sync {
    type Report;

    fn score(&self, source: &Document, target: &Document) -> Self::Report;
}

/// Decode parser input as UTF-8, reporting the first invalid byte.
pub fn input_text(input: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(input).map_err(|e| ParseError::NotText(e.valid_up_to()))
}
