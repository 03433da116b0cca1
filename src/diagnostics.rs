//! Diagnostics for the quarry engine.
//!
//! Input-derived irregularities are *data*, never errors: the engine records
//! them as [`ParseWarning`]s on the tree (or as `error` nodes / `unterminated`
//! flags in the AST itself) and keeps going. The single fatal category is
//! [`BlockContractError`], a precondition violation by a caller *inside* the
//! toolkit, which indicates a bug rather than bad input.

use crate::token::Span;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

/// Kind of recoverable parse warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A string/comment/regex literal was never closed; the exclusion zone
    /// was implicitly closed at end of line or end of input.
    LexicalUnterminated,
    /// A token the parser could not place; the surrounding span was skipped
    /// and recorded as an `error` node.
    UnexpectedToken,
    /// A line whose indentation cannot be ordered against the block baseline
    /// consistently under tab expansion.
    AmbiguousIndentation,
}

/// A recoverable irregularity found while parsing.
///
/// Warnings are attached to the AST root; they never abort a parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseWarning {
    pub message: String,
    pub kind: WarningKind,
    pub span: Span,
}

impl ParseWarning {
    pub fn lexical_unterminated(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            kind: WarningKind::LexicalUnterminated,
            span,
        }
    }

    pub fn unexpected_token(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            kind: WarningKind::UnexpectedToken,
            span,
        }
    }

    pub fn ambiguous_indentation(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            kind: WarningKind::AmbiguousIndentation,
            span,
        }
    }
}

/// Precondition violation in a generic block parser.
///
/// These indicate a caller bug inside the toolkit (e.g. `parse_block` invoked
/// on a token that does not open a block), never malformed input, and are the
/// one category that is rejected instead of recovered.
#[derive(Debug, Error, Diagnostic)]
pub enum BlockContractError {
    #[error("parse_block requires an opening delimiter at token {index}, found {found:?}")]
    #[diagnostic(code(quarry::block::not_an_opener))]
    NotAnOpener {
        index: usize,
        found: String,
        #[label("expected a block opener here")]
        span: miette::SourceSpan,
    },

    #[error("parse_block start index {index} is out of bounds for a stream of {len} tokens")]
    #[diagnostic(code(quarry::block::out_of_bounds))]
    OutOfBounds { index: usize, len: usize },

    #[error("indentation block must start at the beginning of a line (token {index})")]
    #[diagnostic(code(quarry::block::not_at_line_start))]
    NotAtLineStart {
        index: usize,
        #[label("this token is not the first on its line")]
        span: miette::SourceSpan,
    },
}

/// Convert an engine span into a miette label span.
pub(crate) fn label_span(span: Span) -> miette::SourceSpan {
    miette::SourceSpan::new(span.start.into(), span.len())
}
