//! Structural punctuation vocabulary.
//!
//! This module defines the punctuation the block scanners care about:
//! delimiters (braces, parentheses, brackets) and separators (colon, comma,
//! semicolon). Pairing metadata records which delimiter closes which.
//!
//! ## Notes
//! - This module is vocabulary only (spellings + pairing). Whether a given
//!   occurrence is structural or inert (inside a string/comment/regex) is
//!   decided by the engine's exclusion handling.
//!
//! ## Examples
//! ```rust
//! use quarry_core::lang::punctuation::{self, PunctuationId};
//!
//! assert_eq!(punctuation::from_char('{'), Some(PunctuationId::LBrace));
//! assert_eq!(punctuation::closing(PunctuationId::LBrace), Some(PunctuationId::RBrace));
//! assert!(punctuation::is_opener(PunctuationId::LParen));
//! ```

/// Broad syntactic grouping for punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunctuationCategory {
    /// Paired brackets and braces.
    Delimiter,
    /// Separators like `,`, `:`, and `;`.
    Separator,
}

/// Stable identifier for structural punctuation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum PunctuationId {
    // Delimiters
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,

    // Separators
    Colon,
    Comma,
    Semicolon,
}

/// Metadata for a punctuation token.
#[derive(Debug, Clone, Copy)]
pub struct PunctuationInfo {
    pub id: PunctuationId,
    pub canonical: char,
    pub category: PunctuationCategory,
    /// The paired delimiter this one opens (`{` pairs with `}`), if any.
    pub closes_with: Option<PunctuationId>,
}

/// Registry of all structural punctuation.
pub const PUNCTUATION: &[PunctuationInfo] = &[
    PunctuationInfo {
        id: PunctuationId::LBrace,
        canonical: '{',
        category: PunctuationCategory::Delimiter,
        closes_with: Some(PunctuationId::RBrace),
    },
    PunctuationInfo {
        id: PunctuationId::RBrace,
        canonical: '}',
        category: PunctuationCategory::Delimiter,
        closes_with: None,
    },
    PunctuationInfo {
        id: PunctuationId::LParen,
        canonical: '(',
        category: PunctuationCategory::Delimiter,
        closes_with: Some(PunctuationId::RParen),
    },
    PunctuationInfo {
        id: PunctuationId::RParen,
        canonical: ')',
        category: PunctuationCategory::Delimiter,
        closes_with: None,
    },
    PunctuationInfo {
        id: PunctuationId::LBracket,
        canonical: '[',
        category: PunctuationCategory::Delimiter,
        closes_with: Some(PunctuationId::RBracket),
    },
    PunctuationInfo {
        id: PunctuationId::RBracket,
        canonical: ']',
        category: PunctuationCategory::Delimiter,
        closes_with: None,
    },
    PunctuationInfo {
        id: PunctuationId::Colon,
        canonical: ':',
        category: PunctuationCategory::Separator,
        closes_with: None,
    },
    PunctuationInfo {
        id: PunctuationId::Comma,
        canonical: ',',
        category: PunctuationCategory::Separator,
        closes_with: None,
    },
    PunctuationInfo {
        id: PunctuationId::Semicolon,
        canonical: ';',
        category: PunctuationCategory::Separator,
        closes_with: None,
    },
];

/// Resolve a source character to a punctuation id.
pub fn from_char(c: char) -> Option<PunctuationId> {
    PUNCTUATION.iter().find(|p| p.canonical == c).map(|p| p.id)
}

/// Canonical character for a punctuation id.
pub fn as_char(id: PunctuationId) -> char {
    info(id).canonical
}

/// Full metadata for a punctuation id.
pub fn info(id: PunctuationId) -> &'static PunctuationInfo {
    PUNCTUATION
        .iter()
        .find(|p| p.id == id)
        .expect("INVARIANT: every PunctuationId has a PUNCTUATION entry")
}

/// The delimiter that closes `id`, if `id` opens a pair.
pub fn closing(id: PunctuationId) -> Option<PunctuationId> {
    info(id).closes_with
}

/// Return `true` if `id` opens a delimiter pair.
pub fn is_opener(id: PunctuationId) -> bool {
    info(id).closes_with.is_some()
}

/// Return `true` if `id` closes a delimiter pair.
pub fn is_closer(id: PunctuationId) -> bool {
    matches!(
        id,
        PunctuationId::RBrace | PunctuationId::RParen | PunctuationId::RBracket
    )
}
