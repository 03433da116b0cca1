//! Generic block parsers.
//!
//! Two language-agnostic algorithms share one contract: given a token
//! sequence and a position that opens a block, find the end of that block.
//!
//! - [`brace::parse_block`] balances `{ … }` nesting. Brace placement is
//!   irrelevant (only nesting depth matters), so K&R, Allman, Whitesmiths,
//!   and GNU styles are handled identically without special-casing.
//! - [`indent::parse_block`] tracks indentation: lines strictly deeper than
//!   the opener's line belong to the block; the first non-blank,
//!   non-comment line at or below that baseline ends it.
//!
//! Both push a [`ContextFrame`](crate::state::ContextFrame) for the block
//! before scanning and pop it on return (success or recovery), count nothing
//! inside string/comment/regex exclusion zones, and treat end-of-input as a
//! recoverable condition: the scanner returns what it has and flags the
//! outcome as unterminated. The only rejected calls are precondition
//! violations (a `start_index` that does not open a block), which indicate a
//! caller bug inside the toolkit, not bad input.

pub mod brace;
pub mod indent;

/// Result of scanning one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutcome {
    /// Flat, ordered token indices of the block's content: exclusive of the
    /// opening delimiter, exclusive of the closing delimiter/dedent.
    pub members: Vec<usize>,
    /// Index just past the block: one past the matching close brace, or the
    /// first token of the dedented line, or the token count at end of input.
    pub next_index: usize,
    /// Set when end of input arrived before the block closed (brace variant)
    /// or the block never produced an indented line (indentation variant).
    pub unterminated: bool,
}
