//! Indentation-tracking block scanner.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::ast::PropValue;
use crate::block::BlockOutcome;
use crate::diagnostics::{BlockContractError, ParseWarning, label_span};
use crate::exclusion::ExclusionTracker;
use crate::state::{ContextFrame, ContextType, ParserState};
use crate::token::{Token, TokenKind};
use quarry_core::lang::profiles::LexProfile;
use quarry_core::lang::punctuation;

/// Indentation width of one line, expanded at two tab stops.
///
/// Comparing at both the configured width and width 1 is how ambiguity is
/// detected: if the two expansions order a line differently against the
/// baseline, no tab-stop choice can classify it reliably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct IndentWidth {
    configured: usize,
    unit: usize,
}

impl IndentWidth {
    fn of(text: &str, tab_width: usize) -> Self {
        Self {
            configured: expand(text, tab_width),
            unit: expand(text, 1),
        }
    }
}

fn expand(text: &str, tab_width: usize) -> usize {
    let mut col = 0;
    for c in text.chars() {
        match c {
            '\t' => col = (col / tab_width + 1) * tab_width,
            _ => col += 1,
        }
    }
    col
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    CommentOnly,
    Content,
}

/// Scan the indentation block whose body starts at `start_index`.
///
/// `start_index` must point at the first token of a line: the token
/// immediately following the block-introducing colon's newline; anything else
/// is a contract violation. A context frame of `context_type` is pushed for
/// the duration of the scan and popped on every return path.
///
/// The baseline is the indentation of the line that opened the block (post
/// tab-expansion). Lines strictly deeper belong to the block; blank lines
/// and comment-only lines are included without ever ending it; the first
/// content line at or below the baseline ends the block. Lines inside
/// multi-line strings and lines continued inside brackets or by a trailing
/// escape never count as line boundaries. A line whose ordering against the
/// baseline depends on the tab stop is reported as ambiguous, never silently
/// classified.
pub fn parse_block(
    tokens: &[Token],
    start_index: usize,
    state: &mut ParserState,
    context_type: ContextType,
    context_metadata: BTreeMap<String, PropValue>,
    profile: &'static LexProfile,
) -> Result<BlockOutcome, BlockContractError> {
    if start_index > tokens.len() {
        return Err(BlockContractError::OutOfBounds {
            index: start_index,
            len: tokens.len(),
        });
    }
    if start_index > 0 && !matches!(tokens[start_index - 1].kind, TokenKind::Newline) {
        let tok = &tokens[start_index.min(tokens.len() - 1)];
        return Err(BlockContractError::NotAtLineStart {
            index: start_index,
            span: label_span(tok.span),
        });
    }

    let tab_width = state.config().tab_width;
    let baseline = opener_baseline(tokens, start_index, tab_width);

    state.push(ContextFrame::new(context_type, start_index).with_metadata(context_metadata));

    let mut tracker = ExclusionTracker::new(profile);
    let mut members = Vec::new();
    let mut saw_member_line = false;
    let mut i = start_index;

    'lines: while i < tokens.len() && !matches!(tokens[i].kind, TokenKind::Eof) {
        let line_start = i;
        let (indent, first_content) = if matches!(tokens[i].kind, TokenKind::Whitespace) {
            (IndentWidth::of(&tokens[i].text, tab_width), i + 1)
        } else {
            (IndentWidth::default(), i)
        };

        if line_kind(tokens, first_content) == LineKind::Content {
            let cfg_order = indent.configured.cmp(&baseline.configured);
            if cfg_order != indent.unit.cmp(&baseline.unit) {
                let span = tokens[line_start].span;
                state.warn(ParseWarning::ambiguous_indentation(
                    "indentation mixes tabs and spaces ambiguously against the block baseline",
                    span,
                ));
            }
            if cfg_order != Ordering::Greater {
                // Dedent: the block ends before this line.
                state.pop();
                return Ok(BlockOutcome {
                    members,
                    next_index: line_start,
                    unterminated: !saw_member_line,
                });
            }
            saw_member_line = true;
        }

        // Consume the logical line: through its terminating newline, but a
        // newline inside a string/comment zone, inside open brackets, or
        // swallowed by a trailing escape does not end the logical line.
        let mut bracket_depth = 0usize;
        while i < tokens.len() && !matches!(tokens[i].kind, TokenKind::Eof) {
            let tok = &tokens[i];
            let significant = tracker.observe(tok);
            members.push(i);
            i += 1;
            if significant {
                if let Some(p) = tok.punct_id() {
                    if punctuation::is_opener(p) {
                        bracket_depth += 1;
                    } else if punctuation::is_closer(p) {
                        bracket_depth = bracket_depth.saturating_sub(1);
                    }
                }
                if matches!(tok.kind, TokenKind::Newline) && bracket_depth == 0 && !tracker.in_exclusion() {
                    continue 'lines;
                }
            }
        }
        break;
    }

    if !saw_member_line {
        tracing::debug!(start_index, "indentation block has no indented body");
    }
    state.pop();
    Ok(BlockOutcome {
        members,
        next_index: tokens.len(),
        unterminated: !saw_member_line,
    })
}

/// Indentation of the line that opened the block (the line holding the
/// block-introducing colon, i.e. the line before `start_index`).
fn opener_baseline(tokens: &[Token], start_index: usize, tab_width: usize) -> IndentWidth {
    if start_index < 2 {
        return IndentWidth::default();
    }
    // start_index - 1 is the newline terminating the opener line.
    let mut j = start_index - 1;
    while j > 0 && !matches!(tokens[j - 1].kind, TokenKind::Newline) {
        j -= 1;
    }
    if matches!(tokens[j].kind, TokenKind::Whitespace) {
        IndentWidth::of(&tokens[j].text, tab_width)
    } else {
        IndentWidth::default()
    }
}

/// Classify a line by its first token past the indentation.
fn line_kind(tokens: &[Token], first_content: usize) -> LineKind {
    match tokens.get(first_content).map(|t| t.kind) {
        None | Some(TokenKind::Eof) | Some(TokenKind::Newline) => LineKind::Blank,
        Some(TokenKind::CommentStart(_)) => LineKind::CommentOnly,
        _ => LineKind::Content,
    }
}
