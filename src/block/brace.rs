//! Brace-balancing block scanner.

use std::collections::BTreeMap;

use crate::ast::PropValue;
use crate::block::BlockOutcome;
use crate::diagnostics::{BlockContractError, label_span};
use crate::exclusion::ExclusionTracker;
use crate::state::{ContextFrame, ContextType, ParserState};
use crate::token::{Token, TokenKind};
use quarry_core::lang::profiles::LexProfile;
use quarry_core::lang::punctuation::PunctuationId;

/// Scan the brace block opening at `start_index`.
///
/// `start_index` must point at an open-brace token; anything else is a
/// contract violation. A context frame of `context_type` is pushed for the
/// duration of the scan and popped on every return path.
///
/// Braces inside string/comment/regex exclusion zones never touch the depth
/// counter. Exclusion warnings found here are discarded; the language
/// walker re-observes the same region and owns lexical diagnostics.
pub fn parse_block(
    tokens: &[Token],
    start_index: usize,
    state: &mut ParserState,
    context_type: ContextType,
    context_metadata: BTreeMap<String, PropValue>,
    profile: &'static LexProfile,
) -> Result<BlockOutcome, BlockContractError> {
    let opener = tokens.get(start_index).ok_or(BlockContractError::OutOfBounds {
        index: start_index,
        len: tokens.len(),
    })?;
    if !opener.is_punct(PunctuationId::LBrace) {
        return Err(BlockContractError::NotAnOpener {
            index: start_index,
            found: opener.text.clone(),
            span: label_span(opener.span),
        });
    }

    state.push(ContextFrame::new(context_type, start_index).with_metadata(context_metadata));

    let mut tracker = ExclusionTracker::new(profile);
    tracker.observe(opener);

    let mut depth = 1usize;
    let mut members = Vec::new();
    let mut i = start_index + 1;

    while i < tokens.len() && !matches!(tokens[i].kind, TokenKind::Eof) {
        let tok = &tokens[i];
        if tracker.observe(tok) {
            match tok.punct_id() {
                Some(PunctuationId::LBrace) => depth += 1,
                Some(PunctuationId::RBrace) => {
                    depth -= 1;
                    if depth == 0 {
                        state.pop();
                        return Ok(BlockOutcome {
                            members,
                            next_index: i + 1,
                            unterminated: false,
                        });
                    }
                }
                _ => {}
            }
        }
        members.push(i);
        i += 1;
    }

    tracing::debug!(start_index, depth, "brace block unterminated at end of input");
    state.pop();
    Ok(BlockOutcome {
        members,
        next_index: tokens.len(),
        unterminated: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::lexer::tokenize;
    use quarry_core::lang::languages::LanguageId;
    use quarry_core::lang::profiles::profile;

    fn scan(source: &str) -> (Vec<Token>, Result<BlockOutcome, BlockContractError>) {
        let prof = profile(LanguageId::JavaScript);
        let tokens = tokenize(source, prof);
        let start = tokens
            .iter()
            .position(|t| t.is_punct(PunctuationId::LBrace))
            .expect("test source has an open brace");
        let mut state = ParserState::new(ParserConfig::default());
        let outcome = parse_block(&tokens, start, &mut state, ContextType::Block, BTreeMap::new(), prof);
        (tokens, outcome)
    }

    /// Non-layout member texts, for comparing blocks across brace styles.
    fn member_texts(tokens: &[Token], outcome: &BlockOutcome) -> Vec<String> {
        outcome
            .members
            .iter()
            .map(|&i| &tokens[i])
            .filter(|t| !t.is_layout())
            .map(|t| t.text.clone())
            .collect()
    }

    #[test]
    fn test_next_index_is_one_past_matching_close() {
        let (tokens, outcome) = scan("{ a; }");
        let outcome = outcome.unwrap();
        assert!(!outcome.unterminated);
        assert!(tokens[outcome.next_index - 1].is_punct(PunctuationId::RBrace));
        assert_eq!(outcome.next_index, tokens.len() - 1); // only Eof remains
    }

    #[test]
    fn test_nested_braces_balance() {
        let (tokens, outcome) = scan("{ if (x) { y; } z; } tail");
        let outcome = outcome.unwrap();
        assert!(!outcome.unterminated);
        // The scan stops at the outer close, leaving `tail` outside.
        assert!(tokens[outcome.next_index..].iter().any(|t| t.is_word("tail")));
        assert!(member_texts(&tokens, &outcome).contains(&"z".to_string()));
    }

    #[test]
    fn test_brace_styles_yield_identical_content() {
        // K&R, Allman, Whitesmiths, GNU: same code, different brace placement.
        let knr = "function f() {\n  if (x) {\n    y();\n  }\n}";
        let allman = "function f()\n{\n  if (x)\n  {\n    y();\n  }\n}";
        let whitesmiths = "function f()\n  {\n  if (x)\n    {\n    y();\n    }\n  }";
        let gnu = "function f()\n  {\n    if (x)\n      {\n        y();\n      }\n  }";

        let texts: Vec<_> = [knr, allman, whitesmiths, gnu]
            .iter()
            .map(|src| {
                let (tokens, outcome) = scan(src);
                member_texts(&tokens, &outcome.unwrap())
            })
            .collect();

        assert_eq!(texts[0], texts[1]);
        assert_eq!(texts[0], texts[2]);
        assert_eq!(texts[0], texts[3]);
    }

    #[test]
    fn test_braces_in_literals_do_not_count() {
        let (tokens, outcome) = scan(r#"{ s = "}}}"; t = '{'; }"#);
        let outcome = outcome.unwrap();
        assert!(!outcome.unterminated);
        assert!(tokens[outcome.next_index - 1].is_punct(PunctuationId::RBrace));
        assert_eq!(outcome.next_index, tokens.len() - 1);
    }

    #[test]
    fn test_template_interpolation_does_not_unbalance() {
        let (tokens, outcome) = scan("{ s = `a${ {k: 1} }b`; }");
        let outcome = outcome.unwrap();
        assert!(!outcome.unterminated);
        assert_eq!(outcome.next_index, tokens.len() - 1);
    }

    #[test]
    fn test_unterminated_block_returns_what_it_has() {
        let (tokens, outcome) = scan("{ a; { b;");
        let outcome = outcome.unwrap();
        assert!(outcome.unterminated);
        assert_eq!(outcome.next_index, tokens.len());
        assert!(member_texts(&tokens, &outcome).contains(&"b".to_string()));
    }

    #[test]
    fn test_frame_is_popped_on_both_paths() {
        let prof = profile(LanguageId::JavaScript);
        for src in ["{ ok }", "{ never"] {
            let tokens = tokenize(src, prof);
            let mut state = ParserState::new(ParserConfig::default());
            parse_block(&tokens, 0, &mut state, ContextType::Block, BTreeMap::new(), prof).unwrap();
            assert_eq!(state.depth(), 1, "frame leaked for {src:?}");
        }
    }

    #[test]
    fn test_not_an_opener_is_a_contract_error() {
        let prof = profile(LanguageId::JavaScript);
        let tokens = tokenize("a { }", prof);
        let mut state = ParserState::new(ParserConfig::default());
        let err = parse_block(&tokens, 0, &mut state, ContextType::Block, BTreeMap::new(), prof);
        assert!(matches!(err, Err(BlockContractError::NotAnOpener { index: 0, .. })));
        assert_eq!(state.depth(), 1);
    }

    #[test]
    fn test_out_of_bounds_is_a_contract_error() {
        let prof = profile(LanguageId::JavaScript);
        let tokens = tokenize("{}", prof);
        let mut state = ParserState::new(ParserConfig::default());
        let err = parse_block(&tokens, 99, &mut state, ContextType::Block, BTreeMap::new(), prof);
        assert!(matches!(err, Err(BlockContractError::OutOfBounds { .. })));
    }
}
