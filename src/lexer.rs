//! Profile-driven tokenizer.
//!
//! Converts source text into the coarse token stream the rest of the engine
//! operates on. The tokenizer is deliberately dumb: it classifies characters
//! (punctuation, quotes, comment markers, words, symbol runs) without
//! interpreting them. It does not know whether a quote opens a string or a
//! brace opens a block. That interpretation belongs to the exclusion handling
//! and the block scanners, which is what keeps tokenization total: any input,
//! however malformed, tokenizes without error.

use crate::token::{CommentKind, QuoteKind, Span, Token, TokenKind};
use quarry_core::lang::profiles::LexProfile;
use quarry_core::lang::punctuation;

/// Tokenizer for one source string under one lexical profile.
pub struct Lexer<'a> {
    source: &'a str,
    profile: &'static LexProfile,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, profile: &'static LexProfile) -> Self {
        Self {
            source,
            profile,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// Always succeeds; unclassifiable characters become `Text` tokens. The
    /// stream always ends with an `Eof` token, and offsets are monotonically
    /// non-decreasing.
    #[tracing::instrument(skip_all, fields(source_len = self.source.len()))]
    pub fn tokenize(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.scan_token();
        }
        let end = Span::new(self.current_pos, self.current_pos);
        self.tokens
            .push(Token::new(TokenKind::Eof, "", end, self.line, self.column));
        self.tokens
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.current_pos..]
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            Some(c)
        } else {
            None
        }
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    // ========================================================================
    // Main scanning dispatch
    // ========================================================================

    fn scan_token(&mut self) {
        let start = self.current_pos;
        let line = self.line;
        let column = self.column;

        let Some(c) = self.peek() else {
            return;
        };

        match c {
            '\n' => {
                self.advance();
                self.emit(TokenKind::Newline, start, line, column);
            }
            '\r' => {
                self.advance();
                if self.peek() == Some('\n') {
                    self.advance();
                }
                self.emit(TokenKind::Newline, start, line, column);
            }
            ' ' | '\t' => {
                while matches!(self.peek(), Some(' ') | Some('\t')) {
                    self.advance();
                }
                self.emit(TokenKind::Whitespace, start, line, column);
            }
            '\\' => {
                self.advance();
                // An escape covers the backslash and the character it escapes,
                // so an escaped delimiter never reaches the exclusion handling
                // as a delimiter token.
                if self.peek().is_some() {
                    self.advance();
                }
                self.emit(TokenKind::Escape, start, line, column);
            }
            _ => {
                if let Some(kind) = self.match_comment_marker() {
                    self.emit(kind, start, line, column);
                } else if let Some(kind) = self.match_quote(c) {
                    self.emit(kind, start, line, column);
                } else if let Some(id) = punctuation::from_char(c) {
                    self.advance();
                    self.emit(TokenKind::Punct(id), start, line, column);
                } else if c == '/' {
                    self.advance();
                    self.emit(TokenKind::Slash, start, line, column);
                } else if is_word_char(c) {
                    while self.peek().is_some_and(is_word_char) {
                        self.advance();
                    }
                    self.emit(TokenKind::Word, start, line, column);
                } else {
                    self.scan_symbol_run();
                    self.emit(TokenKind::Text, start, line, column);
                }
            }
        }
    }

    /// Match a comment marker at the current position, consuming it.
    fn match_comment_marker(&mut self) -> Option<TokenKind> {
        if let Some(bc) = self.profile.block_comment {
            if self.rest().starts_with(bc.open) {
                self.advance_n(bc.open.chars().count());
                return Some(TokenKind::CommentStart(CommentKind::Block));
            }
            if self.rest().starts_with(bc.close) {
                self.advance_n(bc.close.chars().count());
                return Some(TokenKind::CommentEnd);
            }
        }
        for marker in self.profile.line_comments {
            if self.rest().starts_with(marker) {
                self.advance_n(marker.chars().count());
                return Some(TokenKind::CommentStart(CommentKind::Line));
            }
        }
        None
    }

    /// Match a quote delimiter at the current position, consuming it.
    fn match_quote(&mut self, c: char) -> Option<TokenKind> {
        if self.profile.template_quote == Some(c) {
            self.advance();
            return Some(TokenKind::Quote(QuoteKind::Backtick));
        }
        if !self.profile.quotes.contains(&c) {
            return None;
        }
        let tripled = self.profile.triple_quotes && {
            let mut it = self.rest().chars();
            it.next();
            it.next() == Some(c) && it.next() == Some(c)
        };
        if tripled {
            self.advance_n(3);
            Some(TokenKind::Quote(if c == '\'' {
                QuoteKind::TripleSingle
            } else {
                QuoteKind::TripleDouble
            }))
        } else {
            self.advance();
            Some(TokenKind::Quote(if c == '\'' {
                QuoteKind::Single
            } else {
                QuoteKind::Double
            }))
        }
    }

    /// Consume a run of symbol characters (`=`, `=>`, `@`, `<=`, …).
    ///
    /// The run stops at anything that could start a token of its own:
    /// whitespace, words, punctuation, quotes, escapes, slashes, and comment
    /// markers.
    fn scan_symbol_run(&mut self) {
        loop {
            self.advance();
            let Some(c) = self.peek() else { break };
            if c.is_whitespace()
                || is_word_char(c)
                || c == '\\'
                || c == '/'
                || punctuation::from_char(c).is_some()
                || self.profile.quotes.contains(&c)
                || self.profile.template_quote == Some(c)
                || self.at_marker()
            {
                break;
            }
        }
    }

    fn at_marker(&self) -> bool {
        let rest = self.rest();
        if let Some(bc) = self.profile.block_comment {
            if rest.starts_with(bc.open) || rest.starts_with(bc.close) {
                return true;
            }
        }
        self.profile.line_comments.iter().any(|m| rest.starts_with(m))
    }

    fn emit(&mut self, kind: TokenKind, start: usize, line: u32, column: u32) {
        let span = Span::new(start, self.current_pos);
        let text = self.source[start..self.current_pos].to_string();
        self.tokens.push(Token::new(kind, text, span, line, column));
    }
}

/// Word characters: Unicode letters and digits plus underscore, so non-ASCII
/// identifiers tokenize as single words.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Convenience function to tokenize a source string under a profile.
pub fn tokenize(source: &str, profile: &'static LexProfile) -> Vec<Token> {
    Lexer::new(source, profile).tokenize()
}
