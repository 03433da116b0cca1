//! Lexical exclusion handling.
//!
//! Suppresses structural interpretation of everything inside string literals,
//! comments, and regex literals: once a zone opens, every token (braces,
//! colons, indentation) is inert to every other component until the zone's
//! closing delimiter (or end of input) is reached.
//!
//! The tracker keeps its own lightweight zone state, layered on top of but
//! independent from the context stack used for block structure. Template
//! literals are the one place the two worlds nest: a `${ … }` interpolation
//! re-enters structural scanning as a sub-scan seeded at the interpolation
//! boundary, so braces inside the expression balance without the enclosing
//! literal ever leaving its exclusion zone.

use crate::diagnostics::ParseWarning;
use crate::token::{CommentKind, QuoteKind, Span, Token, TokenKind};
use quarry_core::lang::profiles::LexProfile;
use quarry_core::lang::punctuation::PunctuationId;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Zone {
    Str(QuoteKind),
    Template { interp_depth: usize },
    LineComment,
    BlockComment { depth: usize },
    Regex { in_class: bool },
}

#[derive(Debug, Clone, Copy)]
struct ZoneState {
    zone: Zone,
    open_span: Span,
}

/// Tracks exclusion zones across a linear scan of a token region.
///
/// Feed every token, in order, to [`observe`](Self::observe); it answers
/// whether that token is structurally significant. Call
/// [`finish`](Self::finish) at the end of the region to collect warnings for
/// zones that never closed (they are implicitly closed at end of input).
#[derive(Clone)]
pub struct ExclusionTracker {
    profile: &'static LexProfile,
    zones: Vec<ZoneState>,
    /// Whether a `/` at the current position would start a regex literal.
    /// Decided by the preceding significant token: after anything that can
    /// end an expression (a word, a closing delimiter, a literal), a slash
    /// is division instead.
    slash_starts_regex: bool,
    /// Set when template raw text ends with `$`; the byte offset lets the
    /// following `{` prove adjacency.
    pending_interp_at: Option<usize>,
    warnings: Vec<ParseWarning>,
}

impl ExclusionTracker {
    pub fn new(profile: &'static LexProfile) -> Self {
        Self {
            profile,
            zones: Vec::new(),
            slash_starts_regex: true,
            pending_interp_at: None,
            warnings: Vec::new(),
        }
    }

    /// Return `true` while inside any exclusion zone (an active template
    /// interpolation counts as structural, not excluded).
    pub fn in_exclusion(&self) -> bool {
        match self.zones.last() {
            None => false,
            Some(z) => !matches!(z.zone, Zone::Template { interp_depth } if interp_depth > 0),
        }
    }

    /// Observe the next token; returns `true` if it is structurally
    /// significant (outside every exclusion zone).
    pub fn observe(&mut self, tok: &Token) -> bool {
        let in_interp = matches!(
            self.zones.last(),
            Some(ZoneState { zone: Zone::Template { interp_depth }, .. }) if *interp_depth > 0
        );
        if self.zones.is_empty() || in_interp {
            return self.observe_code(tok, in_interp);
        }
        // Last zone exists and is not an active interpolation.
        let state = *self.zones.last().expect("INVARIANT: checked non-empty above");
        match state.zone {
            Zone::Str(quote) => self.observe_in_string(tok, quote),
            Zone::Template { .. } => self.observe_in_template_raw(tok),
            Zone::LineComment => {
                if matches!(tok.kind, TokenKind::Newline) {
                    self.zones.pop();
                    // The newline still terminates the line structurally.
                    true
                } else {
                    false
                }
            }
            Zone::BlockComment { depth } => self.observe_in_block_comment(tok, depth),
            Zone::Regex { in_class } => self.observe_in_regex(tok, in_class),
        }
    }

    /// Close out the scan: zones still open are implicitly closed and, except
    /// for line comments, reported as lexical-unterminated warnings.
    pub fn finish(mut self) -> Vec<ParseWarning> {
        for state in self.zones.drain(..) {
            let message = match state.zone {
                Zone::Str(_) => "unterminated string literal",
                Zone::Template { .. } => "unterminated template literal",
                Zone::BlockComment { .. } => "unterminated block comment",
                Zone::Regex { .. } => "unterminated regular expression literal",
                Zone::LineComment => continue,
            };
            self.warnings
                .push(ParseWarning::lexical_unterminated(message, state.open_span));
        }
        self.warnings
    }

    // ========================================================================
    // Structural position (no zone, or inside an interpolation sub-scan)
    // ========================================================================

    fn observe_code(&mut self, tok: &Token, in_interp: bool) -> bool {
        match tok.kind {
            TokenKind::Quote(q) => {
                let zone = if q == QuoteKind::Backtick {
                    Zone::Template { interp_depth: 0 }
                } else {
                    Zone::Str(q)
                };
                self.push_zone(zone, tok.span);
                false
            }
            TokenKind::CommentStart(CommentKind::Line) => {
                self.push_zone(Zone::LineComment, tok.span);
                false
            }
            TokenKind::CommentStart(CommentKind::Block) => {
                self.push_zone(Zone::BlockComment { depth: 1 }, tok.span);
                false
            }
            TokenKind::CommentEnd => {
                // Stray close marker outside any comment; inert by nature,
                // but it is not part of a zone either.
                self.slash_starts_regex = true;
                true
            }
            TokenKind::Slash => {
                if self.profile.regex_literals && self.slash_starts_regex {
                    self.push_zone(Zone::Regex { in_class: false }, tok.span);
                    false
                } else {
                    self.slash_starts_regex = true;
                    true
                }
            }
            TokenKind::Escape => false,
            TokenKind::Punct(p) => {
                if in_interp {
                    self.adjust_interp_depth(p);
                }
                self.slash_starts_regex = !matches!(
                    p,
                    PunctuationId::RParen | PunctuationId::RBracket | PunctuationId::RBrace
                );
                true
            }
            TokenKind::Word => {
                self.slash_starts_regex = self.profile.regex_preceders.contains(&tok.text.as_str());
                true
            }
            TokenKind::Text => {
                self.slash_starts_regex = true;
                true
            }
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Eof => true,
        }
    }

    fn adjust_interp_depth(&mut self, p: PunctuationId) {
        if let Some(ZoneState { zone: Zone::Template { interp_depth }, .. }) = self.zones.last_mut() {
            match p {
                PunctuationId::LBrace => *interp_depth += 1,
                PunctuationId::RBrace => *interp_depth = interp_depth.saturating_sub(1),
                _ => {}
            }
        }
    }

    // ========================================================================
    // Inside zones
    // ========================================================================

    fn observe_in_string(&mut self, tok: &Token, quote: QuoteKind) -> bool {
        match tok.kind {
            TokenKind::Quote(q) if closes_string(quote, q) => {
                self.zones.pop();
                self.slash_starts_regex = false;
                false
            }
            TokenKind::Newline if !quote.multi_line() => {
                // A single-line string that reaches a newline is implicitly
                // closed there; the newline itself still ends the line.
                let state = self.zones.pop().expect("INVARIANT: string zone is on the stack");
                self.warnings.push(ParseWarning::lexical_unterminated(
                    "string literal not closed before end of line",
                    state.open_span,
                ));
                self.slash_starts_regex = false;
                true
            }
            _ => false,
        }
    }

    fn observe_in_template_raw(&mut self, tok: &Token) -> bool {
        match tok.kind {
            TokenKind::Quote(QuoteKind::Backtick) => {
                self.zones.pop();
                self.pending_interp_at = None;
                self.slash_starts_regex = false;
                false
            }
            TokenKind::Punct(PunctuationId::LBrace) if self.pending_interp_at == Some(tok.span.start) => {
                // `${` enters the interpolation sub-scan. The brace itself is
                // structural so nesting balances against its closing `}`.
                self.pending_interp_at = None;
                if let Some(ZoneState { zone: Zone::Template { interp_depth }, .. }) = self.zones.last_mut() {
                    *interp_depth = 1;
                }
                true
            }
            TokenKind::Text if tok.text.ends_with('$') => {
                self.pending_interp_at = Some(tok.span.end);
                false
            }
            _ => {
                self.pending_interp_at = None;
                false
            }
        }
    }

    fn observe_in_block_comment(&mut self, tok: &Token, depth: usize) -> bool {
        match tok.kind {
            TokenKind::CommentStart(CommentKind::Block)
                if self.profile.block_comment.is_some_and(|bc| bc.nests) =>
            {
                if let Some(ZoneState { zone: Zone::BlockComment { depth }, .. }) = self.zones.last_mut() {
                    *depth += 1;
                }
                false
            }
            TokenKind::CommentEnd => {
                if depth <= 1 {
                    self.zones.pop();
                } else if let Some(ZoneState { zone: Zone::BlockComment { depth }, .. }) =
                    self.zones.last_mut()
                {
                    *depth -= 1;
                }
                false
            }
            _ => false,
        }
    }

    fn observe_in_regex(&mut self, tok: &Token, in_class: bool) -> bool {
        match tok.kind {
            TokenKind::Punct(PunctuationId::LBracket) => {
                self.set_regex_class(true);
                false
            }
            TokenKind::Punct(PunctuationId::RBracket) => {
                self.set_regex_class(false);
                false
            }
            TokenKind::Slash if !in_class => {
                self.zones.pop();
                self.slash_starts_regex = false;
                false
            }
            TokenKind::Newline => {
                // Regex literals cannot span lines; implicitly closed here.
                let state = self.zones.pop().expect("INVARIANT: regex zone is on the stack");
                self.warnings.push(ParseWarning::lexical_unterminated(
                    "regular expression literal not closed before end of line",
                    state.open_span,
                ));
                self.slash_starts_regex = false;
                true
            }
            _ => false,
        }
    }

    fn set_regex_class(&mut self, value: bool) {
        if let Some(ZoneState { zone: Zone::Regex { in_class }, .. }) = self.zones.last_mut() {
            *in_class = value;
        }
    }

    fn push_zone(&mut self, zone: Zone, open_span: Span) {
        self.zones.push(ZoneState { zone, open_span });
    }
}

/// Whether a quote token of kind `seen` closes a string opened with `open`.
///
/// Triple-quoted strings close only on their own tripled delimiter; a
/// single-quoted string closes on any delimiter sharing its base character
/// (the first quote of a greedy tripled token still terminates it).
fn closes_string(open: QuoteKind, seen: QuoteKind) -> bool {
    match open {
        QuoteKind::Single => matches!(seen, QuoteKind::Single | QuoteKind::TripleSingle),
        QuoteKind::Double => matches!(seen, QuoteKind::Double | QuoteKind::TripleDouble),
        QuoteKind::TripleSingle => seen == QuoteKind::TripleSingle,
        QuoteKind::TripleDouble => seen == QuoteKind::TripleDouble,
        QuoteKind::Backtick => seen == QuoteKind::Backtick,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use quarry_core::lang::languages::LanguageId;
    use quarry_core::lang::profiles::profile;

    /// Run the tracker over a source and return, for each token, whether it
    /// was significant, plus the finish warnings.
    fn scan(lang: LanguageId, source: &str) -> (Vec<(String, bool)>, Vec<ParseWarning>) {
        let prof = profile(lang);
        let tokens = tokenize(source, prof);
        let mut tracker = ExclusionTracker::new(prof);
        let flags = tokens
            .iter()
            .map(|t| (t.text.clone(), tracker.observe(t)))
            .collect();
        (flags, tracker.finish())
    }

    fn significant_braces(flags: &[(String, bool)]) -> usize {
        flags
            .iter()
            .filter(|(text, sig)| *sig && (text == "{" || text == "}"))
            .count()
    }

    #[test]
    fn test_braces_in_strings_are_inert() {
        let (flags, warnings) = scan(LanguageId::JavaScript, r#"x = "{{{" ; y = '}'"#);
        assert_eq!(significant_braces(&flags), 0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_braces_in_comments_are_inert() {
        let (flags, _) = scan(LanguageId::JavaScript, "// {{{\n/* } } */ {");
        assert_eq!(significant_braces(&flags), 1, "only the trailing brace is structural");
    }

    #[test]
    fn test_python_hash_comment() {
        let (flags, _) = scan(LanguageId::Python, "x = 1  # { not a brace\ny = 2");
        assert_eq!(significant_braces(&flags), 0);
        // The newline terminating the comment is still significant.
        assert!(flags.iter().any(|(text, sig)| text == "\n" && *sig));
    }

    #[test]
    fn test_escaped_quote_does_not_close() {
        let (flags, warnings) = scan(LanguageId::JavaScript, r#"s = "a\"b{" ; {"#);
        // The escaped quote stays inside the string, so the brace before the
        // real closing quote is inert; only the trailing brace counts.
        assert_eq!(significant_braces(&flags), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let src = "s = \"\"\"\n{ not code\n'single quotes inert'\n\"\"\"\nz = {";
        let (flags, warnings) = scan(LanguageId::Python, src);
        assert_eq!(significant_braces(&flags), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unterminated_string_warns_at_finish() {
        let (_, warnings) = scan(LanguageId::Python, "s = '''never closed");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, crate::diagnostics::WarningKind::LexicalUnterminated);
    }

    #[test]
    fn test_single_line_string_closed_at_newline() {
        let (flags, warnings) = scan(LanguageId::Python, "s = 'oops\nx = {");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("end of line"));
        // Structure resumes on the next line.
        assert_eq!(significant_braces(&flags), 1);
    }

    #[test]
    fn test_regex_literal_excludes_braces() {
        let (flags, _) = scan(LanguageId::JavaScript, "return /{+/ ; {");
        assert_eq!(significant_braces(&flags), 1);
    }

    #[test]
    fn test_division_is_not_a_regex() {
        let (flags, warnings) = scan(LanguageId::JavaScript, "a = b / 2; c = d / 4; {");
        assert!(warnings.is_empty());
        assert_eq!(significant_braces(&flags), 1);
    }

    #[test]
    fn test_regex_character_class_slash() {
        // The slash inside [...] does not close the regex.
        let (flags, warnings) = scan(LanguageId::JavaScript, "x = /[/]{/ ; {");
        assert!(warnings.is_empty());
        assert_eq!(significant_braces(&flags), 1);
    }

    #[test]
    fn test_template_literal_raw_braces_inert() {
        let (flags, _) = scan(LanguageId::JavaScript, "s = `{{{`; {");
        assert_eq!(significant_braces(&flags), 1);
    }

    #[test]
    fn test_template_interpolation_braces_balance() {
        let (flags, warnings) = scan(LanguageId::JavaScript, "s = `a${ {k: 1} }b`;");
        assert!(warnings.is_empty());
        // `${`, the object literal pair, and the interpolation close: all
        // structural, and they balance to zero.
        assert_eq!(significant_braces(&flags), 4);
    }

    #[test]
    fn test_nested_template_literals() {
        let (flags, warnings) = scan(LanguageId::JavaScript, "s = `a${ `b${c}` }d`; {");
        assert!(warnings.is_empty());
        // Outer `${…}` pair, inner `${…}` pair, trailing orphan brace.
        assert_eq!(significant_braces(&flags), 5);
    }

    #[test]
    fn test_string_inside_interpolation() {
        let (flags, warnings) = scan(LanguageId::JavaScript, "s = `x${ '}' }y`;");
        assert!(warnings.is_empty());
        // The quoted brace inside the interpolation is inert; the `${` and
        // its close balance.
        assert_eq!(significant_braces(&flags), 2);
    }

    #[test]
    fn test_block_comments_do_not_nest_by_default() {
        let (flags, _) = scan(LanguageId::JavaScript, "/* a /* b */ { */");
        // Non-nesting: the first */ closes the comment, so the brace is
        // structural and the trailing */ is a stray marker.
        assert_eq!(significant_braces(&flags), 1);
    }

    #[test]
    fn test_unterminated_block_comment_warns() {
        let (flags, warnings) = scan(LanguageId::JavaScript, "/* never {");
        assert_eq!(significant_braces(&flags), 0);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("block comment"));
    }

    #[test]
    fn test_line_comment_at_eof_is_not_a_warning() {
        let (_, warnings) = scan(LanguageId::JavaScript, "x = 1 // trailing");
        assert!(warnings.is_empty());
    }
}
