//! Python structural parser.
//!
//! Recognizes `def`/`class`/`import` declarations, decorators, keyword
//! blocks, `match`/`case`, and binding statements (assignments, walrus
//! bindings, loop and `with`/`except` targets), delegating body recovery to
//! the indentation block scanner. Everything else on a line is consumed as
//! plain statement content; recovery, not rejection, is the default.
//!
//! The walker works on *logical lines*: physical lines joined across open
//! brackets, trailing escapes, and multi-line strings, with exclusion zones
//! already accounted for, so a `def` inside a docstring can never introduce
//! a declaration.

use std::collections::BTreeMap;

use crate::ast::{Ast, NodeId, PropValue};
use crate::block::indent;
use crate::config::ParserConfig;
use crate::exclusion::ExclusionTracker;
use crate::languages::{LanguageParser, Parse};
use crate::lexer;
use crate::state::{ContextFrame, ContextType, ParserState};
use crate::symbols::{Symbol, SymbolKind, SymbolTable};
use crate::token::{Span, Token, TokenKind};
use quarry_core::lang::keywords::{self, KeywordId, KeywordRole};
use quarry_core::lang::languages::LanguageId;
use quarry_core::lang::nodes::{self, props};
use quarry_core::lang::profiles::{self, LexProfile};
use quarry_core::lang::punctuation::{self, PunctuationId};

/// Structural parser for Python source.
pub struct PythonParser {
    config: ParserConfig,
}

impl PythonParser {
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> LanguageId {
        LanguageId::Python
    }

    #[tracing::instrument(skip_all, fields(source_len = source.len()))]
    fn parse(&self, source: &str) -> Parse {
        let profile = profiles::profile(LanguageId::Python);
        let tokens = lexer::tokenize(source, profile);
        let mut walker = Walker {
            source,
            tokens: &tokens,
            state: ParserState::new(self.config),
            ast: Ast::new(nodes::MODULE),
            symbols: SymbolTable::new(),
            profile,
        };
        let root = walker.ast.root();
        walker.ast.set_prop(root, props::LANGUAGE, "python");
        let end = tokens.len().saturating_sub(1); // exclude Eof
        walker.parse_region(0, end, root, 0, Mode::Statements);

        let Walker {
            mut ast,
            mut state,
            symbols,
            ..
        } = walker;
        ast.warnings.append(&mut state.take_warnings());
        Parse { ast, symbols }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Statements,
    /// Inside a `match` body: `case …:` lines become case clauses.
    MatchArms,
}

/// One logical line: token range plus the significant token indices in it.
#[derive(Debug)]
struct Line {
    start: usize,
    /// Exclusive end, one past the terminating newline.
    end: usize,
    sig: Vec<usize>,
}

/// A parameter binding queued for registration once its scope opens.
struct ParamSym {
    name: String,
    line: u32,
    column: u32,
    span: Span,
}

struct Walker<'t> {
    source: &'t str,
    tokens: &'t [Token],
    state: ParserState,
    ast: Ast,
    symbols: SymbolTable,
    profile: &'static LexProfile,
}

impl<'t> Walker<'t> {
    // ========================================================================
    // Logical-line segmentation
    // ========================================================================

    /// Split a token region into logical lines. Newlines inside exclusion
    /// zones, open brackets, or swallowed by a trailing escape do not end a
    /// line. Lexical warnings are reported only from the module-level pass,
    /// which observes every token exactly once.
    fn segment(&mut self, start: usize, end: usize, report: bool) -> Vec<Line> {
        let mut tracker = ExclusionTracker::new(self.profile);
        let mut lines = Vec::new();
        let mut line = Line {
            start,
            end: start,
            sig: Vec::new(),
        };
        let mut bracket_depth = 0usize;

        for i in start..end {
            let tok = &self.tokens[i];
            if !tracker.observe(tok) {
                continue;
            }
            if let Some(p) = tok.punct_id() {
                if punctuation::is_opener(p) {
                    bracket_depth += 1;
                } else if punctuation::is_closer(p) {
                    bracket_depth = bracket_depth.saturating_sub(1);
                }
            }
            if matches!(tok.kind, TokenKind::Newline) && bracket_depth == 0 && !tracker.in_exclusion() {
                line.end = i + 1;
                let done = std::mem::replace(
                    &mut line,
                    Line {
                        start: i + 1,
                        end: i + 1,
                        sig: Vec::new(),
                    },
                );
                lines.push(done);
                continue;
            }
            if !tok.is_layout() && !matches!(tok.kind, TokenKind::Eof) {
                line.sig.push(i);
            }
        }
        if line.start < end {
            line.end = end;
            lines.push(line);
        }
        if report {
            for w in tracker.finish() {
                self.state.warn(w);
            }
        }
        lines
    }

    // ========================================================================
    // Region parsing
    // ========================================================================

    fn parse_region(&mut self, start: usize, end: usize, parent: NodeId, depth: usize, mode: Mode) {
        let lines = self.segment(start, end, depth == 0);
        let mut pending: Vec<(String, Span)> = Vec::new();
        let mut li = 0;
        while li < lines.len() {
            li = self.parse_line(&lines, li, parent, depth, mode, &mut pending);
        }
        if !pending.is_empty() {
            self.flush_decorators(parent, &mut pending);
        }
    }

    fn parse_line(
        &mut self,
        lines: &[Line],
        li: usize,
        parent: NodeId,
        depth: usize,
        mode: Mode,
        pending: &mut Vec<(String, Span)>,
    ) -> usize {
        let line = &lines[li];
        if line.sig.is_empty() {
            if !self.state.config().decorators_span_blank_lines && !pending.is_empty() {
                self.flush_decorators(parent, pending);
            }
            return li + 1;
        }

        // Walrus bindings can occur on any line, including block headers
        // (`if (n := read()) > 0:`).
        self.scan_walrus(line);

        let first = line.sig[0];
        let ftok = &self.tokens[first];

        // Decorator line: queue for the definition that follows.
        if ftok.kind == TokenKind::Text && ftok.text.starts_with('@') {
            match self.decorator_name(&line.sig) {
                Some(name) => pending.push((name, ftok.span)),
                None => self.error_node(parent, ftok.span, "malformed decorator"),
            }
            return li + 1;
        }

        let kw = if ftok.kind == TokenKind::Word {
            keywords::lookup(LanguageId::Python, &ftok.text)
        } else {
            None
        };

        let decorated_target = matches!(
            kw.map(|k| k.id),
            Some(KeywordId::Def) | Some(KeywordId::Class)
        ) || (kw.map(|k| k.id) == Some(KeywordId::Async) && self.sig_word(line, 1) == Some("def"));
        if !pending.is_empty() && !decorated_target {
            self.flush_decorators(parent, pending);
        }

        if let Some(info) = kw {
            match info.id {
                KeywordId::Def => return self.function_decl(lines, li, parent, depth, pending, false),
                KeywordId::Async if self.sig_word(line, 1) == Some("def") => {
                    return self.function_decl(lines, li, parent, depth, pending, true);
                }
                KeywordId::Async
                    if matches!(self.sig_word(line, 1), Some("for") | Some("with")) =>
                {
                    let keyword = self.sig_word(line, 1).expect("INVARIANT: just matched").to_string();
                    return self.block_stmt(lines, li, parent, depth, &keyword, true);
                }
                KeywordId::Class => return self.class_decl(lines, li, parent, depth, pending),
                KeywordId::Import | KeywordId::From => {
                    self.import_decl(line, parent);
                    return li + 1;
                }
                KeywordId::Match if self.ends_with_colon(line) && line.sig.len() >= 3 => {
                    return self.match_stmt(lines, li, parent, depth);
                }
                KeywordId::Case if mode == Mode::MatchArms && self.ends_with_colon(line) => {
                    return self.case_clause(lines, li, parent, depth);
                }
                _ if info.role == KeywordRole::Block
                    && !matches!(info.id, KeywordId::Match | KeywordId::Case) =>
                {
                    let keyword = ftok.text.clone();
                    return self.block_stmt(lines, li, parent, depth, &keyword, false);
                }
                _ => {}
            }
        }

        self.statement(line, parent);
        li + 1
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn function_decl(
        &mut self,
        lines: &[Line],
        li: usize,
        parent: NodeId,
        depth: usize,
        pending: &mut Vec<(String, Span)>,
        is_async: bool,
    ) -> usize {
        let line = &lines[li];
        let sig = &line.sig;
        let name_pos = if is_async { 2 } else { 1 };

        let Some(&name_idx) = sig
            .get(name_pos)
            .filter(|&&ix| self.tokens[ix].kind == TokenKind::Word)
        else {
            let span = self.tokens[sig[0]].span;
            pending.clear();
            self.error_node(parent, span, "malformed function declaration");
            return li + 1;
        };
        let name_tok = &self.tokens[name_idx];
        let name = name_tok.text.clone();

        let (params, param_syms) = self.parse_params(sig, name_pos + 1);
        let decorators = std::mem::take(pending);

        let node = self
            .ast
            .add_node(parent, nodes::FUNCTION_DECLARATION, self.tokens[sig[0]].span);
        self.ast.set_prop(node, props::NAME, name.clone());
        self.ast.set_prop(node, props::PARAMS, PropValue::List(params));
        if is_async {
            self.ast.set_prop(node, props::ASYNC, true);
        }
        self.apply_decorators(node, &decorators);

        self.symbols.register(Symbol {
            name: name.clone(),
            kind: SymbolKind::Function,
            line: name_tok.line,
            column: name_tok.column,
            scope: self.state.current_scope(),
            span: name_tok.span,
        });

        let mut metadata = BTreeMap::new();
        metadata.insert(props::NAME.to_string(), PropValue::Str(name));
        self.body(lines, li, node, depth, ContextType::Function, metadata, param_syms)
    }

    fn class_decl(
        &mut self,
        lines: &[Line],
        li: usize,
        parent: NodeId,
        depth: usize,
        pending: &mut Vec<(String, Span)>,
    ) -> usize {
        let line = &lines[li];
        let sig = &line.sig;

        let Some(&name_idx) = sig
            .get(1)
            .filter(|&&ix| self.tokens[ix].kind == TokenKind::Word)
        else {
            let span = self.tokens[sig[0]].span;
            pending.clear();
            self.error_node(parent, span, "malformed class declaration");
            return li + 1;
        };
        let name_tok = &self.tokens[name_idx];
        let name = name_tok.text.clone();
        let decorators = std::mem::take(pending);

        let node = self
            .ast
            .add_node(parent, nodes::CLASS_DECLARATION, self.tokens[sig[0]].span);
        self.ast.set_prop(node, props::NAME, name.clone());
        self.apply_decorators(node, &decorators);

        // Base list: `class C(Base, metaclass=Meta):`
        if sig.get(2).is_some_and(|&ix| self.tokens[ix].is_punct(PunctuationId::LParen)) {
            let mut bases = Vec::new();
            for entry in self.split_delimited(sig, 2) {
                if entry.is_empty() {
                    continue;
                }
                let head = &self.tokens[entry[0]];
                if head.is_word("metaclass")
                    && entry
                        .get(1)
                        .is_some_and(|&ix| is_assign_text(&self.tokens[ix]))
                {
                    // A metaclass is an ordinary class property, not a
                    // special node type.
                    let eq = &self.tokens[entry[1]];
                    let end = self.tokens[*entry.last().expect("INVARIANT: entry is non-empty")]
                        .span
                        .end;
                    self.ast
                        .set_prop(node, props::METACLASS, self.slice(eq.span.start + 1, end));
                } else {
                    let start = self.tokens[entry[0]].span.start;
                    let end = self.tokens[*entry.last().expect("INVARIANT: entry is non-empty")]
                        .span
                        .end;
                    bases.push(PropValue::Str(self.slice(start, end)));
                }
            }
            if !bases.is_empty() {
                self.ast.set_prop(node, props::BASES, PropValue::List(bases));
            }
        }

        self.symbols.register(Symbol {
            name: name.clone(),
            kind: SymbolKind::Class,
            line: name_tok.line,
            column: name_tok.column,
            scope: self.state.current_scope(),
            span: name_tok.span,
        });

        let mut metadata = BTreeMap::new();
        metadata.insert(props::NAME.to_string(), PropValue::Str(name));
        self.body(lines, li, node, depth, ContextType::Class, metadata, Vec::new())
    }

    fn import_decl(&mut self, line: &Line, parent: NodeId) {
        let sig = &line.sig;
        let span = self.tokens[sig[0]]
            .span
            .merge(self.tokens[*sig.last().expect("INVARIANT: sig checked non-empty")].span);
        let node = self.ast.add_node(parent, nodes::IMPORT_DECLARATION, span);
        let mut names = Vec::new();

        if self.tokens[sig[0]].is_word("from") {
            // from <module> import <items>
            let Some(import_pos) = sig
                .iter()
                .position(|&ix| self.tokens[ix].is_word("import"))
            else {
                let end = self.tokens[*sig.last().expect("INVARIANT: sig is non-empty")].span.end;
                let module = self.slice(self.tokens[sig[0]].span.end, end);
                self.ast.set_prop(node, props::SOURCE, module);
                return;
            };
            let module = self.slice(
                self.tokens[sig[0]].span.end,
                self.tokens[sig[import_pos]].span.start,
            );
            self.ast.set_prop(node, props::SOURCE, module);
            for entry in split_at_commas(self.tokens, &sig[import_pos + 1..]) {
                self.import_entry(&entry, &mut names);
            }
        } else {
            // import a.b as c, d
            for entry in split_at_commas(self.tokens, &sig[1..]) {
                self.import_entry(&entry, &mut names);
            }
        }
        self.ast.set_prop(node, props::NAMES, PropValue::List(names));
    }

    /// One comma-separated import entry: record the name it binds.
    ///
    /// `from m import x as y` binds `y`; `import a.b` binds `a`; `from m
    /// import *` is recorded but binds nothing nameable.
    fn import_entry(&mut self, entry: &[usize], names: &mut Vec<PropValue>) {
        if entry.is_empty() {
            return;
        }
        if self.tokens[entry[0]].kind == TokenKind::Text && self.tokens[entry[0]].text == "*" {
            names.push(PropValue::Str("*".to_string()));
            return;
        }
        let bound_idx = entry
            .iter()
            .position(|&ix| self.tokens[ix].is_word("as"))
            .and_then(|as_pos| entry.get(as_pos + 1).copied())
            .or_else(|| {
                entry
                    .iter()
                    .copied()
                    .find(|&ix| self.tokens[ix].kind == TokenKind::Word)
            });
        let Some(bound_idx) = bound_idx else { return };
        let tok = &self.tokens[bound_idx];
        if tok.kind != TokenKind::Word {
            return;
        }
        names.push(PropValue::Str(tok.text.clone()));
        self.symbols.register(Symbol {
            name: tok.text.clone(),
            kind: SymbolKind::Import,
            line: tok.line,
            column: tok.column,
            scope: self.state.current_scope(),
            span: tok.span,
        });
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    fn block_stmt(
        &mut self,
        lines: &[Line],
        li: usize,
        parent: NodeId,
        depth: usize,
        keyword: &str,
        is_async: bool,
    ) -> usize {
        let line = &lines[li];
        let node = self
            .ast
            .add_node(parent, nodes::BLOCK, self.tokens[line.sig[0]].span);
        self.ast.set_prop(node, props::KEYWORD, keyword);
        if is_async {
            self.ast.set_prop(node, props::ASYNC, true);
        }
        self.register_block_bindings(line, keyword);

        let mut metadata = BTreeMap::new();
        metadata.insert(props::KEYWORD.to_string(), PropValue::Str(keyword.to_string()));
        self.body(lines, li, node, depth, ContextType::Block, metadata, Vec::new())
    }

    /// Loop targets (`for i, j in …`) and `as` bindings (`with … as f:`,
    /// `except E as e:`) bind names in the enclosing scope.
    fn register_block_bindings(&mut self, line: &Line, keyword: &str) {
        let sig = &line.sig;
        match keyword {
            "for" => {
                let Some(in_pos) = sig.iter().position(|&ix| self.tokens[ix].is_word("in")) else {
                    return;
                };
                for &ix in &sig[1..in_pos] {
                    let tok = &self.tokens[ix];
                    if tok.kind == TokenKind::Word {
                        self.register_variable(ix);
                    }
                }
            }
            "with" | "except" => {
                let mut iter = sig.iter().enumerate();
                while let Some((k, &ix)) = iter.next() {
                    if self.tokens[ix].is_word("as") {
                        if let Some(&target) = sig.get(k + 1) {
                            if self.tokens[target].kind == TokenKind::Word {
                                self.register_variable(target);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn match_stmt(&mut self, lines: &[Line], li: usize, parent: NodeId, depth: usize) -> usize {
        let line = &lines[li];
        let sig = &line.sig;
        let node = self
            .ast
            .add_node(parent, nodes::MATCH_STATEMENT, self.tokens[sig[0]].span);
        let subject = self.slice(
            self.tokens[sig[0]].span.end,
            self.tokens[sig[sig.len() - 1]].span.start,
        );
        self.ast.set_prop(node, props::SUBJECT, subject);

        let mut metadata = BTreeMap::new();
        metadata.insert(props::KEYWORD.to_string(), PropValue::Str("match".to_string()));
        self.body(lines, li, node, depth, ContextType::Block, metadata, Vec::new())
    }

    fn case_clause(&mut self, lines: &[Line], li: usize, parent: NodeId, depth: usize) -> usize {
        let line = &lines[li];
        let sig = &line.sig;
        let node = self
            .ast
            .add_node(parent, nodes::CASE_CLAUSE, self.tokens[sig[0]].span);
        let pattern = self.slice(
            self.tokens[sig[0]].span.end,
            self.tokens[sig[sig.len() - 1]].span.start,
        );
        self.ast.set_prop(node, props::PATTERN, pattern);

        let mut metadata = BTreeMap::new();
        metadata.insert(props::KEYWORD.to_string(), PropValue::Str("case".to_string()));
        self.body(lines, li, node, depth, ContextType::Block, metadata, Vec::new())
    }

    /// Recover the body of a block-introducing line and descend into it.
    ///
    /// Returns the line index to continue at. Handles the three shapes a
    /// Python suite can take: an indented block after a trailing colon, an
    /// inline body after a mid-line colon, and a missing body (unterminated).
    fn body(
        &mut self,
        lines: &[Line],
        li: usize,
        node: NodeId,
        depth: usize,
        ctx: ContextType,
        metadata: BTreeMap<String, PropValue>,
        params: Vec<ParamSym>,
    ) -> usize {
        let line = &lines[li];

        if !self.ends_with_colon(line) {
            if let Some(colon_pos) = self.top_level_colon(&line.sig) {
                // Inline suite: `def f(): return x`
                let after = &line.sig[colon_pos + 1..];
                if let (Some(&first), Some(&last)) = (after.first(), after.last()) {
                    let body_span = self.tokens[first].span.merge(self.tokens[last].span);
                    self.set_body_span(node, body_span);
                }
                if ctx.opens_scope() {
                    self.state.push(ContextFrame::new(ctx, line.start).with_metadata(metadata));
                    let _scope = self.state.enter_scope(ctx);
                    self.register_params(params);
                    self.state.exit_scope();
                    self.state.pop();
                }
            } else {
                let span = self.tokens[line.sig[0]].span;
                self.ast.set_prop(node, props::UNTERMINATED, true);
                self.state.warn(crate::diagnostics::ParseWarning::unexpected_token(
                    "expected ':' to introduce a block",
                    span,
                ));
            }
            return li + 1;
        }

        let body_start = line.end;
        let newline_terminated = line
            .end
            .checked_sub(1)
            .is_some_and(|ix| matches!(self.tokens[ix].kind, TokenKind::Newline));
        if !newline_terminated {
            // The colon was the last thing before end of input.
            self.ast.set_prop(node, props::UNTERMINATED, true);
            return li + 1;
        }

        let outcome = match indent::parse_block(
            self.tokens,
            body_start,
            &mut self.state,
            ctx,
            metadata.clone(),
            self.profile,
        ) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(?err, "indentation scanner rejected a line-start index");
                self.ast.set_prop(node, props::UNTERMINATED, true);
                return li + 1;
            }
        };

        if outcome.unterminated {
            self.ast.set_prop(node, props::UNTERMINATED, true);
        }
        if let (Some(&first), Some(&last)) = (outcome.members.first(), outcome.members.last()) {
            let body_span = self.tokens[first].span.merge(self.tokens[last].span);
            self.set_body_span(node, body_span);

            if depth < self.state.config().max_block_depth {
                let mode = if self.ast.node(node).node_type == nodes::MATCH_STATEMENT {
                    Mode::MatchArms
                } else {
                    Mode::Statements
                };
                self.state.push(ContextFrame::new(ctx, body_start).with_metadata(metadata));
                if ctx.opens_scope() {
                    let _scope = self.state.enter_scope(ctx);
                    self.register_params(params);
                    self.parse_region(first, last + 1, node, depth + 1, mode);
                    self.state.exit_scope();
                } else {
                    self.parse_region(first, last + 1, node, depth + 1, mode);
                }
                self.state.pop();
            }
        }

        let mut next = li + 1;
        while next < lines.len() && lines[next].start < outcome.next_index {
            next += 1;
        }
        next
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Walrus bindings anywhere in the line: `(n := 10)` declares `n` in
    /// the enclosing scope at the point of occurrence.
    fn scan_walrus(&mut self, line: &Line) {
        let sig = &line.sig;
        for k in 1..sig.len().saturating_sub(1) {
            let colon = &self.tokens[sig[k]];
            let eq = &self.tokens[sig[k + 1]];
            if colon.is_punct(PunctuationId::Colon)
                && is_assign_text(eq)
                && colon.span.end == eq.span.start
                && self.tokens[sig[k - 1]].kind == TokenKind::Word
            {
                self.register_variable(sig[k - 1]);
            }
        }
    }

    /// A plain statement line: detect bindings, otherwise consume silently.
    fn statement(&mut self, line: &Line, parent: NodeId) {
        let sig = &line.sig;

        // Assignment targets at the head of the line: `x = …`, `a, b = …`,
        // `x: int = …`.
        let mut targets = Vec::new();
        let mut p = 0;
        while p < sig.len() && self.tokens[sig[p]].kind == TokenKind::Word {
            targets.push(sig[p]);
            p += 1;
            if p < sig.len() && self.tokens[sig[p]].is_punct(PunctuationId::Comma) {
                p += 1;
            } else {
                break;
            }
        }
        if targets.is_empty() {
            return;
        }

        let declares = if targets.len() == 1
            && sig.get(p).is_some_and(|&ix| self.tokens[ix].is_punct(PunctuationId::Colon))
            && sig
                .get(p + 1)
                .is_none_or(|&ix| !is_assign_text(&self.tokens[ix]) || self.tokens[sig[p]].span.end != self.tokens[ix].span.start)
        {
            // Annotated: `x: int = 5` (but not a walrus, which is adjacent).
            self.top_level_assign(&sig[p + 1..]).is_some()
        } else {
            sig.get(p).is_some_and(|&ix| is_assign_text(&self.tokens[ix]))
        };

        if declares {
            let span = self.tokens[sig[0]]
                .span
                .merge(self.tokens[*sig.last().expect("INVARIANT: sig is non-empty")].span);
            let node = self.ast.add_node(parent, nodes::VARIABLE_DECLARATION, span);
            let names = targets
                .iter()
                .map(|&ix| PropValue::Str(self.tokens[ix].text.clone()))
                .collect();
            self.ast.set_prop(node, props::NAMES, PropValue::List(names));
            for &ix in &targets {
                self.register_variable(ix);
            }
        }
    }

    // ========================================================================
    // Small helpers
    // ========================================================================

    fn register_variable(&mut self, token_idx: usize) {
        let tok = &self.tokens[token_idx];
        self.symbols.register(Symbol {
            name: tok.text.clone(),
            kind: SymbolKind::Variable,
            line: tok.line,
            column: tok.column,
            scope: self.state.current_scope(),
            span: tok.span,
        });
    }

    fn register_params(&mut self, params: Vec<ParamSym>) {
        for p in params {
            self.symbols.register(Symbol {
                name: p.name,
                kind: SymbolKind::Parameter,
                line: p.line,
                column: p.column,
                scope: self.state.current_scope(),
                span: p.span,
            });
        }
    }

    fn apply_decorators(&mut self, node: NodeId, decorators: &[(String, Span)]) {
        if decorators.is_empty() {
            return;
        }
        let list = decorators
            .iter()
            .map(|(name, _)| PropValue::Str(name.clone()))
            .collect();
        self.ast.set_prop(node, props::DECORATORS, PropValue::List(list));
        let span = self.ast.node(node).span;
        let merged = decorators.iter().fold(span, |acc, (_, s)| acc.merge(*s));
        self.ast.node_mut(node).span = merged;
    }

    fn flush_decorators(&mut self, parent: NodeId, pending: &mut Vec<(String, Span)>) {
        if let Some((_, span)) = pending.first() {
            self.error_node(parent, *span, "decorator is not attached to a definition");
        }
        pending.clear();
    }

    fn error_node(&mut self, parent: NodeId, span: Span, reason: &str) {
        let node = self.ast.add_node(parent, nodes::ERROR, span);
        self.ast.set_prop(node, props::REASON, reason);
        self.state
            .warn(crate::diagnostics::ParseWarning::unexpected_token(reason, span));
    }

    fn set_body_span(&mut self, node: NodeId, body_span: Span) {
        let mut map = BTreeMap::new();
        map.insert("start".to_string(), PropValue::Int(body_span.start as i64));
        map.insert("end".to_string(), PropValue::Int(body_span.end as i64));
        self.ast.set_prop(node, props::BODY, PropValue::Map(map));
        let merged = self.ast.node(node).span.merge(body_span);
        self.ast.node_mut(node).span = merged;
    }

    fn sig_word(&self, line: &Line, n: usize) -> Option<&str> {
        let &ix = line.sig.get(n)?;
        let tok = &self.tokens[ix];
        (tok.kind == TokenKind::Word).then_some(tok.text.as_str())
    }

    fn ends_with_colon(&self, line: &Line) -> bool {
        line.sig
            .last()
            .is_some_and(|&ix| self.tokens[ix].is_punct(PunctuationId::Colon))
    }

    /// First colon at bracket depth zero within a significant-token list.
    fn top_level_colon(&self, sig: &[usize]) -> Option<usize> {
        let mut depth = 0usize;
        for (k, &ix) in sig.iter().enumerate() {
            if let Some(p) = self.tokens[ix].punct_id() {
                if punctuation::is_opener(p) {
                    depth += 1;
                } else if punctuation::is_closer(p) {
                    depth = depth.saturating_sub(1);
                } else if p == PunctuationId::Colon && depth == 0 {
                    return Some(k);
                }
            }
        }
        None
    }

    /// First `=` assignment text at bracket depth zero.
    fn top_level_assign(&self, sig: &[usize]) -> Option<usize> {
        let mut depth = 0usize;
        for (k, &ix) in sig.iter().enumerate() {
            let tok = &self.tokens[ix];
            if let Some(p) = tok.punct_id() {
                if punctuation::is_opener(p) {
                    depth += 1;
                } else if punctuation::is_closer(p) {
                    depth = depth.saturating_sub(1);
                }
            } else if depth == 0 && is_assign_text(tok) {
                return Some(k);
            }
        }
        None
    }

    /// Dotted decorator name: `@app.route(...)` → `app.route`.
    fn decorator_name(&self, sig: &[usize]) -> Option<String> {
        let mut name = String::new();
        let mut k = 1;
        loop {
            let &ix = sig.get(k)?;
            let tok = &self.tokens[ix];
            if tok.kind != TokenKind::Word {
                return None;
            }
            name.push_str(&tok.text);
            match sig.get(k + 1).map(|&ix| &self.tokens[ix]) {
                Some(t) if t.kind == TokenKind::Text && t.text == "." => {
                    name.push('.');
                    k += 2;
                }
                _ => break,
            }
        }
        Some(name)
    }

    /// Comma-split entries of the delimited group opening at `sig[open_pos]`.
    fn split_delimited(&self, sig: &[usize], open_pos: usize) -> Vec<Vec<usize>> {
        let mut entries = Vec::new();
        let mut entry = Vec::new();
        let mut depth = 0usize;
        for &ix in &sig[open_pos..] {
            let tok = &self.tokens[ix];
            if let Some(p) = tok.punct_id() {
                if punctuation::is_opener(p) {
                    depth += 1;
                    if depth == 1 {
                        continue; // the group's own opener
                    }
                } else if punctuation::is_closer(p) {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                } else if p == PunctuationId::Comma && depth == 1 {
                    entries.push(std::mem::take(&mut entry));
                    continue;
                }
            }
            if depth >= 1 {
                entry.push(ix);
            }
        }
        if !entry.is_empty() {
            entries.push(entry);
        }
        entries
    }

    /// Parameter list of a `def`: property maps plus pending symbols.
    fn parse_params(&self, sig: &[usize], open_pos: usize) -> (Vec<PropValue>, Vec<ParamSym>) {
        let mut prop_list = Vec::new();
        let mut syms = Vec::new();
        if !sig
            .get(open_pos)
            .is_some_and(|&ix| self.tokens[ix].is_punct(PunctuationId::LParen))
        {
            return (prop_list, syms);
        }
        for entry in self.split_delimited(sig, open_pos) {
            // The source extent of an entry runs to the delimiter that closed
            // it (needed because string literals never appear among the
            // significant tokens).
            let end_limit = entry
                .last()
                .and_then(|&last| {
                    let pos = sig.iter().position(|&ix| ix == last)?;
                    sig.get(pos + 1).map(|&next| self.tokens[next].span.start)
                })
                .unwrap_or_else(|| self.tokens[*sig.last().expect("INVARIANT: sig is non-empty")].span.end);
            let Some((map, sym)) = self.parse_param_entry(&entry, end_limit) else {
                continue;
            };
            prop_list.push(PropValue::Map(map));
            syms.push(sym);
        }
        (prop_list, syms)
    }

    fn parse_param_entry(
        &self,
        entry: &[usize],
        end_limit: usize,
    ) -> Option<(BTreeMap<String, PropValue>, ParamSym)> {
        let name_idx = entry
            .iter()
            .copied()
            .find(|&ix| self.tokens[ix].kind == TokenKind::Word)?;
        let name_tok = &self.tokens[name_idx];
        let mut map = BTreeMap::new();
        map.insert(
            props::NAME.to_string(),
            PropValue::Str(name_tok.text.clone()),
        );

        let name_pos = entry
            .iter()
            .position(|&ix| ix == name_idx)
            .expect("INVARIANT: name_idx came from entry");
        let rest = &entry[name_pos + 1..];

        // Annotation: `x: int`
        let mut default_from = None;
        if rest
            .first()
            .is_some_and(|&ix| self.tokens[ix].is_punct(PunctuationId::Colon))
        {
            let ty_end = rest
                .iter()
                .position(|&ix| is_assign_text(&self.tokens[ix]))
                .unwrap_or(rest.len());
            if ty_end > 1 {
                let ty = self.slice(
                    self.tokens[rest[0]].span.end,
                    self.tokens[rest[ty_end - 1]].span.end,
                );
                map.insert(props::TYPE.to_string(), PropValue::Str(ty));
            }
            default_from = Some(ty_end);
        } else if rest.first().is_some_and(|&ix| is_assign_text(&self.tokens[ix])) {
            default_from = Some(0);
        }

        // Default: `b=10` (the `=` may be fused into a longer symbol run,
        // as in `b=-1`, and the value may be a string literal, which never
        // shows up among the significant tokens).
        if let Some(eq_pos) = default_from {
            if let Some(&eq_ix) = rest.get(eq_pos) {
                let default = self.slice(self.tokens[eq_ix].span.start + 1, end_limit);
                if !default.is_empty() {
                    map.insert(props::DEFAULT.to_string(), PropValue::Str(default));
                }
            }
        }

        Some((
            map,
            ParamSym {
                name: name_tok.text.clone(),
                line: name_tok.line,
                column: name_tok.column,
                span: name_tok.span,
            },
        ))
    }

    /// Trimmed source text between two byte offsets.
    fn slice(&self, start: usize, end: usize) -> String {
        let start = start.min(self.source.len());
        let end = end.clamp(start, self.source.len());
        self.source[start..end].trim().to_string()
    }
}

/// Split a significant-token list at top-level commas.
fn split_at_commas(tokens: &[Token], sig: &[usize]) -> Vec<Vec<usize>> {
    let mut entries = Vec::new();
    let mut entry = Vec::new();
    let mut depth = 0usize;
    for &ix in sig {
        let tok = &tokens[ix];
        if let Some(p) = tok.punct_id() {
            if punctuation::is_opener(p) {
                depth += 1;
            } else if punctuation::is_closer(p) {
                depth = depth.saturating_sub(1);
            } else if p == PunctuationId::Comma && depth == 0 {
                entries.push(std::mem::take(&mut entry));
                continue;
            }
        }
        entry.push(ix);
    }
    if !entry.is_empty() {
        entries.push(entry);
    }
    entries
}

/// An assignment `=` (possibly fused with the sign of its value), but never
/// a comparison `==`.
fn is_assign_text(tok: &Token) -> bool {
    tok.kind == TokenKind::Text && tok.text.starts_with('=') && !tok.text.starts_with("==")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PropValue;

    fn parse(source: &str) -> Parse {
        PythonParser::new().parse(source)
    }

    fn prop_str<'a>(parse: &'a Parse, id: NodeId, key: &str) -> Option<&'a str> {
        match parse.ast.prop(id, key) {
            Some(PropValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    #[test]
    fn test_function_declaration_with_defaults() {
        let p = parse("def f(a, b=10):\n    return a*b\n");
        let f = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        assert_eq!(prop_str(&p, f, props::NAME), Some("f"));

        let Some(PropValue::List(params)) = p.ast.prop(f, props::PARAMS) else {
            panic!("params missing");
        };
        assert_eq!(params.len(), 2);
        let PropValue::Map(b) = &params[1] else { panic!("param shape") };
        assert_eq!(b.get(props::NAME), Some(&PropValue::Str("b".into())));
        assert_eq!(b.get(props::DEFAULT), Some(&PropValue::Str("10".into())));

        // Module scope holds exactly the one function symbol.
        let by_scope = p.symbols.get_symbols_by_scope();
        let module: Vec<_> = by_scope[&0].iter().filter(|s| s.kind == SymbolKind::Function).collect();
        assert_eq!(module.len(), 1);
        assert_eq!(module[0].name, "f");
        assert_eq!(module[0].line, 1);

        // Body span covers the return line.
        let Some(PropValue::Map(body)) = p.ast.prop(f, props::BODY) else {
            panic!("body missing");
        };
        let (Some(PropValue::Int(start)), Some(PropValue::Int(end))) = (body.get("start"), body.get("end")) else {
            panic!("body span shape");
        };
        let src = "def f(a, b=10):\n    return a*b\n";
        assert!(src[*start as usize..*end as usize].contains("return a*b"));
    }

    #[test]
    fn test_parameters_register_in_function_scope() {
        let p = parse("def f(a, b=10):\n    return a*b\n");
        let by_scope = p.symbols.get_symbols_by_scope();
        let (&scope, params) = by_scope
            .iter()
            .find(|&(&s, _)| s != 0)
            .expect("function scope exists");
        assert!(scope > 0);
        let names: Vec<_> = params.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(params.iter().all(|s| s.kind == SymbolKind::Parameter));
    }

    #[test]
    fn test_class_with_methods_and_scopes() {
        let src = "class Greeter:\n    def greet(self, name):\n        msg = name\n        return msg\n";
        let p = parse(src);
        let c = p.ast.nodes_of_type(nodes::CLASS_DECLARATION).next().unwrap();
        assert_eq!(prop_str(&p, c, props::NAME), Some("Greeter"));

        // greet is a child construct of the class node.
        let f = p.ast.children(c).iter().copied().find(|&id| {
            p.ast.node(id).node_type == nodes::FUNCTION_DECLARATION
        });
        assert!(f.is_some(), "method not nested under class");

        // Scopes: module(0) > class > function; msg lands in the function scope.
        let msg = p.symbols.symbols().iter().find(|s| s.name == "msg").unwrap();
        let greet = p.symbols.symbols().iter().find(|s| s.name == "greet").unwrap();
        assert_ne!(msg.scope, 0);
        assert_ne!(msg.scope, greet.scope);
    }

    #[test]
    fn test_decorators_attach_to_following_definition() {
        let src = "@app.route(\"/\")\n@cached\ndef index():\n    pass\n";
        let p = parse(src);
        let f = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        let Some(PropValue::List(decs)) = p.ast.prop(f, props::DECORATORS) else {
            panic!("decorators missing");
        };
        assert_eq!(
            decs,
            &vec![PropValue::Str("app.route".into()), PropValue::Str("cached".into())]
        );
    }

    #[test]
    fn test_decorators_span_blank_and_comment_lines() {
        let src = "@cached\n\n# explains the function\ndef f():\n    pass\n";
        let p = parse(src);
        let f = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        assert!(p.ast.prop(f, props::DECORATORS).is_some());
        assert_eq!(p.ast.nodes_of_type(nodes::ERROR).count(), 0);
    }

    #[test]
    fn test_stray_decorator_becomes_error_node() {
        let src = "@lonely\nx = 1\n";
        let p = parse(src);
        assert_eq!(p.ast.nodes_of_type(nodes::ERROR).count(), 1);
        assert!(p.ast.warnings.iter().any(|w| w.kind == crate::diagnostics::WarningKind::UnexpectedToken));
    }

    #[test]
    fn test_walrus_binds_in_enclosing_scope() {
        let p = parse("if (n := 10) > 5:\n    pass\n");
        let n = p.symbols.symbols().iter().find(|s| s.name == "n").unwrap();
        assert_eq!(n.kind, SymbolKind::Variable);
        assert_eq!(n.scope, 0, "walrus binds in the enclosing (module) scope");
    }

    #[test]
    fn test_annotated_assignment_is_not_a_walrus() {
        let p = parse("x: int = 5\n");
        let x = p.symbols.symbols().iter().find(|s| s.name == "x").unwrap();
        assert_eq!(x.kind, SymbolKind::Variable);
        // `int` is not registered as a binding.
        assert!(p.symbols.symbols().iter().all(|s| s.name != "int"));
    }

    #[test]
    fn test_comparison_is_not_an_assignment() {
        let p = parse("x == 5\n");
        assert!(p.symbols.is_empty());
        assert_eq!(p.ast.nodes_of_type(nodes::VARIABLE_DECLARATION).count(), 0);
    }

    #[test]
    fn test_match_case_blocks() {
        let src = "match command:\n    case \"start\":\n        go()\n    case _:\n        stop()\n";
        let p = parse(src);
        let m = p.ast.nodes_of_type(nodes::MATCH_STATEMENT).next().unwrap();
        assert_eq!(prop_str(&p, m, props::SUBJECT), Some("command"));
        let cases: Vec<_> = p
            .ast
            .children(m)
            .iter()
            .filter(|&&id| p.ast.node(id).node_type == nodes::CASE_CLAUSE)
            .collect();
        assert_eq!(cases.len(), 2);
    }

    #[test]
    fn test_match_as_identifier_is_not_a_statement() {
        let p = parse("match = 5\n");
        assert_eq!(p.ast.nodes_of_type(nodes::MATCH_STATEMENT).count(), 0);
        let m = p.symbols.symbols().iter().find(|s| s.name == "match").unwrap();
        assert_eq!(m.kind, SymbolKind::Variable);
    }

    #[test]
    fn test_metaclass_is_a_class_property() {
        let p = parse("class C(Base, metaclass=Meta):\n    pass\n");
        let c = p.ast.nodes_of_type(nodes::CLASS_DECLARATION).next().unwrap();
        assert_eq!(prop_str(&p, c, props::METACLASS), Some("Meta"));
        let Some(PropValue::List(bases)) = p.ast.prop(c, props::BASES) else {
            panic!("bases missing");
        };
        assert_eq!(bases, &vec![PropValue::Str("Base".into())]);
    }

    #[test]
    fn test_dunder_methods_are_ordinary_functions() {
        let p = parse("class C:\n    def __init__(self):\n        pass\n");
        let f = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        assert_eq!(p.ast.node(f).node_type, nodes::FUNCTION_DECLARATION);
        assert_eq!(prop_str(&p, f, props::NAME), Some("__init__"));
    }

    #[test]
    fn test_unicode_identifiers() {
        let p = parse("def приветствие(имя):\n    return имя\n");
        let f = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        assert_eq!(prop_str(&p, f, props::NAME), Some("приветствие"));
        assert!(p.symbols.symbols().iter().any(|s| s.name == "имя"));
    }

    #[test]
    fn test_imports_register_bound_names() {
        let src = "import os.path as osp\nfrom typing import List, Optional as Opt\n";
        let p = parse(src);
        let imports: Vec<_> = p
            .symbols
            .symbols()
            .iter()
            .filter(|s| s.kind == SymbolKind::Import)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(imports, vec!["osp", "List", "Opt"]);
        assert_eq!(p.ast.nodes_of_type(nodes::IMPORT_DECLARATION).count(), 2);
    }

    #[test]
    fn test_def_inside_string_is_not_a_declaration() {
        let src = "s = '''\ndef fake():\n    pass\n'''\n";
        let p = parse(src);
        assert_eq!(p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).count(), 0);
    }

    #[test]
    fn test_unterminated_string_warns_but_parses() {
        let p = parse("def f():\n    s = 'unclosed");
        assert!(
            p.ast
                .warnings
                .iter()
                .any(|w| w.kind == crate::diagnostics::WarningKind::LexicalUnterminated)
        );
        assert_eq!(p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).count(), 1);
    }

    #[test]
    fn test_missing_body_marks_unterminated() {
        let p = parse("def f():\n");
        let f = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        assert_eq!(p.ast.prop(f, props::UNTERMINATED), Some(&PropValue::Bool(true)));
    }

    #[test]
    fn test_inline_suite() {
        let p = parse("def f(): return 1\n");
        let f = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        assert!(p.ast.prop(f, props::BODY).is_some());
        assert!(p.ast.prop(f, props::UNTERMINATED).is_none());
    }

    #[test]
    fn test_for_and_with_targets_bind() {
        let src = "for i, j in pairs:\n    pass\nwith open(p) as fh:\n    pass\n";
        let p = parse(src);
        let names: Vec<_> = p
            .symbols
            .symbols()
            .iter()
            .filter(|s| s.kind == SymbolKind::Variable)
            .map(|s| s.name.as_str())
            .collect();
        assert!(names.contains(&"i"));
        assert!(names.contains(&"j"));
        assert!(names.contains(&"fh"));
    }

    #[test]
    fn test_async_def() {
        let p = parse("async def fetch(url):\n    return url\n");
        let f = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        assert_eq!(p.ast.prop(f, props::ASYNC), Some(&PropValue::Bool(true)));
        assert_eq!(prop_str(&p, f, props::NAME), Some("fetch"));
    }

    #[test]
    fn test_nested_functions_nest_in_ast() {
        let src = "def outer():\n    def inner():\n        pass\n    return inner\n";
        let p = parse(src);
        let outer = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        let inner = p
            .ast
            .children(outer)
            .iter()
            .copied()
            .find(|&id| p.ast.node(id).node_type == nodes::FUNCTION_DECLARATION);
        assert!(inner.is_some());
        // inner's symbol lives in outer's scope, not the module scope.
        let inner_sym = p.symbols.symbols().iter().find(|s| s.name == "inner").unwrap();
        assert_ne!(inner_sym.scope, 0);
    }

    #[test]
    fn test_keyword_blocks_nest() {
        let src = "def f(x):\n    if x:\n        while x:\n            x = step(x)\n    return x\n";
        let p = parse(src);
        let f = p.ast.nodes_of_type(nodes::FUNCTION_DECLARATION).next().unwrap();
        let if_block = p
            .ast
            .children(f)
            .iter()
            .copied()
            .find(|&id| p.ast.node(id).node_type == nodes::BLOCK)
            .unwrap();
        assert_eq!(prop_str(&p, if_block, props::KEYWORD), Some("if"));
        let while_block = p
            .ast
            .children(if_block)
            .iter()
            .copied()
            .find(|&id| p.ast.node(id).node_type == nodes::BLOCK)
            .unwrap();
        assert_eq!(prop_str(&p, while_block, props::KEYWORD), Some("while"));
    }

    #[test]
    fn test_malformed_def_recovers_with_error_node() {
        let src = "def (:\nx = 1\n";
        let p = parse(src);
        assert_eq!(p.ast.nodes_of_type(nodes::ERROR).count(), 1);
        // Recovery continues: the assignment after the bad line still parses.
        assert!(p.symbols.symbols().iter().any(|s| s.name == "x"));
    }
}
