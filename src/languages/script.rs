//! Shared walker for the brace-block script languages.
//!
//! JavaScript and TypeScript differ structurally only in the TypeScript-only
//! construct set (interfaces, type aliases, enums, namespaces, visibility
//! modifiers, generics), so one walker serves both; the keyword registry's
//! language tagging decides what is recognized.
//!
//! The walker scans statements left to right. Construct headers (everything
//! before a body's `{`) are prefetched with a cloned exclusion tracker so
//! lookahead never disturbs zone state; body recovery is delegated to the
//! brace block scanner, and the walker then descends into the recovered
//! member range. Anything unrecognized is consumed as expression content.

use std::collections::BTreeMap;

use crate::ast::{Ast, NodeId, PropValue};
use crate::block::brace;
use crate::config::ParserConfig;
use crate::exclusion::ExclusionTracker;
use crate::languages::Parse;
use crate::lexer;
use crate::state::{ContextFrame, ContextType, ParserState};
use crate::symbols::{Symbol, SymbolKind, SymbolTable};
use crate::token::{Span, Token, TokenKind};
use quarry_core::lang::keywords::{self, KeywordId, KeywordRole};
use quarry_core::lang::languages::{self, LanguageId};
use quarry_core::lang::nodes::{self, props};
use quarry_core::lang::profiles::{self, LexProfile};
use quarry_core::lang::punctuation::{self, PunctuationId};

/// Parse a script-language source (JavaScript or TypeScript).
pub(crate) fn parse_script(source: &str, lang: LanguageId, config: ParserConfig) -> Parse {
    let profile = profiles::profile(lang);
    let tokens = lexer::tokenize(source, profile);
    let mut walker = ScriptWalker {
        source,
        tokens: &tokens,
        state: ParserState::new(config),
        ast: Ast::new(nodes::MODULE),
        symbols: SymbolTable::new(),
        profile,
        lang,
        ts: lang == LanguageId::TypeScript,
    };
    let root = walker.ast.root();
    walker.ast.set_prop(root, props::LANGUAGE, languages::as_str(lang));
    let end = tokens.len().saturating_sub(1); // exclude Eof
    walker.parse_region(0, end, root, 0, Mode::Statements);

    let ScriptWalker {
        mut ast,
        mut state,
        symbols,
        ..
    } = walker;
    ast.warnings.append(&mut state.take_warnings());
    Parse { ast, symbols }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Statements,
    /// Inside a class body: words at member position are methods or fields.
    ClassBody,
}

/// Modifiers accumulated ahead of a construct keyword.
#[derive(Debug, Default, Clone)]
struct Mods {
    exported: bool,
    is_async: bool,
    declare: bool,
    is_abstract: bool,
    /// Member modifiers in class bodies (`static`, `get`, `private`, …).
    member: Vec<String>,
}

impl Mods {
    fn take(&mut self) -> Mods {
        std::mem::take(self)
    }
}

/// Where a construct header ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderStop {
    /// Index of the `{` opening the body.
    Body(usize),
    /// Index of the terminating `;`.
    Semi(usize),
    /// Header ended without a body; resume scanning here.
    Break(usize),
    /// Region ended.
    End(usize),
}

struct Header {
    sig: Vec<usize>,
    stop: HeaderStop,
}

struct ScriptWalker<'t> {
    source: &'t str,
    tokens: &'t [Token],
    state: ParserState,
    ast: Ast,
    symbols: SymbolTable,
    profile: &'static LexProfile,
    lang: LanguageId,
    ts: bool,
}

impl<'t> ScriptWalker<'t> {
    // ========================================================================
    // Region scanning
    // ========================================================================

    fn parse_region(&mut self, start: usize, end: usize, parent: NodeId, depth: usize, mode: Mode) {
        let mut tracker = ExclusionTracker::new(self.profile);
        let mut mods = Mods::default();
        let mut stmt_start = true;
        let mut i = start;

        while i < end {
            let tok = &self.tokens[i];
            if !tracker.observe(tok) {
                i += 1;
                continue;
            }
            match tok.kind {
                TokenKind::Whitespace | TokenKind::Eof => i += 1,
                TokenKind::Newline => {
                    stmt_start = true;
                    i += 1;
                }
                TokenKind::Punct(PunctuationId::Semicolon) => {
                    stmt_start = true;
                    mods = Mods::default();
                    i += 1;
                }
                TokenKind::Punct(PunctuationId::RBrace) => {
                    // An orphan close brace: the region's own delimiters are
                    // already excluded, so this matches nothing.
                    self.error_node(parent, tok.span, "unmatched '}'");
                    stmt_start = true;
                    mods = Mods::default();
                    i += 1;
                }
                TokenKind::Punct(PunctuationId::LBrace) => {
                    // A bare block statement; an export list or default
                    // export object (`export { a }`) is expression content.
                    let attach = if stmt_start && mode == Mode::Statements && !mods.has_any() {
                        Some(self.ast.add_node(parent, nodes::BLOCK, tok.span))
                    } else {
                        None
                    };
                    i = self.consume_braces(i, attach, depth);
                    stmt_start = true;
                    mods = Mods::default();
                }
                TokenKind::Word if stmt_start || !mods.member.is_empty() || mods.has_any() => {
                    i = self.dispatch_word(&mut tracker, i, end, parent, depth, mode, &mut mods, &mut stmt_start);
                }
                _ => {
                    stmt_start = false;
                    i += 1;
                }
            }
        }

        for w in tracker.finish() {
            self.state.warn(w);
        }
    }

    /// Handle a word at statement/member position.
    #[allow(clippy::too_many_arguments)]
    fn dispatch_word(
        &mut self,
        tracker: &mut ExclusionTracker,
        i: usize,
        end: usize,
        parent: NodeId,
        depth: usize,
        mode: Mode,
        mods: &mut Mods,
        stmt_start: &mut bool,
    ) -> usize {
        let text = self.tokens[i].text.clone();

        if mode == Mode::ClassBody {
            if self.is_member_modifier(&text)
                && self
                    .peek_sig(tracker, i + 1, end)
                    .is_some_and(|ix| self.tokens[ix].kind == TokenKind::Word)
            {
                mods.member.push(text);
                if mods.member.last().map(String::as_str) == Some("async") {
                    mods.is_async = true;
                }
                return i + 1;
            }
            return self.class_member(tracker, i, end, parent, depth, mods.take());
        }

        let Some(info) = keywords::lookup(self.lang, &text) else {
            *stmt_start = false;
            return i + 1;
        };

        match info.id {
            KeywordId::Export => {
                mods.exported = true;
                i + 1
            }
            KeywordId::Async => {
                mods.is_async = true;
                i + 1
            }
            KeywordId::Declare if self.ts => {
                mods.declare = true;
                i + 1
            }
            KeywordId::Abstract if self.ts => {
                mods.is_abstract = true;
                i + 1
            }
            KeywordId::Default => i + 1, // `export default …`
            KeywordId::Function => self.function_decl(tracker, i, end, parent, depth, mods.take()),
            KeywordId::Class => self.class_decl(tracker, i, end, parent, depth, mods.take()),
            KeywordId::Const | KeywordId::Let | KeywordId::Var => {
                // `const enum E { … }` is a TypeScript enum.
                if self.ts
                    && info.id == KeywordId::Const
                    && self
                        .peek_sig(tracker, i + 1, end)
                        .is_some_and(|ix| self.tokens[ix].is_word("enum"))
                {
                    let enum_kw = self
                        .peek_sig(tracker, i + 1, end)
                        .expect("INVARIANT: just matched");
                    self.eat(tracker, i + 1, enum_kw);
                    return self.enum_decl(tracker, enum_kw, end, parent, mods.take(), true);
                }
                self.var_decl(tracker, i, end, parent, mods.take(), &text)
            }
            KeywordId::Import => self.import_stmt(tracker, i, end, parent),
            KeywordId::Interface if self.ts => self.interface_decl(tracker, i, end, parent, mods.take()),
            KeywordId::Enum if self.ts => self.enum_decl(tracker, i, end, parent, mods.take(), false),
            KeywordId::Type if self.ts && self.looks_like_type_alias(tracker, i, end) => {
                self.type_alias(tracker, i, end, parent, mods.take())
            }
            KeywordId::Namespace | KeywordId::Module if self.ts && self.looks_like_namespace(tracker, i, end) => {
                self.namespace_decl(tracker, i, end, parent, depth, mods.take())
            }
            _ if info.role == KeywordRole::Block => {
                self.keyword_block(tracker, i, end, parent, depth, &text)
            }
            _ => {
                *stmt_start = false;
                i + 1
            }
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn function_decl(
        &mut self,
        tracker: &mut ExclusionTracker,
        i: usize,
        end: usize,
        parent: NodeId,
        depth: usize,
        mods: Mods,
    ) -> usize {
        let header = self.scan_header(tracker, i + 1, end, false);
        let sig = &header.sig;

        // `function f`, `function* gen`, or an anonymous `export default
        // function`.
        let name_idx = sig
            .iter()
            .copied()
            .take_while(|&ix| !self.tokens[ix].is_punct(PunctuationId::LParen))
            .find(|&ix| self.tokens[ix].kind == TokenKind::Word);

        let node = self
            .ast
            .add_node(parent, nodes::FUNCTION_DECLARATION, self.tokens[i].span);
        let (params, param_syms) = self.parse_params(sig);
        self.ast.set_prop(node, props::PARAMS, PropValue::List(params));
        self.apply_common_mods(node, &mods);
        if self.ts {
            self.capture_type_params(node, sig, name_idx);
        }

        if let Some(ix) = name_idx {
            let tok = &self.tokens[ix];
            self.ast.set_prop(node, props::NAME, tok.text.clone());
            self.symbols.register(Symbol {
                name: tok.text.clone(),
                kind: SymbolKind::Function,
                line: tok.line,
                column: tok.column,
                scope: self.state.current_scope(),
                span: tok.span,
            });
        }

        let name_meta = name_idx.map(|ix| self.tokens[ix].text.clone());
        self.attach_body(
            tracker,
            i,
            node,
            depth,
            header.stop,
            ContextType::Function,
            name_meta,
            param_syms,
            Mode::Statements,
            mods.declare,
        )
    }

    fn class_decl(
        &mut self,
        tracker: &mut ExclusionTracker,
        i: usize,
        end: usize,
        parent: NodeId,
        depth: usize,
        mods: Mods,
    ) -> usize {
        let header = self.scan_header(tracker, i + 1, end, false);
        let sig = &header.sig;

        let name_idx = sig
            .first()
            .copied()
            .filter(|&ix| self.tokens[ix].kind == TokenKind::Word && keywords::lookup(self.lang, &self.tokens[ix].text).is_none());

        let node = self
            .ast
            .add_node(parent, nodes::CLASS_DECLARATION, self.tokens[i].span);
        self.apply_common_mods(node, &mods);
        if mods.is_abstract {
            self.ast.set_prop(node, props::ABSTRACT, true);
        }
        if self.ts {
            self.capture_type_params(node, sig, name_idx);
        }

        if let Some(ix) = name_idx {
            let tok = &self.tokens[ix];
            self.ast.set_prop(node, props::NAME, tok.text.clone());
            self.symbols.register(Symbol {
                name: tok.text.clone(),
                kind: SymbolKind::Class,
                line: tok.line,
                column: tok.column,
                scope: self.state.current_scope(),
                span: tok.span,
            });
        }

        if let Some(pos) = sig.iter().position(|&ix| self.tokens[ix].is_word("extends")) {
            if let Some(&base) = sig.get(pos + 1) {
                if self.tokens[base].kind == TokenKind::Word {
                    self.ast
                        .set_prop(node, props::EXTENDS, self.tokens[base].text.clone());
                }
            }
        }
        if self.ts {
            if let Some(pos) = sig.iter().position(|&ix| self.tokens[ix].is_word("implements")) {
                let names: Vec<PropValue> = sig[pos + 1..]
                    .iter()
                    .filter(|&&ix| self.tokens[ix].kind == TokenKind::Word)
                    .map(|&ix| PropValue::Str(self.tokens[ix].text.clone()))
                    .collect();
                if !names.is_empty() {
                    self.ast.set_prop(node, props::IMPLEMENTS, PropValue::List(names));
                }
            }
        }

        let name_meta = name_idx.map(|ix| self.tokens[ix].text.clone());
        self.attach_body(
            tracker,
            i,
            node,
            depth,
            header.stop,
            ContextType::Class,
            name_meta,
            Vec::new(),
            Mode::ClassBody,
            mods.declare,
        )
    }

    /// A method or field inside a class body. `i` points at the name word.
    fn class_member(
        &mut self,
        tracker: &mut ExclusionTracker,
        i: usize,
        end: usize,
        parent: NodeId,
        depth: usize,
        mods: Mods,
    ) -> usize {
        let name_tok = &self.tokens[i];
        let name = name_tok.text.clone();
        let header = self.scan_header(tracker, i + 1, end, false);
        let sig = &header.sig;

        let paren_pos = sig
            .iter()
            .position(|&ix| self.tokens[ix].is_punct(PunctuationId::LParen));
        let assign_pos = sig
            .iter()
            .position(|&ix| is_assign_text(&self.tokens[ix]));
        let is_method = match (paren_pos, assign_pos) {
            (Some(p), Some(a)) => p < a,
            (Some(_), None) => true,
            _ => false,
        };

        if is_method {
            let node = self
                .ast
                .add_node(parent, nodes::METHOD_DEFINITION, name_tok.span);
            self.ast.set_prop(node, props::NAME, name.clone());
            let (params, param_syms) = self.parse_params(sig);
            self.ast.set_prop(node, props::PARAMS, PropValue::List(params));
            if mods.is_async {
                self.ast.set_prop(node, props::ASYNC, true);
            }
            if !mods.member.is_empty() {
                let list = mods.member.iter().map(|m| PropValue::Str(m.clone())).collect();
                self.ast.set_prop(node, props::MODIFIERS, PropValue::List(list));
            }
            self.symbols.register(Symbol {
                name: name.clone(),
                kind: SymbolKind::Function,
                line: name_tok.line,
                column: name_tok.column,
                scope: self.state.current_scope(),
                span: name_tok.span,
            });
            self.attach_body(
                tracker,
                i,
                node,
                depth,
                header.stop,
                ContextType::Function,
                Some(name),
                param_syms,
                Mode::Statements,
                // TS method signatures (`foo(): void;`) legitimately lack
                // bodies.
                self.ts,
            )
        } else {
            // Field: `x = 5;` or `x: T;`
            let span = name_tok.span;
            let node = self.ast.add_node(parent, nodes::VARIABLE_DECLARATION, span);
            self.ast
                .set_prop(node, props::NAMES, PropValue::List(vec![PropValue::Str(name.clone())]));
            if !mods.member.is_empty() {
                let list = mods.member.iter().map(|m| PropValue::Str(m.clone())).collect();
                self.ast.set_prop(node, props::MODIFIERS, PropValue::List(list));
            }
            self.symbols.register(Symbol {
                name,
                kind: SymbolKind::Variable,
                line: name_tok.line,
                column: name_tok.column,
                scope: self.state.current_scope(),
                span,
            });
            self.finish_statement(tracker, i, header.stop)
        }
    }

    fn var_decl(
        &mut self,
        tracker: &mut ExclusionTracker,
        i: usize,
        end: usize,
        parent: NodeId,
        mods: Mods,
        kind: &str,
    ) -> usize {
        let header = self.scan_header(tracker, i + 1, end, true);
        let sig = &header.sig;

        let node = self
            .ast
            .add_node(parent, nodes::VARIABLE_DECLARATION, self.tokens[i].span);
        self.ast.set_prop(node, props::KIND, kind);
        self.apply_common_mods(node, &mods);

        let mut names = Vec::new();
        for entry in self.split_declarators(sig) {
            for ix in self.binding_words(&entry) {
                let tok = &self.tokens[ix];
                names.push(PropValue::Str(tok.text.clone()));
                self.symbols.register(Symbol {
                    name: tok.text.clone(),
                    kind: SymbolKind::Variable,
                    line: tok.line,
                    column: tok.column,
                    scope: self.state.current_scope(),
                    span: tok.span,
                });
            }
        }
        self.ast.set_prop(node, props::NAMES, PropValue::List(names));
        self.finish_statement(tracker, i, header.stop)
    }

    /// Words bound by one declarator entry: everything before its `=`, minus
    /// property keys in destructuring patterns (`{a: b}` binds `b`, not `a`)
    /// and type-annotation text.
    fn binding_words(&self, entry: &[usize]) -> Vec<usize> {
        let eq = entry
            .iter()
            .position(|&ix| is_assign_text(&self.tokens[ix]))
            .unwrap_or(entry.len());
        let head = &entry[..eq];
        let mut out = Vec::new();
        for (k, &ix) in head.iter().enumerate() {
            let tok = &self.tokens[ix];
            if tok.kind != TokenKind::Word || keywords::lookup(self.lang, &tok.text).is_some() {
                continue;
            }
            let next_is_colon = head
                .get(k + 1)
                .is_some_and(|&nx| self.tokens[nx].is_punct(PunctuationId::Colon));
            if next_is_colon && self.in_pattern(head, k) {
                continue;
            }
            if self.is_annotation_tail(head, k) {
                continue;
            }
            out.push(ix);
        }
        out
    }

    /// Split a declarator list at its top-level commas.
    ///
    /// Unlike the generic comma split, this one knows that before a
    /// declarator's `=` the text is annotation territory, where a comma
    /// inside `<…>` (`Map<string, number>`) separates type arguments, not
    /// declarators.
    fn split_declarators(&self, sig: &[usize]) -> Vec<Vec<usize>> {
        let mut entries = Vec::new();
        let mut entry: Vec<usize> = Vec::new();
        let mut depth = 0usize;
        let mut angle = 0isize;
        let mut in_value = false;
        for &ix in sig {
            let tok = &self.tokens[ix];
            if let Some(p) = tok.punct_id() {
                if punctuation::is_opener(p) {
                    depth += 1;
                } else if punctuation::is_closer(p) {
                    depth = depth.saturating_sub(1);
                } else if p == PunctuationId::Comma && depth == 0 && (in_value || angle <= 0) {
                    entries.push(std::mem::take(&mut entry));
                    in_value = false;
                    angle = 0;
                    continue;
                }
            } else if tok.kind == TokenKind::Text {
                if is_assign_text(tok) && depth == 0 {
                    in_value = true;
                } else if self.ts && !in_value {
                    angle += tok.text.matches('<').count() as isize;
                    angle -= tok.text.matches('>').count() as isize;
                    angle = angle.max(0);
                }
            }
            entry.push(ix);
        }
        if !entry.is_empty() {
            entries.push(entry);
        }
        entries
    }

    /// Loop-head bindings: `for (const x of items)` binds `x` in the
    /// enclosing scope (block scoping is deliberately flattened).
    fn register_loop_bindings(&mut self, sig: &[usize]) {
        let Some(kw_pos) = sig.iter().position(|&ix| {
            matches!(
                keywords::lookup(self.lang, &self.tokens[ix].text).map(|k| k.id),
                Some(KeywordId::Const) | Some(KeywordId::Let) | Some(KeywordId::Var)
            )
        }) else {
            return;
        };
        for &ix in &sig[kw_pos + 1..] {
            let tok = &self.tokens[ix];
            if is_assign_text(tok)
                || tok.is_word("of")
                || tok.is_word("in")
                || tok.is_punct(PunctuationId::Semicolon)
            {
                break;
            }
            if tok.kind == TokenKind::Word && keywords::lookup(self.lang, &tok.text).is_none() {
                self.symbols.register(Symbol {
                    name: tok.text.clone(),
                    kind: SymbolKind::Variable,
                    line: tok.line,
                    column: tok.column,
                    scope: self.state.current_scope(),
                    span: tok.span,
                });
            }
        }
    }

    /// Whether entry position `k` sits inside a destructuring pattern
    /// (braces/brackets opened earlier in the entry).
    fn in_pattern(&self, entry: &[usize], k: usize) -> bool {
        let mut depth = 0isize;
        for &ix in &entry[..k] {
            if let Some(p) = self.tokens[ix].punct_id() {
                if punctuation::is_opener(p) {
                    depth += 1;
                } else if punctuation::is_closer(p) {
                    depth -= 1;
                }
            }
        }
        depth > 0
    }

    /// Whether entry position `k` is part of a type annotation (follows a
    /// top-level `:` in the entry), as in `x: Map<string, number>`.
    fn is_annotation_tail(&self, entry: &[usize], k: usize) -> bool {
        if !self.ts {
            return false;
        }
        let mut depth = 0usize;
        for &ix in &entry[..k] {
            if let Some(p) = self.tokens[ix].punct_id() {
                if punctuation::is_opener(p) {
                    depth += 1;
                } else if punctuation::is_closer(p) {
                    depth = depth.saturating_sub(1);
                } else if p == PunctuationId::Colon && depth == 0 {
                    return true;
                }
            }
        }
        false
    }

    fn import_stmt(&mut self, tracker: &mut ExclusionTracker, i: usize, end: usize, parent: NodeId) -> usize {
        let header = self.scan_header(tracker, i + 1, end, true);
        let sig: Vec<usize> = header
            .sig
            .iter()
            .copied()
            // `import type { … }` is a type-only import in TS.
            .skip_while(|&ix| self.ts && self.tokens[ix].is_word("type"))
            .collect();

        let span = self.tokens[i].span;
        let node = self.ast.add_node(parent, nodes::IMPORT_DECLARATION, span);
        let mut names = Vec::new();

        let from_pos = sig.iter().position(|&ix| self.tokens[ix].is_word("from"));
        let binding_sig = &sig[..from_pos.unwrap_or(sig.len())];

        let mut k = 0;
        while k < binding_sig.len() {
            let ix = binding_sig[k];
            let tok = &self.tokens[ix];
            match tok.kind {
                // Default import: `import X from …`
                TokenKind::Word if !tok.is_word("as") => {
                    self.bind_import(ix, &mut names);
                    k += 1;
                }
                // Namespace import: `* as ns`
                TokenKind::Text if tok.text == "*" => {
                    if binding_sig
                        .get(k + 1)
                        .is_some_and(|&nx| self.tokens[nx].is_word("as"))
                    {
                        if let Some(&ns) = binding_sig.get(k + 2) {
                            self.bind_import(ns, &mut names);
                        }
                        k += 3;
                    } else {
                        k += 1;
                    }
                }
                // Named imports: `{ a, b as c }`
                TokenKind::Punct(PunctuationId::LBrace) => {
                    let close = binding_sig[k..]
                        .iter()
                        .position(|&ix| self.tokens[ix].is_punct(PunctuationId::RBrace))
                        .map(|p| k + p)
                        .unwrap_or(binding_sig.len());
                    for entry in split_at_commas(self.tokens, &binding_sig[k + 1..close]) {
                        let bound = entry
                            .iter()
                            .position(|&ix| self.tokens[ix].is_word("as"))
                            .and_then(|p| entry.get(p + 1).copied())
                            .or_else(|| entry.first().copied());
                        if let Some(bx) = bound {
                            if self.tokens[bx].kind == TokenKind::Word {
                                self.bind_import(bx, &mut names);
                            }
                        }
                    }
                    k = close + 1;
                }
                _ => k += 1,
            }
        }

        // Module source: the string after `from` (or after `import` for a
        // bare side-effect import). String tokens are exclusion-inert, so
        // slice the source text.
        let src_start = match from_pos {
            Some(p) => self.tokens[sig[p]].span.end,
            None if names.is_empty() => self.tokens[i].span.end,
            None => self.tokens[i].span.end.max(
                sig.last()
                    .map(|&ix| self.tokens[ix].span.end)
                    .unwrap_or(self.tokens[i].span.end),
            ),
        };
        let src_end = match header.stop {
            HeaderStop::Semi(s) | HeaderStop::Body(s) | HeaderStop::Break(s) | HeaderStop::End(s) => {
                self.tokens.get(s).map(|t| t.span.start).unwrap_or(self.source.len())
            }
        };
        let module = self.slice(src_start, src_end);
        let module = module.trim_matches(|c| c == '"' || c == '\'' || c == '`' || c == ';').trim();
        if !module.is_empty() {
            self.ast.set_prop(node, props::SOURCE, module.to_string());
        }
        self.ast.set_prop(node, props::NAMES, PropValue::List(names));

        self.finish_statement(tracker, i, header.stop)
    }

    fn bind_import(&mut self, ix: usize, names: &mut Vec<PropValue>) {
        let tok = &self.tokens[ix];
        if tok.kind != TokenKind::Word || keywords::lookup(self.lang, &tok.text).is_some() {
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
    // TypeScript-only declarations
    // ========================================================================

    fn interface_decl(
        &mut self,
        tracker: &mut ExclusionTracker,
        i: usize,
        end: usize,
        parent: NodeId,
        mods: Mods,
    ) -> usize {
        let header = self.scan_header(tracker, i + 1, end, false);
        let sig = &header.sig;
        let name_idx = sig
            .first()
            .copied()
            .filter(|&ix| self.tokens[ix].kind == TokenKind::Word);

        let node = self
            .ast
            .add_node(parent, nodes::INTERFACE_DECLARATION, self.tokens[i].span);
        self.apply_common_mods(node, &mods);
        if self.ts {
            self.capture_type_params(node, sig, name_idx);
        }
        if let Some(ix) = name_idx {
            let tok = &self.tokens[ix];
            self.ast.set_prop(node, props::NAME, tok.text.clone());
            self.symbols.register(Symbol {
                name: tok.text.clone(),
                kind: SymbolKind::Interface,
                line: tok.line,
                column: tok.column,
                scope: self.state.current_scope(),
                span: tok.span,
            });
        }
        if let Some(pos) = sig.iter().position(|&ix| self.tokens[ix].is_word("extends")) {
            let bases: Vec<PropValue> = sig[pos + 1..]
                .iter()
                .filter(|&&ix| self.tokens[ix].kind == TokenKind::Word)
                .map(|&ix| PropValue::Str(self.tokens[ix].text.clone()))
                .collect();
            if !bases.is_empty() {
                self.ast.set_prop(node, props::EXTENDS, PropValue::List(bases));
            }
        }

        // Interface bodies hold signatures, not statements; recover the
        // block for its extent but do not descend.
        match header.stop {
            HeaderStop::Body(open) => {
                self.eat(tracker, i + 1, open);
                match brace::parse_block(
                    self.tokens,
                    open,
                    &mut self.state,
                    ContextType::Class,
                    BTreeMap::new(),
                    self.profile,
                ) {
                    Ok(outcome) => {
                        if outcome.unterminated {
                            self.ast.set_prop(node, props::UNTERMINATED, true);
                        }
                        self.extend_span(node, &outcome.members);
                        outcome.next_index
                    }
                    Err(_) => open + 1,
                }
            }
            stop => {
                self.ast.set_prop(node, props::UNTERMINATED, true);
                self.finish_statement(tracker, i, stop)
            }
        }
    }

    fn type_alias(
        &mut self,
        tracker: &mut ExclusionTracker,
        i: usize,
        end: usize,
        parent: NodeId,
        mods: Mods,
    ) -> usize {
        let header = self.scan_header(tracker, i + 1, end, true);
        let node = self
            .ast
            .add_node(parent, nodes::TYPE_ALIAS_DECLARATION, self.tokens[i].span);
        self.apply_common_mods(node, &mods);
        let name_idx = header
            .sig
            .first()
            .copied()
            .filter(|&ix| self.tokens[ix].kind == TokenKind::Word);
        self.capture_type_params(node, &header.sig, name_idx);
        if let Some(ix) = name_idx {
            let tok = &self.tokens[ix];
            self.ast.set_prop(node, props::NAME, tok.text.clone());
            self.symbols.register(Symbol {
                name: tok.text.clone(),
                kind: SymbolKind::TypeAlias,
                line: tok.line,
                column: tok.column,
                scope: self.state.current_scope(),
                span: tok.span,
            });
        }
        self.finish_statement(tracker, i, header.stop)
    }

    fn enum_decl(
        &mut self,
        tracker: &mut ExclusionTracker,
        i: usize,
        end: usize,
        parent: NodeId,
        mods: Mods,
        const_enum: bool,
    ) -> usize {
        let header = self.scan_header(tracker, i + 1, end, false);
        let node = self
            .ast
            .add_node(parent, nodes::ENUM_DECLARATION, self.tokens[i].span);
        self.apply_common_mods(node, &mods);
        if const_enum {
            self.ast.set_prop(node, props::CONST, true);
        }
        if let Some(&ix) = header.sig.first().filter(|&&ix| self.tokens[ix].kind == TokenKind::Word) {
            let tok = &self.tokens[ix];
            self.ast.set_prop(node, props::NAME, tok.text.clone());
            self.symbols.register(Symbol {
                name: tok.text.clone(),
                kind: SymbolKind::Enum,
                line: tok.line,
                column: tok.column,
                scope: self.state.current_scope(),
                span: tok.span,
            });
        }

        match header.stop {
            HeaderStop::Body(open) => {
                self.eat(tracker, i + 1, open);
                match brace::parse_block(
                    self.tokens,
                    open,
                    &mut self.state,
                    ContextType::Block,
                    BTreeMap::new(),
                    self.profile,
                ) {
                    Ok(outcome) => {
                        if outcome.unterminated {
                            self.ast.set_prop(node, props::UNTERMINATED, true);
                        }
                        // Variant names: the first word of each
                        // comma-separated member. Commas inside string
                        // initializers must not split, so keep only
                        // significant tokens.
                        let mut scan = ExclusionTracker::new(self.profile);
                        scan.observe(&self.tokens[open]);
                        let sig_members: Vec<usize> = outcome
                            .members
                            .iter()
                            .copied()
                            .filter(|&ix| scan.observe(&self.tokens[ix]) && !self.tokens[ix].is_layout())
                            .collect();
                        let members: Vec<PropValue> = split_at_commas(self.tokens, &sig_members)
                            .iter()
                            .filter_map(|entry| {
                                entry
                                    .iter()
                                    .find(|&&ix| self.tokens[ix].kind == TokenKind::Word)
                                    .map(|&ix| PropValue::Str(self.tokens[ix].text.clone()))
                            })
                            .collect();
                        if !members.is_empty() {
                            self.ast.set_prop(node, props::MEMBERS, PropValue::List(members));
                        }
                        self.extend_span(node, &outcome.members);
                        outcome.next_index
                    }
                    Err(_) => open + 1,
                }
            }
            stop => {
                self.ast.set_prop(node, props::UNTERMINATED, true);
                self.finish_statement(tracker, i, stop)
            }
        }
    }

    fn namespace_decl(
        &mut self,
        tracker: &mut ExclusionTracker,
        i: usize,
        end: usize,
        parent: NodeId,
        depth: usize,
        mods: Mods,
    ) -> usize {
        let header = self.scan_header(tracker, i + 1, end, false);
        let node = self
            .ast
            .add_node(parent, nodes::NAMESPACE_DECLARATION, self.tokens[i].span);
        self.apply_common_mods(node, &mods);

        // Dotted names (`namespace A.B`) are one declaration.
        let name_end = header
            .sig
            .iter()
            .copied()
            .take_while(|&ix| {
                let t = &self.tokens[ix];
                t.kind == TokenKind::Word || (t.kind == TokenKind::Text && t.text == ".")
            })
            .last();
        let name_meta = if let (Some(&first), Some(last)) = (header.sig.first(), name_end) {
            let name = self.slice(self.tokens[first].span.start, self.tokens[last].span.end);
            let tok = &self.tokens[first];
            self.ast.set_prop(node, props::NAME, name.clone());
            self.symbols.register(Symbol {
                name: name.clone(),
                kind: SymbolKind::Namespace,
                line: tok.line,
                column: tok.column,
                scope: self.state.current_scope(),
                span: tok.span,
            });
            Some(name)
        } else {
            None
        };

        self.attach_body(
            tracker,
            i,
            node,
            depth,
            header.stop,
            ContextType::Namespace,
            name_meta,
            Vec::new(),
            Mode::Statements,
            mods.declare,
        )
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    fn keyword_block(
        &mut self,
        tracker: &mut ExclusionTracker,
        i: usize,
        end: usize,
        parent: NodeId,
        depth: usize,
        keyword: &str,
    ) -> usize {
        // `else if` reads as one clause.
        let keyword = if keyword == "else"
            && self
                .peek_sig(tracker, i + 1, end)
                .is_some_and(|ix| self.tokens[ix].is_word("if"))
        {
            "else if".to_string()
        } else {
            keyword.to_string()
        };

        let header = self.scan_header(tracker, i + 1, end, false);
        if keyword == "for" {
            self.register_loop_bindings(&header.sig);
        }
        match header.stop {
            HeaderStop::Body(open) => {
                let node = self.ast.add_node(parent, nodes::BLOCK, self.tokens[i].span);
                self.ast.set_prop(node, props::KEYWORD, keyword.clone());
                let mut metadata = BTreeMap::new();
                metadata.insert(props::KEYWORD.to_string(), PropValue::Str(keyword));
                self.eat(tracker, i + 1, open);
                match brace::parse_block(
                    self.tokens,
                    open,
                    &mut self.state,
                    ContextType::Block,
                    metadata,
                    self.profile,
                ) {
                    Ok(outcome) => {
                        if outcome.unterminated {
                            self.ast.set_prop(node, props::UNTERMINATED, true);
                        }
                        self.extend_span(node, &outcome.members);
                        if let (Some(&first), Some(&last)) =
                            (outcome.members.first(), outcome.members.last())
                        {
                            if depth < self.state.config().max_block_depth {
                                self.state.push(ContextFrame::new(ContextType::Block, open));
                                self.parse_region(first, last + 1, node, depth + 1, Mode::Statements);
                                self.state.pop();
                            }
                        }
                        outcome.next_index
                    }
                    Err(_) => open + 1,
                }
            }
            // Braceless (`if (x) return;`) or `do … while (x);` tails:
            // no block construct to recover.
            stop => self.finish_statement(tracker, i, stop),
        }
    }

    /// Recover and descend into a `{ … }` body according to the header stop.
    #[allow(clippy::too_many_arguments)]
    fn attach_body(
        &mut self,
        tracker: &mut ExclusionTracker,
        i: usize,
        node: NodeId,
        depth: usize,
        stop: HeaderStop,
        ctx: ContextType,
        name: Option<String>,
        params: Vec<ParamSym>,
        mode: Mode,
        body_optional: bool,
    ) -> usize {
        let HeaderStop::Body(open) = stop else {
            if !body_optional {
                self.ast.set_prop(node, props::UNTERMINATED, true);
            }
            return self.finish_statement(tracker, i, stop);
        };

        let mut metadata = BTreeMap::new();
        if let Some(name) = &name {
            metadata.insert(props::NAME.to_string(), PropValue::Str(name.clone()));
        }
        self.eat(tracker, i + 1, open);
        match brace::parse_block(self.tokens, open, &mut self.state, ctx, metadata, self.profile) {
            Ok(outcome) => {
                if outcome.unterminated {
                    self.ast.set_prop(node, props::UNTERMINATED, true);
                }
                self.extend_span(node, &outcome.members);
                if let (Some(&first), Some(&last)) = (outcome.members.first(), outcome.members.last()) {
                    if depth < self.state.config().max_block_depth {
                        self.state.push(ContextFrame::new(ctx, open));
                        if ctx.opens_scope() {
                            let _scope = self.state.enter_scope(ctx);
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
                            self.parse_region(first, last + 1, node, depth + 1, mode);
                            self.state.exit_scope();
                        } else {
                            self.parse_region(first, last + 1, node, depth + 1, mode);
                        }
                        self.state.pop();
                    }
                }
                outcome.next_index
            }
            Err(err) => {
                tracing::error!(?err, "brace scanner rejected a header body index");
                open + 1
            }
        }
    }

    /// Consume a balanced brace group found mid-scan. With `attach`, the
    /// group is a bare block statement and gets descended into; without, it
    /// is expression content (an object literal): consumed, with its
    /// lexical warnings still collected.
    fn consume_braces(&mut self, open: usize, attach: Option<NodeId>, depth: usize) -> usize {
        match brace::parse_block(
            self.tokens,
            open,
            &mut self.state,
            ContextType::Block,
            BTreeMap::new(),
            self.profile,
        ) {
            Ok(outcome) => {
                if let Some(node) = attach {
                    if outcome.unterminated {
                        self.ast.set_prop(node, props::UNTERMINATED, true);
                    }
                    self.extend_span(node, &outcome.members);
                    if let (Some(&first), Some(&last)) = (outcome.members.first(), outcome.members.last()) {
                        if depth < self.state.config().max_block_depth {
                            self.state.push(ContextFrame::new(ContextType::Block, open));
                            self.parse_region(first, last + 1, node, depth + 1, Mode::Statements);
                            self.state.pop();
                        }
                    }
                } else {
                    let mut scan = ExclusionTracker::new(self.profile);
                    scan.observe(&self.tokens[open]);
                    for &ix in &outcome.members {
                        scan.observe(&self.tokens[ix]);
                    }
                    for w in scan.finish() {
                        self.state.warn(w);
                    }
                }
                outcome.next_index
            }
            Err(_) => open + 1,
        }
    }

    // ========================================================================
    // Header scanning
    // ========================================================================

    /// Collect the significant tokens of a construct header with a cloned
    /// tracker (real zone state is untouched).
    ///
    /// In body mode the scan stops at the first `{` at depth zero; a newline
    /// at depth zero ends the header unless the next significant token is
    /// that `{` (Allman-style bodies). In statement mode braces are ordinary
    /// openers and the scan stops at `;` or at a newline that does not
    /// follow a continuation token (`=`, `,`, …).
    fn scan_header(&self, base: &ExclusionTracker, from: usize, end: usize, statement_mode: bool) -> Header {
        let mut tracker = base.clone();
        let mut sig: Vec<usize> = Vec::new();
        let mut depth = 0usize;
        let mut pending_newline: Option<usize> = None;

        let mut i = from;
        while i < end {
            let tok = &self.tokens[i];
            let significant = tracker.observe(tok);
            if !significant {
                i += 1;
                continue;
            }
            match tok.kind {
                TokenKind::Whitespace | TokenKind::Eof => {}
                TokenKind::Newline => {
                    if depth == 0 {
                        let continues = sig.last().is_some_and(|&ix| {
                            let t = &self.tokens[ix];
                            t.kind == TokenKind::Text
                                || t.is_punct(PunctuationId::Comma)
                                || t.is_punct(PunctuationId::Colon)
                        });
                        if statement_mode && !continues {
                            return Header {
                                sig,
                                stop: HeaderStop::Break(i + 1),
                            };
                        }
                        if !statement_mode && pending_newline.is_none() {
                            pending_newline = Some(i + 1);
                        }
                    }
                }
                _ => {
                    if let Some(resume) = pending_newline {
                        if !(depth == 0 && tok.is_punct(PunctuationId::LBrace)) {
                            return Header {
                                sig,
                                stop: HeaderStop::Break(resume),
                            };
                        }
                    }
                    if let Some(p) = tok.punct_id() {
                        if depth == 0 {
                            match p {
                                PunctuationId::LBrace if !statement_mode => {
                                    return Header {
                                        sig,
                                        stop: HeaderStop::Body(i),
                                    };
                                }
                                PunctuationId::Semicolon => {
                                    return Header {
                                        sig,
                                        stop: HeaderStop::Semi(i),
                                    };
                                }
                                PunctuationId::RBrace => {
                                    return Header {
                                        sig,
                                        stop: HeaderStop::Break(i),
                                    };
                                }
                                _ => {}
                            }
                        }
                        if punctuation::is_opener(p) {
                            depth += 1;
                        } else if punctuation::is_closer(p) {
                            depth = depth.saturating_sub(1);
                        }
                    }
                    sig.push(i);
                }
            }
            i += 1;
        }
        Header {
            sig,
            stop: HeaderStop::End(end),
        }
    }

    /// The next significant non-layout token at or after `from`.
    fn peek_sig(&self, base: &ExclusionTracker, from: usize, end: usize) -> Option<usize> {
        let mut tracker = base.clone();
        for i in from..end {
            let tok = &self.tokens[i];
            if tracker.observe(tok) && !tok.is_layout() && !matches!(tok.kind, TokenKind::Eof) {
                return Some(i);
            }
        }
        None
    }

    // ========================================================================
    // Small helpers
    // ========================================================================

    /// Advance the real tracker across `[from, to)`.
    fn eat(&mut self, tracker: &mut ExclusionTracker, from: usize, to: usize) {
        for k in from..to.min(self.tokens.len()) {
            tracker.observe(&self.tokens[k]);
        }
    }

    /// Consume a bodyless statement according to its header stop.
    fn finish_statement(&mut self, tracker: &mut ExclusionTracker, i: usize, stop: HeaderStop) -> usize {
        match stop {
            HeaderStop::Semi(s) => {
                self.eat(tracker, i + 1, s + 1);
                s + 1
            }
            HeaderStop::Body(b) => {
                self.eat(tracker, i + 1, b);
                b
            }
            HeaderStop::Break(b) | HeaderStop::End(b) => {
                self.eat(tracker, i + 1, b);
                b
            }
        }
    }

    fn apply_common_mods(&mut self, node: NodeId, mods: &Mods) {
        if mods.exported {
            self.ast.set_prop(node, props::EXPORTED, true);
        }
        if mods.is_async {
            self.ast.set_prop(node, props::ASYNC, true);
        }
        if mods.declare {
            self.ast.set_prop(node, props::DECLARE, true);
        }
    }

    /// Generic type parameters: the `<…>` run right after the name.
    fn capture_type_params(&mut self, node: NodeId, sig: &[usize], name_idx: Option<usize>) {
        let Some(name_ix) = name_idx else { return };
        let Some(pos) = sig.iter().position(|&ix| ix == name_ix) else {
            return;
        };
        let Some(&first) = sig.get(pos + 1) else { return };
        let first_tok = &self.tokens[first];
        if first_tok.kind != TokenKind::Text || !first_tok.text.starts_with('<') {
            return;
        }
        let mut balance = 0isize;
        let mut last = first;
        for &ix in &sig[pos + 1..] {
            let tok = &self.tokens[ix];
            if tok.kind == TokenKind::Text {
                balance += tok.text.matches('<').count() as isize;
                balance -= tok.text.matches('>').count() as isize;
            }
            last = ix;
            if balance <= 0 {
                break;
            }
        }
        let raw = self.slice(self.tokens[first].span.start, self.tokens[last].span.end);
        let inner = raw
            .strip_prefix('<')
            .unwrap_or(&raw)
            .strip_suffix('>')
            .unwrap_or(&raw)
            .trim()
            .to_string();
        if !inner.is_empty() {
            self.ast.set_prop(node, props::TYPE_PARAMS, inner);
        }
    }

    /// Parameter list from a header's significant tokens.
    fn parse_params(&self, sig: &[usize]) -> (Vec<PropValue>, Vec<ParamSym>) {
        let mut prop_list = Vec::new();
        let mut syms = Vec::new();
        let Some(open) = sig
            .iter()
            .position(|&ix| self.tokens[ix].is_punct(PunctuationId::LParen))
        else {
            return (prop_list, syms);
        };

        let mut depth = 0usize;
        let mut entry: Vec<usize> = Vec::new();
        let mut entries: Vec<Vec<usize>> = Vec::new();
        for &ix in &sig[open..] {
            let tok = &self.tokens[ix];
            if let Some(p) = tok.punct_id() {
                if punctuation::is_opener(p) {
                    depth += 1;
                    if depth == 1 {
                        continue;
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

        for entry in entries {
            let Some(&name_ix) = entry
                .iter()
                .find(|&&ix| self.tokens[ix].kind == TokenKind::Word)
            else {
                continue;
            };
            let tok = &self.tokens[name_ix];
            let mut map = BTreeMap::new();
            map.insert(props::NAME.to_string(), PropValue::Str(tok.text.clone()));
            if let Some(eq_pos) = entry.iter().position(|&ix| is_assign_text(&self.tokens[ix])) {
                let eq = &self.tokens[entry[eq_pos]];
                let end = self.tokens[*entry.last().expect("INVARIANT: entry is non-empty")].span.end;
                let default = self.slice(eq.span.start + 1, end);
                if !default.is_empty() {
                    map.insert(props::DEFAULT.to_string(), PropValue::Str(default));
                }
            }
            prop_list.push(PropValue::Map(map));
            syms.push(ParamSym {
                name: tok.text.clone(),
                line: tok.line,
                column: tok.column,
                span: tok.span,
            });
        }
        (prop_list, syms)
    }

    fn is_member_modifier(&self, text: &str) -> bool {
        matches!(text, "static" | "get" | "set" | "async")
            || (self.ts
                && matches!(
                    text,
                    "public" | "private" | "protected" | "readonly" | "abstract" | "override" | "declare"
                ))
    }

    fn looks_like_type_alias(&self, tracker: &ExclusionTracker, i: usize, end: usize) -> bool {
        let Some(name) = self.peek_sig(tracker, i + 1, end) else {
            return false;
        };
        if self.tokens[name].kind != TokenKind::Word {
            return false;
        }
        self.peek_sig(tracker, name + 1, end).is_some_and(|ix| {
            let t = &self.tokens[ix];
            t.kind == TokenKind::Text && (t.text.starts_with('=') || t.text.starts_with('<'))
        })
    }

    fn looks_like_namespace(&self, tracker: &ExclusionTracker, i: usize, end: usize) -> bool {
        self.peek_sig(tracker, i + 1, end)
            .is_some_and(|ix| self.tokens[ix].kind == TokenKind::Word)
    }

    fn extend_span(&mut self, node: NodeId, members: &[usize]) {
        if let (Some(&first), Some(&last)) = (members.first(), members.last()) {
            let body = self.tokens[first].span.merge(self.tokens[last].span);
            let mut map = BTreeMap::new();
            map.insert("start".to_string(), PropValue::Int(body.start as i64));
            map.insert("end".to_string(), PropValue::Int(body.end as i64));
            self.ast.set_prop(node, props::BODY, PropValue::Map(map));
            let merged = self.ast.node(node).span.merge(body);
            self.ast.node_mut(node).span = merged;
        }
    }

    fn error_node(&mut self, parent: NodeId, span: Span, reason: &str) {
        let node = self.ast.add_node(parent, nodes::ERROR, span);
        self.ast.set_prop(node, props::REASON, reason);
        self.state
            .warn(crate::diagnostics::ParseWarning::unexpected_token(reason, span));
    }

    /// Trimmed source text between two byte offsets.
    fn slice(&self, start: usize, end: usize) -> String {
        let start = start.min(self.source.len());
        let end = end.clamp(start, self.source.len());
        self.source[start..end].trim().to_string()
    }
}

struct ParamSym {
    name: String,
    line: u32,
    column: u32,
    span: Span,
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
/// `==`, `=>`, or a comparison.
fn is_assign_text(tok: &Token) -> bool {
    tok.kind == TokenKind::Text
        && tok.text.starts_with('=')
        && !tok.text.starts_with("==")
        && !tok.text.starts_with("=>")
}

impl Mods {
    fn has_any(&self) -> bool {
        self.exported || self.is_async || self.declare || self.is_abstract
    }
}
