//! Construct-introducing keyword registry.
//!
//! This module records, per supported language, the words that introduce a
//! declaration, open a block, or modify the construct that follows. The
//! language parsers drive their recognition loops off this table instead of
//! hard-coding spellings.
//!
//! ## Notes
//! - Lookup via [`lookup`] is **case-sensitive** and scoped to one language;
//!   `interface` resolves for TypeScript but not for JavaScript or Python.
//! - Soft keywords (`match`/`case` in Python, `type`/`namespace` in
//!   TypeScript) are listed here too; the parsers apply their contextual
//!   rules on top of this vocabulary.
//!
//! ## Examples
//! ```rust
//! use quarry_core::lang::keywords::{self, KeywordId, KeywordRole};
//! use quarry_core::lang::languages::LanguageId;
//!
//! let kw = keywords::lookup(LanguageId::Python, "def").unwrap();
//! assert_eq!(kw.id, KeywordId::Def);
//! assert_eq!(kw.role, KeywordRole::Declaration);
//! assert!(keywords::lookup(LanguageId::JavaScript, "def").is_none());
//! ```

use super::languages::LanguageId;

/// Stable identifier for construct-introducing keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordId {
    // Declarations (Python)
    Def,
    Lambda,
    // Declarations (shared / script)
    Class,
    Import,
    From,
    Export,
    Function,
    Const,
    Let,
    Var,
    // Declarations (TypeScript)
    Interface,
    Type,
    Enum,
    Namespace,
    Module,

    // Blocks (Python)
    Elif,
    Except,
    With,
    Match,
    Case,
    // Blocks (shared / script)
    If,
    Else,
    While,
    For,
    Try,
    Finally,
    Do,
    Switch,
    Catch,

    // Modifiers
    Async,
    Static,
    Get,
    Set,
    Extends,
    Implements,
    Declare,
    Abstract,
    Readonly,
    Public,
    Private,
    Protected,
    Default,
}

/// What a keyword introduces when it appears at a statement position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordRole {
    /// Introduces a named declaration (function, class, import, binding).
    Declaration,
    /// Opens a block construct (`if`, `while`, `try`, …).
    Block,
    /// Modifies the construct that follows (`async`, `static`, `export`, …).
    Modifier,
}

/// Metadata for a construct-introducing keyword.
#[derive(Debug, Clone, Copy)]
pub struct KeywordInfo {
    pub id: KeywordId,
    pub canonical: &'static str,
    pub role: KeywordRole,
    /// Languages in which this spelling is recognized.
    pub languages: &'static [LanguageId],
}

const PY: &[LanguageId] = &[LanguageId::Python];
const SCRIPT: &[LanguageId] = &[LanguageId::JavaScript, LanguageId::TypeScript];
const TS: &[LanguageId] = &[LanguageId::TypeScript];
const ALL: &[LanguageId] = &[LanguageId::Python, LanguageId::JavaScript, LanguageId::TypeScript];

/// Registry of all construct-introducing keywords.
///
/// ## Notes
/// - The ordering is not semantically meaningful, but is grouped for
///   readability.
pub const KEYWORDS: &[KeywordInfo] = &[
    // ========== Declarations ==========
    info(KeywordId::Def, "def", KeywordRole::Declaration, PY),
    info(KeywordId::Lambda, "lambda", KeywordRole::Declaration, PY),
    info(KeywordId::Class, "class", KeywordRole::Declaration, ALL),
    info(KeywordId::Import, "import", KeywordRole::Declaration, ALL),
    info(KeywordId::From, "from", KeywordRole::Declaration, PY),
    info(KeywordId::Export, "export", KeywordRole::Modifier, SCRIPT),
    info(KeywordId::Function, "function", KeywordRole::Declaration, SCRIPT),
    info(KeywordId::Const, "const", KeywordRole::Declaration, SCRIPT),
    info(KeywordId::Let, "let", KeywordRole::Declaration, SCRIPT),
    info(KeywordId::Var, "var", KeywordRole::Declaration, SCRIPT),
    info(KeywordId::Interface, "interface", KeywordRole::Declaration, TS),
    info(KeywordId::Type, "type", KeywordRole::Declaration, TS),
    info(KeywordId::Enum, "enum", KeywordRole::Declaration, TS),
    info(KeywordId::Namespace, "namespace", KeywordRole::Declaration, TS),
    info(KeywordId::Module, "module", KeywordRole::Declaration, TS),
    // ========== Blocks ==========
    info(KeywordId::If, "if", KeywordRole::Block, ALL),
    info(KeywordId::Elif, "elif", KeywordRole::Block, PY),
    info(KeywordId::Else, "else", KeywordRole::Block, ALL),
    info(KeywordId::While, "while", KeywordRole::Block, ALL),
    info(KeywordId::For, "for", KeywordRole::Block, ALL),
    info(KeywordId::Try, "try", KeywordRole::Block, ALL),
    info(KeywordId::Except, "except", KeywordRole::Block, PY),
    info(KeywordId::Finally, "finally", KeywordRole::Block, ALL),
    info(KeywordId::With, "with", KeywordRole::Block, PY),
    info(KeywordId::Match, "match", KeywordRole::Block, PY),
    info(KeywordId::Case, "case", KeywordRole::Block, PY),
    info(KeywordId::Do, "do", KeywordRole::Block, SCRIPT),
    info(KeywordId::Switch, "switch", KeywordRole::Block, SCRIPT),
    info(KeywordId::Catch, "catch", KeywordRole::Block, SCRIPT),
    // ========== Modifiers ==========
    info(KeywordId::Async, "async", KeywordRole::Modifier, ALL),
    info(KeywordId::Static, "static", KeywordRole::Modifier, SCRIPT),
    info(KeywordId::Get, "get", KeywordRole::Modifier, SCRIPT),
    info(KeywordId::Set, "set", KeywordRole::Modifier, SCRIPT),
    info(KeywordId::Extends, "extends", KeywordRole::Modifier, SCRIPT),
    info(KeywordId::Implements, "implements", KeywordRole::Modifier, TS),
    info(KeywordId::Declare, "declare", KeywordRole::Modifier, TS),
    info(KeywordId::Abstract, "abstract", KeywordRole::Modifier, TS),
    info(KeywordId::Readonly, "readonly", KeywordRole::Modifier, TS),
    info(KeywordId::Public, "public", KeywordRole::Modifier, TS),
    info(KeywordId::Private, "private", KeywordRole::Modifier, TS),
    info(KeywordId::Protected, "protected", KeywordRole::Modifier, TS),
    info(KeywordId::Default, "default", KeywordRole::Modifier, SCRIPT),
];

const fn info(
    id: KeywordId,
    canonical: &'static str,
    role: KeywordRole,
    languages: &'static [LanguageId],
) -> KeywordInfo {
    KeywordInfo {
        id,
        canonical,
        role,
        languages,
    }
}

/// Resolve a spelling within one language's vocabulary.
pub fn lookup(lang: LanguageId, spelling: &str) -> Option<&'static KeywordInfo> {
    KEYWORDS
        .iter()
        .find(|k| k.canonical == spelling && k.languages.contains(&lang))
}

/// Canonical spelling for a keyword id.
pub fn as_str(id: KeywordId) -> &'static str {
    KEYWORDS
        .iter()
        .find(|k| k.id == id)
        .expect("INVARIANT: every KeywordId has a KEYWORDS entry")
        .canonical
}
