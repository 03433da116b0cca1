//! Language parsers and the parser factory.
//!
//! One parser per supported language, all behind the [`LanguageParser`]
//! trait: Python (indentation blocks), JavaScript and TypeScript (brace
//! blocks, sharing one walker). The factory resolves a language identifier
//! through the [`quarry_core::lang::languages`] registry; adding a language
//! means adding a variant there plus a constructor arm here; dispatch logic
//! never changes.
//!
//! `parse` is total: malformed, truncated, or adversarial input produces a
//! tree with warnings, error nodes, and unterminated flags, never an error.

pub mod javascript;
pub mod python;
pub(crate) mod script;
pub mod typescript;

use crate::ast::Ast;
use crate::symbols::SymbolTable;
use quarry_core::lang::languages::{self, LanguageId};

/// Everything one parse call produces: the tree (with warnings attached)
/// and the scope-indexed symbol table.
#[derive(Debug)]
pub struct Parse {
    pub ast: Ast,
    pub symbols: SymbolTable,
}

/// A structural parser for one language.
pub trait LanguageParser {
    fn language(&self) -> LanguageId;

    /// Parse a complete in-memory source string.
    ///
    /// Single-threaded and synchronous; allocates fresh state per call and
    /// shares nothing across invocations. Never fails on input content.
    fn parse(&self, source: &str) -> Parse;
}

/// Look up a parser for a language identifier (canonical name or alias).
///
/// Unknown identifiers yield `None`: a reported absence the caller must
/// handle, never a panic or an error. Collaborators mapping file extensions
/// should resolve them via [`languages::from_extension`] first.
pub fn create_parser(identifier: &str) -> Option<Box<dyn LanguageParser>> {
    match languages::from_str(identifier)? {
        LanguageId::Python => Some(Box::new(python::PythonParser::new())),
        LanguageId::JavaScript => Some(Box::new(javascript::JavaScriptParser::new())),
        LanguageId::TypeScript => Some(Box::new(typescript::TypeScriptParser::new())),
    }
}
