#![forbid(unsafe_code)]
//! quarry: an error-tolerant structural parsing toolkit
//!
//! quarry recovers the block structure, declarations, and scopes of source
//! code in several languages (Python, JavaScript, TypeScript) without
//! attempting full language-spec compliance. It exists to give code-aware
//! context to editing tools, which routinely hand it malformed, truncated,
//! or mid-edit input. `parse` therefore never fails on input content;
//! irregularities come back as warnings, `error` nodes, and `unterminated`
//! flags on an otherwise usable tree.
//!
//! The engine is a small set of composable pieces: a profile-driven
//! tokenizer, a context stack with a scope arena, generic brace- and
//! indentation-block scanners with shared lexical exclusion handling
//! (strings, comments, regex and template literals), a scope-indexed symbol
//! table, an arena AST, and a cycle-safe serialization transform. Language
//! vocabulary lives in the dependency-free `quarry_core` registries.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: malformed *input* is recovered, never raised; the
//!   only `Err` in the toolkit is [`BlockContractError`], a precondition
//!   violation by a caller inside the toolkit itself.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//! - **True invariants**: if a panic would represent a toolkit bug (logic
//!   error), use `.expect("INVARIANT: reason")` with a clear explanation.
//!
//! ## Examples
//!
//! ```rust
//! use quarry::create_parser;
//!
//! let parser = create_parser("python").expect("python is registered");
//! let parse = parser.parse("def greet(name):\n    return name\n");
//! assert_eq!(parse.symbols.get_symbols_by_scope()[&0].len(), 1);
//!
//! let json = quarry::to_serializable(&parse.ast);
//! assert_eq!(json["node_type"], "module");
//! ```

pub mod ast;
pub mod block;
pub mod config;
pub mod diagnostics;
pub mod exclusion;
pub mod languages;
pub mod lexer;
pub mod serialize;
pub mod state;
pub mod symbols;
pub mod token;

pub use ast::{Ast, AstNode, NodeId, PropValue};
pub use block::BlockOutcome;
pub use config::ParserConfig;
pub use diagnostics::{BlockContractError, ParseWarning, WarningKind};
pub use languages::{LanguageParser, Parse, create_parser};
pub use serialize::{node_to_serializable, to_serializable};
pub use state::{ContextFrame, ContextType, ParserState, ScopeId};
pub use symbols::{Symbol, SymbolKind, SymbolTable};
pub use token::{Span, Token, TokenKind};

pub use quarry_core::lang::languages::LanguageId;
