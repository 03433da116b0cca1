//! Supported-language registry.
//!
//! This module is the single source of truth for the languages the toolkit can
//! parse: a stable identifier ([`LanguageId`]) plus a const metadata table
//! ([`LANGUAGES`]) recording canonical names, accepted aliases, and the file
//! extensions conventionally associated with each language.
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-insensitive** over canonical names and
//!   aliases.
//! - The parser factory keys off this registry; an identifier that does not
//!   resolve here is a reported absence, never an error.
//!
//! ## Examples
//! ```rust
//! use quarry_core::lang::languages::{self, LanguageId};
//!
//! assert_eq!(languages::from_str("typescript"), Some(LanguageId::TypeScript));
//! assert_eq!(languages::from_str("TS"), Some(LanguageId::TypeScript));
//! assert_eq!(languages::from_str("cobol"), None);
//! assert_eq!(languages::as_str(LanguageId::Python), "python");
//! ```

/// Stable identifier for every supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageId {
    Python,
    JavaScript,
    TypeScript,
}

/// Metadata for a supported language.
///
/// ## Notes
/// - `canonical` is the preferred identifier for docs and factory lookups.
/// - `aliases` are additional identifiers accepted by [`from_str`].
/// - `extensions` are lowercase, dot-free file extensions for
///   [`from_extension`]; collaborators mapping file paths to languages should
///   go through this table rather than hard-coding extensions.
#[derive(Debug, Clone, Copy)]
pub struct LanguageInfo {
    pub id: LanguageId,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub extensions: &'static [&'static str],
}

/// Registry of all supported languages.
pub const LANGUAGES: &[LanguageInfo] = &[
    LanguageInfo {
        id: LanguageId::Python,
        canonical: "python",
        aliases: &["py", "python3"],
        extensions: &["py", "pyi", "pyw"],
    },
    LanguageInfo {
        id: LanguageId::JavaScript,
        canonical: "javascript",
        aliases: &["js", "ecmascript"],
        extensions: &["js", "mjs", "cjs", "jsx"],
    },
    LanguageInfo {
        id: LanguageId::TypeScript,
        canonical: "typescript",
        aliases: &["ts"],
        extensions: &["ts", "mts", "cts", "tsx"],
    },
];

/// Resolve a language identifier (canonical or alias, case-insensitive).
pub fn from_str(name: &str) -> Option<LanguageId> {
    LANGUAGES
        .iter()
        .find(|l| {
            l.canonical.eq_ignore_ascii_case(name) || l.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
        })
        .map(|l| l.id)
}

/// Resolve a file extension (without the leading dot, case-insensitive).
pub fn from_extension(ext: &str) -> Option<LanguageId> {
    LANGUAGES
        .iter()
        .find(|l| l.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .map(|l| l.id)
}

/// Canonical spelling for a language id.
pub fn as_str(id: LanguageId) -> &'static str {
    info(id).canonical
}

/// Full metadata for a language id.
pub fn info(id: LanguageId) -> &'static LanguageInfo {
    LANGUAGES
        .iter()
        .find(|l| l.id == id)
        .expect("INVARIANT: every LanguageId has a LANGUAGES entry")
}
