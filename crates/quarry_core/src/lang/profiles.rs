//! Per-language lexical profiles.
//!
//! A [`LexProfile`] tells the engine how a language spells its non-structural
//! lexical territory: comments, string quotes, template literals, and regex
//! literals, plus whether blocks are delimited by braces or indentation. The
//! tokenizer and exclusion handling are generic; profiles are the only place
//! language-specific lexical facts live.
//!
//! ## Examples
//! ```rust
//! use quarry_core::lang::languages::LanguageId;
//! use quarry_core::lang::profiles::{self, BlockStyle};
//!
//! let py = profiles::profile(LanguageId::Python);
//! assert_eq!(py.block_style, BlockStyle::Indentation);
//! assert!(py.triple_quotes);
//! assert!(!py.regex_literals);
//! ```

use super::languages::LanguageId;

/// How a language delimits nested blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockStyle {
    /// Blocks are brace-delimited (`{ … }`).
    Braces,
    /// Blocks are introduced by a colon and delimited by indentation.
    Indentation,
}

/// Block comment delimiters and nesting behavior.
#[derive(Debug, Clone, Copy)]
pub struct BlockCommentStyle {
    pub open: &'static str,
    pub close: &'static str,
    /// Whether the host language defines nested block comments.
    /// The generic default is non-nesting.
    pub nests: bool,
}

/// Lexical profile for one language.
#[derive(Debug, Clone, Copy)]
pub struct LexProfile {
    pub language: LanguageId,
    /// Markers that start a comment running to end of line.
    pub line_comments: &'static [&'static str],
    pub block_comment: Option<BlockCommentStyle>,
    /// Single-character string delimiters.
    pub quotes: &'static [char],
    /// Whether tripled quote characters form multi-line string literals.
    pub triple_quotes: bool,
    /// Template-literal delimiter with `${ … }` interpolation, if any.
    pub template_quote: Option<char>,
    /// Whether `/ … /` regex literals exist.
    pub regex_literals: bool,
    /// Keywords after which a `/` may start a regex literal rather than
    /// being a division operator.
    pub regex_preceders: &'static [&'static str],
    pub block_style: BlockStyle,
}

const SCRIPT_REGEX_PRECEDERS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Registry of all lexical profiles.
pub const PROFILES: &[LexProfile] = &[
    LexProfile {
        language: LanguageId::Python,
        line_comments: &["#"],
        block_comment: None,
        quotes: &['"', '\''],
        triple_quotes: true,
        template_quote: None,
        regex_literals: false,
        regex_preceders: &[],
        block_style: BlockStyle::Indentation,
    },
    LexProfile {
        language: LanguageId::JavaScript,
        line_comments: &["//"],
        block_comment: Some(BlockCommentStyle {
            open: "/*",
            close: "*/",
            nests: false,
        }),
        quotes: &['"', '\''],
        triple_quotes: false,
        template_quote: Some('`'),
        regex_literals: true,
        regex_preceders: SCRIPT_REGEX_PRECEDERS,
        block_style: BlockStyle::Braces,
    },
    LexProfile {
        language: LanguageId::TypeScript,
        line_comments: &["//"],
        block_comment: Some(BlockCommentStyle {
            open: "/*",
            close: "*/",
            nests: false,
        }),
        quotes: &['"', '\''],
        triple_quotes: false,
        template_quote: Some('`'),
        regex_literals: true,
        regex_preceders: SCRIPT_REGEX_PRECEDERS,
        block_style: BlockStyle::Braces,
    },
];

/// Lexical profile for a language id.
pub fn profile(lang: LanguageId) -> &'static LexProfile {
    PROFILES
        .iter()
        .find(|p| p.language == lang)
        .expect("INVARIANT: every LanguageId has a PROFILES entry")
}
