//! Registry-first language vocabulary.
//!
//! One module per concern:
//! - [`languages`] - the supported-language registry behind the parser factory
//! - [`punctuation`] - structural punctuation with open/close pairing
//! - [`keywords`] - construct-introducing keywords, tagged per language
//! - [`profiles`] - per-language lexical profiles (comments, quotes, regex)
//! - [`nodes`] - canonical AST node-type names and recognized property keys

pub mod keywords;
pub mod languages;
pub mod nodes;
pub mod profiles;
pub mod punctuation;
