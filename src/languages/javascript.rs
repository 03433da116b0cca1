//! JavaScript structural parser.

use crate::config::ParserConfig;
use crate::languages::script::parse_script;
use crate::languages::{LanguageParser, Parse};
use quarry_core::lang::languages::LanguageId;

/// Structural parser for JavaScript source.
pub struct JavaScriptParser {
    config: ParserConfig,
}

impl JavaScriptParser {
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }
}

impl Default for JavaScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for JavaScriptParser {
    fn language(&self) -> LanguageId {
        LanguageId::JavaScript
    }

    #[tracing::instrument(skip_all, fields(source_len = source.len()))]
    fn parse(&self, source: &str) -> Parse {
        parse_script(source, LanguageId::JavaScript, self.config)
    }
}
