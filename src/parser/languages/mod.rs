//! Per-language grammar, node-kind table and declaration query.
//!
//! # Adding a New Language
//!
//! Add a module with `KINDS`, `DECLARATION_QUERY` and `grammar()`, a
//! [`Language`] variant, and a static [`LanguageConfig`] below.

mod c;
mod cpp;
mod go;
mod java;
mod javascript;
mod python;
mod rust_lang;
mod typescript;

use once_cell::sync::OnceCell;
use tree_sitter::Query;

use super::{Language, NodeKind};

/// Everything the tree-sitter adapter needs for one language.
pub struct LanguageConfig {
    kinds: &'static phf::Map<&'static str, NodeKind>,
    declaration_query: &'static str,
    grammar: fn() -> tree_sitter::Language,
    compiled: OnceCell<Query>,
}

impl LanguageConfig {
    const fn new(
        kinds: &'static phf::Map<&'static str, NodeKind>,
        declaration_query: &'static str,
        grammar: fn() -> tree_sitter::Language,
    ) -> Self {
        Self {
            kinds,
            declaration_query,
            grammar,
            compiled: OnceCell::new(),
        }
    }

    pub fn grammar(&self) -> tree_sitter::Language {
        (self.grammar)()
    }

    /// Normalized kind for a grammar node kind.
    pub fn kind_of(&self, raw_kind: &str) -> NodeKind {
        self.kinds.get(raw_kind).copied().unwrap_or(NodeKind::Other)
    }

    /// The declaration query, compiled on first use.
    pub fn declaration_query(&self) -> anyhow::Result<&Query> {
        self.compiled.get_or_try_init(|| {
            Query::new(&self.grammar(), self.declaration_query)
                .map_err(|e| anyhow::anyhow!("invalid declaration query: {}", e))
        })
    }
}

static PYTHON: LanguageConfig =
    LanguageConfig::new(&python::KINDS, python::DECLARATION_QUERY, python::grammar);
static RUST: LanguageConfig = LanguageConfig::new(
    &rust_lang::KINDS,
    rust_lang::DECLARATION_QUERY,
    rust_lang::grammar,
);
static GO: LanguageConfig = LanguageConfig::new(&go::KINDS, go::DECLARATION_QUERY, go::grammar);
static JAVASCRIPT: LanguageConfig = LanguageConfig::new(
    &javascript::KINDS,
    javascript::DECLARATION_QUERY,
    javascript::grammar,
);
static TYPESCRIPT: LanguageConfig = LanguageConfig::new(
    &typescript::KINDS,
    typescript::DECLARATION_QUERY,
    typescript::grammar,
);
static TSX: LanguageConfig = LanguageConfig::new(
    &typescript::KINDS,
    typescript::DECLARATION_QUERY,
    typescript::tsx_grammar,
);
static JAVA: LanguageConfig =
    LanguageConfig::new(&java::KINDS, java::DECLARATION_QUERY, java::grammar);
static C: LanguageConfig = LanguageConfig::new(&c::KINDS, c::DECLARATION_QUERY, c::grammar);
static CPP: LanguageConfig = LanguageConfig::new(&cpp::KINDS, cpp::DECLARATION_QUERY, cpp::grammar);

/// Look up the configuration for a language.
pub fn config_for(language: Language) -> &'static LanguageConfig {
    match language {
        Language::Python => &PYTHON,
        Language::Rust => &RUST,
        Language::Go => &GO,
        Language::JavaScript => &JAVASCRIPT,
        Language::TypeScript => &TYPESCRIPT,
        Language::Tsx => &TSX,
        Language::Java => &JAVA,
        Language::C => &C,
        Language::Cpp => &CPP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_declaration_query_compiles() {
        for language in Language::ALL {
            let config = config_for(*language);
            let query = config.declaration_query();
            assert!(query.is_ok(), "{}: {:?}", language, query.err());
        }
    }

    #[test]
    fn test_kind_lookup() {
        let py = config_for(Language::Python);
        assert_eq!(py.kind_of("function_definition"), NodeKind::Function);
        assert_eq!(py.kind_of("no_such_kind"), NodeKind::Other);

        let go = config_for(Language::Go);
        assert_eq!(go.kind_of("defer_statement"), NodeKind::Finally);
    }
}
