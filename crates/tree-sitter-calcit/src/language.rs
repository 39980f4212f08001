//! The language descriptor handed out by the grammar loader.
//!
//! A [`Language`] is built from a validated [`Grammar`] and indexes it the way
//! a compiled Tree-sitter language does: every node kind gets a numeric symbol
//! id, every field name a non-zero field id. Handles are reference counted, so
//! cloning one is cheap and all clones describe the same grammar.

use crate::grammar::{parse_grammar, Grammar, GrammarError};
use crate::node_types::{node_types, NodeType};
use crate::validate::{validate, ValidationError, ValidationWarning};
use std::collections::BTreeSet;
use std::num::NonZeroU16;
use std::path::Path;
use std::sync::Arc;

/// The Tree-sitter ABI version this descriptor corresponds to.
pub const LANGUAGE_VERSION: usize = 14;

/// The kind of the reserved symbol 0, marking the end of input.
pub const END_SYMBOL: &str = "end";

/// Errors raised while loading a language.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LanguageError {
    /// The grammar artifact could not be read.
    #[error("failed to read grammar file {path}: {message}")]
    Io {
        /// The path that was read.
        path: String,
        /// The operating system's description of the failure.
        message: String,
    },

    /// The grammar artifact is not a well-formed grammar.
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// The grammar is well-formed but inconsistent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The artifact holds a different grammar than the one requested.
    #[error("expected grammar '{expected}', found '{found}'")]
    NameMismatch {
        /// The requested grammar name.
        expected: String,
        /// The name recorded in the artifact.
        found: String,
    },
}

/// A node kind in the symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SymbolInfo {
    kind: String,
    named: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct LanguageInner {
    grammar: Grammar,
    start_rule: String,
    symbols: Vec<SymbolInfo>,
    fields: Vec<String>,
    node_types: Vec<NodeType>,
    warnings: Vec<ValidationWarning>,
}

/// An opaque, shareable handle describing a loaded grammar.
#[derive(Debug, Clone)]
pub struct Language {
    inner: Arc<LanguageInner>,
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for Language {}

impl Language {
    /// Builds a language from an already parsed grammar.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError::Validation`] if the grammar fails validation.
    pub fn from_grammar(grammar: Grammar) -> Result<Self, LanguageError> {
        let report = validate(&grammar)?;
        let start_rule = grammar.start_rule()?.to_string();
        let node_types = node_types(&grammar);

        let mut symbols = vec![SymbolInfo {
            kind: END_SYMBOL.to_string(),
            named: false,
        }];
        symbols.extend(node_types.iter().map(|t| SymbolInfo {
            kind: t.kind.clone(),
            named: t.named,
        }));

        let mut fields = BTreeSet::new();
        for rule in grammar.rules.values() {
            rule.visit(&mut |r| fields.extend(r.field_name()));
        }
        let fields: Vec<String> = fields.into_iter().map(str::to_string).collect();

        tracing::debug!(
            grammar = %grammar.name,
            rules = grammar.rules.len(),
            node_kinds = symbols.len(),
            fields = fields.len(),
            warnings = report.warnings.len(),
            "loaded language"
        );

        Ok(Self {
            inner: Arc::new(LanguageInner {
                grammar,
                start_rule,
                symbols,
                fields,
                node_types,
                warnings: report.warnings,
            }),
        })
    }

    /// Parses and loads a `grammar.json` document.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError::Grammar`] for malformed JSON and
    /// [`LanguageError::Validation`] for an inconsistent grammar.
    pub fn from_json(json: &str) -> Result<Self, LanguageError> {
        Self::from_grammar(parse_grammar(json)?)
    }

    /// Like [`Language::from_json`], additionally requiring the grammar's name.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError::NameMismatch`] if the artifact holds another grammar.
    pub fn from_json_named(json: &str, expected: &str) -> Result<Self, LanguageError> {
        let grammar = parse_grammar(json)?;
        if grammar.name != expected {
            return Err(LanguageError::NameMismatch {
                expected: expected.to_string(),
                found: grammar.name,
            });
        }
        Self::from_grammar(grammar)
    }

    /// Reads and loads a `grammar.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError::Io`] if the file cannot be read, otherwise as
    /// [`Language::from_json`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LanguageError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| LanguageError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Returns `true` if both handles share the same loaded grammar.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The grammar's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.grammar.name
    }

    /// The Tree-sitter ABI version.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn version(&self) -> usize {
        LANGUAGE_VERSION
    }

    /// The rule every parse starts from.
    #[must_use]
    pub fn start_rule(&self) -> &str {
        &self.inner.start_rule
    }

    /// The underlying grammar.
    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.inner.grammar
    }

    /// Non-fatal findings from validation.
    #[must_use]
    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.inner.warnings
    }

    /// The declared conflict groups.
    #[must_use]
    pub fn conflicts(&self) -> &[Vec<String>] {
        self.inner.grammar.conflicts.as_deref().unwrap_or_default()
    }

    /// Number of node kinds, the reserved end symbol included.
    #[must_use]
    pub fn node_kind_count(&self) -> usize {
        self.inner.symbols.len()
    }

    /// The node kind for a symbol id.
    #[must_use]
    pub fn node_kind_for_id(&self, id: u16) -> Option<&str> {
        self.inner
            .symbols
            .get(usize::from(id))
            .map(|s| s.kind.as_str())
    }

    /// Whether the symbol id names a rule rather than an anonymous literal.
    #[must_use]
    pub fn node_kind_is_named(&self, id: u16) -> bool {
        self.inner
            .symbols
            .get(usize::from(id))
            .is_some_and(|s| s.named)
    }

    /// The symbol id for a node kind.
    #[must_use]
    pub fn id_for_node_kind(&self, kind: &str, named: bool) -> Option<u16> {
        self.inner
            .symbols
            .iter()
            .position(|s| s.kind == kind && s.named == named)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Number of distinct field names. Field ids run from 1 to this value.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.inner.fields.len()
    }

    /// The field name for a field id.
    #[must_use]
    pub fn field_name_for_id(&self, id: u16) -> Option<&str> {
        let index = usize::from(id).checked_sub(1)?;
        self.inner.fields.get(index).map(String::as_str)
    }

    /// The field id for a field name.
    #[must_use]
    pub fn field_id_for_name(&self, name: &str) -> Option<NonZeroU16> {
        let index = self.inner.fields.iter().position(|f| f == name)?;
        u16::try_from(index + 1).ok().and_then(NonZeroU16::new)
    }

    /// Every node kind's summary: visible rules first, then anonymous literals.
    #[must_use]
    pub fn node_types(&self) -> &[NodeType] {
        &self.inner.node_types
    }

    /// The summary of a single node kind.
    #[must_use]
    pub fn node_type(&self, kind: &str, named: bool) -> Option<&NodeType> {
        self.inner
            .node_types
            .iter()
            .find(|t| t.kind == kind && t.named == named)
    }

    /// The node types serialized in the shape of `node-types.json`.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if the summaries cannot be written.
    pub fn node_types_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.inner.node_types)
    }
}
