//! The Calcit grammar for tree-sitter.
//!
//! The grammar ships as tree-sitter's `grammar.json` artifact, embedded at
//! compile time. [`language`] loads it once per process and hands out
//! [`Language`] descriptors.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::multiple_crate_versions)]

use std::sync::OnceLock;

/// Core structures and parsing logic for Tree-sitter grammars.
///
/// This module defines how the grammar artifact is understood: the rules,
/// extras, conflicts and other declarations that make up a language.
pub mod grammar;

/// The language descriptor and its symbol and field tables.
pub mod language;

/// Node-type summaries, as in tree-sitter's `node-types.json`.
pub mod node_types;

/// Grammar validation and consistency checking utilities.
///
/// Validation keeps a malformed artifact from ever producing a descriptor.
pub mod validate;

pub use grammar::{parse_grammar, Grammar, GrammarError, Rule};
pub use language::{Language, LanguageError, LANGUAGE_VERSION};
pub use node_types::{FieldInfo, NodeType, NodeTypeRef};
pub use validate::{validate, ValidationError, ValidationReport, ValidationWarning};

/// The name recorded in the bundled grammar.
pub const NAME: &str = "calcit";

/// The bundled `grammar.json` artifact.
pub const GRAMMAR_JSON: &str = include_str!("grammar.json");

static LANGUAGE: OnceLock<Result<Language, LanguageError>> = OnceLock::new();

/// Returns the descriptor for the bundled Calcit grammar.
///
/// The artifact is parsed and validated on first use; later calls return
/// handles to the same descriptor.
///
/// # Errors
///
/// Returns a [`LanguageError`] if the bundled artifact does not load. The
/// failure is cached, so every call reports the same error.
pub fn language() -> Result<Language, LanguageError> {
    LANGUAGE
        .get_or_init(|| Language::from_json_named(GRAMMAR_JSON, NAME))
        .clone()
}
