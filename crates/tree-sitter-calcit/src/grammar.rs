//! Core structures and parsing logic for Tree-sitter grammars.
//!
//! This module defines the internal representation of a grammar as parsed from
//! Tree-sitter's JSON format. It uses [`serde_json`] for deserialization and
//! provides accessors for inspecting rule structure.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Rule types, values and per-rule accessors.
pub mod rules;

pub use rules::{Rule, RuleType, RuleValue};

/// The rule tree-sitter conventionally uses as the root of every parse.
pub const DEFAULT_START_RULE: &str = "source_file";

/// Represents a full Tree-sitter grammar definition.
///
/// This structure directly mirrors the serialized JSON format produced by
/// `tree-sitter generate` in `src/grammar.json`. It captures the complete rule
/// set along with auxiliary metadata such as precedences, conflicts, and
/// supertypes.
///
/// See <https://tree-sitter.github.io/tree-sitter/assets/schemas/grammar.schema.json>
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Grammar {
    /// Optional `$schema` field from the JSON, typically used for schema
    /// validation or editor integration.
    #[serde(rename = "$schema", default)]
    pub schema: Option<String>,

    /// The short name of the grammar (e.g. `"calcit"`).
    pub name: String,

    /// Optional name of a base grammar that this one inherits from.
    #[serde(default)]
    pub inherits: Option<String>,

    /// Map of all rule identifiers to their corresponding definitions.
    pub rules: HashMap<String, Rule>,

    /// Tokens that may appear between any other tokens, such as whitespace or comments.
    #[serde(default)]
    pub extras: Option<Vec<Rule>>,

    /// Rules implemented externally via a scanner.
    #[serde(default)]
    pub externals: Option<Vec<Rule>>,

    /// Names of rules that should be inlined into other rules.
    #[serde(default)]
    pub inline: Option<Vec<String>>,

    /// Named precedence orderings, each entry a `STRING` or `SYMBOL` rule.
    #[serde(default)]
    pub precedences: Option<Vec<Vec<Rule>>>,

    /// Explicit conflict groups expected during parsing.
    #[serde(default)]
    pub conflicts: Option<Vec<Vec<String>>>,

    /// Context-specific reserved word definitions.
    #[serde(default)]
    pub reserved: Option<HashMap<String, Vec<Rule>>>,

    /// The special rule name used to identify word tokens (keywords, identifiers, etc.).
    #[serde(default)]
    pub word: Option<String>,

    /// A list of node supertypes, grouping related syntactic forms.
    #[serde(default)]
    pub supertypes: Option<Vec<String>>,
}

/// Possible errors raised while reading a grammar artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    /// The input JSON was syntactically invalid or structurally mismatched.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// The grammar defines no rules at all.
    #[error("grammar '{0}' has no rules")]
    NoRules(String),

    /// No unique entry rule could be found.
    #[error("cannot determine start rule: {0}")]
    StartRule(String),
}

/// Parse a JSON grammar definition into a strongly typed [`Grammar`] structure.
///
/// # Errors
///
/// Returns [`GrammarError::JsonParse`] if the provided string is not valid JSON
/// or fails schema deserialization. The message names the line and column.
pub fn parse_grammar(json: &str) -> Result<Grammar, GrammarError> {
    serde_json::from_str(json).map_err(|e| GrammarError::JsonParse(e.to_string()))
}

impl Grammar {
    /// Looks up a rule by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Rule names in sorted order, for deterministic iteration.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Names of the `SYMBOL` entries in `externals`, in declaration order.
    ///
    /// `STRING` entries are external tokens matched by literal text and have
    /// no name of their own.
    #[must_use]
    pub fn external_names(&self) -> Vec<&str> {
        self.externals
            .iter()
            .flatten()
            .filter_map(Rule::symbol_name)
            .collect()
    }

    /// Returns `true` if `name` is a rule or an external token.
    #[must_use]
    pub fn defines(&self, name: &str) -> bool {
        self.rules.contains_key(name)
            || self
                .externals
                .iter()
                .flatten()
                .any(|r| r.symbol_name() == Some(name))
    }

    /// Returns `true` if nodes for this rule never appear in the syntax tree.
    ///
    /// Rules starting with an underscore and rules listed in `inline` are
    /// expanded into their parents.
    #[must_use]
    pub fn is_hidden(&self, name: &str) -> bool {
        name.starts_with('_')
            || self
                .inline
                .as_ref()
                .is_some_and(|inline| inline.iter().any(|n| n == name))
    }

    /// Names of every rule referenced through a `SYMBOL` somewhere in a rule body.
    #[must_use]
    pub fn referenced_symbols(&self) -> HashSet<&str> {
        let mut referenced = HashSet::new();
        for rule in self.rules.values() {
            rule.visit(&mut |r| {
                if let Some(name) = r.symbol_name() {
                    referenced.insert(name);
                }
            });
        }
        referenced
    }

    /// Returns the entry rule of the grammar.
    ///
    /// JSON objects carry no ordering once deserialized, so the entry rule is
    /// [`DEFAULT_START_RULE`] when defined, and otherwise the only rule that no
    /// other rule refers to.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::NoRules`] for an empty grammar and
    /// [`GrammarError::StartRule`] when there are zero or several candidates.
    pub fn start_rule(&self) -> Result<&str, GrammarError> {
        if self.rules.is_empty() {
            return Err(GrammarError::NoRules(self.name.clone()));
        }
        if let Some((name, _)) = self.rules.get_key_value(DEFAULT_START_RULE) {
            return Ok(name);
        }

        let referenced = self.referenced_symbols();
        let roots: Vec<&str> = self
            .rule_names()
            .into_iter()
            .filter(|name| !referenced.contains(name))
            .collect();

        match roots.as_slice() {
            [only] => Ok(*only),
            [] => Err(GrammarError::StartRule(
                "every rule is referenced by another rule".to_string(),
            )),
            many => Err(GrammarError::StartRule(format!(
                "several unreferenced rules: {}",
                many.join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_grammar() {
        let json = r#"{
            "name": "test",
            "rules": {
                "source_file": {
                    "type": "SYMBOL",
                    "name": "expression"
                },
                "expression": {
                    "type": "CHOICE",
                    "members": [
                        {
                            "type": "STRING",
                            "value": "hello"
                        },
                        {
                            "type": "PATTERN",
                            "value": "[0-9]+"
                        }
                    ]
                }
            }
        }"#;

        let grammar = parse_grammar(json).unwrap();
        assert_eq!(grammar.name, "test");
        assert_eq!(grammar.rules.len(), 2);
        assert_eq!(grammar.rule_names(), vec!["expression", "source_file"]);
        assert_eq!(grammar.start_rule().unwrap(), "source_file");
    }

    #[test]
    fn test_parse_precedence() {
        let json = r#"{
            "name": "test",
            "rules": {
                "expr": {
                    "type": "PREC_LEFT",
                    "value": 1,
                    "content": {
                        "type": "SEQ",
                        "members": [
                            {"type": "SYMBOL", "name": "expr"},
                            {"type": "STRING", "value": "+"},
                            {"type": "SYMBOL", "name": "expr"}
                        ]
                    }
                }
            }
        }"#;

        let grammar = parse_grammar(json).unwrap();
        let expr_rule = grammar.rule("expr").unwrap();
        assert_eq!(expr_rule.precedence(), Some(1));
        assert_eq!(expr_rule.rule_type, RuleType::PrecLeft);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let err = parse_grammar(r#"{"name": "broken", "rules": {"#).unwrap_err();
        assert!(matches!(err, GrammarError::JsonParse(_)));
        let message = err.to_string();
        assert!(message.starts_with("JSON parse error"));
        assert!(message.contains("line 1"), "{message}");
        assert!(!message.contains('\u{1b}'), "{message:?}");
        assert!(!message.contains('\n'), "{message:?}");
    }

    #[test]
    fn test_rule_values_in_grammar() {
        let json = r#"{
            "name": "test",
            "rules": {
                "source_file": {
                    "type": "PREC",
                    "value": 1,
                    "content": {"type": "SYMBOL", "name": "word"}
                },
                "word": {"type": "STRING", "value": "x"}
            }
        }"#;
        let grammar = parse_grammar(json).unwrap();
        assert_eq!(grammar.rule("source_file").unwrap().precedence(), Some(1));
        assert_eq!(grammar.rule("word").unwrap().string_value(), Some("x"));
    }

    #[test]
    fn test_external_names() {
        let json = r#"{
            "name": "test",
            "externals": [
                {"type": "SYMBOL", "name": "_indent"},
                {"type": "STRING", "value": "\\"}
            ],
            "rules": {
                "source_file": {"type": "SYMBOL", "name": "_indent"}
            }
        }"#;
        let grammar = parse_grammar(json).unwrap();
        assert_eq!(grammar.external_names(), vec!["_indent"]);
        assert!(grammar.defines("_indent"));
        assert!(grammar.defines("source_file"));
        assert!(!grammar.defines("missing"));
    }

    #[test]
    fn test_start_rule_falls_back_to_unreferenced_rule() {
        let json = r#"{
            "name": "test",
            "rules": {
                "program": {"type": "SYMBOL", "name": "item"},
                "item": {"type": "STRING", "value": "x"}
            }
        }"#;
        let grammar = parse_grammar(json).unwrap();
        assert_eq!(grammar.start_rule().unwrap(), "program");
    }

    #[test]
    fn test_start_rule_ambiguous() {
        let json = r#"{
            "name": "test",
            "rules": {
                "a": {"type": "STRING", "value": "a"},
                "b": {"type": "STRING", "value": "b"}
            }
        }"#;
        let grammar = parse_grammar(json).unwrap();
        let err = grammar.start_rule().unwrap_err();
        assert_eq!(
            err,
            GrammarError::StartRule("several unreferenced rules: a, b".to_string())
        );
    }

    #[test]
    fn test_hidden_rules() {
        let json = r#"{
            "name": "test",
            "inline": ["atom"],
            "rules": {
                "source_file": {"type": "SYMBOL", "name": "_item"},
                "_item": {"type": "SYMBOL", "name": "atom"},
                "atom": {"type": "STRING", "value": "x"}
            }
        }"#;
        let grammar = parse_grammar(json).unwrap();
        assert!(grammar.is_hidden("_item"));
        assert!(grammar.is_hidden("atom"));
        assert!(!grammar.is_hidden("source_file"));
    }
}
