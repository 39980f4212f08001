//! Validation routines for Tree-sitter grammars.
//!
//! This module performs structural checks over parsed [`Grammar`](crate::grammar::Grammar)
//! definitions, such as verifying symbol references, compiling token patterns,
//! ensuring all rules are reachable, detecting left recursion, and confirming
//! precedence consistency. It runs before a [`Language`](crate::Language) is
//! built so that a malformed artifact never yields a descriptor.

use crate::grammar::{Grammar, GrammarError, Rule, RuleType};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// A fatal problem found while checking a grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The grammar has no usable entry point.
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// A `SYMBOL` rule names neither a rule nor an external token.
    #[error("undefined symbol '{symbol}' referenced in rule '{rule}'")]
    UndefinedSymbol {
        /// The missing rule name.
        symbol: String,
        /// The rule whose body holds the reference.
        rule: String,
    },

    /// A top-level grammar property names a rule that does not exist.
    ///
    /// Covers the name lists (`conflicts`, `inline`, `supertypes`, `word`) and
    /// the `SYMBOL`s inside `extras` and `precedences`.
    #[error("undefined rule '{symbol}' listed in {property}")]
    UndefinedReference {
        /// The missing rule name.
        symbol: String,
        /// The grammar property holding the reference, e.g. `conflicts`.
        property: &'static str,
    },

    /// A `PATTERN` rule is not a valid regular expression.
    #[error("invalid pattern /{pattern}/ in rule '{rule}': {message}")]
    InvalidPattern {
        /// The rule whose body holds the pattern.
        rule: String,
        /// The pattern source.
        pattern: String,
        /// The regex engine's description of the problem.
        message: String,
    },

    /// A `STRING` rule matches nothing.
    #[error("empty string literal in rule '{rule}'")]
    EmptyString {
        /// The rule whose body holds the literal.
        rule: String,
    },
}

/// A non-fatal observation about a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// The rule cannot be reached from the start rule or the extras.
    UnreachableRule(String),

    /// The rule refers to itself as its first element.
    LeftRecursion(String),

    /// The rule declares several distinct precedence levels.
    MixedPrecedence {
        /// The rule name.
        rule: String,
        /// The distinct levels, ascending.
        levels: Vec<i32>,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::UnreachableRule(rule) => write!(f, "unreachable rule '{rule}'"),
            ValidationWarning::LeftRecursion(rule) => write!(f, "rule '{rule}' has left recursion"),
            ValidationWarning::MixedPrecedence { rule, levels } => {
                write!(f, "rule '{rule}' has multiple precedence levels: {levels:?}")
            }
        }
    }
}

/// The outcome of a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Observations that did not prevent the grammar from loading.
    ///
    /// Grouped by check: unreachable rules, then left recursion, then mixed
    /// precedence. Each group is in rule-name order.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// Names of the rules reported as unreachable.
    #[must_use]
    pub fn unreachable_rules(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                ValidationWarning::UnreachableRule(rule) => Some(rule.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Performs semantic validation of a parsed [`Grammar`](crate::grammar::Grammar).
///
/// This function runs several consistency passes over the grammar:
///
/// - Checks that all referenced symbols are defined, in rule bodies and in
///   the top-level properties.
/// - Checks that every pattern compiles.
/// - Warns about unreachable rules.
/// - Notes immediate left recursion.
/// - Verifies precedence consistency.
///
/// # Errors
///
/// Returns a [`ValidationError`] if any structural rule violation is detected.
pub fn validate(grammar: &Grammar) -> Result<ValidationReport, ValidationError> {
    let start = grammar.start_rule()?;

    check_undefined_symbols(grammar)?;
    check_top_level_references(grammar)?;
    check_terminals(grammar)?;

    let mut warnings = Vec::new();
    check_unreachable_rules(grammar, start, &mut warnings);
    check_left_recursion(grammar, &mut warnings);
    check_precedence(grammar, &mut warnings);

    for warning in &warnings {
        match warning {
            ValidationWarning::LeftRecursion(_) => tracing::debug!(grammar = %grammar.name, "{warning}"),
            _ => tracing::warn!(grammar = %grammar.name, "{warning}"),
        }
    }

    Ok(ValidationReport { warnings })
}

fn check_undefined_symbols(grammar: &Grammar) -> Result<(), ValidationError> {
    for rule_name in grammar.rule_names() {
        if let Some(symbol) = first_undefined_symbol(grammar, &grammar.rules[rule_name]) {
            return Err(ValidationError::UndefinedSymbol {
                symbol: symbol.to_string(),
                rule: rule_name.to_string(),
            });
        }
    }
    Ok(())
}

/// The first `SYMBOL` under `rule` naming neither a rule nor an external.
fn first_undefined_symbol<'a>(grammar: &Grammar, rule: &'a Rule) -> Option<&'a str> {
    let mut missing = None;
    rule.visit(&mut |r| {
        if let Some(symbol) = r.symbol_name() {
            if missing.is_none() && !grammar.defines(symbol) {
                missing = Some(symbol);
            }
        }
    });
    missing
}

fn check_top_level_references(grammar: &Grammar) -> Result<(), ValidationError> {
    let groups = [
        (
            "conflicts",
            grammar.conflicts.iter().flatten().flatten().collect::<Vec<_>>(),
        ),
        ("inline", grammar.inline.iter().flatten().collect()),
        ("supertypes", grammar.supertypes.iter().flatten().collect()),
        ("word", grammar.word.iter().collect()),
    ];

    for (property, names) in groups {
        if let Some(symbol) = names.into_iter().find(|n| !grammar.rules.contains_key(*n)) {
            return Err(ValidationError::UndefinedReference {
                symbol: symbol.clone(),
                property,
            });
        }
    }

    let rule_groups = [
        ("extras", grammar.extras.iter().flatten().collect::<Vec<_>>()),
        (
            "precedences",
            grammar.precedences.iter().flatten().flatten().collect(),
        ),
    ];

    for (property, rules) in rule_groups {
        if let Some(symbol) = rules
            .into_iter()
            .find_map(|rule| first_undefined_symbol(grammar, rule))
        {
            return Err(ValidationError::UndefinedReference {
                symbol: symbol.to_string(),
                property,
            });
        }
    }
    Ok(())
}

fn check_terminals(grammar: &Grammar) -> Result<(), ValidationError> {
    for rule_name in grammar.rule_names() {
        check_rule_terminals(&grammar.rules[rule_name], rule_name, false)?;
    }
    for extra in grammar.extras.iter().flatten() {
        check_rule_terminals(extra, "extras", true)?;
    }
    Ok(())
}

fn check_rule_terminals(rule: &Rule, context: &str, in_token: bool) -> Result<(), ValidationError> {
    match rule.rule_type {
        RuleType::Pattern => {
            let pattern = rule.pattern_value().unwrap_or_default();
            let case_insensitive = rule.flags.as_deref().is_some_and(|f| f.contains('i'));
            regex::RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|e| ValidationError::InvalidPattern {
                    rule: context.to_string(),
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?;
        }
        RuleType::String => {
            if !in_token && rule.string_value().is_none_or(str::is_empty) {
                return Err(ValidationError::EmptyString {
                    rule: context.to_string(),
                });
            }
        }
        t => {
            let in_token = in_token || t.is_token();
            for child in rule.children() {
                check_rule_terminals(child, context, in_token)?;
            }
        }
    }
    Ok(())
}

fn check_unreachable_rules(grammar: &Grammar, start: &str, warnings: &mut Vec<ValidationWarning>) {
    let mut reachable = HashSet::new();
    let mut to_visit = vec![start];

    for extra in grammar.extras.iter().flatten() {
        extra.visit(&mut |r| to_visit.extend(r.symbol_name()));
    }

    while let Some(rule_name) = to_visit.pop() {
        if !reachable.insert(rule_name) {
            continue;
        }

        if let Some(rule) = grammar.rules.get(rule_name) {
            rule.visit(&mut |r| to_visit.extend(r.symbol_name()));
        }
    }

    for rule_name in grammar.rule_names() {
        if !reachable.contains(rule_name) && !grammar.is_hidden(rule_name) {
            warnings.push(ValidationWarning::UnreachableRule(rule_name.to_string()));
        }
    }
}

fn check_left_recursion(grammar: &Grammar, warnings: &mut Vec<ValidationWarning>) {
    for rule_name in grammar.rule_names() {
        if has_immediate_left_recursion(&grammar.rules[rule_name], rule_name) {
            warnings.push(ValidationWarning::LeftRecursion(rule_name.to_string()));
        }
    }
}

fn has_immediate_left_recursion(rule: &Rule, target: &str) -> bool {
    match rule.rule_type {
        RuleType::Symbol => rule.symbol_name() == Some(target),

        RuleType::Seq => rule
            .members
            .first()
            .is_some_and(|first| has_immediate_left_recursion(first, target)),

        RuleType::Choice => rule
            .members
            .iter()
            .any(|member| has_immediate_left_recursion(member, target)),

        RuleType::Prec
        | RuleType::PrecLeft
        | RuleType::PrecRight
        | RuleType::PrecDynamic
        | RuleType::Field
        | RuleType::Alias
        | RuleType::Repeat
        | RuleType::Repeat1 => rule
            .content
            .as_deref()
            .is_some_and(|content| has_immediate_left_recursion(content, target)),

        _ => false,
    }
}

fn check_precedence(grammar: &Grammar, warnings: &mut Vec<ValidationWarning>) {
    let mut prec_levels: BTreeMap<&str, BTreeSet<i32>> = BTreeMap::new();

    for (rule_name, rule) in &grammar.rules {
        rule.visit(&mut |r| {
            if let Some(p) = r.precedence() {
                prec_levels.entry(rule_name.as_str()).or_default().insert(p);
            }
        });
    }

    for (rule, levels) in prec_levels {
        if levels.len() > 1 {
            warnings.push(ValidationWarning::MixedPrecedence {
                rule: rule.to_string(),
                levels: levels.into_iter().collect(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse_grammar;

    fn grammar(json: &str) -> Grammar {
        parse_grammar(json).unwrap()
    }

    #[test]
    fn test_undefined_symbol() {
        let g = grammar(
            r#"{
                "name": "test",
                "rules": {
                    "source_file": {"type": "SYMBOL", "name": "missing"}
                }
            }"#,
        );
        let err = validate(&g).unwrap_err();
        assert_eq!(
            err.to_string(),
            "undefined symbol 'missing' referenced in rule 'source_file'"
        );
    }

    #[test]
    fn test_undefined_conflict_member() {
        let g = grammar(
            r#"{
                "name": "test",
                "conflicts": [["source_file", "ghost"]],
                "rules": {
                    "source_file": {"type": "STRING", "value": "x"}
                }
            }"#,
        );
        assert_eq!(
            validate(&g).unwrap_err(),
            ValidationError::UndefinedReference {
                symbol: "ghost".to_string(),
                property: "conflicts",
            }
        );
    }

    #[test]
    fn test_undefined_top_level_names() {
        let cases = [
            ("inline", r#""inline": ["ghost"]"#),
            ("supertypes", r#""supertypes": ["ghost"]"#),
            ("word", r#""word": "ghost""#),
            ("extras", r#""extras": [{"type": "SYMBOL", "name": "ghost"}]"#),
            (
                "precedences",
                r#""precedences": [[{"type": "STRING", "value": "sum"}, {"type": "SYMBOL", "name": "ghost"}]]"#,
            ),
        ];

        for (property, entry) in cases {
            let g = grammar(&format!(
                r#"{{
                    "name": "test",
                    {entry},
                    "rules": {{
                        "source_file": {{"type": "STRING", "value": "x"}}
                    }}
                }}"#
            ));
            assert_eq!(
                validate(&g).unwrap_err(),
                ValidationError::UndefinedReference {
                    symbol: "ghost".to_string(),
                    property,
                },
                "{property}"
            );
        }
    }

    #[test]
    fn test_defined_top_level_names() {
        let g = grammar(
            r#"{
                "name": "test",
                "word": "identifier",
                "inline": ["_item"],
                "supertypes": ["_item"],
                "extras": [{"type": "SYMBOL", "name": "comment"}, {"type": "PATTERN", "value": "\\s"}],
                "precedences": [[{"type": "SYMBOL", "name": "identifier"}, {"type": "STRING", "value": "low"}]],
                "rules": {
                    "source_file": {"type": "SYMBOL", "name": "_item"},
                    "_item": {"type": "SYMBOL", "name": "identifier"},
                    "identifier": {"type": "PATTERN", "value": "[a-z]+"},
                    "comment": {"type": "PATTERN", "value": ";.*"}
                }
            }"#,
        );
        assert!(validate(&g).is_ok());
    }

    #[test]
    fn test_external_symbols_are_defined() {
        let g = grammar(
            r#"{
                "name": "test",
                "externals": [{"type": "SYMBOL", "name": "_auto"}, {"type": "SYMBOL", "name": "heredoc"}],
                "extras": [{"type": "SYMBOL", "name": "heredoc"}],
                "rules": {
                    "source_file": {"type": "SYMBOL", "name": "_auto"}
                }
            }"#,
        );
        let report = validate(&g).unwrap();
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let g = grammar(
            r#"{
                "name": "test",
                "rules": {
                    "source_file": {"type": "PATTERN", "value": "[0-9"}
                }
            }"#,
        );
        let err = validate(&g).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidPattern { ref rule, ref pattern, .. }
                if rule == "source_file" && pattern == "[0-9"
        ));
    }

    #[test]
    fn test_empty_string_literal() {
        let g = grammar(
            r#"{
                "name": "test",
                "rules": {
                    "source_file": {
                        "type": "SEQ",
                        "members": [
                            {"type": "STRING", "value": "a"},
                            {"type": "STRING", "value": ""}
                        ]
                    }
                }
            }"#,
        );
        assert_eq!(
            validate(&g).unwrap_err(),
            ValidationError::EmptyString {
                rule: "source_file".to_string()
            }
        );
    }

    #[test]
    fn test_empty_grammar() {
        let g = grammar(r#"{"name": "test", "rules": {}}"#);
        assert_eq!(
            validate(&g).unwrap_err(),
            ValidationError::Grammar(GrammarError::NoRules("test".to_string()))
        );
    }

    #[test]
    fn test_warnings() {
        let g = grammar(
            r##"{
                "name": "test",
                "extras": [{"type": "SYMBOL", "name": "comment"}],
                "rules": {
                    "source_file": {"type": "SYMBOL", "name": "expr"},
                    "expr": {
                        "type": "CHOICE",
                        "members": [
                            {
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
                            },
                            {
                                "type": "PREC_LEFT",
                                "value": 2,
                                "content": {
                                    "type": "SEQ",
                                    "members": [
                                        {"type": "SYMBOL", "name": "expr"},
                                        {"type": "STRING", "value": "*"},
                                        {"type": "SYMBOL", "name": "expr"}
                                    ]
                                }
                            },
                            {"type": "PATTERN", "value": "[0-9]+"}
                        ]
                    },
                    "comment": {"type": "PATTERN", "value": "#.*"},
                    "orphan": {"type": "STRING", "value": "never"},
                    "_hidden_orphan": {"type": "STRING", "value": "quiet"}
                }
            }"##,
        );

        let report = validate(&g).unwrap();
        assert_eq!(report.unreachable_rules(), vec!["orphan"]);
        assert_eq!(
            report.warnings,
            vec![
                ValidationWarning::UnreachableRule("orphan".to_string()),
                ValidationWarning::LeftRecursion("expr".to_string()),
                ValidationWarning::MixedPrecedence {
                    rule: "expr".to_string(),
                    levels: vec![1, 2],
                },
            ]
        );
    }
}
