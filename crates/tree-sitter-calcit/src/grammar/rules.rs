//! Core types for representing Tree-sitter grammar rules.
//!
//! This module contains the types used to model grammar rules and their
//! structure according to the Tree-sitter JSON schema.

use serde::Deserialize;

/// Represents a grammar rule in the Tree-sitter format.
///
/// Each rule corresponds to a node in the grammar's rule graph, identified by a
/// [`RuleType`] and containing type-specific fields such as `members` or
/// `content`.
///
/// A `Rule` can be atomic (like a literal or regex) or composite
/// (like a sequence, choice, or precedence group).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rule {
    /// The discriminant identifying what kind of rule this is.
    #[serde(rename = "type")]
    pub rule_type: RuleType,

    /// Optional literal or numeric value, depending on rule kind.
    #[serde(default)]
    pub value: Option<RuleValue>,

    /// Optional name used by `SYMBOL`, `FIELD`, or `ALIAS` rules.
    #[serde(default)]
    pub name: Option<String>,

    /// Optional nested rule for unary constructs such as `REPEAT` or `PREC`.
    #[serde(default)]
    pub content: Option<Box<Rule>>,

    /// List of child rules for compound constructs (`SEQ`, `CHOICE`, etc.).
    #[serde(default)]
    pub members: Vec<Rule>,

    /// Whether the node produced by this rule is named.
    #[serde(default)]
    pub named: Option<bool>,

    /// Internal or generator-specific modifier flags.
    #[serde(default)]
    pub flags: Option<String>,

    /// Optional context label used for reserved-word handling.
    #[serde(default)]
    pub context_name: Option<String>,
}

/// A literal or numeric value attached to a rule node.
///
/// Literal and pattern rules carry text. Precedence wrappers carry a number,
/// or a string when they name an entry of the grammar's `precedences`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// A string literal value (e.g. `"+"`, `"if"`).
    String(String),

    /// An integer numeric value (used by precedence modifiers).
    Integer(i32),
}

/// The enumeration of all recognized Tree-sitter rule types.
///
/// Each variant corresponds to one of the `type` strings found in the JSON
/// grammar format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    /// An empty (ε) production.
    Blank,
    /// A literal string token.
    String,
    /// A regular-expression pattern token.
    Pattern,
    /// A reference to another named rule.
    Symbol,
    /// A rule that matches one of several alternatives.
    Choice,
    /// A sequential composition of member rules.
    Seq,
    /// A zero-or-more repetition of a rule.
    Repeat,
    /// A one-or-more repetition of a rule.
    Repeat1,
    /// A generic precedence wrapper.
    Prec,
    /// A left-associative precedence wrapper.
    PrecLeft,
    /// A right-associative precedence wrapper.
    PrecRight,
    /// A dynamic (runtime) precedence wrapper.
    PrecDynamic,
    /// A named field applied to a subrule.
    Field,
    /// An alias providing an alternate node name.
    Alias,
    /// A tokenization wrapper.
    Token,
    /// A token that must appear immediately without leading trivia.
    ImmediateToken,
    /// A reserved-word context wrapper.
    Reserved,
}

impl RuleType {
    /// Returns `true` for the four precedence wrappers.
    #[must_use]
    pub fn is_precedence(self) -> bool {
        matches!(
            self,
            RuleType::Prec | RuleType::PrecLeft | RuleType::PrecRight | RuleType::PrecDynamic
        )
    }

    /// Returns `true` for `TOKEN` and `IMMEDIATE_TOKEN`.
    #[must_use]
    pub fn is_token(self) -> bool {
        matches!(self, RuleType::Token | RuleType::ImmediateToken)
    }
}

impl Rule {
    /// Returns the canonical string name of this rule type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self.rule_type {
            RuleType::Blank => "BLANK",
            RuleType::String => "STRING",
            RuleType::Pattern => "PATTERN",
            RuleType::Symbol => "SYMBOL",
            RuleType::Choice => "CHOICE",
            RuleType::Seq => "SEQ",
            RuleType::Repeat => "REPEAT",
            RuleType::Repeat1 => "REPEAT1",
            RuleType::Prec => "PREC",
            RuleType::PrecLeft => "PREC_LEFT",
            RuleType::PrecRight => "PREC_RIGHT",
            RuleType::PrecDynamic => "PREC_DYNAMIC",
            RuleType::Field => "FIELD",
            RuleType::Alias => "ALIAS",
            RuleType::Token => "TOKEN",
            RuleType::ImmediateToken => "IMMEDIATE_TOKEN",
            RuleType::Reserved => "RESERVED",
        }
    }

    /// Returns `true` if this rule represents a terminal (lexical) token.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.rule_type, RuleType::String | RuleType::Pattern)
    }

    /// Returns `true` if this rule is a symbol reference.
    #[must_use]
    pub fn is_symbol(&self) -> bool {
        matches!(self.rule_type, RuleType::Symbol)
    }

    /// Returns the referenced symbol name, if applicable.
    #[must_use]
    pub fn symbol_name(&self) -> Option<&str> {
        if self.is_symbol() {
            self.name.as_deref()
        } else {
            None
        }
    }

    /// Returns the field name if this rule is a `FIELD` wrapper.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        if matches!(self.rule_type, RuleType::Field) {
            self.name.as_deref()
        } else {
            None
        }
    }

    /// Returns the numeric precedence value if this rule is a precedence wrapper.
    #[must_use]
    pub fn precedence(&self) -> Option<i32> {
        if !self.rule_type.is_precedence() {
            return None;
        }
        self.value.as_ref().and_then(|v| match v {
            RuleValue::Integer(i) => Some(*i),
            RuleValue::String(_) => None,
        })
    }

    /// Returns the literal string value if this is a `STRING` rule.
    #[must_use]
    pub fn string_value(&self) -> Option<&str> {
        if matches!(self.rule_type, RuleType::String) {
            self.text_value()
        } else {
            None
        }
    }

    /// Returns the pattern source if this is a `PATTERN` rule.
    #[must_use]
    pub fn pattern_value(&self) -> Option<&str> {
        if matches!(self.rule_type, RuleType::Pattern) {
            self.text_value()
        } else {
            None
        }
    }

    fn text_value(&self) -> Option<&str> {
        self.value.as_ref().and_then(|v| match v {
            RuleValue::String(s) => Some(s.as_str()),
            RuleValue::Integer(_) => None,
        })
    }

    /// Iterates over the immediate sub-rules: `content` first, then `members`.
    pub fn children(&self) -> impl Iterator<Item = &Rule> {
        self.content.as_deref().into_iter().chain(self.members.iter())
    }

    /// Visits this rule and every nested sub-rule in pre-order.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Rule)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    /// Returns `true` if a rule with this body produces a leaf node.
    ///
    /// That is the case for a bare literal or pattern, an explicit token, or a
    /// choice between alternatives that are each already tokenized.
    #[must_use]
    pub fn is_lexical(&self) -> bool {
        match self.rule_type {
            RuleType::String | RuleType::Pattern | RuleType::Token | RuleType::ImmediateToken => {
                true
            }
            t if t.is_precedence() => self.content.as_deref().is_some_and(Rule::is_lexical),
            RuleType::Choice => {
                !self.members.is_empty() && self.members.iter().all(Rule::is_tokenized)
            }
            _ => false,
        }
    }

    fn is_tokenized(&self) -> bool {
        match self.rule_type {
            RuleType::Blank
            | RuleType::Pattern
            | RuleType::Token
            | RuleType::ImmediateToken => true,
            t if t.is_precedence() => self.content.as_deref().is_some_and(Rule::is_tokenized),
            RuleType::Choice => self.members.iter().all(Rule::is_tokenized),
            _ => false,
        }
    }
}
