//! Node-type summaries in the shape of Tree-sitter's `node-types.json`.
//!
//! For every visible rule this module works out which fields a node may carry,
//! which node kinds can fill each field, and which named children appear
//! outside of fields. Hidden rules are expanded into the nodes that use them.

use crate::grammar::{Grammar, Rule, RuleType, RuleValue};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A reference to a node kind, as it appears inside field and children lists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeTypeRef {
    /// The node kind, e.g. `"expression"` or `"("`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Whether the kind is a named rule rather than an anonymous literal.
    pub named: bool,
}

impl NodeTypeRef {
    fn named(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            named: true,
        }
    }

    fn anonymous(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            named: false,
        }
    }
}

/// The nodes that may occupy a field (or the unnamed children slot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    /// More than one node can appear in the slot.
    pub multiple: bool,

    /// At least one node always appears in the slot.
    pub required: bool,

    /// Every kind that can appear, sorted.
    pub types: Vec<NodeTypeRef>,
}

/// The summary of one node kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeType {
    /// The node kind.
    #[serde(rename = "type")]
    pub kind: String,

    /// Whether the kind is a named rule rather than an anonymous literal.
    pub named: bool,

    /// Fields by name. Empty for leaves and anonymous nodes.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldInfo>,

    /// Named children that are not held by any field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<FieldInfo>,
}

impl NodeType {
    fn leaf(kind: &str, named: bool) -> Self {
        Self {
            kind: kind.to_string(),
            named,
            fields: BTreeMap::new(),
            children: None,
        }
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.get(name)
    }
}

/// Computes the node types of every named kind followed by every anonymous literal.
///
/// Named kinds are the visible rules, the visible external tokens, and the
/// names introduced by named aliases, all in sorted order.
#[must_use]
pub fn node_types(grammar: &Grammar) -> Vec<NodeType> {
    let mut summarizer = Summarizer {
        grammar,
        expanding: Vec::new(),
    };

    let mut named: BTreeMap<&str, NodeType> = BTreeMap::new();
    for name in grammar.rule_names() {
        if !grammar.is_hidden(name) {
            named.insert(name, summarizer.node_type(name, &grammar.rules[name]));
        }
    }

    for name in grammar.external_names() {
        if !grammar.is_hidden(name) {
            named
                .entry(name)
                .or_insert_with(|| NodeType::leaf(name, true));
        }
    }

    // An aliased symbol keeps the structure of the rule it renames.
    for (alias, content) in named_aliases(grammar) {
        if named.contains_key(alias) {
            continue;
        }
        let node_type = match content.symbol_name() {
            Some(name) => match grammar.rule(name) {
                Some(rule) => summarizer.node_type(alias, rule),
                None => NodeType::leaf(alias, true),
            },
            None => summarizer.node_type(alias, content),
        };
        named.insert(alias, node_type);
    }

    let mut types: Vec<NodeType> = named.into_values().collect();
    types.extend(
        anonymous_kinds(grammar)
            .into_iter()
            .map(|kind| NodeType::leaf(kind, false)),
    );
    types
}

/// Every literal that surfaces as an anonymous node.
///
/// Literals inside tokens are part of a larger token, and a literal forming a
/// whole leaf rule surfaces under the rule's name instead. Anonymous aliases
/// and literal external tokens surface as well.
#[must_use]
pub fn anonymous_kinds(grammar: &Grammar) -> BTreeSet<&str> {
    let mut kinds = BTreeSet::new();
    for rule in grammar.rules.values() {
        if !rule.is_lexical() {
            collect_anonymous(rule, &mut kinds);
        }
    }
    for extra in grammar.extras.iter().flatten() {
        collect_anonymous(extra, &mut kinds);
    }
    kinds.extend(
        grammar
            .externals
            .iter()
            .flatten()
            .filter_map(Rule::string_value),
    );
    kinds
}

fn collect_anonymous<'g>(rule: &'g Rule, kinds: &mut BTreeSet<&'g str>) {
    match rule.rule_type {
        RuleType::String => kinds.extend(rule.string_value()),
        RuleType::Token | RuleType::ImmediateToken => {
            kinds.extend(rule.content.as_deref().and_then(Rule::string_value));
        }
        RuleType::Alias => {
            if !rule.named.unwrap_or(false) {
                kinds.extend(alias_name(rule));
            }
            // A lexical body is renamed as a whole. Any other body still
            // contributes the literals inside it.
            if let Some(content) = rule.content.as_deref() {
                if !content.is_lexical() {
                    collect_anonymous(content, kinds);
                }
            }
        }
        _ => {
            for child in rule.children() {
                collect_anonymous(child, kinds);
            }
        }
    }
}

fn alias_name(rule: &Rule) -> Option<&str> {
    match &rule.value {
        Some(RuleValue::String(alias)) => Some(alias.as_str()),
        _ => None,
    }
}

/// Every named alias with the body it renames, in rule-name order.
fn named_aliases(grammar: &Grammar) -> Vec<(&str, &Rule)> {
    let mut aliases = Vec::new();
    for name in grammar.rule_names() {
        grammar.rules[name].visit(&mut |rule| {
            if rule.rule_type == RuleType::Alias && rule.named.unwrap_or(false) {
                if let (Some(alias), Some(content)) = (alias_name(rule), rule.content.as_deref()) {
                    aliases.push((alias, content));
                }
            }
        });
    }
    aliases
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Quantity {
    exists: bool,
    required: bool,
    multiple: bool,
}

impl Quantity {
    const ONE: Quantity = Quantity {
        exists: true,
        required: true,
        multiple: false,
    };

    fn then(self, next: Quantity) -> Quantity {
        Quantity {
            exists: self.exists || next.exists,
            required: self.required || next.required,
            multiple: self.multiple || next.multiple || (self.exists && next.exists),
        }
    }

    fn or(self, other: Quantity) -> Quantity {
        Quantity {
            exists: self.exists || other.exists,
            required: self.required && other.required,
            multiple: self.multiple || other.multiple,
        }
    }

    fn repeated(self, at_least_once: bool) -> Quantity {
        Quantity {
            exists: self.exists,
            required: self.required && at_least_once,
            multiple: self.exists,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    quantity: Quantity,
    types: BTreeSet<NodeTypeRef>,
}

impl Slot {
    fn one(node: NodeTypeRef) -> Slot {
        Slot {
            quantity: Quantity::ONE,
            types: BTreeSet::from([node]),
        }
    }

    fn then(mut self, next: Slot) -> Slot {
        self.quantity = self.quantity.then(next.quantity);
        self.types.extend(next.types);
        self
    }

    fn or(mut self, other: Slot) -> Slot {
        self.quantity = self.quantity.or(other.quantity);
        self.types.extend(other.types);
        self
    }

    fn repeated(mut self, at_least_once: bool) -> Slot {
        self.quantity = self.quantity.repeated(at_least_once);
        self
    }

    fn into_info(self) -> FieldInfo {
        FieldInfo {
            multiple: self.quantity.multiple,
            required: self.quantity.required,
            types: self.types.into_iter().collect(),
        }
    }
}

/// What one rule body contributes to the node that contains it.
#[derive(Debug, Clone, Default)]
struct Summary {
    fields: BTreeMap<String, Slot>,
    /// Visible named nodes outside fields.
    children: Slot,
    /// Every visible node, named or not, fields included.
    nodes: Slot,
}

impl Summary {
    fn named(kind: &str) -> Summary {
        let slot = Slot::one(NodeTypeRef::named(kind));
        Summary {
            fields: BTreeMap::new(),
            children: slot.clone(),
            nodes: slot,
        }
    }

    fn anonymous(kind: Option<&str>) -> Summary {
        kind.map_or_else(Summary::default, |kind| Summary {
            nodes: Slot::one(NodeTypeRef::anonymous(kind)),
            ..Summary::default()
        })
    }

    fn then(self, next: Summary) -> Summary {
        Summary {
            fields: merge_fields(self.fields, next.fields, Slot::then),
            children: self.children.then(next.children),
            nodes: self.nodes.then(next.nodes),
        }
    }

    fn or(self, other: Summary) -> Summary {
        Summary {
            fields: merge_fields(self.fields, other.fields, Slot::or),
            children: self.children.or(other.children),
            nodes: self.nodes.or(other.nodes),
        }
    }

    fn repeated(self, at_least_once: bool) -> Summary {
        Summary {
            fields: self
                .fields
                .into_iter()
                .map(|(name, slot)| (name, slot.repeated(at_least_once)))
                .collect(),
            children: self.children.repeated(at_least_once),
            nodes: self.nodes.repeated(at_least_once),
        }
    }
}

fn merge_fields(
    left: BTreeMap<String, Slot>,
    mut right: BTreeMap<String, Slot>,
    combine: fn(Slot, Slot) -> Slot,
) -> BTreeMap<String, Slot> {
    let mut merged = BTreeMap::new();
    for (name, slot) in left {
        let other = right.remove(&name).unwrap_or_default();
        merged.insert(name, combine(slot, other));
    }
    for (name, slot) in right {
        merged.insert(name, combine(Slot::default(), slot));
    }
    merged
}

struct Summarizer<'g> {
    grammar: &'g Grammar,
    expanding: Vec<&'g str>,
}

impl<'g> Summarizer<'g> {
    /// The node type of a visible kind whose body is `rule`.
    fn node_type(&mut self, kind: &str, rule: &'g Rule) -> NodeType {
        if rule.is_lexical() {
            return NodeType::leaf(kind, true);
        }

        let summary = self.summarize(rule);
        NodeType {
            kind: kind.to_string(),
            named: true,
            fields: summary
                .fields
                .into_iter()
                .map(|(field, slot)| (field, slot.into_info()))
                .collect(),
            children: summary
                .children
                .quantity
                .exists
                .then(|| summary.children.into_info()),
        }
    }

    fn summarize(&mut self, rule: &'g Rule) -> Summary {
        match rule.rule_type {
            RuleType::Blank | RuleType::Pattern => Summary::default(),
            RuleType::String => Summary::anonymous(rule.string_value()),
            RuleType::Token | RuleType::ImmediateToken => {
                Summary::anonymous(rule.content.as_deref().and_then(Rule::string_value))
            }
            RuleType::Symbol => self.symbol(rule.symbol_name()),
            RuleType::Alias => match alias_name(rule) {
                Some(alias) if rule.named.unwrap_or(false) => Summary::named(alias),
                alias => Summary::anonymous(alias),
            },
            RuleType::Seq => rule
                .members
                .iter()
                .map(|member| self.summarize(member))
                .reduce(Summary::then)
                .unwrap_or_default(),
            RuleType::Choice => rule
                .members
                .iter()
                .map(|member| self.summarize(member))
                .reduce(Summary::or)
                .unwrap_or_default(),
            RuleType::Repeat => self.content(rule).repeated(false),
            RuleType::Repeat1 => self.content(rule).repeated(true),
            RuleType::Field => {
                let inner = self.content(rule);
                let Some(name) = rule.field_name() else {
                    return inner;
                };
                let mut fields = inner.fields;
                fields.insert(name.to_string(), inner.nodes.clone());
                Summary {
                    fields,
                    children: Slot::default(),
                    nodes: inner.nodes,
                }
            }
            RuleType::Prec
            | RuleType::PrecLeft
            | RuleType::PrecRight
            | RuleType::PrecDynamic
            | RuleType::Reserved => self.content(rule),
        }
    }

    fn content(&mut self, rule: &'g Rule) -> Summary {
        rule.content
            .as_deref()
            .map(|content| self.summarize(content))
            .unwrap_or_default()
    }

    fn symbol(&mut self, name: Option<&'g str>) -> Summary {
        let Some(name) = name.filter(|n| self.grammar.defines(n)) else {
            return Summary::default();
        };
        if !self.grammar.is_hidden(name) {
            return Summary::named(name);
        }
        // Hidden external tokens have no body to expand.
        let Some(target) = self.grammar.rule(name) else {
            return Summary::default();
        };
        if target.is_lexical() || self.expanding.contains(&name) {
            return Summary::default();
        }

        self.expanding.push(name);
        let summary = self.summarize(target);
        self.expanding.pop();
        summary
    }
}
