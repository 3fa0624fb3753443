//! Rendering a directive tree against a [`Context`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Record, display_value};

use super::ast::DirectiveNode;
use super::context::{Context, Scope};

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// Per-element test used by [`Condition::Any`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// The element field is truthy.
    Truthy,
    /// The element field equals `value`.
    Equals { value: Value },
    /// The element field's display text contains `value`, ignoring case.
    Contains { value: String },
}

impl Predicate {
    fn holds(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Truthy => value.is_some_and(is_truthy_value),
            Self::Equals { value: expected } => value == Some(expected),
            Self::Contains { value: needle } => value.is_some_and(|v| {
                display_value(v)
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            }),
        }
    }
}

/// A named truthiness rule for `<OPEN:name>` blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Condition {
    /// Boolean value at `path`.
    Flag { path: String },
    /// Non-empty array, object or trimmed string at `path`.
    NonEmpty { path: String },
    /// Some element of the array at `path` has a `field` satisfying `predicate`.
    Any {
        path: String,
        field: String,
        #[serde(default = "default_predicate")]
        predicate: Predicate,
    },
    /// Non-empty trimmed string at `path`.
    Text { path: String },
}

fn default_predicate() -> Predicate {
    Predicate::Truthy
}

impl Condition {
    pub fn evaluate(&self, context: &Context<'_>) -> bool {
        match self {
            Self::Flag { path } => matches!(context.resolve_str(path), Some(Value::Bool(true))),
            Self::NonEmpty { path } => match context.resolve_str(path) {
                Some(Value::Array(items)) => !items.is_empty(),
                Some(Value::Object(map)) => !map.is_empty(),
                Some(Value::String(s)) => !s.trim().is_empty(),
                _ => false,
            },
            Self::Any {
                path,
                field,
                predicate,
            } => match context.resolve_str(path) {
                Some(Value::Array(items)) => items
                    .iter()
                    .any(|item| predicate.holds(item.as_object().and_then(|o| o.get(field)))),
                _ => false,
            },
            Self::Text { path } => {
                matches!(context.resolve_str(path), Some(Value::String(s)) if !s.trim().is_empty())
            }
        }
    }
}

/// Caller-supplied rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderRules {
    /// Named truthiness rules consulted by conditional blocks.
    pub conditions: BTreeMap<String, Condition>,
    /// Names bound to the current item inside every loop.
    pub loop_aliases: Vec<String>,
}

impl Default for RenderRules {
    fn default() -> Self {
        Self {
            conditions: BTreeMap::new(),
            loop_aliases: ["file", "group", "update", "section", "link"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Generic truthiness of a JSON value.
pub fn is_truthy_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Whether the conditional block `key` renders in `context`.
///
/// Keys in the rules' condition table use their rule; any other key is the
/// generic truthiness of the value at that path.
pub fn is_truthy(context: &Context<'_>, key: &str, rules: &RenderRules) -> bool {
    match rules.conditions.get(key) {
        Some(condition) => condition.evaluate(context),
        None => context.resolve_str(key).is_some_and(is_truthy_value),
    }
}

/// Render `nodes` and post-process the result.
pub fn render(nodes: &[DirectiveNode], context: &Context<'_>, rules: &RenderRules) -> String {
    let mut out = String::new();
    render_into(&mut out, nodes, context, rules);
    post_process(&out)
}

/// Collapse runs of blank lines to a single blank line and trim.
pub fn post_process(text: &str) -> String {
    BLANK_RUN.replace_all(text, "\n\n").trim().to_string()
}

fn render_into(
    out: &mut String,
    nodes: &[DirectiveNode],
    context: &Context<'_>,
    rules: &RenderRules,
) {
    for node in nodes {
        match node {
            DirectiveNode::Text(text) => out.push_str(text),
            DirectiveNode::Variable { path, raw } => match context.resolve(path) {
                Some(value) => out.push_str(&display_value(value)),
                None => out.push_str(raw),
            },
            DirectiveNode::If { key, body } => {
                if is_truthy(context, key, rules) {
                    render_into(out, body, context, rules);
                }
            }
            DirectiveNode::Loop { key, body } => render_loop(out, key, body, context, rules),
        }
    }
}

fn render_loop(
    out: &mut String,
    key: &str,
    body: &[DirectiveNode],
    context: &Context<'_>,
    rules: &RenderRules,
) {
    let Some(Value::Array(items)) = context.resolve_str(key) else {
        return;
    };

    let last = items.len().saturating_sub(1);
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }

        let mut meta = Record::new();
        meta.insert(
            "loop".into(),
            serde_json::json!({
                "index": index,
                "number": index + 1,
                "first": index == 0,
                "last": index == last,
            }),
        );

        let mut scopes = vec![Scope::Alias {
            names: &rules.loop_aliases,
            value: item,
        }];
        if let Value::Object(fields) = item {
            scopes.push(Scope::Fields(fields));
        }
        scopes.push(Scope::Owned(meta));

        let child = Context::child(context, scopes);
        render_into(out, body, &child, rules);
    }
}
