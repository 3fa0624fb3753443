//! Rendering every stored entry through one template.

use crate::model::{Entry, Record};

use super::ast::DirectiveNode;
use super::context::Context;
use super::render::{RenderRules, render};

/// Render one entry with `ambient` values visible beneath its own fields.
pub fn render_entry(
    nodes: &[DirectiveNode],
    entry: &Entry,
    ambient: &Record,
    rules: &RenderRules,
) -> String {
    let record = entry.to_record();
    render(nodes, &Context::with_ambient(&record, ambient), rules)
}

/// Render each entry in order and join the results with `\n`.
pub fn render_batch(
    nodes: &[DirectiveNode],
    entries: &[Entry],
    ambient: &Record,
    rules: &RenderRules,
) -> String {
    tracing::debug!(entries = entries.len(), "rendering batch");
    entries
        .iter()
        .map(|entry| render_entry(nodes, entry, ambient, rules))
        .collect::<Vec<_>>()
        .join("\n")
}
