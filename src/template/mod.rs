//! Directive template language.
//!
//! Templates are plain text with three kinds of markers:
//!
//! - `{path.to.value}` substitutes a value from the render context.
//! - `<OPEN:key>` ... `<CLOSE:key>` renders its body when `key` is truthy.
//! - `<LOOPOPEN:key>` ... `<LOOPCLOSE:key>` renders its body once per element
//!   of the array at `key`.
//!
//! Parsing builds a [`DirectiveNode`] tree with an explicit stack, so blocks
//! with the same key nest correctly.

pub mod ast;
pub mod batch;
pub mod context;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod render;

pub use ast::{DirectiveNode, referenced_keys};
pub use batch::{render_batch, render_entry};
pub use context::{Context, Scope};
pub use error::{BlockKind, TemplateError, TemplateResult};
pub use parser::parse_template;
pub use render::{Condition, Predicate, RenderRules, is_truthy, render};

use crate::model::{Entry, Record};

/// A template parsed once and rendered many times.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    nodes: Vec<DirectiveNode>,
}

impl Template {
    pub fn parse(source: impl Into<String>) -> TemplateResult<Self> {
        let source = source.into();
        let nodes = parse_template(&source)?;
        Ok(Self { source, nodes })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn nodes(&self) -> &[DirectiveNode] {
        &self.nodes
    }

    /// Number of nodes in the whole tree, nested bodies included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(DirectiveNode::size).sum()
    }

    pub fn render(&self, context: &Context<'_>, rules: &RenderRules) -> String {
        render(&self.nodes, context, rules)
    }

    pub fn render_entry(&self, entry: &Entry, ambient: &Record, rules: &RenderRules) -> String {
        render_entry(&self.nodes, entry, ambient, rules)
    }

    pub fn render_batch(&self, entries: &[Entry], ambient: &Record, rules: &RenderRules) -> String {
        render_batch(&self.nodes, entries, ambient, rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn template_renders_repeatedly() {
        let template = Template::parse("Hello {name}!").unwrap();
        let mut a = Record::new();
        a.insert("name".into(), json!("A"));
        let mut b = Record::new();
        b.insert("name".into(), json!("B"));
        let rules = RenderRules::default();
        assert_eq!(template.render(&Context::root(&a), &rules), "Hello A!");
        assert_eq!(template.render(&Context::root(&b), &rules), "Hello B!");
        assert_eq!(template.source(), "Hello {name}!");
        assert_eq!(template.node_count(), 3);
    }

    #[test]
    fn referenced_keys_in_first_use_order() {
        let source = "{title} <OPEN:notes>{notes}<CLOSE:notes> \
                      <LOOPOPEN:files>{file.url}<LOOPCLOSE:files> {title}";
        let template = Template::parse(source).unwrap();
        assert_eq!(referenced_keys(template.nodes()), ["title", "notes", "files", "file"]);
        // Seven top-level nodes plus one variable inside each block.
        assert_eq!(template.node_count(), 9);
    }
}
