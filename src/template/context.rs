//! Scoped lookup for rendering.
//!
//! A [`Context`] is a stack of scopes searched first to last, then the parent
//! context. Loops push a child context per item; nothing is ever mutated.

use serde_json::Value;

use crate::model::Record;

/// One layer of names visible to a template.
#[derive(Debug, Clone)]
pub enum Scope<'a> {
    /// Borrowed record, e.g. an entry or the ambient values.
    Fields(&'a Record),
    /// Record built for this context only, e.g. loop metadata.
    Owned(Record),
    /// Every name in `names` resolves to `value`.
    Alias { names: &'a [String], value: &'a Value },
}

impl Scope<'_> {
    fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Fields(record) => record.get(name),
            Self::Owned(record) => record.get(name),
            Self::Alias { names, value } => names.iter().any(|n| n == name).then_some(*value),
        }
    }
}

/// Name resolution chain for one render.
#[derive(Debug, Clone, Default)]
pub struct Context<'a> {
    scopes: Vec<Scope<'a>>,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Context<'a> {
    /// Context over a single record.
    pub fn root(record: &'a Record) -> Self {
        Self {
            scopes: vec![Scope::Fields(record)],
            parent: None,
        }
    }

    /// Context over `record`, falling back to `ambient`.
    pub fn with_ambient(record: &'a Record, ambient: &'a Record) -> Self {
        Self {
            scopes: vec![Scope::Fields(record), Scope::Fields(ambient)],
            parent: None,
        }
    }

    /// Child context whose scopes shadow `parent`.
    pub fn child(parent: &'a Context<'a>, scopes: Vec<Scope<'a>>) -> Self {
        Self {
            scopes,
            parent: Some(parent),
        }
    }

    /// Look up a top-level name; the first scope that has it wins.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.parent.and_then(|parent| parent.lookup(name)))
    }

    /// Walk a dotted path. Any missing segment, or a non-object
    /// intermediate, yields `None`.
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (head, rest) = path.split_first()?;
        rest.iter().try_fold(self.lookup(head.as_ref())?, |value, segment| {
            value.as_object()?.get(segment.as_ref())
        })
    }

    /// [`Context::resolve`] for a `.`-separated path string.
    pub fn resolve_str(&self, path: &str) -> Option<&Value> {
        let segments: Vec<&str> = path.split('.').collect();
        self.resolve(&segments)
    }
}
