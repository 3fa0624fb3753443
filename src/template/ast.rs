//! Parsed template tree.

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveNode {
    /// Literal text, emitted verbatim.
    Text(String),
    /// `{a.b.c}` substitution. `raw` is the marker as written, emitted when
    /// the path does not resolve.
    Variable { path: Vec<String>, raw: String },
    /// `<OPEN:key>` ... `<CLOSE:key>`.
    If { key: String, body: Vec<DirectiveNode> },
    /// `<LOOPOPEN:key>` ... `<LOOPCLOSE:key>`.
    Loop { key: String, body: Vec<DirectiveNode> },
}

impl DirectiveNode {
    pub fn variable(raw_path: &str) -> Self {
        Self::Variable {
            path: raw_path.split('.').map(str::to_string).collect(),
            raw: format!("{{{raw_path}}}"),
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        match self {
            Self::Text(_) | Self::Variable { .. } => 1,
            Self::If { body, .. } | Self::Loop { body, .. } => {
                1 + body.iter().map(Self::size).sum::<usize>()
            }
        }
    }
}

/// Names referenced by variables and blocks anywhere in `nodes`, in first-use order.
pub fn referenced_keys(nodes: &[DirectiveNode]) -> Vec<String> {
    fn walk(nodes: &[DirectiveNode], out: &mut Vec<String>) {
        for node in nodes {
            let name = match node {
                DirectiveNode::Text(_) => None,
                DirectiveNode::Variable { path, .. } => path.first().cloned(),
                DirectiveNode::If { key, .. } | DirectiveNode::Loop { key, .. } => {
                    Some(key.clone())
                }
            };
            if let Some(name) = name
                && !out.contains(&name)
            {
                out.push(name);
            }
            if let DirectiveNode::If { body, .. } | DirectiveNode::Loop { body, .. } = node {
                walk(body, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(nodes, &mut out);
    out
}
