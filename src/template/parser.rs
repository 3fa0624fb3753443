//! Stack-based directive parser.

use super::ast::DirectiveNode;
use super::error::{BlockKind, TemplateError, TemplateResult};
use super::lexer::{TokenKind, tokenize};

struct Frame {
    kind: BlockKind,
    key: String,
    offset: usize,
    len: usize,
    body: Vec<DirectiveNode>,
}

/// Parse template source into a directive tree.
///
/// Every opener must be closed by a marker of the same kind and key, in
/// stack order. Same-key blocks may nest.
pub fn parse_template(source: &str) -> TemplateResult<Vec<DirectiveNode>> {
    let mut root = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for token in tokenize(source) {
        let node = match token.kind {
            TokenKind::Text(text) => DirectiveNode::Text(text.to_string()),
            TokenKind::Variable(path) => DirectiveNode::variable(path),
            TokenKind::Open { kind, key } => {
                stack.push(Frame {
                    kind,
                    key: key.to_string(),
                    offset: token.offset,
                    len: token.len,
                    body: Vec::new(),
                });
                continue;
            }
            TokenKind::Close { kind, key } => {
                let Some(frame) = stack.pop() else {
                    return Err(TemplateError::UnexpectedClose {
                        key: key.to_string(),
                        kind,
                        offset: token.offset,
                        src: source.to_string(),
                        span: (token.offset, token.len).into(),
                    });
                };
                if frame.kind != kind || frame.key != key {
                    return Err(TemplateError::Mismatched {
                        expected: frame.key,
                        found: key.to_string(),
                        kind: frame.kind,
                        offset: token.offset,
                        src: source.to_string(),
                        span: (token.offset, token.len).into(),
                    });
                }
                match frame.kind {
                    BlockKind::If => DirectiveNode::If {
                        key: frame.key,
                        body: frame.body,
                    },
                    BlockKind::Loop => DirectiveNode::Loop {
                        key: frame.key,
                        body: frame.body,
                    },
                }
            }
        };

        match stack.last_mut() {
            Some(frame) => frame.body.push(node),
            None => root.push(node),
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(TemplateError::Unclosed {
            key: frame.key,
            kind: frame.kind,
            offset: frame.offset,
            src: source.to_string(),
            span: (frame.offset, frame.len).into(),
        });
    }

    tracing::debug!(nodes = root.len(), "parsed template");
    Ok(root)
}
