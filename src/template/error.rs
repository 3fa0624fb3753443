//! Diagnostics for template parsing.

use std::fmt;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Kind of block directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    If,
    Loop,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::If => write!(f, "conditional"),
            Self::Loop => write!(f, "loop"),
        }
    }
}

/// Structural errors in a template source.
#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("closing {kind} marker for \"{key}\" at byte {offset} has no matching opener")]
    #[diagnostic(
        code(postsmith::template::unexpected_close),
        help("Remove the stray closing marker for \"{key}\" or add the matching opener before it.")
    )]
    UnexpectedClose {
        key: String,
        kind: BlockKind,
        offset: usize,
        #[source_code]
        src: String,
        #[label("no block is open here")]
        span: SourceSpan,
    },

    #[error("expected close of {kind} \"{expected}\" at byte {offset}, found \"{found}\"")]
    #[diagnostic(
        code(postsmith::template::mismatched),
        help("Blocks must close in reverse order of opening. Close \"{expected}\" first.")
    )]
    Mismatched {
        expected: String,
        found: String,
        kind: BlockKind,
        offset: usize,
        #[source_code]
        src: String,
        #[label("this closes the wrong block")]
        span: SourceSpan,
    },

    #[error("{kind} block \"{key}\" opened at byte {offset} is never closed")]
    #[diagnostic(
        code(postsmith::template::unclosed),
        help("Add the closing marker for \"{key}\" after the block body.")
    )]
    Unclosed {
        key: String,
        kind: BlockKind,
        offset: usize,
        #[source_code]
        src: String,
        #[label("opened here")]
        span: SourceSpan,
    },
}

impl TemplateError {
    /// Byte offset of the offending marker.
    pub fn offset(&self) -> usize {
        match self {
            Self::UnexpectedClose { offset, .. }
            | Self::Mismatched { offset, .. }
            | Self::Unclosed { offset, .. } => *offset,
        }
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;
