//! Rich diagnostic error types for the extraction subsystem.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from field extraction, pattern inference and variant selection.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ExtractError {
    #[error("field \"{field}\" not found in source text")]
    #[diagnostic(
        code(postsmith::extract::not_found),
        severity(Warning),
        help(
            "The before/after anchors (or the regex override) did not locate a value. \
             Check the pattern against the variant's sample text, or re-infer it \
             by highlighting the value."
        )
    )]
    NotFound { field: String },

    #[error("invalid regex for field \"{field}\": {message}")]
    #[diagnostic(
        code(postsmith::extract::pattern),
        severity(Warning),
        help(
            "The regex override \"{pattern}\" does not compile. The field is skipped \
             and treated as missing until the pattern is fixed."
        )
    )]
    Pattern {
        field: String,
        pattern: String,
        message: String,
    },

    #[error("no variants configured")]
    #[diagnostic(
        code(postsmith::extract::no_variants),
        help("Every profile needs at least one [[variants]] table before text can be parsed.")
    )]
    NoVariants,

    #[error("variant \"{variant}\" has no primary-key field")]
    #[diagnostic(
        code(postsmith::extract::missing_primary_key),
        help(
            "Multi-entry parsing groups blocks by their primary key. Mark exactly one \
             field with `primary_key = true`."
        )
    )]
    MissingPrimaryKey { variant: String },

    #[error("invalid selection {start}..{end} for text of {len} bytes")]
    #[diagnostic(
        code(postsmith::extract::invalid_selection),
        help(
            "Selection offsets are byte offsets into the full text. They must satisfy \
             start <= end <= length and fall on character boundaries."
        )
    )]
    InvalidSelection { start: usize, end: usize, len: usize },
}

impl ExtractError {
    /// Whether the failure only means "field missing" for the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Pattern { .. })
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
