//! Top-level diagnostic error for postsmith.
//!
//! Each subsystem owns its own error type with miette `#[diagnostic]` derives;
//! [`PostsmithError`] wraps them transparently so codes, help text and source
//! spans reach the user unchanged.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::extract::ExtractError;
use crate::paths::PathError;
use crate::storage::StorageError;
use crate::template::TemplateError;

#[derive(Debug, Error, Diagnostic)]
pub enum PostsmithError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),
}

pub type PostsmithResult<T> = std::result::Result<T, PostsmithError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_codes_pass_through() {
        let err: PostsmithError = ExtractError::NoVariants.into();
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("postsmith::extract::no_variants"));
        assert_eq!(err.to_string(), "no variants configured");
    }
}
