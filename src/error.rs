//! Crate error types.
//!
//! These cover misuse of the construction and configuration APIs only.
//! Problems in the modeled documents are never errors; they are reported as
//! [`Diagnostic`](crate::hir::Diagnostic)s.

use smol_str::SmolStr;
use thiserror::Error;

/// Rejected input while building a [`ModuleAst`](crate::hir::ModuleAst).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(SmolStr),
    #[error("reference text of {0} is empty")]
    EmptyReference(&'static str),
    #[error("array values cannot contain arrays (in '{0}')")]
    NestedArray(SmolStr),
}

/// Rejected analysis configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid analysis configuration: {0}")]
    Json(#[from] serde_json::Error),
}
