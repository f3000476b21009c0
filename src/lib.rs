//! # kerno-base
//!
//! Semantic core of the Kerno modeling language: scope resolution, type
//! checking and structural validation of parsed modules.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! hir     → AST store, resolution, types, validation, diagnostics
//!   ↓
//! config  → Analysis configuration
//!   ↓
//! base    → Primitives (FileId, TextRange, LineIndex)
//! ```
//!
//! Parsing is not part of this crate. A front end lowers each document into a
//! [`hir::ModuleAst`] (see [`hir::ModuleBuilder`]) and hands it to an
//! [`hir::AnalysisHost`].

/// Foundation types: FileId, TextRange, line/column conversion
pub mod base;

/// Analysis configuration
pub mod config;

/// Construction and configuration errors
pub mod error;

/// Semantic model: AST store, resolution, types, validation
pub mod hir;

pub use base::{FileId, LineCol, LineIndex, TextRange, TextSize};
pub use config::{AnalysisConfig, ArrayBoundPolicy};
pub use error::{BuildError, ConfigError};
pub use hir::{Analysis, AnalysisHost, Diagnostic, Severity};
