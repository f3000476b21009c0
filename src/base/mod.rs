//! Foundation types for the Kerno semantic core.
//!
//! - [`FileId`] - Identifier of one module document
//! - [`TextRange`], [`TextSize`] - Source positions
//! - [`LineCol`], [`LineIndex`] - Line/column conversion for diagnostics
//!
//! This module has NO dependencies on other kerno modules.

mod file_id;
mod span;

pub use file_id::FileId;
pub use span::{LineCol, LineIndex, LineRange, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
