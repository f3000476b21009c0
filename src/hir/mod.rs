//! HIR — the semantic model of Kerno modules.
//!
//! Parsed modules enter as immutable [`ModuleAst`] arenas and are indexed per
//! [`Generation`]. Three passes run over them, all read-only:
//!
//! 1. **Resolution** ([`Resolver`]) - reference slots to target nodes
//! 2. **Typing** ([`TypeSystem`]) - types of declarations and values
//! 3. **Validation** - uniqueness, cardinality, array and completeness checks
//!
//! ## Usage
//!
//! ```ignore
//! use kerno::hir::{AnalysisHost, ModuleBuilder};
//!
//! let host = AnalysisHost::new();
//! let file = host.file_id("shapes.kerno");
//! host.set_module(ModuleBuilder::new(file, "shapes")?.finish());
//!
//! let analysis = host.analysis();
//! let diagnostics = analysis.check_file(file);
//! ```

mod analysis;
mod ast;
mod builder;
mod diagnostics;
mod ids;
mod input;
mod resolve;
mod source;
mod types;
mod validate;

pub use analysis::{Analysis, AnalysisHost};
pub use ast::{
    Cardinality, MemberData, MemberKind, ModuleAst, Node, NodeKind, NodeTag, RefProperty, Reference,
};
pub use builder::{EntitySpec, ImportSpec, InstanceSpec, MemberSpec, ModuleBuilder, TypeSpec, ValueSpec};
pub use diagnostics::{
    Diagnostic, DiagnosticCollector, DiagnosticData, LinkingFailure, RelatedInfo, Severity, codes,
};
pub use ids::{Generation, LocalNodeId, NodeId};
pub use input::ModuleIndex;
pub use resolve::{ResolveResult, Resolver, Scope, ScopeEntry, expected_kind};
pub use source::FileSet;
pub use types::{Field, Ty, TypeMismatch, TypeSystem, ValueKind};
