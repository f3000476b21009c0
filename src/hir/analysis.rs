//! Analysis context over one generation of the module index.
//!
//! [`AnalysisHost`] is the mutable side: documents are loaded, replaced and
//! removed through it, and each change publishes a new [`ModuleIndex`]
//! generation. [`Analysis`] is an immutable snapshot of one generation that
//! answers semantic queries. Memoized results live in the snapshot, one
//! write-once slot per node, so dropping the snapshot is the whole
//! invalidation story.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use super::ast::{ModuleAst, Node, NodeKind};
use super::diagnostics::Diagnostic;
use super::ids::{Generation, NodeId};
use super::input::ModuleIndex;
use super::resolve::{ResolveResult, Resolver, Scope};
use super::source::FileSet;
use super::types::{Field, Ty, TypeSystem, ValueKind};
use super::validate;
use crate::base::{FileId, LineIndex};
use crate::config::AnalysisConfig;

// ============================================================================
// HOST
// ============================================================================

/// Owner of the loaded documents.
///
/// Only the module index is shared mutable state; it is swapped atomically as
/// a whole, so snapshots taken earlier keep reading their own generation.
#[derive(Debug, Default)]
pub struct AnalysisHost {
    files: FileSet,
    index: RwLock<Arc<ModuleIndex>>,
    config: Arc<AnalysisConfig>,
}

impl AnalysisHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self {
            config: Arc::new(config),
            ..Self::default()
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Stable id for a document path.
    pub fn file_id(&self, path: impl AsRef<Path>) -> FileId {
        self.files.file_id(path.as_ref())
    }

    /// Record document text for line/column conversion.
    pub fn set_text(&self, file: FileId, text: &str) {
        self.files.set_text(file, text);
    }

    pub fn line_index(&self, file: FileId) -> Option<Arc<LineIndex>> {
        self.files.line_index(file)
    }

    /// Load or replace the parsed module of a document.
    pub fn set_module(&self, ast: ModuleAst) -> Generation {
        let file = ast.file();
        let ast = Arc::new(ast);
        let mut index = self.index.write();
        *index = Arc::new(index.with_module(ast));
        let generation = index.generation();
        tracing::debug!(%file, %generation, modules = index.len(), "module loaded");
        generation
    }

    /// Unload a document.
    pub fn remove_module(&self, file: FileId) -> Generation {
        let mut index = self.index.write();
        if index.contains(file) {
            *index = Arc::new(index.without_module(file));
            tracing::debug!(%file, generation = %index.generation(), "module removed");
        }
        self.files.remove(file);
        index.generation()
    }

    pub fn generation(&self) -> Generation {
        self.index.read().generation()
    }

    /// Snapshot of the current generation.
    pub fn analysis(&self) -> Analysis {
        let index = Arc::clone(&self.index.read());
        Analysis::new(index, Arc::clone(&self.config))
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Write-once memo slots of one document.
#[derive(Debug)]
struct FileCaches {
    resolved: Vec<OnceCell<ResolveResult>>,
    types: Vec<OnceCell<Option<Ty>>>,
    /// Classifiers visible anywhere in the document.
    classifier_scope: OnceCell<Scope>,
}

impl FileCaches {
    fn new(len: usize) -> Self {
        Self {
            resolved: (0..len).map(|_| OnceCell::new()).collect(),
            types: (0..len).map(|_| OnceCell::new()).collect(),
            classifier_scope: OnceCell::new(),
        }
    }
}

/// Semantic queries over one generation.
///
/// `Analysis` is `Send + Sync`: documents can be checked from several threads
/// at once. Two threads racing to fill the same memo slot compute the same
/// value, so whichever write lands first is kept.
#[derive(Debug)]
pub struct Analysis {
    index: Arc<ModuleIndex>,
    config: Arc<AnalysisConfig>,
    caches: FxHashMap<FileId, FileCaches>,
}

impl Analysis {
    pub fn new(index: Arc<ModuleIndex>, config: Arc<AnalysisConfig>) -> Self {
        let caches = index
            .modules()
            .map(|ast| (ast.file(), FileCaches::new(ast.len())))
            .collect();
        Self {
            index,
            config,
            caches,
        }
    }

    /// Snapshot of a fixed set of modules with the default configuration.
    pub fn from_modules(modules: impl IntoIterator<Item = ModuleAst>) -> Self {
        let index = modules
            .into_iter()
            .fold(ModuleIndex::new(), |index, ast| index.with_module(Arc::new(ast)));
        Self::new(Arc::new(index), Arc::default())
    }

    pub fn generation(&self) -> Generation {
        self.index.generation()
    }

    pub fn index(&self) -> &ModuleIndex {
        &self.index
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn module(&self, file: FileId) -> Option<&Arc<ModuleAst>> {
        self.index.module(file)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.node(id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id)?.parent?;
        Some(NodeId::new(id.file, parent))
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self)
    }

    pub fn types(&self) -> TypeSystem<'_> {
        TypeSystem::new(self)
    }

    /// Resolve the reference held by `site`.
    pub fn resolve(&self, site: NodeId) -> &ResolveResult {
        self.resolver().resolve(site)
    }

    /// The node `site` refers to, when it resolves to exactly one target.
    pub fn target(&self, site: NodeId) -> Option<NodeId> {
        self.resolve(site).target()
    }

    /// Candidates visible at a reference site; `None` when the site has no
    /// scope (not a reference, or an upstream reference is unresolved).
    pub fn candidates(&self, site: NodeId) -> Option<Scope> {
        self.resolver().scope(site)
    }

    /// Classifiers visible anywhere in a document.
    pub fn scope(&self, file: FileId) -> &Scope {
        self.resolver().classifier_scope(file)
    }

    /// Modules and classifiers exported by every other document.
    pub fn global_scope(&self, file: FileId) -> Scope {
        self.resolver().global_scope(file)
    }

    pub fn infer(&self, node: NodeId) -> Option<Ty> {
        self.types().infer(node)
    }

    pub fn value_kind(&self, member: NodeId) -> Option<ValueKind> {
        self.types().value_kind(member)
    }

    pub fn class_fields(&self, entity: NodeId) -> Vec<Field> {
        self.types().class_fields(entity)
    }

    pub fn field_type(&self, entity: NodeId, name: &str) -> Option<Ty> {
        self.types().field_type(entity, name)
    }

    /// Every diagnostic of one document.
    pub fn check_file(&self, file: FileId) -> Vec<Diagnostic> {
        validate::check_file(self, file)
    }

    /// Check every loaded document in parallel; results in load order.
    pub fn check_all(&self) -> Vec<(FileId, Vec<Diagnostic>)> {
        let files: Vec<FileId> = self.index.files().collect();
        files
            .into_par_iter()
            .map(|file| (file, self.check_file(file)))
            .collect()
    }

    pub(crate) fn resolution_slot(&self, id: NodeId) -> Option<&OnceCell<ResolveResult>> {
        self.caches.get(&id.file)?.resolved.get(id.local.index())
    }

    pub(crate) fn type_slot(&self, id: NodeId) -> Option<&OnceCell<Option<Ty>>> {
        self.caches.get(&id.file)?.types.get(id.local.index())
    }

    pub(crate) fn classifier_scope_slot(&self, file: FileId) -> Option<&OnceCell<Scope>> {
        self.caches.get(&file).map(|c| &c.classifier_scope)
    }
}
