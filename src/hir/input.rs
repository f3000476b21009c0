//! The module index of one generation.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::ast::{ModuleAst, Node};
use super::ids::{Generation, NodeId};
use crate::base::FileId;

/// Read-only view of all loaded modules at one [`Generation`].
///
/// Never mutated after publication: [`with_module`](Self::with_module) and
/// [`without_module`](Self::without_module) return a new index, so readers
/// holding an `Arc<ModuleIndex>` are never raced by a reparse.
#[derive(Clone, Debug, Default)]
pub struct ModuleIndex {
    generation: Generation,
    /// Load order is preserved; it decides candidate order in scopes.
    modules: IndexMap<FileId, Arc<ModuleAst>>,
    /// Module name → first-loaded document declaring it.
    by_name: FxHashMap<SmolStr, FileId>,
}

impl ModuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this index with `ast` added (or replacing the previous
    /// version of its document), one generation later.
    pub fn with_module(&self, ast: Arc<ModuleAst>) -> Self {
        let mut modules = self.modules.clone();
        modules.insert(ast.file(), ast);
        Self::from_modules(self.generation.next(), modules)
    }

    /// A copy of this index without `file`, one generation later.
    pub fn without_module(&self, file: FileId) -> Self {
        let mut modules = self.modules.clone();
        modules.shift_remove(&file);
        Self::from_modules(self.generation.next(), modules)
    }

    fn from_modules(generation: Generation, modules: IndexMap<FileId, Arc<ModuleAst>>) -> Self {
        let mut by_name = FxHashMap::default();
        for (&file, ast) in &modules {
            by_name.entry(ast.name().clone()).or_insert(file);
        }
        Self {
            generation,
            modules,
            by_name,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn module(&self, file: FileId) -> Option<&Arc<ModuleAst>> {
        self.modules.get(&file)
    }

    pub fn module_by_name(&self, name: &str) -> Option<&Arc<ModuleAst>> {
        self.by_name.get(name).and_then(|file| self.modules.get(file))
    }

    /// Modules in load order.
    pub fn modules(&self) -> impl Iterator<Item = &Arc<ModuleAst>> + '_ {
        self.modules.values()
    }

    pub fn files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.modules.keys().copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.modules.get(&id.file)?.get(id.local)
    }

    pub fn contains(&self, file: FileId) -> bool {
        self.modules.contains_key(&file)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
