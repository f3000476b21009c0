//! File set management for tracking module documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::base::{FileId, LineIndex};

/// Assigns stable [`FileId`]s to document paths and keeps the text needed to
/// turn diagnostic ranges into line/column positions.
#[derive(Debug, Default)]
pub struct FileSet {
    inner: RwLock<FileSetInner>,
}

#[derive(Debug, Default)]
struct FileSetInner {
    path_to_id: IndexMap<PathBuf, FileId>,
    id_to_path: IndexMap<FileId, PathBuf>,
    line_indexes: IndexMap<FileId, Arc<LineIndex>>,
    next_id: u32,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the FileId for a path.
    pub fn file_id(&self, path: &Path) -> FileId {
        // Fast path: read lock
        if let Some(&id) = self.inner.read().path_to_id.get(path) {
            return id;
        }

        let mut inner = self.inner.write();
        // Double-check
        if let Some(&id) = inner.path_to_id.get(path) {
            return id;
        }

        let id = FileId::new(inner.next_id);
        inner.next_id += 1;
        inner.path_to_id.insert(path.to_owned(), id);
        inner.id_to_path.insert(id, path.to_owned());
        id
    }

    pub fn path(&self, file: FileId) -> Option<PathBuf> {
        self.inner.read().id_to_path.get(&file).cloned()
    }

    /// Record the source text of a document.
    pub fn set_text(&self, file: FileId, text: &str) {
        let index = Arc::new(LineIndex::new(text));
        self.inner.write().line_indexes.insert(file, index);
    }

    pub fn line_index(&self, file: FileId) -> Option<Arc<LineIndex>> {
        self.inner.read().line_indexes.get(&file).cloned()
    }

    /// Forget a document. Its id is never reused.
    pub fn remove(&self, file: FileId) {
        let mut inner = self.inner.write();
        if let Some(path) = inner.id_to_path.swap_remove(&file) {
            inner.path_to_id.swap_remove(&path);
        }
        inner.line_indexes.swap_remove(&file);
    }

    pub fn len(&self) -> usize {
        self.inner.read().path_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
