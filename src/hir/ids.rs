//! Node identities and analysis generations.

use std::fmt;

use crate::base::FileId;

/// A globally unique handle to an AST node.
///
/// Combines the document that owns the node with the node's index in that
/// document's arena. Handles are only meaningful for the generation that
/// produced them; reparsing a document allocates a fresh arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId {
    /// The document whose arena holds the node
    pub file: FileId,
    /// The index within that arena
    pub local: LocalNodeId,
}

impl NodeId {
    #[inline]
    pub const fn new(file: FileId, local: LocalNodeId) -> Self {
        Self { file, local }
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({:?}:{})", self.file, self.local.0)
    }
}

/// A document-local node index.
///
/// Assigned in document pre-order as nodes are allocated, so sorting local
/// ids gives declaration order.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct LocalNodeId(pub u32);

impl LocalNodeId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Position in the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LocalNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalNodeId({})", self.0)
    }
}

/// Version stamp of the module index.
///
/// Bumped whenever any document is loaded, replaced or removed. Memoized
/// resolution and type results are valid for exactly one generation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Generation(pub u64);

impl Generation {
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}
