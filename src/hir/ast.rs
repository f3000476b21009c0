//! AST store: one immutable node arena per module document.
//!
//! The external parser produces one [`ModuleAst`] per source file. Nodes are
//! allocated in document pre-order and never change afterwards; semantic
//! passes address them through [`NodeId`]s and keep their own memo tables.
//!
//! Cross-references are stored as [`Reference`] slots holding the source text
//! only. Every node kind has at most one such slot, so a reference site is
//! identified by the node alone (see [`NodeKind::reference`]).

use std::fmt;

use smol_str::SmolStr;

use super::ids::{LocalNodeId, NodeId};
use crate::base::{FileId, TextRange};

// ============================================================================
// REFERENCES
// ============================================================================

/// An unresolved cross-reference as written in the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub text: SmolStr,
    pub range: TextRange,
}

impl Reference {
    pub fn new(text: impl Into<SmolStr>, range: TextRange) -> Self {
        Self {
            text: text.into(),
            range,
        }
    }
}

/// The grammar property that holds a reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RefProperty {
    FromModule,
    Imported,
    Ref,
    EntityRef,
    EnumerationRef,
    LiteralRef,
    MemberRef,
}

impl RefProperty {
    pub fn as_str(self) -> &'static str {
        match self {
            RefProperty::FromModule => "fromModule",
            RefProperty::Imported => "imported",
            RefProperty::Ref => "ref",
            RefProperty::EntityRef => "entityRef",
            RefProperty::EnumerationRef => "enumerationRef",
            RefProperty::LiteralRef => "literalRef",
            RefProperty::MemberRef => "memberRef",
        }
    }
}

impl fmt::Display for RefProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// MEMBER DATA
// ============================================================================

/// `(lowerBound, upperBound, bound)` of a member.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Cardinality {
    pub lower: Option<u64>,
    pub upper: Option<u64>,
    /// The member holds an array of values.
    pub bound: bool,
}

impl Cardinality {
    /// Lower bound with a missing value read as `0`.
    pub fn min(&self) -> u64 {
        self.lower.unwrap_or(0)
    }

    /// Upper bound with a missing value read as unbounded.
    pub fn max(&self) -> u64 {
        self.upper.unwrap_or(u64::MAX)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemberKind {
    /// Primitive or enumeration typed.
    Attribute,
    /// Entity typed; `contains` marks composition rather than association.
    Reference { contains: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemberData {
    pub name: SmolStr,
    pub kind: MemberKind,
    /// One of the type nodes.
    pub member_type: LocalNodeId,
    pub cardinality: Cardinality,
    pub unique: bool,
    pub ordered: bool,
    /// Default value node.
    pub default: Option<LocalNodeId>,
}

impl MemberData {
    pub fn is_attribute(&self) -> bool {
        self.kind == MemberKind::Attribute
    }
}

// ============================================================================
// NODES
// ============================================================================

/// Every node kind the Kerno grammar produces.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Module {
        name: SmolStr,
        imports: Vec<LocalNodeId>,
        classifiers: Vec<LocalNodeId>,
    },
    Import {
        from_module: Reference,
        items: Vec<LocalNodeId>,
    },
    ClassifierImport {
        imported: Reference,
        alias: Option<SmolStr>,
    },
    Entity {
        name: SmolStr,
        /// External id; instances bind to entities through it.
        id: Option<SmolStr>,
        members: Vec<LocalNodeId>,
    },
    Enumeration {
        name: SmolStr,
        literals: Vec<LocalNodeId>,
    },
    EnumerationLiteral {
        name: SmolStr,
    },
    Member(MemberData),

    BooleanType,
    IntegerType,
    FloatType,
    StringType,
    EnumerationType {
        enumeration: Reference,
    },
    ReferenceType {
        target: Reference,
    },

    Instance {
        name: SmolStr,
        entity: Reference,
        members: Vec<LocalNodeId>,
    },
    InstanceMember {
        member: Reference,
        value: LocalNodeId,
    },

    BooleanValue(bool),
    IntegerValue(i64),
    FloatValue(f64),
    StringValue(SmolStr),
    EnumerationLiteralValue {
        literal: Reference,
    },
    ArrayValue {
        elements: Vec<LocalNodeId>,
    },
    ContainsValue {
        target: Reference,
    },
}

/// Fieldless mirror of [`NodeKind`], used in messages and diagnostic payloads.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeTag {
    Module,
    Import,
    ClassifierImport,
    Entity,
    Enumeration,
    EnumerationLiteral,
    AttributeMember,
    ReferenceMember,
    BooleanType,
    IntegerType,
    FloatType,
    StringType,
    EnumerationType,
    ReferenceType,
    Instance,
    InstanceMember,
    BooleanValue,
    IntegerValue,
    FloatValue,
    StringValue,
    EnumerationLiteralValue,
    ArrayValue,
    ContainsValue,
}

impl NodeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeTag::Module => "Module",
            NodeTag::Import => "Import",
            NodeTag::ClassifierImport => "ClassifierImport",
            NodeTag::Entity => "Entity",
            NodeTag::Enumeration => "Enumeration",
            NodeTag::EnumerationLiteral => "EnumerationLiteral",
            NodeTag::AttributeMember => "AttributeMember",
            NodeTag::ReferenceMember => "ReferenceMember",
            NodeTag::BooleanType => "BooleanType",
            NodeTag::IntegerType => "IntegerType",
            NodeTag::FloatType => "FloatType",
            NodeTag::StringType => "StringType",
            NodeTag::EnumerationType => "EnumerationType",
            NodeTag::ReferenceType => "ReferenceType",
            NodeTag::Instance => "Instance",
            NodeTag::InstanceMember => "InstanceMember",
            NodeTag::BooleanValue => "BooleanValue",
            NodeTag::IntegerValue => "IntegerValue",
            NodeTag::FloatValue => "FloatValue",
            NodeTag::StringValue => "StringValue",
            NodeTag::EnumerationLiteralValue => "EnumerationLiteralValue",
            NodeTag::ArrayValue => "ArrayValue",
            NodeTag::ContainsValue => "ContainsValue",
        }
    }
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NodeKind {
    pub fn tag(&self) -> NodeTag {
        match self {
            NodeKind::Module { .. } => NodeTag::Module,
            NodeKind::Import { .. } => NodeTag::Import,
            NodeKind::ClassifierImport { .. } => NodeTag::ClassifierImport,
            NodeKind::Entity { .. } => NodeTag::Entity,
            NodeKind::Enumeration { .. } => NodeTag::Enumeration,
            NodeKind::EnumerationLiteral { .. } => NodeTag::EnumerationLiteral,
            NodeKind::Member(data) if data.is_attribute() => NodeTag::AttributeMember,
            NodeKind::Member(_) => NodeTag::ReferenceMember,
            NodeKind::BooleanType => NodeTag::BooleanType,
            NodeKind::IntegerType => NodeTag::IntegerType,
            NodeKind::FloatType => NodeTag::FloatType,
            NodeKind::StringType => NodeTag::StringType,
            NodeKind::EnumerationType { .. } => NodeTag::EnumerationType,
            NodeKind::ReferenceType { .. } => NodeTag::ReferenceType,
            NodeKind::Instance { .. } => NodeTag::Instance,
            NodeKind::InstanceMember { .. } => NodeTag::InstanceMember,
            NodeKind::BooleanValue(_) => NodeTag::BooleanValue,
            NodeKind::IntegerValue(_) => NodeTag::IntegerValue,
            NodeKind::FloatValue(_) => NodeTag::FloatValue,
            NodeKind::StringValue(_) => NodeTag::StringValue,
            NodeKind::EnumerationLiteralValue { .. } => NodeTag::EnumerationLiteralValue,
            NodeKind::ArrayValue { .. } => NodeTag::ArrayValue,
            NodeKind::ContainsValue { .. } => NodeTag::ContainsValue,
        }
    }

    /// The declared name, for named nodes.
    pub fn name(&self) -> Option<&SmolStr> {
        match self {
            NodeKind::Module { name, .. }
            | NodeKind::Entity { name, .. }
            | NodeKind::Enumeration { name, .. }
            | NodeKind::EnumerationLiteral { name }
            | NodeKind::Instance { name, .. } => Some(name),
            NodeKind::Member(data) => Some(&data.name),
            _ => None,
        }
    }

    /// The node's cross-reference slot, if it has one.
    pub fn reference(&self) -> Option<(&Reference, RefProperty)> {
        match self {
            NodeKind::Import { from_module, .. } => Some((from_module, RefProperty::FromModule)),
            NodeKind::ClassifierImport { imported, .. } => Some((imported, RefProperty::Imported)),
            NodeKind::EnumerationType { enumeration } => {
                Some((enumeration, RefProperty::EnumerationRef))
            }
            NodeKind::ReferenceType { target } => Some((target, RefProperty::Ref)),
            NodeKind::Instance { entity, .. } => Some((entity, RefProperty::EntityRef)),
            NodeKind::InstanceMember { member, .. } => Some((member, RefProperty::MemberRef)),
            NodeKind::EnumerationLiteralValue { literal } => {
                Some((literal, RefProperty::LiteralRef))
            }
            NodeKind::ContainsValue { target } => Some((target, RefProperty::Ref)),
            _ => None,
        }
    }

    /// Whether this node is a classifier (a direct, named module member).
    pub fn is_classifier(&self) -> bool {
        matches!(
            self,
            NodeKind::Entity { .. } | NodeKind::Enumeration { .. } | NodeKind::Instance { .. }
        )
    }

    pub fn is_value(&self) -> bool {
        matches!(
            self,
            NodeKind::BooleanValue(_)
                | NodeKind::IntegerValue(_)
                | NodeKind::FloatValue(_)
                | NodeKind::StringValue(_)
                | NodeKind::EnumerationLiteralValue { .. }
                | NodeKind::ArrayValue { .. }
                | NodeKind::ContainsValue { .. }
        )
    }

    /// Child nodes in document order.
    pub fn children(&self) -> Vec<LocalNodeId> {
        match self {
            NodeKind::Module {
                imports,
                classifiers,
                ..
            } => imports.iter().chain(classifiers).copied().collect(),
            NodeKind::Import { items, .. } => items.clone(),
            NodeKind::Entity { members, .. } | NodeKind::Instance { members, .. } => {
                members.clone()
            }
            NodeKind::Enumeration { literals, .. } => literals.clone(),
            NodeKind::Member(data) => std::iter::once(data.member_type)
                .chain(data.default)
                .collect(),
            NodeKind::InstanceMember { value, .. } => vec![*value],
            NodeKind::ArrayValue { elements } => elements.clone(),
            _ => Vec::new(),
        }
    }
}

/// One arena slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<LocalNodeId>,
    pub range: TextRange,
}

impl Node {
    pub fn name(&self) -> Option<&SmolStr> {
        self.kind.name()
    }

    pub fn tag(&self) -> NodeTag {
        self.kind.tag()
    }
}

// ============================================================================
// MODULE AST
// ============================================================================

/// The parsed tree of one module document.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleAst {
    file: FileId,
    nodes: Vec<Node>,
}

impl ModuleAst {
    /// Wrap an arena whose first node is the `Module` root.
    pub(crate) fn from_nodes(file: FileId, nodes: Vec<Node>) -> Self {
        debug_assert!(
            matches!(nodes.first().map(|n| &n.kind), Some(NodeKind::Module { .. })),
            "module arena must start with its Module node"
        );
        Self { file, nodes }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn root(&self) -> LocalNodeId {
        LocalNodeId::new(0)
    }

    pub fn root_id(&self) -> NodeId {
        self.id(self.root())
    }

    /// Name of the module.
    pub fn name(&self) -> &SmolStr {
        match &self.nodes[0].kind {
            NodeKind::Module { name, .. } => name,
            _ => unreachable!("module arena must start with its Module node"),
        }
    }

    pub fn imports(&self) -> &[LocalNodeId] {
        match &self.nodes[0].kind {
            NodeKind::Module { imports, .. } => imports,
            _ => &[],
        }
    }

    pub fn classifiers(&self) -> &[LocalNodeId] {
        match &self.nodes[0].kind {
            NodeKind::Module { classifiers, .. } => classifiers,
            _ => &[],
        }
    }

    pub fn id(&self, local: LocalNodeId) -> NodeId {
        NodeId::new(self.file, local)
    }

    pub fn get(&self, local: LocalNodeId) -> Option<&Node> {
        self.nodes.get(local.index())
    }

    /// Panics on ids from another arena.
    pub fn node(&self, local: LocalNodeId) -> &Node {
        &self.nodes[local.index()]
    }

    pub fn kind(&self, local: LocalNodeId) -> &NodeKind {
        &self.node(local).kind
    }

    pub fn parent(&self, local: LocalNodeId) -> Option<LocalNodeId> {
        self.node(local).parent
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, local: LocalNodeId) -> impl Iterator<Item = LocalNodeId> + '_ {
        std::iter::successors(self.parent(local), move |&n| self.parent(n))
    }

    /// All nodes of the document in pre-order, root first.
    pub fn preorder(&self) -> Vec<LocalNodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(next) = stack.pop() {
            order.push(next);
            let children = self.kind(next).children();
            stack.extend(children.into_iter().rev());
        }
        order
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct classifier with the given name, first declared wins.
    pub fn classifier_named(&self, name: &str) -> Option<LocalNodeId> {
        self.classifiers()
            .iter()
            .copied()
            .find(|&c| self.kind(c).name().is_some_and(|n| n == name))
    }
}
