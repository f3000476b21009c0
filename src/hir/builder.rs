//! Construction API for [`ModuleAst`]s.
//!
//! This is the boundary the external parser (or a test) uses to hand a module
//! to the semantic core. Declarations are described with small spec values and
//! lowered into the arena in document pre-order. Nothing is resolved here.
//!
//! ```ignore
//! let mut b = ModuleBuilder::new(FileId::new(0), "shapes")?;
//! b.import(ImportSpec::from_module("colors").item("Color"))?;
//! b.entity(
//!     EntitySpec::new("Point")
//!         .id("pt")
//!         .member(MemberSpec::attribute("x", TypeSpec::Integer)),
//! )?;
//! b.instance(InstanceSpec::new("origin", "pt").set("x", 0))?;
//! let ast = b.finish();
//! ```

use smol_str::SmolStr;

use super::ast::{Cardinality, MemberData, MemberKind, ModuleAst, Node, NodeKind, Reference};
use super::ids::LocalNodeId;
use crate::base::{FileId, TextRange, TextSize};
use crate::error::BuildError;

// ============================================================================
// SPECS
// ============================================================================

/// Declared member type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeSpec {
    Boolean,
    Integer,
    Float,
    String,
    /// Reference to an enumeration by (possibly aliased) name.
    Enumeration(SmolStr),
    /// Reference to an entity by (possibly aliased) name.
    Reference(SmolStr),
}

impl TypeSpec {
    pub fn enumeration(name: impl Into<SmolStr>) -> Self {
        TypeSpec::Enumeration(name.into())
    }

    pub fn reference(name: impl Into<SmolStr>) -> Self {
        TypeSpec::Reference(name.into())
    }
}

/// A literal value as written in the source.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueSpec {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(SmolStr),
    /// Enumeration literal reference.
    Literal(SmolStr),
    Array(Vec<ValueSpec>),
    /// Composition reference.
    Contains(SmolStr),
}

impl ValueSpec {
    pub fn literal(name: impl Into<SmolStr>) -> Self {
        ValueSpec::Literal(name.into())
    }

    pub fn contains(target: impl Into<SmolStr>) -> Self {
        ValueSpec::Contains(target.into())
    }

    pub fn array<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ValueSpec>,
    {
        ValueSpec::Array(values.into_iter().map(Into::into).collect())
    }
}

impl From<bool> for ValueSpec {
    fn from(value: bool) -> Self {
        ValueSpec::Boolean(value)
    }
}

impl From<i64> for ValueSpec {
    fn from(value: i64) -> Self {
        ValueSpec::Integer(value)
    }
}

impl From<i32> for ValueSpec {
    fn from(value: i32) -> Self {
        ValueSpec::Integer(value.into())
    }
}

impl From<f64> for ValueSpec {
    fn from(value: f64) -> Self {
        ValueSpec::Float(value)
    }
}

impl From<&str> for ValueSpec {
    fn from(value: &str) -> Self {
        ValueSpec::String(value.into())
    }
}

/// A member declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberSpec {
    name: SmolStr,
    kind: MemberKind,
    ty: TypeSpec,
    cardinality: Cardinality,
    unique: bool,
    ordered: bool,
    default: Option<ValueSpec>,
}

impl MemberSpec {
    /// A `prop` member.
    pub fn attribute(name: impl Into<SmolStr>, ty: TypeSpec) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Attribute,
            ty,
            cardinality: Cardinality::default(),
            unique: false,
            ordered: false,
            default: None,
        }
    }

    /// A `refers` (or, with `contains`, a `contains`) member typed by an entity.
    pub fn reference(name: impl Into<SmolStr>, entity: impl Into<SmolStr>, contains: bool) -> Self {
        Self {
            kind: MemberKind::Reference { contains },
            ..Self::attribute(name, TypeSpec::Reference(entity.into()))
        }
    }

    pub fn lower(mut self, bound: u64) -> Self {
        self.cardinality.lower = Some(bound);
        self
    }

    pub fn upper(mut self, bound: u64) -> Self {
        self.cardinality.upper = Some(bound);
        self
    }

    /// `[lower..upper]` in one call.
    pub fn bounds(self, lower: u64, upper: u64) -> Self {
        self.lower(lower).upper(upper)
    }

    /// Mark the member as array-valued.
    pub fn array(mut self) -> Self {
        self.cardinality.bound = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<ValueSpec>) -> Self {
        self.default = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntitySpec {
    name: SmolStr,
    id: Option<SmolStr>,
    members: Vec<MemberSpec>,
}

impl EntitySpec {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            id: None,
            members: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<SmolStr>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn member(mut self, member: MemberSpec) -> Self {
        self.members.push(member);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSpec {
    from: SmolStr,
    items: Vec<(SmolStr, Option<SmolStr>)>,
}

impl ImportSpec {
    pub fn from_module(module: impl Into<SmolStr>) -> Self {
        Self {
            from: module.into(),
            items: Vec::new(),
        }
    }

    pub fn item(mut self, classifier: impl Into<SmolStr>) -> Self {
        self.items.push((classifier.into(), None));
        self
    }

    pub fn item_as(mut self, classifier: impl Into<SmolStr>, alias: impl Into<SmolStr>) -> Self {
        self.items.push((classifier.into(), Some(alias.into())));
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstanceSpec {
    name: SmolStr,
    entity: SmolStr,
    members: Vec<(SmolStr, ValueSpec)>,
}

impl InstanceSpec {
    /// `entity` is the entity's external id, not its name.
    pub fn new(name: impl Into<SmolStr>, entity: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            members: Vec::new(),
        }
    }

    pub fn set(mut self, member: impl Into<SmolStr>, value: impl Into<ValueSpec>) -> Self {
        self.members.push((member.into(), value.into()));
        self
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Lowers specs into a module arena.
///
/// Nodes get synthetic, strictly increasing ranges; a parser that knows the
/// real source positions overrides them with [`ModuleBuilder::set_range`].
#[derive(Debug)]
pub struct ModuleBuilder {
    file: FileId,
    nodes: Vec<Node>,
    cursor: u32,
}

impl ModuleBuilder {
    pub fn new(file: FileId, name: impl Into<SmolStr>) -> Result<Self, BuildError> {
        let name = name.into();
        if !name.split('.').all(is_identifier) {
            return Err(BuildError::InvalidIdentifier(name));
        }
        let mut builder = Self {
            file,
            nodes: Vec::new(),
            cursor: 0,
        };
        let width = name.len();
        builder.alloc(
            NodeKind::Module {
                name,
                imports: Vec::new(),
                classifiers: Vec::new(),
            },
            None,
            width,
        );
        Ok(builder)
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn import(&mut self, spec: ImportSpec) -> Result<LocalNodeId, BuildError> {
        self.atomically(|b| b.lower_import(spec))
    }

    pub fn entity(&mut self, spec: EntitySpec) -> Result<LocalNodeId, BuildError> {
        self.atomically(|b| b.lower_entity(spec))
    }

    pub fn enumeration<I, S>(&mut self, name: impl Into<SmolStr>, literals: I) -> Result<LocalNodeId, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let name = name.into();
        self.atomically(|b| b.lower_enumeration(name, literals))
    }

    pub fn instance(&mut self, spec: InstanceSpec) -> Result<LocalNodeId, BuildError> {
        self.atomically(|b| b.lower_instance(spec))
    }

    /// Override the synthetic range of a node (and of its reference slot).
    pub fn set_range(&mut self, node: LocalNodeId, range: TextRange) {
        if let Some(slot) = self.nodes.get_mut(node.index()) {
            slot.range = range;
        }
        self.patch_reference_range(node);
    }

    pub fn finish(self) -> ModuleAst {
        ModuleAst::from_nodes(self.file, self.nodes)
    }

    // ------------------------------------------------------------------------

    /// Runs one declaration's lowering; on error the arena is left as it was.
    fn atomically<T>(&mut self, lower: impl FnOnce(&mut Self) -> Result<T, BuildError>) -> Result<T, BuildError> {
        let (len, cursor) = (self.nodes.len(), self.cursor);
        let result = lower(self);
        if result.is_err() {
            self.nodes.truncate(len);
            self.cursor = cursor;
        }
        result
    }

    fn lower_import(&mut self, spec: ImportSpec) -> Result<LocalNodeId, BuildError> {
        let root = LocalNodeId::new(0);
        let from_module = self.reference(&spec.from, "an import")?;
        let import = self.alloc(
            NodeKind::Import {
                from_module,
                items: Vec::new(),
            },
            Some(root),
            spec.from.len(),
        );
        self.patch_reference_range(import);

        let mut items = Vec::with_capacity(spec.items.len());
        for (classifier, alias) in spec.items {
            if let Some(alias) = &alias {
                check_identifier(alias)?;
            }
            let imported = self.reference(&classifier, "a classifier import")?;
            let item = self.alloc(
                NodeKind::ClassifierImport { imported, alias },
                Some(import),
                classifier.len(),
            );
            self.patch_reference_range(item);
            items.push(item);
        }
        if let NodeKind::Import { items: slot, .. } = &mut self.nodes[import.index()].kind {
            *slot = items;
        }
        if let NodeKind::Module { imports, .. } = &mut self.nodes[root.index()].kind {
            imports.push(import);
        }
        Ok(import)
    }

    fn lower_entity(&mut self, spec: EntitySpec) -> Result<LocalNodeId, BuildError> {
        check_identifier(&spec.name)?;
        let width = spec.name.len();
        let entity = self.alloc(
            NodeKind::Entity {
                name: spec.name,
                id: spec.id,
                members: Vec::new(),
            },
            Some(LocalNodeId::new(0)),
            width,
        );
        let mut members = Vec::with_capacity(spec.members.len());
        for member in spec.members {
            members.push(self.lower_member(entity, member)?);
        }
        if let NodeKind::Entity { members: slot, .. } = &mut self.nodes[entity.index()].kind {
            *slot = members;
        }
        self.add_classifier(entity);
        Ok(entity)
    }

    fn lower_enumeration<I, S>(&mut self, name: SmolStr, literals: I) -> Result<LocalNodeId, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        check_identifier(&name)?;
        let width = name.len();
        let enumeration = self.alloc(
            NodeKind::Enumeration {
                name,
                literals: Vec::new(),
            },
            Some(LocalNodeId::new(0)),
            width,
        );
        let mut ids = Vec::new();
        for literal in literals {
            let literal = literal.into();
            check_identifier(&literal)?;
            let width = literal.len();
            ids.push(self.alloc(
                NodeKind::EnumerationLiteral { name: literal },
                Some(enumeration),
                width,
            ));
        }
        if let NodeKind::Enumeration { literals, .. } = &mut self.nodes[enumeration.index()].kind {
            *literals = ids;
        }
        self.add_classifier(enumeration);
        Ok(enumeration)
    }

    fn lower_instance(&mut self, spec: InstanceSpec) -> Result<LocalNodeId, BuildError> {
        check_identifier(&spec.name)?;
        let entity = self.reference(&spec.entity, "an instance")?;
        let width = spec.name.len();
        let instance = self.alloc(
            NodeKind::Instance {
                name: spec.name,
                entity,
                members: Vec::new(),
            },
            Some(LocalNodeId::new(0)),
            width,
        );
        self.patch_reference_range(instance);

        let mut members = Vec::with_capacity(spec.members.len());
        for (member_name, value) in spec.members {
            let member = self.reference(&member_name, "an instance member")?;
            let assignment = self.alloc(
                NodeKind::InstanceMember {
                    member,
                    value: LocalNodeId::new(0),
                },
                Some(instance),
                member_name.len(),
            );
            self.patch_reference_range(assignment);
            let value = self.lower_value(assignment, value, &member_name, false)?;
            if let NodeKind::InstanceMember { value: slot, .. } = &mut self.nodes[assignment.index()].kind {
                *slot = value;
            }
            members.push(assignment);
        }
        if let NodeKind::Instance { members: slot, .. } = &mut self.nodes[instance.index()].kind {
            *slot = members;
        }
        self.add_classifier(instance);
        Ok(instance)
    }

    fn alloc(&mut self, kind: NodeKind, parent: Option<LocalNodeId>, width: usize) -> LocalNodeId {
        let width = width.max(1) as u32;
        let start = TextSize::from(self.cursor);
        self.cursor += width + 1;
        let id = LocalNodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent,
            range: TextRange::at(start, TextSize::from(width)),
        });
        id
    }

    fn add_classifier(&mut self, classifier: LocalNodeId) {
        if let NodeKind::Module { classifiers, .. } = &mut self.nodes[0].kind {
            classifiers.push(classifier);
        }
    }

    fn reference(&self, text: &SmolStr, site: &'static str) -> Result<Reference, BuildError> {
        if text.trim().is_empty() {
            return Err(BuildError::EmptyReference(site));
        }
        Ok(Reference::new(text.clone(), TextRange::default()))
    }

    /// Reference slots share their owner's range.
    fn patch_reference_range(&mut self, node: LocalNodeId) {
        let Some(slot) = self.nodes.get_mut(node.index()) else {
            return;
        };
        let range = slot.range;
        let reference = match &mut slot.kind {
            NodeKind::Import { from_module: r, .. }
            | NodeKind::ClassifierImport { imported: r, .. }
            | NodeKind::EnumerationType { enumeration: r }
            | NodeKind::ReferenceType { target: r }
            | NodeKind::Instance { entity: r, .. }
            | NodeKind::InstanceMember { member: r, .. }
            | NodeKind::EnumerationLiteralValue { literal: r }
            | NodeKind::ContainsValue { target: r } => r,
            _ => return,
        };
        reference.range = range;
    }

    fn lower_member(&mut self, entity: LocalNodeId, spec: MemberSpec) -> Result<LocalNodeId, BuildError> {
        check_identifier(&spec.name)?;
        let width = spec.name.len();
        let member = self.alloc(
            NodeKind::Member(MemberData {
                name: spec.name.clone(),
                kind: spec.kind,
                member_type: LocalNodeId::new(0),
                cardinality: spec.cardinality,
                unique: spec.unique,
                ordered: spec.ordered,
                default: None,
            }),
            Some(entity),
            width,
        );
        let member_type = self.lower_type(member, spec.ty)?;
        let default = match spec.default {
            Some(value) => Some(self.lower_value(member, value, &spec.name, false)?),
            None => None,
        };
        if let NodeKind::Member(data) = &mut self.nodes[member.index()].kind {
            data.member_type = member_type;
            data.default = default;
        }
        Ok(member)
    }

    fn lower_type(&mut self, member: LocalNodeId, spec: TypeSpec) -> Result<LocalNodeId, BuildError> {
        let (kind, width) = match spec {
            TypeSpec::Boolean => (NodeKind::BooleanType, "boolean".len()),
            TypeSpec::Integer => (NodeKind::IntegerType, "integer".len()),
            TypeSpec::Float => (NodeKind::FloatType, "float".len()),
            TypeSpec::String => (NodeKind::StringType, "string".len()),
            TypeSpec::Enumeration(name) => {
                let width = name.len();
                let enumeration = self.reference(&name, "an enumeration type")?;
                (NodeKind::EnumerationType { enumeration }, width)
            }
            TypeSpec::Reference(name) => {
                let width = name.len();
                let target = self.reference(&name, "a reference type")?;
                (NodeKind::ReferenceType { target }, width)
            }
        };
        let node = self.alloc(kind, Some(member), width);
        self.patch_reference_range(node);
        Ok(node)
    }

    fn lower_value(
        &mut self,
        parent: LocalNodeId,
        spec: ValueSpec,
        owner: &SmolStr,
        in_array: bool,
    ) -> Result<LocalNodeId, BuildError> {
        let (kind, width) = match spec {
            ValueSpec::Boolean(b) => (NodeKind::BooleanValue(b), if b { 4 } else { 5 }),
            ValueSpec::Integer(i) => (NodeKind::IntegerValue(i), i.to_string().len()),
            ValueSpec::Float(f) => (NodeKind::FloatValue(f), f.to_string().len()),
            ValueSpec::String(s) => {
                let width = s.len() + 2;
                (NodeKind::StringValue(s), width)
            }
            ValueSpec::Literal(name) => {
                let width = name.len();
                let literal = self.reference(&name, "an enumeration literal value")?;
                (NodeKind::EnumerationLiteralValue { literal }, width)
            }
            ValueSpec::Contains(name) => {
                let width = name.len();
                let target = self.reference(&name, "a contains value")?;
                (NodeKind::ContainsValue { target }, width)
            }
            ValueSpec::Array(values) => {
                if in_array {
                    return Err(BuildError::NestedArray(owner.clone()));
                }
                let array = self.alloc(
                    NodeKind::ArrayValue {
                        elements: Vec::new(),
                    },
                    Some(parent),
                    1,
                );
                let mut elements = Vec::with_capacity(values.len());
                for value in values {
                    elements.push(self.lower_value(array, value, owner, true)?);
                }
                if let NodeKind::ArrayValue { elements: slot } = &mut self.nodes[array.index()].kind {
                    *slot = elements;
                }
                return Ok(array);
            }
        };
        let node = self.alloc(kind, Some(parent), width);
        self.patch_reference_range(node);
        Ok(node)
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first == '_' || unicode_ident::is_xid_start(first) => {
            chars.all(unicode_ident::is_xid_continue)
        }
        _ => false,
    }
}

fn check_identifier(text: &SmolStr) -> Result<(), BuildError> {
    if is_identifier(text) {
        Ok(())
    } else {
        Err(BuildError::InvalidIdentifier(text.clone()))
    }
}
