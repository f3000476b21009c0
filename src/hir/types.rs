//! Nominal and primitive types of declarations and values.

use std::fmt;

use smol_str::SmolStr;

use super::analysis::Analysis;
use super::ast::{MemberData, NodeKind};
use super::ids::NodeId;

/// A type assigned to a node.
///
/// Enumerations and entities are nominal: two types are equal only if they
/// name the same declaration node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Boolean,
    Integer,
    Float,
    String,
    /// The enumeration declaration.
    Enumeration(NodeId),
    /// The entity declaration (record type).
    Class(NodeId),
}

impl Ty {
    pub fn is_primitive(self) -> bool {
        matches!(self, Ty::Boolean | Ty::Integer | Ty::Float | Ty::String)
    }
}

/// The shape of value a member accepts, independent of resolution.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Boolean,
    Integer,
    Float,
    String,
    EnumerationLiteral,
    Contains,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::EnumerationLiteral => "enumeration literal",
            ValueKind::Contains => "contains",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field of an entity's record type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: SmolStr,
    pub member: NodeId,
}

/// A value that is not assignable where it appears.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeMismatch {
    /// The offending value node.
    pub node: NodeId,
    pub expected: String,
    pub found: String,
}

/// Type queries over one [`Analysis`] snapshot.
#[derive(Clone, Copy, Debug)]
pub struct TypeSystem<'a> {
    db: &'a Analysis,
}

impl<'a> TypeSystem<'a> {
    pub fn new(db: &'a Analysis) -> Self {
        Self { db }
    }

    /// The type of a node, memoized per snapshot.
    ///
    /// `None` means the type depends on an unresolved reference. Asking for
    /// the type of a node kind that has none (modules, imports, arrays) is a
    /// caller bug.
    pub fn infer(&self, node: NodeId) -> Option<Ty> {
        match self.db.type_slot(node) {
            Some(slot) => *slot.get_or_init(|| self.compute(node)),
            None => None,
        }
    }

    fn compute(&self, node: NodeId) -> Option<Ty> {
        let kind = self.db.kind(node)?;
        match kind {
            NodeKind::BooleanType | NodeKind::BooleanValue(_) => Some(Ty::Boolean),
            NodeKind::IntegerType | NodeKind::IntegerValue(_) => Some(Ty::Integer),
            NodeKind::FloatType | NodeKind::FloatValue(_) => Some(Ty::Float),
            NodeKind::StringType | NodeKind::StringValue(_) => Some(Ty::String),

            NodeKind::Enumeration { .. } => Some(Ty::Enumeration(node)),
            NodeKind::EnumerationLiteral { .. } => self.db.parent(node).map(Ty::Enumeration),
            NodeKind::Entity { .. } => Some(Ty::Class(node)),

            NodeKind::EnumerationType { .. } => {
                let target = self.db.target(node)?;
                matches!(self.db.kind(target), Some(NodeKind::Enumeration { .. }))
                    .then_some(Ty::Enumeration(target))
            }
            NodeKind::ReferenceType { .. } | NodeKind::ContainsValue { .. } | NodeKind::Instance { .. } => {
                let target = self.db.target(node)?;
                matches!(self.db.kind(target), Some(NodeKind::Entity { .. })).then_some(Ty::Class(target))
            }
            NodeKind::EnumerationLiteralValue { .. } => {
                let literal = self.db.target(node)?;
                self.infer(literal)
            }

            // Both kinds of member carry the declared type; assigned values
            // are checked against it, never inferred into it.
            NodeKind::Member(data) => self.infer(NodeId::new(node.file, data.member_type)),
            NodeKind::InstanceMember { .. } => {
                let member = self.db.target(node)?;
                self.declared_type(member)
            }

            NodeKind::Module { .. }
            | NodeKind::Import { .. }
            | NodeKind::ClassifierImport { .. }
            | NodeKind::ArrayValue { .. } => {
                debug_assert!(false, "no type rule for {}", kind.tag());
                None
            }
        }
    }

    /// The declared `memberType` of a member.
    pub fn declared_type(&self, member: NodeId) -> Option<Ty> {
        let data = self.member_data(member)?;
        self.infer(NodeId::new(member.file, data.member_type))
    }

    /// What kind of value a member accepts; answered without resolving.
    pub fn value_kind(&self, member: NodeId) -> Option<ValueKind> {
        let data = self.member_data(member)?;
        let kind = match self.db.kind(NodeId::new(member.file, data.member_type))? {
            NodeKind::BooleanType => ValueKind::Boolean,
            NodeKind::IntegerType => ValueKind::Integer,
            NodeKind::FloatType => ValueKind::Float,
            NodeKind::StringType => ValueKind::String,
            NodeKind::EnumerationType { .. } => ValueKind::EnumerationLiteral,
            NodeKind::ReferenceType { .. } => ValueKind::Contains,
            _ => return None,
        };
        Some(kind)
    }

    /// Fields of an entity's record type, in declaration order.
    ///
    /// Field types are not part of the result; look them up on demand with
    /// [`field_type`](Self::field_type) so that entities referring to each
    /// other (even across modules) never need an evaluation order.
    pub fn class_fields(&self, entity: NodeId) -> Vec<Field> {
        let Some(NodeKind::Entity { members, .. }) = self.db.kind(entity) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|&m| {
                let member = NodeId::new(entity.file, m);
                let name = self.db.node(member)?.name()?.clone();
                Some(Field { name, member })
            })
            .collect()
    }

    /// Declared type of the field `name`; the first declaration wins.
    pub fn field_type(&self, entity: NodeId, name: &str) -> Option<Ty> {
        let field = self.class_fields(entity).into_iter().find(|f| f.name == name)?;
        self.declared_type(field.member)
    }

    /// Name of a type as used in messages.
    pub fn type_name(&self, ty: Ty) -> String {
        match ty {
            Ty::Boolean => "boolean".to_owned(),
            Ty::Integer => "integer".to_owned(),
            Ty::Float => "float".to_owned(),
            Ty::String => "string".to_owned(),
            Ty::Enumeration(decl) | Ty::Class(decl) => self
                .db
                .node(decl)
                .and_then(|n| n.name())
                .map(|n| n.to_string())
                .unwrap_or_default(),
        }
    }

    /// Check the value assigned to a member (its default, or an instance
    /// assignment bound to it).
    ///
    /// Scalar members take a scalar of exactly the declared type. Array-valued
    /// members take an array whose elements are each checked on their own.
    /// Values whose type depends on an unresolved reference are skipped.
    pub fn check_assignment(&self, member: NodeId, value: NodeId) -> Vec<TypeMismatch> {
        let Some(data) = self.member_data(member) else {
            return Vec::new();
        };
        let Some(expected) = self.declared_type(member) else {
            return Vec::new();
        };
        let Some(value_kind) = self.db.kind(value) else {
            return Vec::new();
        };

        let mut mismatches = Vec::new();
        match (data.cardinality.bound, value_kind) {
            (false, NodeKind::ArrayValue { .. }) => mismatches.push(TypeMismatch {
                node: value,
                expected: self.type_name(expected),
                found: "array".to_owned(),
            }),
            (false, _) => mismatches.extend(self.check_scalar(expected, value)),
            (true, NodeKind::ArrayValue { elements }) => {
                for &element in elements {
                    mismatches.extend(self.check_scalar(expected, NodeId::new(value.file, element)));
                }
            }
            (true, _) => mismatches.push(TypeMismatch {
                node: value,
                expected: format!("Array of {}", self.type_name(expected)),
                found: self.found_name(value),
            }),
        }
        mismatches
    }

    fn check_scalar(&self, expected: Ty, value: NodeId) -> Option<TypeMismatch> {
        let found = self.infer(value)?;
        (found != expected).then(|| TypeMismatch {
            node: value,
            expected: self.type_name(expected),
            found: self.type_name(found),
        })
    }

    fn found_name(&self, value: NodeId) -> String {
        if let Some(ty) = self.infer(value) {
            return self.type_name(ty);
        }
        match self.db.kind(value) {
            Some(NodeKind::EnumerationLiteralValue { .. }) => ValueKind::EnumerationLiteral.to_string(),
            Some(NodeKind::ContainsValue { .. }) => ValueKind::Contains.to_string(),
            _ => "unknown".to_owned(),
        }
    }

    fn member_data(&self, member: NodeId) -> Option<&'a MemberData> {
        match self.db.kind(member)? {
            NodeKind::Member(data) => Some(data),
            _ => None,
        }
    }
}
