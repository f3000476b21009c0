//! Structural validation, one traversal per document.
//!
//! Checking a document happens in two passes over its nodes in document
//! order. The linking pass reports every reference that did not resolve or
//! resolved ambiguously. The validation pass then checks name uniqueness,
//! cardinalities, value types, arrays and instance completeness. Checks that
//! depend on an unresolved reference are skipped; the linking pass has
//! already reported the root cause.

use std::collections::hash_map::Entry;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::analysis::Analysis;
use super::ast::{MemberData, ModuleAst, NodeKind, NodeTag};
use super::diagnostics::{Diagnostic, DiagnosticCollector, LinkingFailure, RelatedInfo};
use super::ids::{LocalNodeId, NodeId};
use super::resolve::{ResolveResult, expected_kind};
use super::types::TypeSystem;
use crate::base::FileId;

/// Every diagnostic of one document: linking first, then validation, each in
/// document order.
pub(crate) fn check_file(db: &Analysis, file: FileId) -> Vec<Diagnostic> {
    let Some(ast) = db.module(file) else {
        return Vec::new();
    };
    let _span = tracing::debug_span!("check_file", %file, module = %ast.name()).entered();

    let mut sink = DiagnosticCollector::new();
    let order = ast.preorder();
    for &local in &order {
        link(db, ast, local, &mut sink);
    }
    let mut validator = Validator {
        db,
        ast,
        types: db.types(),
        sink,
    };
    for &local in &order {
        validator.visit(local);
    }

    let sink = validator.sink;
    tracing::debug!(
        %file,
        generation = %db.generation(),
        errors = sink.error_count(),
        warnings = sink.warning_count(),
        "document checked"
    );
    sink.finish()
}

// ============================================================================
// LINKING
// ============================================================================

fn link(db: &Analysis, ast: &ModuleAst, local: LocalNodeId, sink: &mut DiagnosticCollector) {
    let kind = ast.kind(local);
    let Some((reference, property)) = kind.reference() else {
        return;
    };
    let site = ast.id(local);
    let failure = LinkingFailure {
        expected_kind: expected_kind(kind),
        ref_text: &reference.text,
        container_kind: kind.tag().as_str(),
        property: property.as_str(),
    };
    match db.resolve(site) {
        ResolveResult::Found(_) | ResolveResult::Blocked => {}
        ResolveResult::NotFound => {
            let related = if db.config().related_candidates {
                related_candidates(db, site.file, failure.expected_kind, &reference.text)
            } else {
                Vec::new()
            };
            sink.unresolved_reference(site, reference.range, failure, related);
        }
        ResolveResult::Ambiguous(targets) => {
            let candidates = targets
                .iter()
                .map(|&target| RelatedInfo {
                    node: target,
                    range: node_range(db, target),
                    message: qualified_name(db, target).into(),
                })
                .collect();
            sink.ambiguous_reference(
                db.config().ambiguous_reference_severity,
                site,
                reference.range,
                failure,
                candidates,
            );
        }
    }
}

/// Declarations in other documents that carry the unresolved name and would
/// fit the site, e.g. to offer an import.
fn related_candidates(db: &Analysis, file: FileId, expected: &str, text: &str) -> Vec<RelatedInfo> {
    let fits = |tag: NodeTag| match expected {
        "Module" => tag == NodeTag::Module,
        "Entity" => tag == NodeTag::Entity,
        "Enumeration" => tag == NodeTag::Enumeration,
        "Classifier" => matches!(tag, NodeTag::Entity | NodeTag::Enumeration | NodeTag::Instance),
        _ => false,
    };
    db.resolver()
        .global_scope(file)
        .iter()
        .filter(|e| e.name == text)
        .filter(|e| db.node(e.target).is_some_and(|n| fits(n.tag())))
        .map(|e| RelatedInfo {
            node: e.target,
            range: node_range(db, e.target),
            message: format!("'{}' is declared in module '{}'", e.name, module_name(db, e.target)).into(),
        })
        .collect()
}

fn node_range(db: &Analysis, id: NodeId) -> crate::base::TextRange {
    db.node(id).map(|n| n.range).unwrap_or_default()
}

fn module_name(db: &Analysis, id: NodeId) -> SmolStr {
    db.module(id.file).map(|m| m.name().clone()).unwrap_or_default()
}

/// Dotted path from the module down to `id`, e.g. `shapes.Color.Red`.
fn qualified_name(db: &Analysis, id: NodeId) -> String {
    let mut segments: Vec<SmolStr> = Vec::new();
    let mut current = Some(id);
    while let Some(node) = current {
        if let Some(name) = db.node(node).and_then(|n| n.name()) {
            segments.push(name.clone());
        }
        current = db.parent(node);
    }
    segments.reverse();
    segments.join(".")
}

// ============================================================================
// VALIDATION
// ============================================================================

struct Validator<'a> {
    db: &'a Analysis,
    ast: &'a ModuleAst,
    types: TypeSystem<'a>,
    sink: DiagnosticCollector,
}

/// Identity of an array element for uniqueness checks.
#[derive(PartialEq, Eq, Hash)]
enum ElementKey {
    Boolean(bool),
    Integer(i64),
    /// Bit pattern with `-0.0` folded into `0.0`.
    Float(u64),
    String(SmolStr),
    Node(NodeId),
}

impl Validator<'_> {
    fn visit(&mut self, local: LocalNodeId) {
        let ast = self.ast;
        match ast.kind(local) {
            NodeKind::Module { classifiers, .. } => self.check_unique_names(classifiers, "classifier"),
            NodeKind::Entity { members, .. } => self.check_unique_names(members, "member"),
            NodeKind::Enumeration { literals, .. } => self.check_unique_names(literals, "literal"),
            NodeKind::Member(data) => {
                self.check_cardinality(local, data);
                if let Some(default) = data.default {
                    self.check_value(ast.id(local), ast.id(default));
                }
            }
            NodeKind::Instance { name, members, .. } => {
                self.check_completeness(local, name, members);
                self.check_duplicate_assignments(members);
            }
            NodeKind::InstanceMember { value, .. } => {
                if let Some(member) = self.db.target(ast.id(local)) {
                    self.check_value(member, ast.id(*value));
                }
            }
            _ => {}
        }
    }

    fn check_unique_names(&mut self, siblings: &[LocalNodeId], what: &str) {
        let ast = self.ast;
        let mut first: FxHashMap<&SmolStr, LocalNodeId> = FxHashMap::default();
        for &sibling in siblings {
            let node = ast.node(sibling);
            let Some(name) = node.name() else {
                continue;
            };
            match first.entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert(sibling);
                }
                Entry::Occupied(slot) => {
                    let original = *slot.get();
                    let related = RelatedInfo {
                        node: ast.id(original),
                        range: ast.node(original).range,
                        message: Arc::from("first declared here"),
                    };
                    self.sink
                        .duplicate_name(ast.id(sibling), node.range, what, name, related);
                }
            }
        }
    }

    fn check_cardinality(&mut self, local: LocalNodeId, data: &MemberData) {
        let id = self.ast.id(local);
        let range = self.ast.node(local).range;
        let card = data.cardinality;

        if card.min() > card.max() {
            self.sink.invalid_cardinality(
                id,
                range,
                "The minimum bound of a cardinality cannot be greater than the maximum bound.",
            );
        }
        if card.upper == Some(0) && card.min() == 0 {
            self.sink.invalid_cardinality(id, range, "Cardinality 0 is meaningless.");
        }
        if !data.unique {
            return;
        }
        let Some(upper) = card.upper else {
            return;
        };
        match self.ast.kind(data.member_type) {
            NodeKind::BooleanType if upper > 2 => {
                self.sink.invalid_cardinality(
                    id,
                    range,
                    "A unique boolean array cannot have an upper bound greater than 2.",
                );
            }
            NodeKind::EnumerationType { .. } => {
                let literal_count = self
                    .db
                    .target(self.ast.id(data.member_type))
                    .and_then(|e| match self.db.kind(e) {
                        Some(NodeKind::Enumeration { literals, .. }) => Some(literals.len() as u64),
                        _ => None,
                    });
                if let Some(count) = literal_count.filter(|&count| upper > count) {
                    self.sink.invalid_cardinality(
                        id,
                        range,
                        &format!(
                            "A unique enumeration array cannot have an upper bound greater than \
                             the number of literals ({count})."
                        ),
                    );
                }
            }
            _ => {}
        }
    }

    /// Type and array checks of a value assigned to `member`.
    fn check_value(&mut self, member: NodeId, value: NodeId) {
        let db = self.db;
        for mismatch in self.types.check_assignment(member, value) {
            let range = node_range(self.db, mismatch.node);
            self.sink
                .type_mismatch(mismatch.node, range, &mismatch.expected, &mismatch.found);
        }

        let Some(NodeKind::Member(data)) = db.kind(member) else {
            return;
        };
        let Some(NodeKind::ArrayValue { elements }) = db.kind(value) else {
            return;
        };

        let (min, max) = self.db.config().array_bounds.bounds(&data.cardinality);
        let size = elements.len();
        let range = node_range(self.db, value);
        if (size as u64) < min {
            self.sink.array_too_small(value, range, min, size);
        } else if (size as u64) > max {
            self.sink.array_too_large(value, range, max, size);
        }

        if data.unique {
            let mut seen = FxHashSet::default();
            for &element in elements {
                let element = NodeId::new(value.file, element);
                let Some(key) = self.element_key(element) else {
                    continue;
                };
                if !seen.insert(key) {
                    self.sink.array_not_unique(element, node_range(self.db, element));
                }
            }
        }
    }

    fn element_key(&self, element: NodeId) -> Option<ElementKey> {
        let key = match self.db.kind(element)? {
            NodeKind::BooleanValue(v) => ElementKey::Boolean(*v),
            NodeKind::IntegerValue(v) => ElementKey::Integer(*v),
            NodeKind::FloatValue(v) => ElementKey::Float(if *v == 0.0 { 0 } else { v.to_bits() }),
            NodeKind::StringValue(v) => ElementKey::String(v.clone()),
            NodeKind::EnumerationLiteralValue { .. } | NodeKind::ContainsValue { .. } => {
                ElementKey::Node(self.db.target(element)?)
            }
            _ => return None,
        };
        Some(key)
    }

    /// Every attribute member without a default must be assigned.
    fn check_completeness(&mut self, local: LocalNodeId, name: &SmolStr, assignments: &[LocalNodeId]) {
        let (db, ast) = (self.db, self.ast);
        let Some(entity) = db.target(ast.id(local)) else {
            return;
        };
        let Some(NodeKind::Entity {
            name: entity_name,
            members,
            ..
        }) = db.kind(entity)
        else {
            return;
        };

        let assigned: FxHashSet<&str> = assignments
            .iter()
            .filter_map(|&a| match ast.kind(a) {
                NodeKind::InstanceMember { member, .. } => Some(member.text.as_str()),
                _ => None,
            })
            .collect();
        let missing: Vec<String> = members
            .iter()
            .filter_map(|&m| match db.kind(NodeId::new(entity.file, m)) {
                Some(NodeKind::Member(data)) if data.is_attribute() && data.default.is_none() => {
                    Some(data.name.as_str())
                }
                _ => None,
            })
            .filter(|member| !assigned.contains(member))
            .map(str::to_owned)
            .collect();

        if !missing.is_empty() {
            let range = ast.node(local).range;
            self.sink
                .missing_members(ast.id(local), range, entity_name, name, missing);
        }
    }

    /// A member may be assigned at most once per instance.
    fn check_duplicate_assignments(&mut self, assignments: &[LocalNodeId]) {
        let mut first: FxHashMap<NodeId, LocalNodeId> = FxHashMap::default();
        for &assignment in assignments {
            let id = self.ast.id(assignment);
            let Some(member) = self.db.target(id) else {
                continue;
            };
            match first.entry(member) {
                Entry::Vacant(slot) => {
                    slot.insert(assignment);
                }
                Entry::Occupied(slot) => {
                    let original = *slot.get();
                    let name = self.db.node(member).and_then(|n| n.name().cloned()).unwrap_or_default();
                    let related = RelatedInfo {
                        node: self.ast.id(original),
                        range: self.ast.node(original).range,
                        message: Arc::from("first assigned here"),
                    };
                    let range = self.ast.node(assignment).range;
                    self.sink
                        .duplicate_name(id, range, "member assignment", &name, related);
                }
            }
        }
    }
}
