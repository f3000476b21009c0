//! Name resolution — resolving reference slots to their targets.
//!
//! Resolution is pull based. A reference site (a node with a [`Reference`]
//! slot) is resolved the first time anything asks for it, and the result is
//! memoized in the [`Analysis`] snapshot. Each kind of site has its own
//! visibility rule:
//!
//! | Site                              | Candidates                                         |
//! |-----------------------------------|----------------------------------------------------|
//! | `Import.fromModule`               | every other loaded module                          |
//! | `ClassifierImport.imported`       | classifiers of the module named by the import      |
//! | `ReferenceType.ref`               | the whole classifier scope                         |
//! | `Instance.entityRef`              | entities of the classifier scope, keyed by `id`    |
//! | `EnumerationType.enumerationRef`  | enumerations of the classifier scope               |
//! | `EnumerationLiteralValue.literalRef` | literals of the enclosing member's enumeration  |
//! | `InstanceMember.memberRef`        | members of the instance's entity                   |
//! | `ContainsValue.ref`               | entities of the classifier scope                   |
//!
//! The classifier scope of a document is its imported classifiers (under
//! their alias, if any) followed by its own classifiers. A name bound to more
//! than one distinct target is ambiguous when an import is involved; otherwise
//! the first declaration wins.
//!
//! [`Reference`]: super::ast::Reference

use smol_str::SmolStr;

use super::analysis::Analysis;
use super::ast::{ModuleAst, NodeKind, NodeTag, RefProperty};
use super::ids::NodeId;
use crate::base::FileId;

// ============================================================================
// SCOPE
// ============================================================================

/// One visible `(name, target)` binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeEntry {
    pub name: SmolStr,
    pub target: NodeId,
    /// Bound through an import rather than declared in the scope's own
    /// document or container.
    pub imported: bool,
}

/// Ordered candidate set visible at a reference site.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scope {
    entries: Vec<ScopeEntry>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<SmolStr>, target: NodeId) {
        self.entries.push(ScopeEntry {
            name: name.into(),
            target,
            imported: false,
        });
    }

    pub fn push_imported(&mut self, name: impl Into<SmolStr>, target: NodeId) {
        self.entries.push(ScopeEntry {
            name: name.into(),
            target,
            imported: true,
        });
    }

    /// Resolve a name. Several entries naming the same target are one match.
    ///
    /// Distinct targets sharing a name are ambiguous only when one of them
    /// is imported. Collisions among declarations of one container bind the
    /// first declared; the duplicate itself is reported by validation.
    pub fn lookup(&self, name: &str) -> ResolveResult {
        let mut targets: Vec<NodeId> = Vec::new();
        let mut imported = false;
        for entry in self.entries.iter().filter(|e| e.name == name) {
            imported |= entry.imported;
            if !targets.contains(&entry.target) {
                targets.push(entry.target);
            }
        }
        match targets.len() {
            0 => ResolveResult::NotFound,
            1 => ResolveResult::Found(targets[0]),
            _ if !imported => ResolveResult::Found(targets[0]),
            _ => ResolveResult::Ambiguous(targets),
        }
    }

    /// Entries whose target satisfies `keep`, in order.
    pub fn filter(&self, mut keep: impl FnMut(&ScopeEntry) -> bool) -> Scope {
        Scope {
            entries: self.entries.iter().filter(|e| keep(e)).cloned().collect(),
        }
    }

    pub fn entries(&self) -> &[ScopeEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScopeEntry> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// RESOLUTION RESULT
// ============================================================================

/// Outcome of resolving one reference site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveResult {
    /// Exactly one target.
    Found(NodeId),
    /// Several distinct targets share the name; in candidate order.
    Ambiguous(Vec<NodeId>),
    /// The scope was computed and the name is not in it.
    NotFound,
    /// No scope could be computed: an upstream reference this site depends
    /// on is unresolved, or the node holds no reference at all. Never
    /// reported on its own.
    Blocked,
}

impl ResolveResult {
    pub fn target(&self) -> Option<NodeId> {
        match self {
            ResolveResult::Found(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ResolveResult::Found(_))
    }
}

static BLOCKED: ResolveResult = ResolveResult::Blocked;

/// Kind of node a reference site expects, as named in linking diagnostics.
pub fn expected_kind(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Import { .. } => "Module",
        NodeKind::ClassifierImport { .. } => "Classifier",
        NodeKind::ReferenceType { .. } | NodeKind::Instance { .. } | NodeKind::ContainsValue { .. } => {
            "Entity"
        }
        NodeKind::EnumerationType { .. } => "Enumeration",
        NodeKind::EnumerationLiteralValue { .. } => "EnumerationLiteral",
        NodeKind::InstanceMember { .. } => "Member",
        _ => "Node",
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Query-time resolution over one [`Analysis`] snapshot.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    db: &'a Analysis,
}

impl<'a> Resolver<'a> {
    pub fn new(db: &'a Analysis) -> Self {
        Self { db }
    }

    /// Resolve the reference held by `site`, memoized per snapshot.
    pub fn resolve(&self, site: NodeId) -> &'a ResolveResult {
        match self.db.resolution_slot(site) {
            Some(slot) => slot.get_or_init(|| self.compute(site)),
            None => &BLOCKED,
        }
    }

    pub fn target(&self, site: NodeId) -> Option<NodeId> {
        self.resolve(site).target()
    }

    fn compute(&self, site: NodeId) -> ResolveResult {
        let Some((reference, property)) = self.db.kind(site).and_then(NodeKind::reference) else {
            return ResolveResult::Blocked;
        };
        let result = match self.scope(site) {
            Some(scope) => scope.lookup(&reference.text),
            None => ResolveResult::Blocked,
        };
        tracing::trace!(?site, %property, text = %reference.text, ?result, "resolved reference");
        result
    }

    /// Candidates visible at `site`; `None` when the site holds no reference
    /// or its scope depends on an unresolved reference.
    pub fn scope(&self, site: NodeId) -> Option<Scope> {
        let ast = self.db.module(site.file)?;
        let (_, property) = ast.get(site.local)?.kind.reference()?;
        match property {
            RefProperty::FromModule => Some(self.module_scope(ast)),
            RefProperty::Imported => self.exported_scope(ast, site),
            RefProperty::Ref => {
                let scope = self.classifier_scope(site.file);
                match ast.kind(site.local) {
                    NodeKind::ContainsValue { .. } => {
                        Some(scope.filter(|e| self.tag(e.target) == Some(NodeTag::Entity)))
                    }
                    _ => Some(scope.clone()),
                }
            }
            RefProperty::EntityRef => Some(self.entity_id_scope(site.file)),
            RefProperty::EnumerationRef => {
                let scope = self.classifier_scope(site.file);
                Some(scope.filter(|e| self.tag(e.target) == Some(NodeTag::Enumeration)))
            }
            RefProperty::LiteralRef => self.literal_scope(ast, site),
            RefProperty::MemberRef => self.member_scope(ast, site),
        }
    }

    /// Imported classifiers (alias or original name) followed by the
    /// document's own classifiers.
    pub fn classifier_scope(&self, file: FileId) -> &'a Scope {
        static EMPTY: Scope = Scope { entries: Vec::new() };
        let Some(slot) = self.db.classifier_scope_slot(file) else {
            return &EMPTY;
        };
        slot.get_or_init(|| {
            let mut scope = Scope::new();
            let Some(ast) = self.db.module(file) else {
                return scope;
            };
            for &import in ast.imports() {
                let NodeKind::Import { items, .. } = ast.kind(import) else {
                    continue;
                };
                for &item in items {
                    let NodeKind::ClassifierImport { alias, .. } = ast.kind(item) else {
                        continue;
                    };
                    let Some(target) = self.target(ast.id(item)) else {
                        continue;
                    };
                    let name = match alias {
                        Some(alias) => Some(alias.clone()),
                        None => self.db.node(target).and_then(|n| n.name().cloned()),
                    };
                    if let Some(name) = name {
                        scope.push_imported(name, target);
                    }
                }
            }
            for &classifier in ast.classifiers() {
                if let Some(name) = ast.kind(classifier).name() {
                    scope.push(name.clone(), ast.id(classifier));
                }
            }
            scope
        })
    }

    /// Modules and classifiers declared in every document except `file`.
    pub fn global_scope(&self, file: FileId) -> Scope {
        let mut scope = Scope::new();
        for ast in self.db.index().modules().filter(|m| m.file() != file) {
            scope.push(ast.name().clone(), ast.root_id());
            for &classifier in ast.classifiers() {
                if let Some(name) = ast.kind(classifier).name() {
                    scope.push(name.clone(), ast.id(classifier));
                }
            }
        }
        scope
    }

    fn module_scope(&self, current: &ModuleAst) -> Scope {
        let mut scope = Scope::new();
        for ast in self.db.index().modules() {
            let name = ast.name();
            // Self-import is forbidden; a repeated name binds the first-loaded module.
            if name == current.name() || scope.names().any(|n| n == name.as_str()) {
                continue;
            }
            scope.push(name.clone(), ast.root_id());
        }
        scope
    }

    fn exported_scope(&self, ast: &ModuleAst, site: NodeId) -> Option<Scope> {
        let import = NodeId::new(site.file, ast.parent(site.local)?);
        let module = self.target(import)?;
        let exporter = self.db.module(module.file)?;
        let mut scope = Scope::new();
        for &classifier in exporter.classifiers() {
            if let Some(name) = exporter.kind(classifier).name() {
                scope.push(name.clone(), exporter.id(classifier));
            }
        }
        Some(scope)
    }

    fn entity_id_scope(&self, file: FileId) -> Scope {
        let mut scope = Scope::new();
        for entry in self.classifier_scope(file).iter() {
            if let Some(NodeKind::Entity { id: Some(id), .. }) = self.db.kind(entry.target) {
                let rekeyed = ScopeEntry {
                    name: id.clone(),
                    ..entry.clone()
                };
                scope.entries.push(rekeyed);
            }
        }
        scope
    }

    fn literal_scope(&self, ast: &ModuleAst, site: NodeId) -> Option<Scope> {
        let owner = ast
            .ancestors(site.local)
            .find(|&n| matches!(ast.kind(n), NodeKind::Member(_) | NodeKind::InstanceMember { .. }))?;
        let member = match ast.kind(owner) {
            NodeKind::InstanceMember { .. } => self.target(ast.id(owner))?,
            _ => ast.id(owner),
        };
        let NodeKind::Member(data) = self.db.kind(member)? else {
            return None;
        };
        let member_type = NodeId::new(member.file, data.member_type);
        if !matches!(self.db.kind(member_type), Some(NodeKind::EnumerationType { .. })) {
            return Some(Scope::new());
        }
        let enumeration = self.target(member_type)?;
        let NodeKind::Enumeration { literals, .. } = self.db.kind(enumeration)? else {
            return None;
        };
        let mut scope = Scope::new();
        for &literal in literals {
            let id = NodeId::new(enumeration.file, literal);
            if let Some(name) = self.db.node(id).and_then(|n| n.name()) {
                scope.push(name.clone(), id);
            }
        }
        Some(scope)
    }

    fn member_scope(&self, ast: &ModuleAst, site: NodeId) -> Option<Scope> {
        let instance = NodeId::new(site.file, ast.parent(site.local)?);
        let entity = self.target(instance)?;
        let NodeKind::Entity { members, .. } = self.db.kind(entity)? else {
            return None;
        };
        let mut scope = Scope::new();
        for &member in members {
            let id = NodeId::new(entity.file, member);
            if let Some(name) = self.db.node(id).and_then(|n| n.name()) {
                scope.push(name.clone(), id);
            }
        }
        Some(scope)
    }

    fn tag(&self, id: NodeId) -> Option<NodeTag> {
        self.db.node(id).map(|n| n.tag())
    }
}
