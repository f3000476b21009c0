//! Diagnostics — semantic error reporting.
//!
//! Every problem the semantic passes find is a [`Diagnostic`] attached to the
//! offending node. Two payloads are structured so that quick-fix tooling can
//! act on them without parsing messages: linking failures and instances with
//! missing members (see [`DiagnosticData`]).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ids::NodeId;
use crate::base::{FileId, LineIndex, LineRange, TextRange};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }
}

/// Machine-readable payload of a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagnosticData {
    /// A reference did not resolve in its scope.
    #[serde(rename_all = "camelCase")]
    Linking {
        expected_kind: String,
        ref_text: String,
        container_kind: String,
        property: String,
    },
    /// An instance does not assign every required member of its entity.
    #[serde(rename_all = "camelCase")]
    MissingMembers {
        instance_name: String,
        missing_member_names: Vec<String>,
    },
}

impl DiagnosticData {
    /// The payload as a JSON object carrying its `code`, as editors expect in
    /// `Diagnostic.data`.
    pub fn to_json(&self, code: &str) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(object) = value.as_object_mut() {
            object.insert("code".to_owned(), code.into());
        }
        value
    }
}

/// A diagnostic attached to one node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: FileId,
    /// The offending node.
    pub node: NodeId,
    pub range: TextRange,
    pub severity: Severity,
    /// Stable code (see [`codes`]).
    pub code: Option<Arc<str>>,
    pub message: Arc<str>,
    pub data: Option<DiagnosticData>,
    pub related: Vec<RelatedInfo>,
}

/// A secondary location mentioned by a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelatedInfo {
    pub node: NodeId,
    pub range: TextRange,
    pub message: Arc<str>,
}

impl Diagnostic {
    pub fn new(severity: Severity, node: NodeId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            file: node.file,
            node,
            range,
            severity,
            code: None,
            message: message.into(),
            data: None,
            related: Vec::new(),
        }
    }

    pub fn error(node: NodeId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Error, node, range, message)
    }

    pub fn warning(node: NodeId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Warning, node, range, message)
    }

    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_data(mut self, data: DiagnosticData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Line/column range for an editor.
    pub fn line_range(&self, index: &LineIndex) -> LineRange {
        index.range(self.range)
    }

    /// The `data` field as JSON, if the diagnostic has a payload.
    pub fn data_json(&self) -> Option<serde_json::Value> {
        let data = self.data.as_ref()?;
        Some(data.to_json(self.code.as_deref().unwrap_or_default()))
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Stable diagnostic codes. Quick-fix tooling matches on `LINKING_ERROR` and
/// `MISSING_MEMBERS`; do not rename them.
pub mod codes {
    /// Reference text does not resolve in its scope.
    pub const LINKING_ERROR: &str = "linking-error";
    /// Reference text matches several distinct candidates.
    pub const AMBIGUOUS_REFERENCE: &str = "ambiguous-reference";
    /// Instance lacks required members.
    pub const MISSING_MEMBERS: &str = "missing-members";
    /// Value not assignable to the declared type.
    pub const TYPE_MISMATCH: &str = "type-mismatch";
    /// Name repeated among siblings.
    pub const DUPLICATE_NAME: &str = "duplicate-name";
    /// Malformed member cardinality.
    pub const INVALID_CARDINALITY: &str = "invalid-cardinality";
    /// Array size outside the member's bounds.
    pub const ARRAY_SIZE: &str = "array-size";
    /// Repeated element in a unique array.
    pub const ARRAY_NOT_UNIQUE: &str = "array-not-unique";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during semantic analysis, in report order.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add a linking error.
    pub fn unresolved_reference(
        &mut self,
        node: NodeId,
        range: TextRange,
        data: LinkingFailure<'_>,
        related: Vec<RelatedInfo>,
    ) {
        let mut diag = Diagnostic::error(
            node,
            range,
            format!(
                "Could not resolve reference to {} named '{}'.",
                data.expected_kind, data.ref_text
            ),
        )
        .with_code(codes::LINKING_ERROR)
        .with_data(data.into_data());
        diag.related = related;
        self.add(diag);
    }

    /// Add an ambiguous reference diagnostic listing the candidates.
    pub fn ambiguous_reference(
        &mut self,
        severity: Severity,
        node: NodeId,
        range: TextRange,
        data: LinkingFailure<'_>,
        candidates: Vec<RelatedInfo>,
    ) {
        let names: Vec<&str> = candidates.iter().map(|c| c.message.as_ref()).collect();
        let mut diag = Diagnostic::new(
            severity,
            node,
            range,
            format!(
                "Ambiguous reference to {} named '{}': {}.",
                data.expected_kind,
                data.ref_text,
                names.join(", ")
            ),
        )
        .with_code(codes::AMBIGUOUS_REFERENCE)
        .with_data(data.into_data());
        diag.related = candidates;
        self.add(diag);
    }

    /// Add a duplicate sibling name error.
    pub fn duplicate_name(&mut self, node: NodeId, range: TextRange, what: &str, name: &str, first: RelatedInfo) {
        self.add(
            Diagnostic::error(node, range, format!("A {what} named '{name}' already exists."))
                .with_code(codes::DUPLICATE_NAME)
                .with_related(first),
        );
    }

    /// Add a type mismatch error.
    pub fn type_mismatch(&mut self, node: NodeId, range: TextRange, expected: &str, found: &str) {
        self.add(
            Diagnostic::error(
                node,
                range,
                format!("Value must be of type '{expected}', found '{found}'."),
            )
            .with_code(codes::TYPE_MISMATCH),
        );
    }

    pub fn invalid_cardinality(&mut self, node: NodeId, range: TextRange, message: &str) {
        self.add(
            Diagnostic::error(node, range, message).with_code(codes::INVALID_CARDINALITY),
        );
    }

    pub fn array_too_small(&mut self, node: NodeId, range: TextRange, min: u64, size: usize) {
        self.add(
            Diagnostic::error(
                node,
                range,
                format!("Array must have at least {min} element(s), {size} found."),
            )
            .with_code(codes::ARRAY_SIZE),
        );
    }

    pub fn array_too_large(&mut self, node: NodeId, range: TextRange, max: u64, size: usize) {
        self.add(
            Diagnostic::error(
                node,
                range,
                format!("Array must have at most {max} element(s), {size} found."),
            )
            .with_code(codes::ARRAY_SIZE),
        );
    }

    pub fn array_not_unique(&mut self, node: NodeId, range: TextRange) {
        self.add(
            Diagnostic::error(node, range, "Array must only have unique values.")
                .with_code(codes::ARRAY_NOT_UNIQUE),
        );
    }

    /// Add the aggregated missing-members error of one instance.
    pub fn missing_members(
        &mut self,
        node: NodeId,
        range: TextRange,
        entity_name: &str,
        instance_name: &str,
        missing: Vec<String>,
    ) {
        self.add(
            Diagnostic::error(
                node,
                range,
                format!(
                    "{entity_name} '{instance_name}' is missing the following members: {}.",
                    missing.join(", ")
                ),
            )
            .with_code(codes::MISSING_MEMBERS)
            .with_data(DiagnosticData::MissingMembers {
                instance_name: instance_name.to_owned(),
                missing_member_names: missing,
            }),
        );
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning).count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Facts about a failed reference, shared by the linking and ambiguity
/// diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct LinkingFailure<'a> {
    pub expected_kind: &'a str,
    pub ref_text: &'a str,
    pub container_kind: &'a str,
    pub property: &'a str,
}

impl LinkingFailure<'_> {
    fn into_data(self) -> DiagnosticData {
        DiagnosticData::Linking {
            expected_kind: self.expected_kind.to_owned(),
            ref_text: self.ref_text.to_owned(),
            container_kind: self.container_kind.to_owned(),
            property: self.property.to_owned(),
        }
    }
}
