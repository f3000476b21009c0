//! Scope resolution across modules.
//!
//! Each test loads a few modules into an `AnalysisHost` and checks what the
//! reference sites of one of them resolve to, plus the linking diagnostics
//! that come out of `check_file`.

use kerno::hir::{
    AnalysisHost, EntitySpec, ImportSpec, InstanceSpec, MemberSpec, ModuleAst, ModuleBuilder, NodeId, NodeKind,
    NodeTag, ResolveResult, Severity, TypeSpec, ValueSpec, codes,
};
use kerno::{AnalysisConfig, FileId};
use rstest::rstest;

fn module(host: &AnalysisHost, name: &str, build: impl FnOnce(&mut ModuleBuilder)) -> FileId {
    let file = host.file_id(format!("/{name}.kerno"));
    let mut b = ModuleBuilder::new(file, name).unwrap();
    build(&mut b);
    host.set_module(b.finish());
    file
}

/// First node of the given tag, in document order.
fn find(ast: &ModuleAst, tag: NodeTag) -> NodeId {
    let local = ast
        .preorder()
        .into_iter()
        .find(|&n| ast.node(n).tag() == tag)
        .unwrap_or_else(|| panic!("no {tag} node"));
    ast.id(local)
}

fn classifier(host: &AnalysisHost, file: FileId, name: &str) -> NodeId {
    let analysis = host.analysis();
    let ast = analysis.module(file).unwrap();
    ast.id(ast.classifier_named(name).unwrap())
}

#[test]
fn test_same_module_reference_resolves() {
    let host = AnalysisHost::new();
    let file = module(&host, "garage", |b| {
        b.entity(EntitySpec::new("Wheel")).unwrap();
        b.entity(EntitySpec::new("Car").member(MemberSpec::reference("wheels", "Wheel", true)))
            .unwrap();
    });

    let analysis = host.analysis();
    let site = find(analysis.module(file).unwrap(), NodeTag::ReferenceType);
    assert_eq!(
        analysis.resolve(site),
        &ResolveResult::Found(classifier(&host, file, "Wheel"))
    );
    assert!(analysis.check_file(file).is_empty());
}

#[test]
fn test_non_imported_module_reference_is_unresolved() {
    let host = AnalysisHost::new();
    module(&host, "parts", |b| {
        b.entity(EntitySpec::new("Wheel")).unwrap();
    });
    let file = module(&host, "garage", |b| {
        b.entity(EntitySpec::new("Car").member(MemberSpec::reference("wheels", "Wheel", true)))
            .unwrap();
    });

    let analysis = host.analysis();
    let site = find(analysis.module(file).unwrap(), NodeTag::ReferenceType);
    assert_eq!(analysis.resolve(site), &ResolveResult::NotFound);

    let diags = analysis.check_file(file);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code.as_deref(), Some(codes::LINKING_ERROR));
    assert_eq!(&*diags[0].message, "Could not resolve reference to Entity named 'Wheel'.");
    // The declaration in the other document is offered as a candidate.
    assert_eq!(diags[0].related.len(), 1);
    assert_eq!(&*diags[0].related[0].message, "'Wheel' is declared in module 'parts'");
}

#[test]
fn test_import_makes_classifier_visible() {
    let host = AnalysisHost::new();
    let parts = module(&host, "parts", |b| {
        b.entity(EntitySpec::new("Wheel")).unwrap();
    });
    let garage = module(&host, "garage", |b| {
        b.import(ImportSpec::from_module("parts").item("Wheel")).unwrap();
        b.entity(EntitySpec::new("Car").member(MemberSpec::reference("wheels", "Wheel", true)))
            .unwrap();
    });

    let analysis = host.analysis();
    let site = find(analysis.module(garage).unwrap(), NodeTag::ReferenceType);
    assert_eq!(analysis.target(site), Some(classifier(&host, parts, "Wheel")));
    assert!(analysis.check_file(garage).is_empty());
}

#[test]
fn test_alias_replaces_original_name() {
    let host = AnalysisHost::new();
    module(&host, "parts", |b| {
        b.entity(EntitySpec::new("Wheel")).unwrap();
    });
    let garage = module(&host, "garage", |b| {
        b.import(ImportSpec::from_module("parts").item_as("Wheel", "Rim")).unwrap();
        b.entity(
            EntitySpec::new("Car")
                .member(MemberSpec::reference("front", "Rim", true))
                .member(MemberSpec::reference("back", "Wheel", true)),
        )
        .unwrap();
    });

    let analysis = host.analysis();
    assert_eq!(analysis.scope(garage).names().collect::<Vec<_>>(), vec!["Rim", "Car"]);

    let diags = analysis.check_file(garage);
    assert_eq!(diags.len(), 1);
    assert!(diags[0].message.contains("'Wheel'"));
}

#[test]
fn test_self_import_is_forbidden() {
    let host = AnalysisHost::new();
    let file = module(&host, "garage", |b| {
        b.import(ImportSpec::from_module("garage").item("Car")).unwrap();
        b.entity(EntitySpec::new("Car")).unwrap();
    });

    let analysis = host.analysis();
    let ast = analysis.module(file).unwrap();
    assert_eq!(analysis.resolve(find(ast, NodeTag::Import)), &ResolveResult::NotFound);
    // The classifier import depends on the failed module reference.
    assert_eq!(
        analysis.resolve(find(ast, NodeTag::ClassifierImport)),
        &ResolveResult::Blocked
    );

    let diags = analysis.check_file(file);
    assert_eq!(diags.len(), 1);
    let data = diags[0].data_json().unwrap();
    assert_eq!(data["expectedKind"], "Module");
    assert_eq!(data["containerKind"], "Import");
    assert_eq!(data["property"], "fromModule");
    assert_eq!(data["code"], codes::LINKING_ERROR);
}

#[test]
fn test_module_candidates_exclude_current_module() {
    let host = AnalysisHost::new();
    module(&host, "a", |_| {});
    module(&host, "b", |_| {});
    let c = module(&host, "c", |b| {
        b.import(ImportSpec::from_module("a")).unwrap();
    });

    let analysis = host.analysis();
    let site = find(analysis.module(c).unwrap(), NodeTag::Import);
    let scope = analysis.candidates(site).unwrap();
    assert_eq!(scope.names().collect::<Vec<_>>(), vec!["a", "b"]);
}

#[test]
fn test_instance_binds_entity_by_id() {
    let host = AnalysisHost::new();
    let file = module(&host, "m", |b| {
        b.entity(EntitySpec::new("Point").id("pt").member(MemberSpec::attribute("x", TypeSpec::Integer)))
            .unwrap();
        b.instance(InstanceSpec::new("byId", "pt").set("x", 1)).unwrap();
        b.instance(InstanceSpec::new("byName", "Point").set("x", 1)).unwrap();
    });

    let analysis = host.analysis();
    let ast = analysis.module(file).unwrap();
    let by_id = ast.id(ast.classifier_named("byId").unwrap());
    let by_name = ast.id(ast.classifier_named("byName").unwrap());

    assert_eq!(analysis.target(by_id), Some(classifier(&host, file, "Point")));
    assert_eq!(analysis.resolve(by_name), &ResolveResult::NotFound);

    // The unresolved instance reports its entity only; its members are not
    // checked against anything.
    let diags = analysis.check_file(file);
    assert_eq!(diags.len(), 1);
    assert_eq!(&*diags[0].message, "Could not resolve reference to Entity named 'Point'.");
}

#[test]
fn test_entities_without_id_are_not_bindable() {
    let host = AnalysisHost::new();
    let file = module(&host, "m", |b| {
        b.entity(EntitySpec::new("Point")).unwrap();
        b.instance(InstanceSpec::new("p", "Point")).unwrap();
    });

    let analysis = host.analysis();
    let instance = classifier(&host, file, "p");
    assert!(analysis.candidates(instance).unwrap().is_empty());
}

#[rstest]
#[case::entity_is_not_an_enumeration("Shape", 1)]
#[case::enumeration_resolves("Color", 0)]
fn test_enumeration_type_only_sees_enumerations(#[case] type_name: &str, #[case] expected: usize) {
    let host = AnalysisHost::new();
    let file = module(&host, "m", |b| {
        b.enumeration("Color", ["Red"]).unwrap();
        b.entity(EntitySpec::new("Shape").member(MemberSpec::attribute("fill", TypeSpec::enumeration(type_name))))
            .unwrap();
    });

    let analysis = host.analysis();
    assert_eq!(analysis.check_file(file).len(), expected);
}

#[test]
fn test_literal_scope_follows_instance_member() {
    let host = AnalysisHost::new();
    let file = module(&host, "m", |b| {
        b.enumeration("Color", ["Red", "Green"]).unwrap();
        b.enumeration("Size", ["Small"]).unwrap();
        b.entity(
            EntitySpec::new("Shape")
                .id("shape")
                .member(MemberSpec::attribute("fill", TypeSpec::enumeration("Color"))),
        )
        .unwrap();
        b.instance(InstanceSpec::new("s", "shape").set("fill", ValueSpec::literal("Green")))
            .unwrap();
        b.instance(InstanceSpec::new("t", "shape").set("fill", ValueSpec::literal("Small")))
            .unwrap();
    });

    let analysis = host.analysis();
    let ast = analysis.module(file).unwrap();
    let site = find(ast, NodeTag::EnumerationLiteralValue);
    let scope = analysis.candidates(site).unwrap();
    assert_eq!(scope.names().collect::<Vec<_>>(), vec!["Red", "Green"]);

    let diags = analysis.check_file(file);
    assert_eq!(diags.len(), 1);
    assert_eq!(
        &*diags[0].message,
        "Could not resolve reference to EnumerationLiteral named 'Small'."
    );
}

#[test]
fn test_literal_on_non_enumeration_member_has_no_candidates() {
    let host = AnalysisHost::new();
    let file = module(&host, "m", |b| {
        b.enumeration("Color", ["Red"]).unwrap();
        b.entity(
            EntitySpec::new("E").member(MemberSpec::attribute("n", TypeSpec::Integer).default_value(ValueSpec::literal("Red"))),
        )
        .unwrap();
    });

    let analysis = host.analysis();
    let site = find(analysis.module(file).unwrap(), NodeTag::EnumerationLiteralValue);
    assert!(analysis.candidates(site).unwrap().is_empty());
    assert_eq!(analysis.resolve(site), &ResolveResult::NotFound);

    // Only the linking error; the type check skips the unresolved literal.
    let diags = analysis.check_file(file);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code.as_deref(), Some(codes::LINKING_ERROR));
}

#[test]
fn test_contains_value_only_sees_entities() {
    let host = AnalysisHost::new();
    let file = module(&host, "m", |b| {
        b.entity(EntitySpec::new("Wheel")).unwrap();
        b.enumeration("Color", ["Red"]).unwrap();
        b.entity(
            EntitySpec::new("Car")
                .id("car")
                .member(MemberSpec::reference("wheel", "Wheel", true)),
        )
        .unwrap();
        b.instance(InstanceSpec::new("ok", "car").set("wheel", ValueSpec::contains("Wheel")))
            .unwrap();
        b.instance(InstanceSpec::new("bad", "car").set("wheel", ValueSpec::contains("Color")))
            .unwrap();
    });

    let analysis = host.analysis();
    let diags = analysis.check_file(file);
    assert_eq!(diags.len(), 1);
    assert_eq!(&*diags[0].message, "Could not resolve reference to Entity named 'Color'.");
    let data = diags[0].data_json().unwrap();
    assert_eq!(data["containerKind"], "ContainsValue");
}

#[test]
fn test_member_scope_lists_entity_members() {
    let host = AnalysisHost::new();
    let file = module(&host, "m", |b| {
        b.entity(
            EntitySpec::new("Point")
                .id("pt")
                .member(MemberSpec::attribute("x", TypeSpec::Integer))
                .member(MemberSpec::attribute("y", TypeSpec::Integer)),
        )
        .unwrap();
        b.instance(InstanceSpec::new("p", "pt").set("x", 1).set("y", 2).set("z", 3))
            .unwrap();
    });

    let analysis = host.analysis();
    let site = find(analysis.module(file).unwrap(), NodeTag::InstanceMember);
    assert_eq!(
        analysis.candidates(site).unwrap().names().collect::<Vec<_>>(),
        vec!["x", "y"]
    );

    let diags = analysis.check_file(file);
    assert_eq!(diags.len(), 1);
    assert_eq!(&*diags[0].message, "Could not resolve reference to Member named 'z'.");
}

#[rstest]
#[case::error(Severity::Error)]
#[case::warning(Severity::Warning)]
fn test_import_colliding_with_local_is_ambiguous(#[case] severity: Severity) {
    let config = AnalysisConfig {
        ambiguous_reference_severity: severity,
        ..AnalysisConfig::default()
    };
    let host = AnalysisHost::with_config(config);
    let parts = module(&host, "parts", |b| {
        b.entity(EntitySpec::new("Wheel")).unwrap();
    });
    let garage = module(&host, "garage", |b| {
        b.import(ImportSpec::from_module("parts").item("Wheel")).unwrap();
        b.entity(EntitySpec::new("Wheel")).unwrap();
        b.entity(EntitySpec::new("Car").member(MemberSpec::reference("wheels", "Wheel", true)))
            .unwrap();
    });

    let analysis = host.analysis();
    let site = find(analysis.module(garage).unwrap(), NodeTag::ReferenceType);
    let ResolveResult::Ambiguous(targets) = analysis.resolve(site) else {
        panic!("expected an ambiguous reference");
    };
    // Imports come first in the merged scope.
    assert_eq!(targets[0], classifier(&host, parts, "Wheel"));
    assert_eq!(targets[1], classifier(&host, garage, "Wheel"));

    let diags = analysis.check_file(garage);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, severity);
    assert_eq!(diags[0].code.as_deref(), Some(codes::AMBIGUOUS_REFERENCE));
    assert_eq!(
        &*diags[0].message,
        "Ambiguous reference to Entity named 'Wheel': parts.Wheel, garage.Wheel."
    );
}

#[test]
fn test_duplicate_module_names_bind_first_loaded() {
    let host = AnalysisHost::new();
    let first = host.file_id("/one.kerno");
    let second = host.file_id("/two.kerno");
    for (file, entity) in [(first, "A"), (second, "B")] {
        let mut b = ModuleBuilder::new(file, "shared").unwrap();
        b.entity(EntitySpec::new(entity)).unwrap();
        host.set_module(b.finish());
    }
    let user = module(&host, "user", |b| {
        b.import(ImportSpec::from_module("shared").item("A")).unwrap();
    });

    let analysis = host.analysis();
    let ast = analysis.module(user).unwrap();
    let import = find(ast, NodeTag::Import);
    assert_eq!(analysis.target(import).map(|t| t.file), Some(first));
    assert!(analysis.check_file(user).is_empty());
}

#[test]
fn test_related_candidates_can_be_disabled() {
    let config = AnalysisConfig {
        related_candidates: false,
        ..AnalysisConfig::default()
    };
    let host = AnalysisHost::with_config(config);
    module(&host, "parts", |b| {
        b.entity(EntitySpec::new("Wheel")).unwrap();
    });
    let garage = module(&host, "garage", |b| {
        b.entity(EntitySpec::new("Car").member(MemberSpec::reference("wheels", "Wheel", true)))
            .unwrap();
    });

    let diags = host.analysis().check_file(garage);
    assert_eq!(diags.len(), 1);
    assert!(diags[0].related.is_empty());
}

#[test]
fn test_import_cycles_resolve() {
    let host = AnalysisHost::new();
    let a = module(&host, "a", |b| {
        b.import(ImportSpec::from_module("b").item("B")).unwrap();
        b.entity(EntitySpec::new("A").member(MemberSpec::reference("b", "B", false)))
            .unwrap();
    });
    let b = module(&host, "b", |b| {
        b.import(ImportSpec::from_module("a").item("A")).unwrap();
        b.entity(EntitySpec::new("B").member(MemberSpec::reference("a", "A", false)))
            .unwrap();
    });

    let analysis = host.analysis();
    assert!(analysis.check_file(a).is_empty());
    assert!(analysis.check_file(b).is_empty());

    let entity_a = classifier(&host, a, "A");
    let entity_b = classifier(&host, b, "B");
    let field = analysis.field_type(entity_a, "b");
    assert_eq!(field, Some(kerno::hir::Ty::Class(entity_b)));
    assert!(matches!(analysis.kind(entity_a), Some(NodeKind::Entity { .. })));
}
