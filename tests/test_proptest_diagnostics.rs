//! Property-based tests of the validator.
//!
//! Generates small modules from arbitrary member names, cardinalities and
//! values and checks properties that must hold for any input: repeated names
//! are reported exactly once per repeat, undeclared names never link, and
//! checking is deterministic.
#![cfg(feature = "proptest")]

use proptest::prelude::*;
use rustc_hash::FxHashSet;

use kerno::hir::{
    Analysis, EntitySpec, InstanceSpec, MemberSpec, ModuleAst, ModuleBuilder, TypeSpec, ValueSpec, codes,
};
use kerno::FileId;

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

/// Strategy for member names drawn from a small pool so repeats are common.
fn arb_member_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-d]", 0..8)
}

fn arb_type() -> impl Strategy<Value = TypeSpec> {
    prop_oneof![
        Just(TypeSpec::Boolean),
        Just(TypeSpec::Integer),
        Just(TypeSpec::Float),
        Just(TypeSpec::String),
    ]
}

fn arb_scalar() -> impl Strategy<Value = ValueSpec> {
    prop_oneof![
        any::<bool>().prop_map(ValueSpec::Boolean),
        (-5i64..5).prop_map(ValueSpec::Integer),
        (-2i32..2).prop_map(|n| ValueSpec::Float(f64::from(n) / 2.0)),
        "[xyz]{0,2}".prop_map(|s| ValueSpec::String(s.into())),
    ]
}

fn arb_value() -> impl Strategy<Value = ValueSpec> {
    prop_oneof![
        3 => arb_scalar(),
        1 => prop::collection::vec(arb_scalar(), 0..5).prop_map(ValueSpec::Array),
    ]
}

fn arb_member() -> impl Strategy<Value = MemberSpec> {
    (
        "[a-d]",
        arb_type(),
        prop::option::of(0u64..4),
        prop::option::of(0u64..4),
        any::<bool>(),
        any::<bool>(),
        prop::option::of(arb_value()),
    )
        .prop_map(|(name, ty, lower, upper, array, unique, default)| {
            let mut member = MemberSpec::attribute(name, ty);
            if let Some(lower) = lower {
                member = member.lower(lower);
            }
            if let Some(upper) = upper {
                member = member.upper(upper);
            }
            if array {
                member = member.array();
            }
            if unique {
                member = member.unique();
            }
            if let Some(default) = default {
                member = member.default_value(default);
            }
            member
        })
}

fn arb_module() -> impl Strategy<Value = ModuleAst> {
    (
        prop::collection::vec(arb_member(), 0..6),
        prop::collection::vec(("[a-e]", arb_value()), 0..5),
    )
        .prop_map(|(members, assignments)| {
            let file = FileId::new(0);
            let mut b = ModuleBuilder::new(file, "generated").unwrap();
            let entity = members
                .into_iter()
                .fold(EntitySpec::new("Thing").id("thing"), EntitySpec::member);
            b.entity(entity).unwrap();
            let instance = assignments
                .into_iter()
                .fold(InstanceSpec::new("it", "thing"), |i, (name, value)| i.set(name, value));
            b.instance(instance).unwrap();
            b.finish()
        })
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn duplicate_members_reported_per_repeat(names in arb_member_names()) {
        let file = FileId::new(0);
        let mut b = ModuleBuilder::new(file, "m").unwrap();
        let entity = names
            .iter()
            .fold(EntitySpec::new("E"), |e, n| e.member(MemberSpec::attribute(n.as_str(), TypeSpec::Integer)));
        b.entity(entity).unwrap();

        let analysis = Analysis::from_modules([b.finish()]);
        let diags = analysis.check_file(file);
        let distinct: FxHashSet<_> = names.iter().collect();
        let duplicates = diags
            .iter()
            .filter(|d| d.code.as_deref() == Some(codes::DUPLICATE_NAME))
            .count();
        prop_assert_eq!(duplicates, names.len() - distinct.len());
    }

    #[test]
    fn undeclared_reference_never_links(name in "[A-Z][a-z]{1,6}") {
        let file = FileId::new(0);
        let mut b = ModuleBuilder::new(file, "m").unwrap();
        b.entity(EntitySpec::new("Declared").member(MemberSpec::reference("r", format!("X{name}"), false)))
            .unwrap();

        let analysis = Analysis::from_modules([b.finish()]);
        let diags = analysis.check_file(file);
        prop_assert_eq!(diags.len(), 1);
        let expected = format!("Could not resolve reference to Entity named 'X{name}'.");
        prop_assert_eq!(&*diags[0].message, expected.as_str());
    }

    #[test]
    fn checking_is_deterministic(ast in arb_module()) {
        let file = ast.file();
        let first = Analysis::from_modules([ast.clone()]).check_file(file);
        let second = Analysis::from_modules([ast]);
        let again = second.check_file(file);
        let cached = second.check_file(file);

        prop_assert_eq!(&first, &again);
        prop_assert_eq!(&again, &cached);
    }
}
