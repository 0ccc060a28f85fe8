//! Property tests for registration using proptest.
//!
//! Key properties:
//!
//! 1. Re-registering the same concrete value leaves the binding unchanged.
//! 2. Merging two concrete values does not depend on registration order.
//! 3. Merged multiplicities subsume every registered value, in any order.
//! 4. Registrations inside a collection-element state vanish when it is dropped.
//! 5. Owner chains of any length resolve to the root's value.

use std::collections::BTreeMap;

use gmi_types::{ClassDecl, Metamodel, TypeParam};
use proptest::prelude::*;

use crate::*;

fn model() -> Metamodel {
    let mut model = Metamodel::new();
    model.define(ClassDecl::new("Animal"));
    model.define(ClassDecl::new("Cat").extends(TypeExpr::class("Animal")));
    model.define(ClassDecl::new("Dog").extends(TypeExpr::class("Animal")));
    model.define(
        ClassDecl::new("Box")
            .with_type_params(vec![TypeParam::new("T")])
            .with_multiplicity_params(&["m"]),
    );
    model
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const CLASS_POOL: &[&str] = &[
    "String", "Boolean", "Date", "Number", "Integer", "Float", "Animal", "Cat", "Dog", "Any",
];

const LABEL_POOL: &[&str] = &["a", "b", "c", "id", "name", "val"];

fn arb_class() -> impl Strategy<Value = TypeExpr> {
    prop::sample::select(CLASS_POOL).prop_map(TypeExpr::class)
}

fn arb_multiplicity() -> impl Strategy<Value = Multiplicity> {
    (0u32..4, prop::option::of(0u32..4)).prop_map(|(lower, extra)| {
        Multiplicity::range(lower, extra.map(|extra| lower + extra))
    })
}

/// Fully concrete types of bounded depth.
fn arb_type(depth: u32) -> BoxedStrategy<TypeExpr> {
    if depth == 0 {
        return arb_class().boxed();
    }
    let inner = arb_type(depth - 1);
    prop_oneof![
        3 => arb_class(),
        2 => inner.clone().prop_map(|t| TypeExpr::generic("List", vec![t])),
        1 => (inner.clone(), arb_multiplicity())
            .prop_map(|(t, m)| TypeExpr::generic_with_muls("Box", vec![t], vec![m])),
        1 => prop::collection::btree_map(prop::sample::select(LABEL_POOL), inner.clone(), 1..4)
            .prop_map(|columns: BTreeMap<&str, TypeExpr>| {
                TypeExpr::relation(columns.into_iter().collect())
            }),
        1 => (prop::collection::vec((inner.clone(), arb_multiplicity()), 0..3), inner, arb_multiplicity())
            .prop_map(|(params, ret, ret_mul)| TypeExpr::function(params, ret, ret_mul)),
    ]
    .boxed()
}

fn registered(model: &Metamodel, values: &[TypeExpr]) -> Option<TypeExpr> {
    let mut arena = ContextArena::with_id_offset(model, 1);
    let ctx = arena.new_context(None, None).unwrap();
    for value in values {
        arena
            .register(ctx, &TypeExpr::param("T"), Some(value), ctx, false, &mut NoopObserver)
            .unwrap();
    }
    arena.resolve(ctx, &TypeExpr::param("T")).unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn re_registration_is_idempotent(ty in arb_type(2)) {
        let model = model();
        let once = registered(&model, std::slice::from_ref(&ty));
        let twice = registered(&model, &[ty.clone(), ty.clone()]);
        prop_assert_eq!(once, Some(ty.clone()));
        prop_assert_eq!(twice, Some(ty));
    }

    #[test]
    fn concrete_merge_is_commutative(
        left in arb_class(),
        right in arb_class(),
        wrap in any::<bool>(),
    ) {
        let model = model();
        let (left, right) = if wrap {
            (TypeExpr::generic("List", vec![left]), TypeExpr::generic("List", vec![right]))
        } else {
            (left, right)
        };
        let forward = registered(&model, &[left.clone(), right.clone()]);
        let backward = registered(&model, &[right, left]);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn merged_multiplicity_subsumes_every_value(
        muls in prop::collection::vec(arb_multiplicity(), 1..5),
    ) {
        let model = model();
        let merge = |order: &[Multiplicity]| {
            let mut arena = ContextArena::with_id_offset(&model, 1);
            let ctx = arena.new_context(None, None).unwrap();
            for mul in order {
                arena
                    .register_mul(ctx, &Multiplicity::param("m"), mul, ctx, &mut NoopObserver)
                    .unwrap();
            }
            arena.get_multiplicity_parameter_value(ctx, "m").unwrap().unwrap()
        };
        let merged = merge(&muls);
        for mul in &muls {
            prop_assert!(merged.subsumes(mul), "{} does not subsume {}", merged, mul);
        }
        let mut reversed = muls.clone();
        reversed.reverse();
        prop_assert_eq!(merge(&reversed), merged);
    }

    #[test]
    fn dropped_element_state_leaves_no_trace(
        before in prop::option::of(arb_type(1)),
        element in arb_type(2),
    ) {
        let model = model();
        let mut arena = ContextArena::with_id_offset(&model, 1);
        let ctx = arena.new_context(None, None).unwrap();
        let t = TypeExpr::param("T");
        if let Some(before) = &before {
            arena.register(ctx, &t, Some(before), ctx, false, &mut NoopObserver).unwrap();
        }
        let snapshot = arena.context(ctx).unwrap().current_state().clone();

        arena.add_state_for_collection_element(ctx).unwrap();
        arena.register(ctx, &t, Some(&element), ctx, false, &mut NoopObserver).unwrap();
        arena.drop_states(ctx, 1).unwrap();

        prop_assert_eq!(arena.context(ctx).unwrap().current_state(), &snapshot);
    }

    #[test]
    fn owner_chains_resolve_to_the_root_value(len in 1usize..12, leaf in arb_type(1)) {
        let model = model();
        let mut arena = ContextArena::with_id_offset(&model, 1);
        let mut chain = vec![arena.new_context(None, None).unwrap()];
        for i in 1..=len {
            let parent = chain[i - 1];
            let ctx = arena.new_context(Some(parent), None).unwrap();
            arena
                .register(
                    ctx,
                    &TypeExpr::param(format!("p{i}")),
                    Some(&TypeExpr::param(format!("p{}", i - 1))),
                    parent,
                    false,
                    &mut NoopObserver,
                )
                .unwrap();
            chain.push(ctx);
        }
        arena
            .register(chain[0], &TypeExpr::param("p0"), Some(&leaf), chain[0], false, &mut NoopObserver)
            .unwrap();

        let resolved = arena.get_type_parameter_value(chain[len], &format!("p{len}")).unwrap();
        prop_assert_eq!(resolved, Some(leaf));
    }

    #[test]
    fn drop_states_pops_at_most_the_pushed_states(pushed in 0usize..6, dropped in 0usize..8) {
        let model = model();
        let mut arena = ContextArena::with_id_offset(&model, 1);
        let ctx = arena.new_context(None, None).unwrap();
        for _ in 0..pushed {
            arena.add_state_for_collection_element(ctx).unwrap();
        }
        let popped = arena.drop_states(ctx, dropped).unwrap();
        prop_assert_eq!(popped.len(), pushed.min(dropped));
        prop_assert_eq!(
            arena.context(ctx).unwrap().state_count(),
            1 + pushed - pushed.min(dropped)
        );
    }
}
