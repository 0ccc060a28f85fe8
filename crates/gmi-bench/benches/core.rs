use std::hint::black_box;

use divan::{AllocProfiler, Bencher};
use gmi_bench::{nested_list, owner_chain, sibling, sibling_model, wide_relation};
use gmi_infer::{ContextArena, NoopObserver, TypeExpr};

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

#[divan::bench(args = [4, 16, 64])]
fn register_nested_generic(bencher: Bencher, depth: usize) {
    let model = sibling_model(0);
    let template = nested_list(depth, TypeExpr::param("T"));
    let actual = nested_list(depth, TypeExpr::class("String"));
    bencher.bench(|| {
        let mut arena = ContextArena::with_id_offset(&model, 1);
        let ctx = arena
            .new_context(None, None)
            .unwrap_or_else(|err| panic!("context setup failed: {err}"));
        arena
            .register(ctx, black_box(&template), Some(&actual), ctx, false, &mut NoopObserver)
            .unwrap_or_else(|err| panic!("registration failed in benchmark: {err}"));
        black_box(arena.resolve(ctx, &TypeExpr::param("T")).ok())
    });
}

#[divan::bench(args = [16, 64, 256])]
fn merge_sibling_classes(bencher: Bencher, width: usize) {
    let model = sibling_model(width);
    let values: Vec<TypeExpr> = (0..width).map(|idx| TypeExpr::class(sibling(idx))).collect();
    let template = TypeExpr::param("T");
    bencher.bench(|| {
        let mut arena = ContextArena::with_id_offset(&model, 1);
        let ctx = arena
            .new_context(None, None)
            .unwrap_or_else(|err| panic!("context setup failed: {err}"));
        for value in &values {
            arena
                .register(ctx, &template, Some(black_box(value)), ctx, false, &mut NoopObserver)
                .unwrap_or_else(|err| panic!("registration failed in benchmark: {err}"));
        }
        black_box(arena.resolve(ctx, &template).ok())
    });
}

#[divan::bench(args = [8, 32, 128])]
fn resolve_owner_chain(bencher: Bencher, len: usize) {
    let model = sibling_model(1);
    let mut arena = ContextArena::with_id_offset(&model, 1);
    let chain = owner_chain(&mut arena, len, &TypeExpr::class("C0"))
        .unwrap_or_else(|err| panic!("chain setup failed: {err}"));
    let leaf = chain[len];
    let name = format!("p{len}");
    bencher.bench(|| black_box(arena.get_type_parameter_value(black_box(leaf), &name).ok()));
}

#[divan::bench(args = [8, 64, 256])]
fn decompose_wide_relation(bencher: Bencher, columns: usize) {
    let model = sibling_model(0);
    let template = wide_relation(columns, |idx| TypeExpr::param(format!("X{idx}")));
    let actual = wide_relation(columns, |_| TypeExpr::class("String"));
    bencher.bench(|| {
        let mut arena = ContextArena::with_id_offset(&model, 1);
        let ctx = arena
            .new_context(None, None)
            .unwrap_or_else(|err| panic!("context setup failed: {err}"));
        arena
            .register(ctx, &template, Some(black_box(&actual)), ctx, false, &mut NoopObserver)
            .unwrap_or_else(|err| panic!("registration failed in benchmark: {err}"));
        black_box(arena.type_parameter_to_generic_type(ctx).ok())
    });
}

#[divan::bench(args = [16, 128])]
fn collection_element_states(bencher: Bencher, elements: usize) {
    let model = sibling_model(elements);
    let template = TypeExpr::param("T");
    let values: Vec<TypeExpr> = (0..elements)
        .map(|idx| TypeExpr::class(sibling(idx)))
        .collect();
    bencher.bench(|| {
        let mut arena = ContextArena::with_id_offset(&model, 1);
        let ctx = arena
            .new_context(None, None)
            .unwrap_or_else(|err| panic!("context setup failed: {err}"));
        let mut dropped = 0;
        for value in &values {
            arena
                .add_state_for_collection_element(ctx)
                .unwrap_or_else(|err| panic!("state push failed: {err}"));
            arena
                .register(ctx, &template, Some(value), ctx, false, &mut NoopObserver)
                .unwrap_or_else(|err| panic!("registration failed in benchmark: {err}"));
            dropped += arena
                .drop_states(ctx, 1)
                .map(|states| states.len())
                .unwrap_or_default();
        }
        black_box(dropped)
    });
}
