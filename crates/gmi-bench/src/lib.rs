//! Fixtures shared by the inference benchmarks.

use gmi_infer::{ContextArena, ContextId, InferError, NoopObserver, TypeExpr};
use gmi_types::{ClassDecl, Metamodel};

/// A metamodel with `Base` and `width` direct subclasses `C0..`.
pub fn sibling_model(width: usize) -> Metamodel {
    let mut model = Metamodel::new();
    model.define(ClassDecl::new("Base"));
    for idx in 0..width {
        model.define(ClassDecl::new(sibling(idx)).extends(TypeExpr::class("Base")));
    }
    model
}

pub fn sibling(idx: usize) -> String {
    format!("C{idx}")
}

/// `List<List<...<leaf>...>>` with `depth` list layers.
pub fn nested_list(depth: usize, leaf: TypeExpr) -> TypeExpr {
    (0..depth).fold(leaf, |inner, _| TypeExpr::generic("List", vec![inner]))
}

/// A relation with `columns` columns named `c0..`, typed by `column_type`.
pub fn wide_relation(columns: usize, column_type: impl Fn(usize) -> TypeExpr) -> TypeExpr {
    let names: Vec<String> = (0..columns).map(|idx| format!("c{idx}")).collect();
    TypeExpr::relation(
        names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), column_type(idx)))
            .collect(),
    )
}

/// A chain of `len + 1` nested contexts where `p{i}` in context `i` is
/// bound to `p{i-1}` owned by its parent, and `p0` in the root is `leaf`.
///
/// Returns the contexts root first.
pub fn owner_chain(
    arena: &mut ContextArena<'_>,
    len: usize,
    leaf: &TypeExpr,
) -> Result<Vec<ContextId>, InferError> {
    let root = arena.new_context(None, None)?;
    arena.register(
        root,
        &TypeExpr::param("p0"),
        Some(leaf),
        root,
        false,
        &mut NoopObserver,
    )?;
    let mut chain = vec![root];
    for idx in 1..=len {
        let parent = chain[idx - 1];
        let ctx = arena.new_context(Some(parent), None)?;
        arena.register(
            ctx,
            &TypeExpr::param(format!("p{idx}")),
            Some(&TypeExpr::param(format!("p{}", idx - 1))),
            parent,
            false,
            &mut NoopObserver,
        )?;
        chain.push(ctx);
    }
    Ok(chain)
}
