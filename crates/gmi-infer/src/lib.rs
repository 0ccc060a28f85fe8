//! Scoped generic type and multiplicity inference.
//!
//! Each lexical scope of a program (a function body, a lambda, a call's
//! argument list) gets an [`InferenceContext`]: a map from the type and
//! multiplicity parameters visible in that scope to what is known about
//! them. Contexts form a tree through their parent links and live in a
//! [`ContextArena`].
//!
//! A binding records a value together with the context that owns it. When
//! the value is another parameter, that parameter must be read in the
//! owner, which may be an ancestor; resolution follows such chains.
//!
//! Registration (`ContextArena::register`) matches a declared template
//! against an observed type, binding the template's parameters. It recurses
//! through type arguments, function signatures and relation columns, and
//! propagates facts to the owning contexts of open bindings.
//!
//! Every context keeps a stack of binding states; only the top one is
//! visible. Element-wise evaluation over a collection pushes a trial state,
//! registers into it, and pops it with [`ContextArena::drop_states`].

mod error;
mod register;
pub mod state;
pub mod trace;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use gmi_types::{ClassDecl, TypeParam};

pub use error::InferError;
pub use gmi_types::{Multiplicity, TypeExpr, TypeSystem};
pub use state::{Binding, BindingState, Lookahead};
pub use trace::{
    InferenceObserver, NoopObserver, RegistrationStep, TraceAction, TraceObserver,
    TracingObserver,
};

/// Global counter for context ids.
///
/// Arenas reserve ids in blocks so that ids from different arenas never
/// collide, which keeps printed traces unambiguous. An arena that uses up
/// its block reserves another one.
static GLOBAL_CONTEXT_ID: AtomicU32 = AtomicU32::new(1);

const ID_BLOCK_SIZE: u32 = 1024;

/// Reserve `ID_BLOCK_SIZE` ids and return the first one.
fn alloc_id_block() -> Result<u32, InferError> {
    GLOBAL_CONTEXT_ID
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |start| {
            start.checked_add(ID_BLOCK_SIZE)
        })
        .map_err(|_| InferError::ContextIdsExhausted)
}

// ---------------------------------------------------------------------------
// Identifiers and options
// ---------------------------------------------------------------------------

/// Identity of an inference context. Printed in hexadecimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u32);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Limits for registration and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferOptions {
    /// Maximum nesting of registration calls and maximum length of a
    /// resolution chain.
    pub max_depth: usize,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

/// The declaration whose type parameters a context is seeded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub type_params: Vec<TypeParam>,
}

impl Signature {
    pub fn new(name: impl Into<String>, type_params: Vec<TypeParam>) -> Self {
        Self {
            name: name.into(),
            type_params,
        }
    }
}

impl From<&ClassDecl> for Signature {
    fn from(decl: &ClassDecl) -> Self {
        Self::new(decl.raw.path(), decl.type_params.clone())
    }
}

// ---------------------------------------------------------------------------
// Inference context
// ---------------------------------------------------------------------------

/// One scope's bindings.
///
/// The state stack is never empty: `base` is always present and `trials`
/// holds the states pushed for collection elements.
#[derive(Debug, Clone)]
pub struct InferenceContext {
    id: ContextId,
    parent: Option<ContextId>,
    scope: Option<String>,
    base: BindingState,
    trials: Vec<BindingState>,
    tops: BTreeSet<String>,
}

impl InferenceContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    /// Diagnostic label of the scope, if one was set.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Type parameters declared by the signature this context was created for.
    pub fn tops(&self) -> &BTreeSet<String> {
        &self.tops
    }

    pub fn state_count(&self) -> usize {
        1 + self.trials.len()
    }

    /// The visible state.
    pub fn current_state(&self) -> &BindingState {
        self.trials.last().unwrap_or(&self.base)
    }

    /// All states, bottom of the stack first.
    pub fn states(&self) -> impl Iterator<Item = &BindingState> {
        std::iter::once(&self.base).chain(self.trials.iter())
    }

    fn current_state_mut(&mut self) -> &mut BindingState {
        match self.trials.last_mut() {
            Some(state) => state,
            None => &mut self.base,
        }
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// Owner of every context of one inference session.
///
/// Cross-context references are [`ContextId`]s resolved through the arena;
/// an id from another arena is reported as [`InferError::UnknownContext`].
pub struct ContextArena<'ts> {
    type_system: &'ts dyn TypeSystem,
    options: InferOptions,
    contexts: BTreeMap<ContextId, InferenceContext>,
    next_id: u32,
    /// One past the last id of the block `next_id` is drawn from.
    block_end: u32,
}

impl<'ts> ContextArena<'ts> {
    /// An arena drawing its ids from the global counter. The first block is
    /// reserved when the first context is created.
    pub fn new(type_system: &'ts dyn TypeSystem) -> Self {
        Self {
            type_system,
            options: InferOptions::default(),
            contexts: BTreeMap::new(),
            next_id: 0,
            block_end: 0,
        }
    }

    /// An arena whose first context gets id `first_id`.
    ///
    /// Used by tests that need deterministic printed output. After
    /// `ID_BLOCK_SIZE` contexts the arena continues with global blocks.
    pub fn with_id_offset(type_system: &'ts dyn TypeSystem, first_id: u32) -> Self {
        Self {
            next_id: first_id,
            block_end: first_id.saturating_add(ID_BLOCK_SIZE),
            ..Self::new(type_system)
        }
    }

    pub fn with_options(mut self, options: InferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> InferOptions {
        self.options
    }

    pub fn type_system(&self) -> &'ts dyn TypeSystem {
        self.type_system
    }

    /// Create a context below `parent`.
    ///
    /// When `signature` is given, each of its type parameters is declared
    /// top-level here and bound to itself as a terminal binding.
    pub fn new_context(
        &mut self,
        parent: Option<ContextId>,
        signature: Option<&Signature>,
    ) -> Result<ContextId, InferError> {
        if let Some(parent) = parent {
            self.context(parent)?;
        }
        let id = self.next_context_id()?;

        let mut base = BindingState::new();
        let mut tops = BTreeSet::new();
        for param in signature.map(|s| s.type_params.as_slice()).unwrap_or_default() {
            base.bind_type(
                param.name.clone(),
                Binding::Terminal {
                    value: TypeExpr::Param(param.clone()),
                    owner: id,
                },
            );
            tops.insert(param.name.clone());
        }
        self.contexts.insert(
            id,
            InferenceContext {
                id,
                parent,
                scope: signature.map(|s| s.name.clone()),
                base,
                trials: Vec::new(),
                tops,
            },
        );
        Ok(id)
    }

    fn next_context_id(&mut self) -> Result<ContextId, InferError> {
        if self.next_id == self.block_end {
            let start = alloc_id_block()?;
            self.next_id = start;
            self.block_end = start + ID_BLOCK_SIZE;
        }
        let id = ContextId(self.next_id);
        self.next_id += 1;
        Ok(id)
    }

    pub fn context(&self, id: ContextId) -> Result<&InferenceContext, InferError> {
        self.contexts.get(&id).ok_or(InferError::UnknownContext(id))
    }

    fn context_mut(&mut self, id: ContextId) -> Result<&mut InferenceContext, InferError> {
        self.contexts
            .get_mut(&id)
            .ok_or(InferError::UnknownContext(id))
    }

    fn state_mut(&mut self, id: ContextId) -> Result<&mut BindingState, InferError> {
        Ok(self.context_mut(id)?.current_state_mut())
    }

    pub fn set_scope(&mut self, id: ContextId, scope: impl Into<String>) -> Result<(), InferError> {
        self.context_mut(id)?.scope = Some(scope.into());
        Ok(())
    }

    pub fn parent(&self, id: ContextId) -> Result<Option<ContextId>, InferError> {
        Ok(self.context(id)?.parent)
    }

    /// The root of `id`'s ancestor chain.
    pub fn top_context(&self, id: ContextId) -> Result<ContextId, InferError> {
        // Parents are created before their children, so the chain is acyclic.
        let mut current = self.context(id)?;
        while let Some(parent) = current.parent {
            current = self.context(parent)?;
        }
        Ok(current.id)
    }

    /// Whether `name` was declared by the signature of the root of `id`'s tree.
    pub fn is_top(&self, id: ContextId, name: &str) -> Result<bool, InferError> {
        let root = self.top_context(id)?;
        Ok(self.context(root)?.tops.contains(name))
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Single-step lookup of a type.
    ///
    /// Concrete types resolve to themselves. A parameter resolves to its
    /// binding in `id`'s visible state, falling back to the root context.
    /// Owners are not followed; see [`Self::resolve_type_parameter`].
    pub fn resolve(&self, id: ContextId, ty: &TypeExpr) -> Result<Option<TypeExpr>, InferError> {
        if ty.is_concrete() {
            return Ok(Some(ty.clone()));
        }
        let Some(name) = ty.parameter_name() else {
            return Ok(None);
        };
        if let Some(binding) = self.context(id)?.current_state().type_binding(name) {
            return Ok(Some(binding.value().clone()));
        }
        let root = self.top_context(id)?;
        Ok(self
            .context(root)?
            .current_state()
            .type_binding(name)
            .map(|b| b.value().clone()))
    }

    /// Whether `ty` is settled: concrete, or a parameter whose binding (here
    /// or at the root) is concrete or terminal.
    pub fn is_type_parameter_resolved(
        &self,
        id: ContextId,
        ty: &TypeExpr,
    ) -> Result<bool, InferError> {
        if ty.is_concrete() {
            return Ok(true);
        }
        let Some(name) = ty.parameter_name() else {
            return Ok(false);
        };
        let settled = |b: &Binding<TypeExpr>| b.is_terminal() || b.value().is_concrete();
        if self
            .context(id)?
            .current_state()
            .type_binding(name)
            .is_some_and(settled)
        {
            return Ok(true);
        }
        let root = self.top_context(id)?;
        Ok(self
            .context(root)?
            .current_state()
            .type_binding(name)
            .is_some_and(settled))
    }

    /// Resolve type parameter `name` by following owner links.
    ///
    /// While the bound value is a parameter declared in a different owner
    /// context, continue there. Returns `None` when `name` is unbound in `id`.
    pub fn resolve_type_parameter(
        &self,
        id: ContextId,
        name: &str,
    ) -> Result<Option<TypeExpr>, InferError> {
        let Some(mut binding) = self.context(id)?.current_state().type_binding(name) else {
            return Ok(None);
        };
        let mut current = id;
        for _ in 0..self.options.max_depth {
            let owner = binding.owner();
            let Some(next_name) = binding.value().parameter_name() else {
                break;
            };
            if owner == current {
                break;
            }
            let Some(next) = self.context(owner)?.current_state().type_binding(next_name) else {
                break;
            };
            binding = next;
            current = owner;
        }
        if let Some(next_name) = binding.value().parameter_name()
            && binding.owner() != current
            && self
                .context(binding.owner())?
                .current_state()
                .has_type(next_name)
        {
            return Err(InferError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(Some(binding.value().clone()))
    }

    /// Multiplicity counterpart of [`Self::resolve_type_parameter`].
    pub fn resolve_multiplicity_parameter(
        &self,
        id: ContextId,
        name: &str,
    ) -> Result<Option<Multiplicity>, InferError> {
        let Some(mut binding) = self.context(id)?.current_state().multiplicity_binding(name) else {
            return Ok(None);
        };
        let mut current = id;
        for _ in 0..self.options.max_depth {
            let owner = binding.owner();
            let Some(next_name) = binding.value().parameter_name() else {
                break;
            };
            if owner == current {
                break;
            }
            let Some(next) = self
                .context(owner)?
                .current_state()
                .multiplicity_binding(next_name)
            else {
                break;
            };
            binding = next;
            current = owner;
        }
        if let Some(next_name) = binding.value().parameter_name()
            && binding.owner() != current
            && self
                .context(binding.owner())?
                .current_state()
                .has_multiplicity(next_name)
        {
            return Err(InferError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(Some(binding.value().clone()))
    }

    /// The fully resolved value of type parameter `name` as seen from `id`.
    pub fn get_type_parameter_value(
        &self,
        id: ContextId,
        name: &str,
    ) -> Result<Option<TypeExpr>, InferError> {
        self.resolve_type_parameter(id, name)
    }

    /// The fully resolved value of multiplicity parameter `name` as seen
    /// from `id`.
    pub fn get_multiplicity_parameter_value(
        &self,
        id: ContextId,
        name: &str,
    ) -> Result<Option<Multiplicity>, InferError> {
        self.resolve_multiplicity_parameter(id, name)
    }

    /// Every type parameter bound in `id`'s visible state, resolved through
    /// its owner chain.
    pub fn type_parameter_to_generic_type(
        &self,
        id: ContextId,
    ) -> Result<BTreeMap<String, TypeExpr>, InferError> {
        let mut resolved = BTreeMap::new();
        for name in self.context(id)?.current_state().type_bindings().map(|(name, _)| name) {
            if let Some(value) = self.resolve_type_parameter(id, name)? {
                resolved.insert(name.to_string(), value);
            }
        }
        Ok(resolved)
    }

    /// Multiplicity counterpart of [`Self::type_parameter_to_generic_type`].
    pub fn multiplicity_parameter_to_multiplicity(
        &self,
        id: ContextId,
    ) -> Result<BTreeMap<String, Multiplicity>, InferError> {
        let mut resolved = BTreeMap::new();
        for name in self
            .context(id)?
            .current_state()
            .multiplicity_bindings()
            .map(|(name, _)| name)
        {
            if let Some(value) = self.resolve_multiplicity_parameter(id, name)? {
                resolved.insert(name.to_string(), value);
            }
        }
        Ok(resolved)
    }

    // -----------------------------------------------------------------------
    // State stack
    // -----------------------------------------------------------------------

    /// Push a copy of the visible state for one collection element.
    pub fn add_state_for_collection_element(&mut self, id: ContextId) -> Result<(), InferError> {
        let ctx = self.context_mut(id)?;
        let copy = ctx.current_state().clone();
        ctx.trials.push(copy);
        Ok(())
    }

    /// Pop up to `count` states, topmost first. The bottom state is never
    /// removed, so fewer may be returned.
    pub fn drop_states(
        &mut self,
        id: ContextId,
        count: usize,
    ) -> Result<Vec<BindingState>, InferError> {
        let ctx = self.context_mut(id)?;
        let take = count.min(ctx.trials.len());
        let split = ctx.trials.len() - take;
        let mut dropped = ctx.trials.split_off(split);
        dropped.reverse();
        Ok(dropped)
    }

    // -----------------------------------------------------------------------
    // Operation rewriting
    // -----------------------------------------------------------------------

    /// The context that ultimately owns a binding whose value is `operation`.
    ///
    /// Starting at `id`, hops to the owner of the first binding equal to
    /// `operation` until no binding matches or the owner is the current
    /// context.
    pub fn find_parent_for_operation(
        &self,
        id: ContextId,
        operation: &TypeExpr,
    ) -> Result<ContextId, InferError> {
        let mut current = id;
        for _ in 0..=self.options.max_depth {
            let owner = self
                .context(current)?
                .current_state()
                .type_bindings()
                .find(|(_, b)| b.value() == operation)
                .map(|(_, b)| b.owner());
            match owner {
                Some(owner) if owner != current => current = owner,
                _ => return Ok(current),
            }
        }
        Err(InferError::DepthExceeded {
            limit: self.options.max_depth,
        })
    }

    /// Rebind every parameter bound to `operation` to `instance`, here and in
    /// the owners those bindings point to. The new bindings are terminal.
    pub fn replace(
        &mut self,
        id: ContextId,
        operation: &TypeExpr,
        instance: &TypeExpr,
    ) -> Result<(), InferError> {
        self.replace_at(id, operation, instance, 0)
    }

    fn replace_at(
        &mut self,
        id: ContextId,
        operation: &TypeExpr,
        instance: &TypeExpr,
        depth: usize,
    ) -> Result<(), InferError> {
        self.check_depth(depth)?;
        let matches: Vec<(String, ContextId)> = self
            .context(id)?
            .current_state()
            .type_bindings()
            .filter(|(_, b)| b.value() == operation)
            .map(|(name, b)| (name.to_string(), b.owner()))
            .collect();
        for (name, owner) in matches {
            self.state_mut(id)?.bind_type(
                name,
                Binding::Terminal {
                    value: instance.clone(),
                    owner: id,
                },
            );
            if owner != id {
                self.replace_at(owner, operation, instance, depth + 1)?;
            }
        }
        Ok(())
    }

    fn check_depth(&self, depth: usize) -> Result<(), InferError> {
        if depth > self.options.max_depth {
            return Err(InferError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookahead
    // -----------------------------------------------------------------------

    pub fn set_ahead(&mut self, id: ContextId) -> Result<(), InferError> {
        self.state_mut(id)?.set_lookahead(Lookahead::Ahead);
        Ok(())
    }

    pub fn is_ahead(&self, id: ContextId) -> Result<bool, InferError> {
        Ok(self.context(id)?.current_state().lookahead().is_ahead())
    }

    pub fn is_ahead_consumed(&self, id: ContextId) -> Result<bool, InferError> {
        Ok(self.context(id)?.current_state().lookahead().is_consumed())
    }

    /// `Ahead -> AheadConsumed`; other states are left alone.
    pub fn ahead_consumed(&mut self, id: ContextId) -> Result<(), InferError> {
        let state = self.state_mut(id)?;
        state.set_lookahead(state.lookahead().consume());
        Ok(())
    }

    pub fn clear_ahead(&mut self, id: ContextId) -> Result<(), InferError> {
        self.state_mut(id)?.set_lookahead(Lookahead::NotAhead);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Printing
    // -----------------------------------------------------------------------

    /// Render `id` and its ancestors, innermost first.
    ///
    /// `##>[id:scope ~ [T = *T:id, U = String] / [m = [1]]] -> [parent ...]<##`.
    /// A leading `*` marks a terminal binding, `:owner` follows open values,
    /// and states of the stack are separated by ` || `.
    pub fn print(&self, id: ContextId) -> Result<String, InferError> {
        Ok(self.display(id)?.to_string())
    }

    /// Lazily formatted form of [`Self::print`].
    pub fn display(&self, id: ContextId) -> Result<ContextChain<'_, 'ts>, InferError> {
        self.context(id)?;
        Ok(ContextChain { arena: self, id })
    }
}

impl fmt::Debug for ContextArena<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextArena")
            .field("options", &self.options)
            .field("contexts", &self.contexts)
            .finish_non_exhaustive()
    }
}

/// A context and its ancestors, formatted as by [`ContextArena::print`].
pub struct ContextChain<'a, 'ts> {
    arena: &'a ContextArena<'ts>,
    id: ContextId,
}

impl fmt::Display for ContextChain<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "##>")?;
        let mut current = Some(self.id);
        let mut first = true;
        while let Some(id) = current {
            let Some(ctx) = self.arena.contexts.get(&id) else {
                break;
            };
            if !first {
                write!(f, " -> ")?;
            }
            first = false;
            write!(f, "[{}:{} ~ ", ctx.id, ctx.scope.as_deref().unwrap_or("_"))?;
            for (idx, state) in ctx.states().enumerate() {
                if idx > 0 {
                    write!(f, " || ")?;
                }
                write_state(f, state)?;
            }
            write!(f, "]")?;
            current = ctx.parent;
        }
        write!(f, "<##")
    }
}

fn write_state(f: &mut fmt::Formatter<'_>, state: &BindingState) -> fmt::Result {
    write!(f, "[")?;
    for (idx, (name, binding)) in state.type_bindings().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        let mark = if binding.is_terminal() { "*" } else { "" };
        write!(f, "{name} = {mark}{}", binding.value())?;
        if !binding.value().is_concrete() {
            write!(f, ":{}", binding.owner())?;
        }
    }
    write!(f, "] / [")?;
    for (idx, (name, binding)) in state.multiplicity_bindings().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        let mark = if binding.is_terminal() { "*" } else { "" };
        write!(f, "{name} = {mark}{}", binding.value())?;
        if !binding.value().is_concrete() {
            write!(f, ":{}", binding.owner())?;
        }
    }
    write!(f, "]")
}

#[cfg(test)]
mod prop_tests;

#[cfg(test)]
mod tests {
    use super::*;
    use gmi_types::Metamodel;

    #[test]
    fn context_ids_render_in_hex() {
        assert_eq!(ContextId(255).to_string(), "ff");
    }

    #[test]
    fn arenas_allocate_disjoint_ids() {
        let model = Metamodel::new();
        let mut a = ContextArena::new(&model);
        let mut b = ContextArena::new(&model);
        let ia = a.new_context(None, None).unwrap();
        let ib = b.new_context(None, None).unwrap();
        assert_ne!(ia, ib);
        assert_eq!(b.context(ia).unwrap_err(), InferError::UnknownContext(ia));
    }

    #[test]
    fn arenas_reserve_another_block_when_theirs_runs_out() {
        let model = Metamodel::new();
        let mut a = ContextArena::new(&model);
        let mut ids = BTreeSet::new();
        for _ in 0..ID_BLOCK_SIZE + 8 {
            ids.insert(a.new_context(None, None).unwrap());
        }
        assert_eq!(ids.len(), ID_BLOCK_SIZE as usize + 8);

        let mut b = ContextArena::new(&model);
        let ib = b.new_context(None, None).unwrap();
        assert!(!ids.contains(&ib));
        assert_eq!(a.context(ib).unwrap_err(), InferError::UnknownContext(ib));
    }

    #[test]
    fn offset_near_the_id_limit_does_not_wrap() {
        let model = Metamodel::new();
        let mut arena = ContextArena::with_id_offset(&model, u32::MAX - 2);
        let first = arena.new_context(None, None).unwrap();
        let second = arena.new_context(Some(first), None).unwrap();
        let third = arena.new_context(Some(second), None).unwrap();
        assert_eq!(first, ContextId(u32::MAX - 2));
        assert_eq!(second, ContextId(u32::MAX - 1));
        assert!(third.0 < u32::MAX - 2);
        assert_eq!(arena.top_context(third).unwrap(), first);
    }

    #[test]
    fn signature_seeds_terminal_self_bindings() {
        let model = Metamodel::new();
        let mut arena = ContextArena::with_id_offset(&model, 1);
        let sig = Signature::new("f", vec![TypeParam::new("T"), TypeParam::invariant("U")]);
        let ctx = arena.new_context(None, Some(&sig)).unwrap();
        let state = arena.context(ctx).unwrap().current_state();
        let t = state.type_binding("T").unwrap();
        assert!(t.is_terminal());
        assert_eq!(t.owner(), ctx);
        assert_eq!(t.value(), &TypeExpr::param("T"));
        assert_eq!(
            state.type_binding("U").unwrap().value(),
            &TypeExpr::invariant_param("U")
        );
        assert_eq!(arena.context(ctx).unwrap().scope(), Some("f"));
    }

    #[test]
    fn signature_from_class_declaration() {
        let model = Metamodel::new();
        let list = model.class(&gmi_types::RawType::new("List")).unwrap();
        let sig = Signature::from(list);
        assert_eq!(sig.name, "List");
        assert_eq!(sig.type_params, vec![TypeParam::new("T")]);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let model = Metamodel::new();
        let mut arena = ContextArena::with_id_offset(&model, 1);
        assert_eq!(
            arena.new_context(Some(ContextId(99)), None),
            Err(InferError::UnknownContext(ContextId(99)))
        );
    }
}
