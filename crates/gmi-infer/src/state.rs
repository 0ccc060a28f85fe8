//! Binding states: what one scope currently knows about its parameters.

use std::collections::BTreeMap;

use gmi_types::{Multiplicity, TypeExpr};

use crate::ContextId;

/// A parameter's bound value and the context that value must be read in.
///
/// When the value is itself a parameter, it names a binding in `owner`,
/// not necessarily in the context holding this record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding<V> {
    /// Learnt from registration; later registrations may refine it.
    Bound { value: V, owner: ContextId },
    /// A scope's own declared parameter, or an explicit rewrite.
    /// Registration never replaces it.
    Terminal { value: V, owner: ContextId },
}

impl<V> Binding<V> {
    pub fn value(&self) -> &V {
        match self {
            Binding::Bound { value, .. } | Binding::Terminal { value, .. } => value,
        }
    }

    pub fn owner(&self) -> ContextId {
        match self {
            Binding::Bound { owner, .. } | Binding::Terminal { owner, .. } => *owner,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Binding::Terminal { .. })
    }

    pub fn into_value(self) -> V {
        match self {
            Binding::Bound { value, .. } | Binding::Terminal { value, .. } => value,
        }
    }
}

/// Lookahead protocol used during overload disambiguation.
///
/// Callers mark a state `Ahead` before speculative evaluation; whoever uses
/// the speculation moves it to `AheadConsumed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookahead {
    #[default]
    NotAhead,
    Ahead,
    AheadConsumed,
}

impl Lookahead {
    pub fn is_ahead(self) -> bool {
        !matches!(self, Lookahead::NotAhead)
    }

    pub fn is_consumed(self) -> bool {
        matches!(self, Lookahead::AheadConsumed)
    }

    /// `Ahead -> AheadConsumed`; any other state is left alone.
    pub fn consume(self) -> Self {
        match self {
            Lookahead::Ahead => Lookahead::AheadConsumed,
            other => other,
        }
    }
}

/// Type and multiplicity bindings of one scope (or one trial state of it).
///
/// Type and multiplicity parameter names live in disjoint namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingState {
    types: BTreeMap<String, Binding<TypeExpr>>,
    multiplicities: BTreeMap<String, Binding<Multiplicity>>,
    lookahead: Lookahead,
}

impl BindingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_binding(&self, name: &str) -> Option<&Binding<TypeExpr>> {
        self.types.get(name)
    }

    pub fn multiplicity_binding(&self, name: &str) -> Option<&Binding<Multiplicity>> {
        self.multiplicities.get(name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn has_multiplicity(&self, name: &str) -> bool {
        self.multiplicities.contains_key(name)
    }

    pub fn bind_type(&mut self, name: impl Into<String>, binding: Binding<TypeExpr>) {
        self.types.insert(name.into(), binding);
    }

    pub fn bind_multiplicity(&mut self, name: impl Into<String>, binding: Binding<Multiplicity>) {
        self.multiplicities.insert(name.into(), binding);
    }

    /// Type bindings, sorted by parameter name.
    pub fn type_bindings(&self) -> impl Iterator<Item = (&str, &Binding<TypeExpr>)> {
        self.types.iter().map(|(name, b)| (name.as_str(), b))
    }

    /// Multiplicity bindings, sorted by parameter name.
    pub fn multiplicity_bindings(&self) -> impl Iterator<Item = (&str, &Binding<Multiplicity>)> {
        self.multiplicities.iter().map(|(name, b)| (name.as_str(), b))
    }

    pub fn lookahead(&self) -> Lookahead {
        self.lookahead
    }

    pub(crate) fn set_lookahead(&mut self, lookahead: Lookahead) {
        self.lookahead = lookahead;
    }
}
