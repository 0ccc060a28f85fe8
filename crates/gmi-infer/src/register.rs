//! Registration: binding template parameters against observed types.
//!
//! A registration call walks a declared template and an observed type in
//! parallel. Parameters found in the template are bound in the current
//! context through a small state machine (new binding, merge, demotion,
//! forwarding to the owning context); concrete pairs are decomposed into
//! their arguments, function signatures and relation columns.
//!
//! Facts that belong to another context are collected as
//! `RegistrationRequest`s while the local binding is decided and replayed
//! afterwards, one nesting level deeper.

use gmi_types::{
    ConcreteType, ConflictPolicy, Multiplicity, OperationKind, TypeExpr, TypeParam, TypeSystem,
};
use tracing::debug;

use crate::{Binding, ContextArena, ContextId, InferError, InferenceObserver};

/// A deferred registration into another (or the same) context.
#[derive(Debug, Clone)]
struct RegistrationRequest<V> {
    context: ContextId,
    template: V,
    value: V,
}

impl<'ts> ContextArena<'ts> {
    /// Match `template` against `actual` in `context`.
    ///
    /// `target` is the context in which free parameters of `actual` are
    /// interpreted; it becomes the owner of new bindings. With `merge` set,
    /// an open binding is not overwritten by a concrete value. A missing
    /// `actual` is a no-op.
    pub fn register(
        &mut self,
        context: ContextId,
        template: &TypeExpr,
        actual: Option<&TypeExpr>,
        target: ContextId,
        merge: bool,
        observer: &mut dyn InferenceObserver,
    ) -> Result<(), InferError> {
        Registrar {
            arena: self,
            observer,
        }
        .register(context, template, actual, target, merge, 0)
    }

    /// Match a multiplicity template against an observed multiplicity.
    pub fn register_mul(
        &mut self,
        context: ContextId,
        template: &Multiplicity,
        actual: &Multiplicity,
        target: ContextId,
        observer: &mut dyn InferenceObserver,
    ) -> Result<(), InferError> {
        Registrar {
            arena: self,
            observer,
        }
        .register_mul(context, template, actual, target, 0)
    }
}

/// One top-level registration in flight.
struct Registrar<'a, 'ts, O: ?Sized> {
    arena: &'a mut ContextArena<'ts>,
    observer: &'a mut O,
}

impl<'ts, O: InferenceObserver + ?Sized> Registrar<'_, 'ts, O> {
    fn type_system(&self) -> &'ts dyn TypeSystem {
        self.arena.type_system
    }

    /// Run `f` one indentation level deeper, restoring the level even on error.
    fn nested<F>(&mut self, f: F) -> Result<(), InferError>
    where
        F: FnOnce(&mut Self) -> Result<(), InferError>,
    {
        self.observer.shift_tab();
        let result = f(self);
        self.observer.unshift_tab();
        result
    }

    fn trial_active(&self, context: ContextId) -> Result<bool, InferError> {
        Ok(self.arena.context(context)?.state_count() > 1)
    }

    fn bind_type(
        &mut self,
        context: ContextId,
        name: &str,
        value: TypeExpr,
        owner: ContextId,
    ) -> Result<(), InferError> {
        self.arena
            .state_mut(context)?
            .bind_type(name, Binding::Bound { value, owner });
        Ok(())
    }

    fn bind_multiplicity(
        &mut self,
        context: ContextId,
        name: &str,
        value: Multiplicity,
        owner: ContextId,
    ) -> Result<(), InferError> {
        self.arena
            .state_mut(context)?
            .bind_multiplicity(name, Binding::Bound { value, owner });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    fn register(
        &mut self,
        context: ContextId,
        template: &TypeExpr,
        actual: Option<&TypeExpr>,
        target: ContextId,
        merge: bool,
        depth: usize,
    ) -> Result<(), InferError> {
        self.arena.check_depth(depth)?;
        self.arena.context(context)?;
        let target_parent = self.arena.context(target)?.parent();
        self.observer
            .trying_registration(template, actual, context, target);
        let Some(actual) = actual else {
            return Ok(());
        };
        let actual = actual.clone();

        // `X = <relation>` observed below a parent: X belongs to the parent.
        if let TypeExpr::Operation(op) = &actual
            && op.kind == OperationKind::Equal
            && let Some(target_parent) = target_parent
        {
            let registering = self.arena.context(context)?.parent().unwrap_or(target_parent);
            self.nested(|this| {
                this.register(
                    registering,
                    &op.left,
                    Some(&op.right),
                    target_parent,
                    merge,
                    depth + 1,
                )
            })?;
        }

        if let TypeExpr::Operation(op) = template {
            if op.kind == OperationKind::Equal {
                self.nested(|this| {
                    this.register(context, &op.left, Some(&actual), target, merge, depth + 1)
                })?;
            }
            if let TypeExpr::Operation(actual_op) = &actual
                && actual_op.kind == op.kind
            {
                self.nested(|this| {
                    this.register(
                        context,
                        &op.left,
                        Some(&actual_op.left),
                        target,
                        merge,
                        depth + 1,
                    )?;
                    this.register(
                        context,
                        &op.right,
                        Some(&actual_op.right),
                        target,
                        merge,
                        depth + 1,
                    )
                })?;
            }
        }

        if let TypeExpr::Param(param) = template {
            self.register_type_parameter(context, param, &actual, target, merge, depth)?;
        }

        if template.is_concrete()
            && actual.is_concrete()
            && !is_extremum(template)
            && !is_extremum(&actual)
        {
            self.decompose(context, template, &actual, target, merge, depth)?;
        }
        Ok(())
    }

    fn register_type_parameter(
        &mut self,
        context: ContextId,
        param: &TypeParam,
        actual: &TypeExpr,
        target: ContextId,
        merge: bool,
        depth: usize,
    ) -> Result<(), InferError> {
        let name = param.name.as_str();
        let existing = self
            .arena
            .context(context)?
            .current_state()
            .type_binding(name)
            .cloned();
        let trial = self.trial_active(context)?;
        let mut forwards = Vec::new();

        match existing {
            None => self.bind_type(context, name, actual.clone(), target)?,
            Some(Binding::Terminal { .. }) => {
                debug!(%context, parameter = name, "declared parameter keeps its self-binding");
            }
            Some(Binding::Bound {
                value: existing,
                owner,
            }) => {
                if existing.is_concrete() && actual.is_concrete() {
                    let merged = self.merge_concrete(param, &existing, actual, owner, &mut forwards)?;
                    self.bind_type(context, name, merged, target)?;
                } else if trial {
                    self.bind_type(context, name, actual.clone(), target)?;
                } else if existing.is_concrete() {
                    // Demotion: the new open value must itself be at least
                    // the concrete type we knew.
                    self.bind_type(context, name, actual.clone(), target)?;
                    forwards.push(RegistrationRequest {
                        context: target,
                        template: actual.clone(),
                        value: existing,
                    });
                } else if actual.is_concrete() {
                    if matches!(existing, TypeExpr::Operation(_)) {
                        self.bind_type(context, name, actual.clone(), target)?;
                    } else if owner != context {
                        forwards.push(RegistrationRequest {
                            context: owner,
                            template: existing,
                            value: actual.clone(),
                        });
                    } else if !merge {
                        self.bind_type(context, name, actual.clone(), target)?;
                    } else {
                        debug!(
                            %context,
                            parameter = name,
                            %existing,
                            %actual,
                            "open binding kept; merging with a concrete value is not computed"
                        );
                    }
                } else if owner != context {
                    forwards.push(RegistrationRequest {
                        context: owner,
                        template: existing,
                        value: actual.clone(),
                    });
                }
            }
        }

        self.observer
            .register(&TypeExpr::Param(param.clone()), actual, context, target);
        if forwards.is_empty() {
            return Ok(());
        }
        self.nested(|this| {
            for request in forwards {
                this.register(
                    request.context,
                    &request.template,
                    Some(&request.value),
                    target,
                    merge,
                    depth + 1,
                )?;
            }
            Ok(())
        })
    }

    /// Merge two concrete values of one parameter.
    ///
    /// Argument facts uncovered by the merge are queued on `forwards` for
    /// the owner of the existing binding.
    fn merge_concrete(
        &self,
        param: &TypeParam,
        existing: &TypeExpr,
        actual: &TypeExpr,
        owner: ContextId,
        forwards: &mut Vec<RegistrationRequest<TypeExpr>>,
    ) -> Result<TypeExpr, InferError> {
        let ts = self.type_system();
        if let (TypeExpr::Relation(left), TypeExpr::Relation(right)) = (existing, actual) {
            if ts.can_concatenate(left, right) {
                return Ok(TypeExpr::Relation(ts.concatenate(left, right)));
            }
            debug!(parameter = %param.name, %existing, %actual, "relations clash, degrading to top");
            return Ok(TypeExpr::top());
        }

        if let (TypeExpr::Concrete(left), TypeExpr::Concrete(right)) = (existing, actual)
            && ts.is_function_class(&left.raw)
            && ts.is_function_class(&right.raw)
            && left.type_args.len() == right.type_args.len()
        {
            forwards.extend(left.type_args.iter().zip(&right.type_args).map(|(l, r)| {
                RegistrationRequest {
                    context: owner,
                    template: l.clone(),
                    value: r.clone(),
                }
            }));
        }

        let merged = ts.common_supertype(
            &[existing.clone(), actual.clone()],
            param.variance,
            ConflictPolicy::Degrade,
        )?;
        if merged.is_top() && !existing.is_top() && !actual.is_top() {
            debug!(parameter = %param.name, %existing, %actual, "no common supertype, degrading to top");
        }

        // Same head: arguments that only now became concrete are news for
        // the owner.
        if let (TypeExpr::Concrete(before), TypeExpr::Concrete(after)) = (existing, &merged)
            && before.raw == after.raw
        {
            forwards.extend(
                before
                    .type_args
                    .iter()
                    .zip(&after.type_args)
                    .filter(|(b, a)| !b.is_concrete() && a.is_concrete())
                    .map(|(b, a)| RegistrationRequest {
                        context: owner,
                        template: b.clone(),
                        value: a.clone(),
                    }),
            );
        }
        Ok(merged)
    }

    fn decompose(
        &mut self,
        context: ContextId,
        template: &TypeExpr,
        actual: &TypeExpr,
        target: ContextId,
        merge: bool,
        depth: usize,
    ) -> Result<(), InferError> {
        match (template, actual) {
            (TypeExpr::Relation(templates), TypeExpr::Relation(values)) => {
                let (values, templates) = self
                    .type_system()
                    .align_columns(&values.columns, &templates.columns);
                self.nested(|this| {
                    for (template, value) in templates.iter().zip(&values) {
                        this.register(
                            context,
                            &template.ty,
                            Some(&value.ty),
                            target,
                            merge,
                            depth + 1,
                        )?;
                    }
                    Ok(())
                })
            }
            (TypeExpr::Function(_), TypeExpr::Function(_)) => {
                self.register_function_type(context, template, actual, target, false, depth + 1)
            }
            (TypeExpr::Concrete(template), TypeExpr::Concrete(actual)) => {
                self.register_arguments(context, template, actual, target, merge, depth)
            }
            _ => Ok(()),
        }
    }

    /// Pair the arguments of two class types through the hierarchy and
    /// register each pair, multiplicities first.
    fn register_arguments(
        &mut self,
        context: ContextId,
        template: &ConcreteType,
        actual: &ConcreteType,
        target: ContextId,
        merge: bool,
        depth: usize,
    ) -> Result<(), InferError> {
        let ts = self.type_system();
        let (type_templates, mul_templates, type_values, mul_values) =
            if ts.is_subtype_of(&template.raw, &actual.raw) {
                let (types, muls) = arguments_as(ts, template, actual);
                (types, muls, actual.type_args.clone(), actual.mul_args.clone())
            } else if !template.is_fully_concrete() || !actual.is_fully_concrete() {
                let (types, muls) = arguments_as(ts, actual, template);
                (template.type_args.clone(), template.mul_args.clone(), types, muls)
            } else {
                return Ok(());
            };

        for (template, value) in mul_templates.iter().zip(&mul_values) {
            self.register_mul(context, template, value, target, depth + 1)?;
        }
        for (template, value) in type_templates.iter().zip(&type_values) {
            if matches!(
                (template, value),
                (TypeExpr::Function(_), TypeExpr::Function(_))
            ) {
                self.register_function_type(context, template, value, target, merge, depth + 1)?;
            } else {
                self.nested(|this| {
                    this.register(context, template, Some(value), target, merge, depth + 1)
                })?;
            }
        }
        Ok(())
    }

    /// Register parameter and return types and multiplicities of two
    /// function types of equal arity.
    fn register_function_type(
        &mut self,
        context: ContextId,
        template: &TypeExpr,
        actual: &TypeExpr,
        target: ContextId,
        merge: bool,
        depth: usize,
    ) -> Result<(), InferError> {
        let (TypeExpr::Function(tf), TypeExpr::Function(af)) = (template, actual) else {
            return Ok(());
        };
        self.arena.check_depth(depth)?;
        self.observer.register(template, actual, context, target);
        if tf.params.len() != af.params.len() {
            debug!(%template, %actual, "function arity differs, signature not decomposed");
            return Ok(());
        }
        self.nested(|this| {
            for ((tt, tm), (at, am)) in tf.params.iter().zip(&af.params) {
                this.register(context, tt, Some(at), target, merge, depth + 1)?;
                this.register_mul(context, tm, am, target, depth + 1)?;
            }
            this.register(context, &tf.ret, Some(&af.ret), target, merge, depth + 1)?;
            this.register_mul(context, &tf.ret_mul, &af.ret_mul, target, depth + 1)
        })
    }

    // -----------------------------------------------------------------------
    // Multiplicities
    // -----------------------------------------------------------------------

    fn register_mul(
        &mut self,
        context: ContextId,
        template: &Multiplicity,
        actual: &Multiplicity,
        target: ContextId,
        depth: usize,
    ) -> Result<(), InferError> {
        self.arena.check_depth(depth)?;
        self.arena.context(context)?;
        self.arena.context(target)?;
        let Multiplicity::Param(name) = template else {
            return Ok(());
        };
        let existing = self
            .arena
            .context(context)?
            .current_state()
            .multiplicity_binding(name)
            .cloned();
        let trial = self.trial_active(context)?;
        let mut forward = None;

        match existing {
            None => self.bind_multiplicity(context, name, actual.clone(), target)?,
            Some(Binding::Terminal { .. }) => {}
            Some(Binding::Bound {
                value: existing,
                owner,
            }) => {
                if existing.is_concrete() && actual.is_concrete() {
                    let merged = self
                        .type_system()
                        .min_subsuming_multiplicity(&[existing, actual.clone()]);
                    self.bind_multiplicity(context, name, merged, target)?;
                } else if trial {
                    self.bind_multiplicity(context, name, actual.clone(), target)?;
                } else if existing.is_concrete() {
                    self.bind_multiplicity(context, name, actual.clone(), target)?;
                    forward = Some(RegistrationRequest {
                        context: target,
                        template: actual.clone(),
                        value: existing,
                    });
                } else if owner != context {
                    forward = Some(RegistrationRequest {
                        context: owner,
                        template: existing,
                        value: actual.clone(),
                    });
                } else if actual.is_concrete() {
                    self.bind_multiplicity(context, name, actual.clone(), target)?;
                }
            }
        }

        self.observer.register_mul(template, actual, context, target);
        let Some(request) = forward else {
            return Ok(());
        };
        self.nested(|this| {
            this.register_mul(
                request.context,
                &request.template,
                &request.value,
                target,
                depth + 1,
            )
        })
    }
}

/// The top and bottom types carry no structure worth decomposing.
fn is_extremum(ty: &TypeExpr) -> bool {
    ty.is_top() || ty.is_bottom()
}

/// Arguments of `ty` as seen from `other`'s class, or `ty`'s own when that
/// class is not an ancestor.
fn arguments_as(
    ts: &dyn TypeSystem,
    ty: &ConcreteType,
    other: &ConcreteType,
) -> (Vec<TypeExpr>, Vec<Multiplicity>) {
    ts.inherited_arguments(ty, &other.raw)
        .unwrap_or_else(|| (ty.type_args.clone(), ty.mul_args.clone()))
}
