//! Observers for the registration process.
//!
//! The engine reports each registration attempt and each accepted binding to
//! an [`InferenceObserver`]. Nested registrations are bracketed by
//! `shift_tab` / `unshift_tab` so observers can render the recursion as an
//! indented tree. [`NoopObserver`] costs nothing; [`TraceObserver`] records
//! serializable steps; [`TracingObserver`] forwards to `tracing`.

use serde::Serialize;

use gmi_types::{Multiplicity, TypeExpr};

use crate::ContextId;

// ---------------------------------------------------------------------------
// Observer interface
// ---------------------------------------------------------------------------

/// Receives registration events. Every method defaults to doing nothing.
pub trait InferenceObserver {
    /// A type registration was requested. `actual` is `None` when the caller
    /// had nothing to register.
    fn trying_registration(
        &mut self,
        _template: &TypeExpr,
        _actual: Option<&TypeExpr>,
        _context: ContextId,
        _target: ContextId,
    ) {
    }

    /// A type parameter or function type was processed in `context`.
    fn register(
        &mut self,
        _template: &TypeExpr,
        _actual: &TypeExpr,
        _context: ContextId,
        _target: ContextId,
    ) {
    }

    /// A multiplicity parameter was processed in `context`.
    fn register_mul(
        &mut self,
        _template: &Multiplicity,
        _actual: &Multiplicity,
        _context: ContextId,
        _target: ContextId,
    ) {
    }

    fn shift_tab(&mut self) {}

    fn unshift_tab(&mut self) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl InferenceObserver for NoopObserver {}

// ---------------------------------------------------------------------------
// Recorded trace
// ---------------------------------------------------------------------------

/// A single step in a registration trace.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationStep {
    pub step: usize,
    /// Nesting level at which the event fired.
    pub depth: usize,
    pub action: TraceAction,
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    pub context: String,
    pub target: String,
}

/// What the engine was doing when a step was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceAction {
    /// Entry into `register`, before anything is decided.
    Trying,
    /// A type parameter (or function type) was processed.
    RegisterType,
    /// A multiplicity parameter was processed.
    RegisterMultiplicity,
}

impl TraceAction {
    fn label(self) -> &'static str {
        match self {
            TraceAction::Trying => "try",
            TraceAction::RegisterType => "type",
            TraceAction::RegisterMultiplicity => "mul",
        }
    }
}

/// Records every event as a [`RegistrationStep`].
#[derive(Debug, Clone, Default)]
pub struct TraceObserver {
    depth: usize,
    steps: Vec<RegistrationStep>,
}

impl TraceObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[RegistrationStep] {
        &self.steps
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.steps)
    }

    /// One line per step, indented by nesting depth.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push_str(&"  ".repeat(step.depth));
            out.push_str(step.action.label());
            out.push(' ');
            out.push_str(&step.template);
            out.push_str(" <- ");
            out.push_str(step.actual.as_deref().unwrap_or("(none)"));
            out.push_str(&format!(" @{}->{}\n", step.context, step.target));
        }
        out
    }

    fn record(
        &mut self,
        action: TraceAction,
        template: String,
        actual: Option<String>,
        context: ContextId,
        target: ContextId,
    ) {
        self.steps.push(RegistrationStep {
            step: self.steps.len(),
            depth: self.depth,
            action,
            template,
            actual,
            context: context.to_string(),
            target: target.to_string(),
        });
    }
}

impl InferenceObserver for TraceObserver {
    fn trying_registration(
        &mut self,
        template: &TypeExpr,
        actual: Option<&TypeExpr>,
        context: ContextId,
        target: ContextId,
    ) {
        self.record(
            TraceAction::Trying,
            template.to_string(),
            actual.map(ToString::to_string),
            context,
            target,
        );
    }

    fn register(
        &mut self,
        template: &TypeExpr,
        actual: &TypeExpr,
        context: ContextId,
        target: ContextId,
    ) {
        self.record(
            TraceAction::RegisterType,
            template.to_string(),
            Some(actual.to_string()),
            context,
            target,
        );
    }

    fn register_mul(
        &mut self,
        template: &Multiplicity,
        actual: &Multiplicity,
        context: ContextId,
        target: ContextId,
    ) {
        self.record(
            TraceAction::RegisterMultiplicity,
            template.to_string(),
            Some(actual.to_string()),
            context,
            target,
        );
    }

    fn shift_tab(&mut self) {
        self.depth += 1;
    }

    fn unshift_tab(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

// ---------------------------------------------------------------------------
// `tracing` bridge
// ---------------------------------------------------------------------------

/// Emits every event as a `tracing` event at TRACE level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver {
    depth: usize,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InferenceObserver for TracingObserver {
    fn trying_registration(
        &mut self,
        template: &TypeExpr,
        actual: Option<&TypeExpr>,
        context: ContextId,
        target: ContextId,
    ) {
        match actual {
            Some(actual) => tracing::trace!(
                depth = self.depth,
                %template,
                %actual,
                %context,
                %target,
                "trying registration"
            ),
            None => tracing::trace!(
                depth = self.depth,
                %template,
                %context,
                %target,
                "trying registration without a value"
            ),
        }
    }

    fn register(
        &mut self,
        template: &TypeExpr,
        actual: &TypeExpr,
        context: ContextId,
        target: ContextId,
    ) {
        tracing::trace!(depth = self.depth, %template, %actual, %context, %target, "register type");
    }

    fn register_mul(
        &mut self,
        template: &Multiplicity,
        actual: &Multiplicity,
        context: ContextId,
        target: ContextId,
    ) {
        tracing::trace!(
            depth = self.depth,
            %template,
            %actual,
            %context,
            %target,
            "register multiplicity"
        );
    }

    fn shift_tab(&mut self) {
        self.depth += 1;
    }

    fn unshift_tab(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_observer_tracks_nesting() {
        let mut obs = TraceObserver::new();
        obs.trying_registration(
            &TypeExpr::param("T"),
            Some(&TypeExpr::class("String")),
            ContextId(1),
            ContextId(1),
        );
        obs.shift_tab();
        obs.register_mul(
            &Multiplicity::param("m"),
            &Multiplicity::one(),
            ContextId(1),
            ContextId(2),
        );
        obs.unshift_tab();
        obs.unshift_tab();
        obs.trying_registration(&TypeExpr::param("U"), None, ContextId(2), ContextId(2));

        let steps = obs.steps();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].depth, 0);
        assert_eq!(steps[1].depth, 1);
        assert_eq!(steps[1].action, TraceAction::RegisterMultiplicity);
        assert_eq!(steps[2].depth, 0);
        assert_eq!(steps[2].actual, None);
        assert_eq!(
            obs.render(),
            "try T <- String @1->1\n  mul [m] <- [1] @1->2\ntry U <- (none) @2->2\n"
        );
    }

    #[test]
    fn tracing_observer_balances_depth_across_a_registration() {
        let model = gmi_types::Metamodel::new();
        let mut arena = crate::ContextArena::with_id_offset(&model, 1);
        let ctx = arena.new_context(None, None).unwrap();
        let template = TypeExpr::function(
            vec![(TypeExpr::param("X"), Multiplicity::param("m"))],
            TypeExpr::generic("List", vec![TypeExpr::param("Y")]),
            Multiplicity::one(),
        );
        let actual = TypeExpr::function(
            vec![(TypeExpr::class("String"), Multiplicity::one())],
            TypeExpr::generic("List", vec![TypeExpr::class("Integer")]),
            Multiplicity::one(),
        );

        let mut obs = TracingObserver::new();
        arena
            .register(ctx, &template, Some(&actual), ctx, false, &mut obs)
            .unwrap();

        assert_eq!(obs.depth, 0);
        assert_eq!(
            arena.get_type_parameter_value(ctx, "Y").unwrap(),
            Some(TypeExpr::class("Integer"))
        );
        assert_eq!(
            arena.get_multiplicity_parameter_value(ctx, "m").unwrap(),
            Some(Multiplicity::one())
        );
    }

    #[test]
    fn trace_json_omits_missing_actual() {
        let mut obs = TraceObserver::new();
        obs.trying_registration(&TypeExpr::param("T"), None, ContextId(10), ContextId(10));
        let json = obs.to_json().unwrap();
        assert!(json.contains("\"action\": \"trying\""));
        assert!(json.contains("\"context\": \"a\""));
        assert!(!json.contains("\"actual\""));
    }
}
