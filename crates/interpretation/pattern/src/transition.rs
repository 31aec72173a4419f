//! Automaton transitions and the constraint hooks they carry.
//!
//! A transition is an edge between two automaton states. Observing
//! transitions create a new finding of their observable type when taken;
//! epsilon transitions create nothing. Each transition may carry two hooks:
//!
//! - the **temporal** hook contributes constraints to the pattern's
//!   networks when the transition is taken (and again on every rebuild);
//! - the **general** hook checks non-temporal conditions, and is only run
//!   once the evidence it looks at is no longer tentative.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use interpretation_types::{InterpretationResult, ObservableType, Observation};

use crate::automaton::StateId;
use crate::pattern::AbstractionPattern;

/// Hook run against a pattern for one step of its trace.
pub type ConstraintHook = Arc<
    dyn Fn(&mut AbstractionPattern, Option<&Arc<Observation>>) -> InterpretationResult<()>
        + Send
        + Sync,
>;

/// How the evidence of a transition relates to the hypothesis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The evidence is explained (abstracted) by the hypothesis.
    #[default]
    Abstracted,
    /// The evidence is context the hypothesis needs but does not explain.
    Environment,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abstracted => write!(f, "abstracted"),
            Self::Environment => write!(f, "environment"),
        }
    }
}

/// A directed automaton edge.
#[derive(Clone)]
pub struct Transition {
    source: StateId,
    target: StateId,
    observable: Option<ObservableType>,
    role: Role,
    label: String,
    temporal: Option<ConstraintHook>,
    general: Option<ConstraintHook>,
}

impl Transition {
    /// A transition that consumes no evidence.
    pub fn epsilon(source: impl Into<StateId>, target: impl Into<StateId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            observable: None,
            role: Role::default(),
            label: String::new(),
            temporal: None,
            general: None,
        }
    }

    /// A transition that requires an observation of `observable`.
    pub fn observing(
        source: impl Into<StateId>,
        target: impl Into<StateId>,
        observable: impl Into<ObservableType>,
    ) -> Self {
        Self {
            observable: Some(observable.into()),
            ..Self::epsilon(source, target)
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_temporal<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut AbstractionPattern, Option<&Arc<Observation>>) -> InterpretationResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.temporal = Some(Arc::new(hook));
        self
    }

    pub fn with_general<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut AbstractionPattern, Option<&Arc<Observation>>) -> InterpretationResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.general = Some(Arc::new(hook));
        self
    }

    pub fn source(&self) -> &StateId {
        &self.source
    }

    pub fn target(&self) -> &StateId {
        &self.target
    }

    pub fn observable(&self) -> Option<&ObservableType> {
        self.observable.as_ref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_abstracted(&self) -> bool {
        self.role == Role::Abstracted
    }

    pub fn is_epsilon(&self) -> bool {
        self.observable.is_none()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// A fresh finding for this transition, or `None` for epsilon
    /// transitions.
    pub fn new_observation(&self) -> Option<Observation> {
        self.observable.clone().map(Observation::new)
    }

    /// Run the temporal hook. Transitions without one contribute nothing.
    pub fn temporal_constraint(
        &self,
        pattern: &mut AbstractionPattern,
        observation: Option<&Arc<Observation>>,
    ) -> InterpretationResult<()> {
        match &self.temporal {
            Some(hook) => hook(pattern, observation),
            None => Ok(()),
        }
    }

    /// Run the general hook. Transitions without one accept everything.
    pub fn general_constraint(
        &self,
        pattern: &mut AbstractionPattern,
        observation: Option<&Arc<Observation>>,
    ) -> InterpretationResult<()> {
        match &self.general {
            Some(hook) => hook(pattern, observation),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("observable", &self.observable)
            .field("role", &self.role)
            .field("label", &self.label)
            .field("temporal", &self.temporal.is_some())
            .field("general", &self.general.is_some())
            .finish()
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.observable {
            Some(observable) => write!(f, "{} -[{}]-> {}", self.source, observable, self.target),
            None => write!(f, "{} -> {}", self.source, self.target),
        }
    }
}
