//! Pattern automata: the knowledge an abstraction pattern explores.
//!
//! The [`Automaton`] trait is the capability a pattern consumes. Knowledge
//! bases may implement it directly; [`PatternAutomaton`] is the builder-style
//! implementation used for most definitions.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use interpretation_types::{InterpretationError, InterpretationResult, ObservableType, Observation};

use crate::pattern::AbstractionPattern;
use crate::transition::Transition;

/// Hook run against a whole pattern (base constraints, finalization).
pub type PatternHook =
    Arc<dyn Fn(&mut AbstractionPattern) -> InterpretationResult<()> + Send + Sync>;

// ── State Identifier ────────────────────────────────────────────────────

/// Name of an automaton state.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub String);

impl StateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for StateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ── Automaton Capability ────────────────────────────────────────────────

/// The basic temporal constraint of every hypothesis: `start <= time <= end`.
pub fn basic_temporal_constraint(pattern: &mut AbstractionPattern) {
    let [start, time, end] = pattern.hypothesis().vars();
    pattern.set_between(start, time, end);
}

/// What an abstraction pattern needs from its automaton.
pub trait Automaton: Send + Sync {
    fn name(&self) -> &str;

    fn start_state(&self) -> &StateId;

    fn final_states(&self) -> &BTreeSet<StateId>;

    /// Observable types that may appear as evidence of this pattern.
    fn manifestations(&self) -> &BTreeSet<ObservableType>;

    /// A fresh hypothesis for a new pattern.
    fn new_hypothesis(&self) -> Observation;

    /// Transitions whose target is `state`.
    fn transitions_into(&self, state: &StateId) -> Vec<Arc<Transition>>;

    /// Transitions whose source is `state`.
    fn transitions_out_of(&self, state: &StateId) -> Vec<Arc<Transition>>;

    /// Constraints every pattern starts with, and every rebuild re-applies.
    fn base_constraint(&self, pattern: &mut AbstractionPattern) -> InterpretationResult<()> {
        basic_temporal_constraint(pattern);
        Ok(())
    }

    /// Assign the derived attributes of the hypothesis once the pattern has
    /// sufficient evidence.
    fn finalize(&self, _pattern: &mut AbstractionPattern) -> InterpretationResult<()> {
        Ok(())
    }
}

// ── Pattern Automaton ───────────────────────────────────────────────────

/// Builder-style automaton definition.
///
/// Manifestations are derived from the observable types of the added
/// transitions.
#[derive(Clone)]
pub struct PatternAutomaton {
    name: String,
    hypothesis_kind: ObservableType,
    start: StateId,
    finals: BTreeSet<StateId>,
    manifestations: BTreeSet<ObservableType>,
    transitions: Vec<Arc<Transition>>,
    base: Option<PatternHook>,
    finalizer: Option<PatternHook>,
}

impl PatternAutomaton {
    pub fn new(
        name: impl Into<String>,
        hypothesis_kind: impl Into<ObservableType>,
        start: impl Into<StateId>,
    ) -> Self {
        Self {
            name: name.into(),
            hypothesis_kind: hypothesis_kind.into(),
            start: start.into(),
            finals: BTreeSet::new(),
            manifestations: BTreeSet::new(),
            transitions: Vec::new(),
            base: None,
            finalizer: None,
        }
    }

    pub fn with_final(mut self, state: impl Into<StateId>) -> Self {
        self.finals.insert(state.into());
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.add_transition(transition);
        self
    }

    pub fn add_transition(&mut self, transition: Transition) {
        if let Some(observable) = transition.observable() {
            self.manifestations.insert(observable.clone());
        }
        self.transitions.push(Arc::new(transition));
    }

    /// Replace the default `start <= time <= end` base constraint.
    pub fn with_base_constraint<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut AbstractionPattern) -> InterpretationResult<()> + Send + Sync + 'static,
    {
        self.base = Some(Arc::new(hook));
        self
    }

    pub fn with_finalizer<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut AbstractionPattern) -> InterpretationResult<()> + Send + Sync + 'static,
    {
        self.finalizer = Some(Arc::new(hook));
        self
    }

    pub fn hypothesis_kind(&self) -> &ObservableType {
        &self.hypothesis_kind
    }

    pub fn transitions(&self) -> &[Arc<Transition>] {
        &self.transitions
    }

    /// Every state mentioned by the definition.
    pub fn states(&self) -> BTreeSet<StateId> {
        let mut states: BTreeSet<StateId> = self.finals.clone();
        states.insert(self.start.clone());
        for t in &self.transitions {
            states.insert(t.source().clone());
            states.insert(t.target().clone());
        }
        states
    }

    /// Check the definition is usable.
    ///
    /// There must be at least one final state, no transition may take the
    /// hypothesis kind as its own evidence, and every final state must be
    /// reachable from the start state.
    pub fn validate(&self) -> InterpretationResult<()> {
        if self.finals.is_empty() {
            return Err(InterpretationError::InvalidAutomaton(format!(
                "{} has no final state",
                self.name
            )));
        }
        if let Some(t) = self
            .transitions
            .iter()
            .find(|t| t.observable() == Some(&self.hypothesis_kind))
        {
            return Err(InterpretationError::InvalidAutomaton(format!(
                "{}: transition {} uses the hypothesis as its own evidence",
                self.name, t
            )));
        }

        let mut reached: BTreeSet<&StateId> = BTreeSet::new();
        let mut queue: VecDeque<&StateId> = VecDeque::from([&self.start]);
        while let Some(state) = queue.pop_front() {
            if !reached.insert(state) {
                continue;
            }
            for t in self.transitions.iter().filter(|t| t.source() == state) {
                queue.push_back(t.target());
            }
        }

        if let Some(unreachable) = self.finals.iter().find(|s| !reached.contains(s)) {
            return Err(InterpretationError::InvalidAutomaton(format!(
                "{}: final state {} is not reachable from {}",
                self.name, unreachable, self.start
            )));
        }
        Ok(())
    }
}

impl Automaton for PatternAutomaton {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_state(&self) -> &StateId {
        &self.start
    }

    fn final_states(&self) -> &BTreeSet<StateId> {
        &self.finals
    }

    fn manifestations(&self) -> &BTreeSet<ObservableType> {
        &self.manifestations
    }

    fn new_hypothesis(&self) -> Observation {
        Observation::new(self.hypothesis_kind.clone())
    }

    fn transitions_into(&self, state: &StateId) -> Vec<Arc<Transition>> {
        self.transitions
            .iter()
            .filter(|t| t.target() == state)
            .cloned()
            .collect()
    }

    fn transitions_out_of(&self, state: &StateId) -> Vec<Arc<Transition>> {
        self.transitions
            .iter()
            .filter(|t| t.source() == state)
            .cloned()
            .collect()
    }

    fn base_constraint(&self, pattern: &mut AbstractionPattern) -> InterpretationResult<()> {
        match &self.base {
            Some(hook) => hook(pattern),
            None => {
                basic_temporal_constraint(pattern);
                Ok(())
            }
        }
    }

    fn finalize(&self, pattern: &mut AbstractionPattern) -> InterpretationResult<()> {
        match &self.finalizer {
            Some(hook) => hook(pattern),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for PatternAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternAutomaton")
            .field("name", &self.name)
            .field("hypothesis_kind", &self.hypothesis_kind)
            .field("start", &self.start)
            .field("finals", &self.finals)
            .field("transitions", &self.transitions)
            .finish()
    }
}

impl fmt::Display for PatternAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
