//! The abstraction pattern: one partial interpretation bound to an automaton.
//!
//! A pattern walks its automaton from the start state towards a final state,
//! collecting evidence on the way. It owns:
//!
//! - the two boundaries of the explored path (`initial_state` moves
//!   backward, `final_state` moves forward);
//! - the trace of `(transition, observation)` steps from one boundary to the
//!   other;
//! - the evidence lists, one per manifestation type, in temporal order;
//! - the findings, i.e. the observations created while exploring that still
//!   wait for a confirmed observation to match them;
//! - the hypothesis the evidence supports;
//! - the temporal constraint networks relating all of them.
//!
//! Patterns are values. Exploring ([`AbstractionPattern::successors`]) never
//! changes a pattern: every candidate is a [`branch`](AbstractionPattern::branch)
//! with its own lists, findings, hypothesis and networks. Only the evidence
//! observations themselves are shared, as immutable `Arc<Observation>`s.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use interpretation_tnet::ConstraintNetwork;
use interpretation_types::{
    InterpretationError, InterpretationResult, Interval, ObservableType, Observation,
    ObservationId, TimeVar,
};

use crate::automaton::{Automaton, StateId};
use crate::config::PatternConfig;
use crate::networks::NetworkSet;
use crate::transition::{Role, Transition};

// ── Identifiers ─────────────────────────────────────────────────────────

/// Identity of one pattern branch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternId(pub String);

impl PatternId {
    /// Generate a new unique pattern ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for PatternId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pattern:{}", self.0)
    }
}

/// One entry of the trace. `observation` is `None` for epsilon steps.
#[derive(Clone, Debug)]
pub struct Step {
    pub transition: Arc<Transition>,
    pub observation: Option<Arc<Observation>>,
}

impl Step {
    fn holds(&self, id: ObservationId) -> bool {
        self.observation.as_ref().is_some_and(|obs| obs.id() == id)
    }
}

// ── Abstraction Pattern ─────────────────────────────────────────────────

pub struct AbstractionPattern {
    pub(crate) id: PatternId,
    pub(crate) automaton: Arc<dyn Automaton>,
    pub(crate) config: PatternConfig,
    pub(crate) initial_state: StateId,
    pub(crate) final_state: StateId,
    pub(crate) trace: Vec<Step>,
    pub(crate) hypothesis: Observation,
    pub(crate) evidence: BTreeMap<ObservableType, Vec<Arc<Observation>>>,
    pub(crate) findings: BTreeMap<ObservationId, Arc<Observation>>,
    pub(crate) networks: NetworkSet,
    pub(crate) finished: bool,
}

impl AbstractionPattern {
    /// Create a pattern at the start state of `automaton`, with the default
    /// configuration.
    pub fn new(automaton: Arc<dyn Automaton>) -> InterpretationResult<Self> {
        Self::with_config(automaton, PatternConfig::default())
    }

    pub fn with_config(
        automaton: Arc<dyn Automaton>,
        config: PatternConfig,
    ) -> InterpretationResult<Self> {
        let start = automaton.start_state().clone();
        let evidence = automaton
            .manifestations()
            .iter()
            .map(|ty| (ty.clone(), Vec::new()))
            .collect();
        let mut pattern = Self {
            id: PatternId::new(),
            hypothesis: automaton.new_hypothesis(),
            automaton: Arc::clone(&automaton),
            config,
            initial_state: start.clone(),
            final_state: start,
            trace: Vec::new(),
            evidence,
            findings: BTreeMap::new(),
            networks: NetworkSet::new(),
            finished: false,
        };
        automaton.base_constraint(&mut pattern)?;

        debug!(
            pattern = %pattern.id,
            automaton = automaton.name(),
            hypothesis = %pattern.hypothesis,
            "Created abstraction pattern"
        );
        Ok(pattern)
    }

    /// An independent copy of this pattern.
    ///
    /// Trace, evidence lists and findings are copied (the observations in
    /// them are shared). The hypothesis is forked to a new identity with new
    /// temporal variables, and the copied networks refer to the new
    /// variables.
    pub fn branch(&self) -> Self {
        let hypothesis = self.hypothesis.fork();
        let mut networks = self.networks.clone();
        for (old, new) in self.hypothesis.vars().into_iter().zip(hypothesis.vars()) {
            networks.substitute(old, new);
        }
        Self {
            id: PatternId::new(),
            automaton: Arc::clone(&self.automaton),
            config: self.config.clone(),
            initial_state: self.initial_state.clone(),
            final_state: self.final_state.clone(),
            trace: self.trace.clone(),
            hypothesis,
            evidence: self.evidence.clone(),
            findings: self.findings.clone(),
            networks,
            finished: self.finished,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn id(&self) -> &PatternId {
        &self.id
    }

    pub fn automaton(&self) -> &Arc<dyn Automaton> {
        &self.automaton
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Backward boundary of the explored path.
    pub fn initial_state(&self) -> &StateId {
        &self.initial_state
    }

    /// Forward boundary of the explored path.
    pub fn final_state(&self) -> &StateId {
        &self.final_state
    }

    pub fn hypothesis(&self) -> &Observation {
        &self.hypothesis
    }

    /// The hypothesis, for finalizers assigning its derived attributes.
    pub fn hypothesis_mut(&mut self) -> &mut Observation {
        &mut self.hypothesis
    }

    /// Publish the hypothesis.
    pub fn into_hypothesis(self) -> Observation {
        self.hypothesis
    }

    /// Evidence of type `ty`, in temporal order.
    pub fn evidence(&self, ty: &ObservableType) -> &[Arc<Observation>] {
        self.evidence.get(ty).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn findings(&self) -> impl Iterator<Item = &Arc<Observation>> + '_ {
        self.findings.values()
    }

    pub fn is_finding(&self, id: ObservationId) -> bool {
        self.findings.contains_key(&id)
    }

    pub fn trace(&self) -> &[Step] {
        &self.trace
    }

    /// The observation of every trace step, `None` for epsilon steps.
    pub fn trace_observations(&self) -> impl Iterator<Item = Option<&Arc<Observation>>> + '_ {
        self.trace.iter().map(|step| step.observation.as_ref())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // ── Constraint contribution ─────────────────────────────────────────
    //
    // Hooks add knowledge through these so the pattern keeps track of which
    // networks mention which variables. Everything goes to the last network.

    /// Constrain `b - a` to lie in `interval`.
    pub fn constrain(&mut self, a: TimeVar, b: TimeVar, interval: Interval) {
        self.networks.add_constraint(a, b, interval);
    }

    /// Constrain the value of `var`. Returns whether this was new knowledge.
    pub fn restrict(&mut self, var: TimeVar, interval: Interval) -> bool {
        self.networks.restrict(var, interval)
    }

    /// `a <= b`.
    pub fn set_before(&mut self, a: TimeVar, b: TimeVar) {
        self.networks.set_before(a, b);
    }

    /// `a == b`.
    pub fn set_equal(&mut self, a: TimeVar, b: TimeVar) {
        self.networks.set_equal(a, b);
    }

    /// `a <= b <= c`.
    pub fn set_between(&mut self, a: TimeVar, b: TimeVar, c: TimeVar) {
        self.networks.set_between(a, b, c);
    }

    /// Start a new, independent network for the following constraints.
    pub fn open_network(&mut self) -> usize {
        self.networks.open()
    }

    pub fn networks(&self) -> &[ConstraintNetwork] {
        self.networks.networks()
    }

    pub fn last_network(&self) -> &ConstraintNetwork {
        self.networks.last()
    }

    /// Tightest known bound of `var` across the owned networks.
    pub fn bounds(&self, var: TimeVar) -> Option<Interval> {
        self.networks.bounds(var)
    }

    /// Tightest known bound of `b - a`.
    pub fn distance(&self, a: TimeVar, b: TimeVar) -> Option<Interval> {
        self.networks.distance(a, b)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Whether the pattern is complete: no pending findings, and the path
    /// runs from the start state to a final state.
    pub fn sufficient_evidence(&self) -> bool {
        self.findings.is_empty()
            && &self.initial_state == self.automaton.start_state()
            && self.automaton.final_states().contains(&self.final_state)
    }

    /// The evidence of the same type immediately before and after
    /// `observation`.
    pub fn get_consecutive(
        &self,
        observation: &Observation,
    ) -> InterpretationResult<(Option<&Arc<Observation>>, Option<&Arc<Observation>>)> {
        let (ty, _) = self.get_evidence_type(observation)?;
        let list = self.evidence(&ty);
        let idx = list
            .iter()
            .position(|obs| obs.id() == observation.id())
            .ok_or(InterpretationError::UnrelatedObservation(observation.id()))?;
        let previous = idx.checked_sub(1).and_then(|i| list.get(i));
        Ok((previous, list.get(idx + 1)))
    }

    /// Observable type and role of the transition that generated
    /// `observation`.
    pub fn get_evidence_type(
        &self,
        observation: &Observation,
    ) -> InterpretationResult<(ObservableType, Role)> {
        self.trace
            .iter()
            .find(|step| step.holds(observation.id()))
            .and_then(|step| {
                let transition = &step.transition;
                transition.observable().map(|ty| (ty.clone(), transition.role()))
            })
            .ok_or(InterpretationError::UnrelatedObservation(observation.id()))
    }

    /// Trace position at which `observation` was generated.
    pub fn get_step(&self, observation: &Observation) -> Option<usize> {
        self.trace.iter().position(|step| step.holds(observation.id()))
    }

    /// Whether `observation` is evidence explained by the hypothesis. Fails
    /// for observations unrelated to the pattern.
    pub fn abstracts(&self, observation: &Observation) -> InterpretationResult<bool> {
        let (_, role) = self.get_evidence_type(observation)?;
        Ok(role == Role::Abstracted)
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Put `new` everywhere `old` appears: networks, trace, evidence list and
    /// findings. Consistency is not checked.
    pub fn replace(&mut self, old: &Observation, new: Arc<Observation>) -> InterpretationResult<()> {
        self.ensure_open()?;
        if old.id() == new.id() {
            return Ok(());
        }

        let idx = self
            .get_step(old)
            .ok_or(InterpretationError::UnrelatedObservation(old.id()))?;
        let expected = self.trace[idx]
            .transition
            .observable()
            .cloned()
            .ok_or(InterpretationError::UnrelatedObservation(old.id()))?;
        if !new.is_a(&expected) {
            return Err(InterpretationError::TypeMismatch {
                expected,
                found: new.kind().clone(),
            });
        }
        let list = self
            .evidence
            .get_mut(&expected)
            .ok_or(InterpretationError::UnrelatedObservation(old.id()))?;
        if list.iter().any(|obs| obs.id() == new.id()) {
            return Err(InterpretationError::DuplicatedEvidence(new.id()));
        }
        let position = list
            .iter()
            .position(|obs| obs.id() == old.id())
            .ok_or(InterpretationError::UnrelatedObservation(old.id()))?;

        list[position] = Arc::clone(&new);
        self.trace[idx].observation = Some(Arc::clone(&new));
        for (from, to) in old.vars().into_iter().zip(new.vars()) {
            self.networks.substitute(from, to);
        }
        if self.findings.remove(&old.id()).is_some() {
            self.findings.insert(new.id(), Arc::clone(&new));
        }
        self.anchor(&new);

        trace!(
            pattern = %self.id,
            old = %old,
            new = %new,
            step = idx,
            "Replaced observation"
        );
        Ok(())
    }

    /// Confirm `finding` with the actual `observation`.
    ///
    /// After the replacement the networks touching the observation are
    /// minimized, and the general constraints from the matched step onwards
    /// are checked, up to the first step still holding a finding.
    pub fn match_finding(
        &mut self,
        finding: &Observation,
        observation: Arc<Observation>,
    ) -> InterpretationResult<()> {
        self.replace(finding, Arc::clone(&observation))?;
        self.findings.remove(&observation.id());

        let vars: BTreeSet<TimeVar> = observation.vars().into_iter().collect();
        let changed = self.check_temporal_consistency(&vars)?;

        let from = self
            .get_step(&observation)
            .ok_or(InterpretationError::UnrelatedObservation(observation.id()))?;
        for idx in from..self.trace.len() {
            let step = self.trace[idx].clone();
            if step
                .observation
                .as_ref()
                .is_some_and(|obs| self.is_finding(obs.id()))
            {
                break;
            }
            step.transition
                .general_constraint(self, step.observation.as_ref())?;
        }

        debug!(
            pattern = %self.id,
            finding = %finding,
            observation = %observation,
            changed = changed.len(),
            remaining = self.findings.len(),
            "Matched finding"
        );
        Ok(())
    }

    /// Minimize every network that has unminimized constraints or mentions
    /// one of `variables`, propagating changed bounds between networks until
    /// nothing changes. Returns every variable whose bound changed.
    pub fn check_temporal_consistency(
        &mut self,
        variables: &BTreeSet<TimeVar>,
    ) -> InterpretationResult<BTreeSet<TimeVar>> {
        self.networks
            .propagate(variables, self.config.max_propagation_steps)
    }

    /// Close the pattern.
    ///
    /// Requires sufficient evidence. The hypothesis receives its tightest
    /// temporal bounds, then the automaton assigns its derived attributes.
    /// If the finalizer fails the hypothesis is restored and the pattern
    /// stays open.
    pub fn finish(&mut self) -> InterpretationResult<()> {
        self.ensure_open()?;
        if !self.sufficient_evidence() {
            return Err(InterpretationError::InsufficientEvidence(format!(
                "{} pending findings, path {} .. {}",
                self.findings.len(),
                self.initial_state,
                self.final_state
            )));
        }

        self.check_temporal_consistency(&BTreeSet::new())?;
        let previous = self.hypothesis.clone();
        for var in self.hypothesis.vars() {
            if let Some(bound) = self.networks.bounds(var) {
                self.hypothesis.set_extent_of(var, bound);
            }
        }
        let automaton = Arc::clone(&self.automaton);
        if let Err(err) = automaton.finalize(self) {
            self.hypothesis = previous;
            return Err(err);
        }
        self.finished = true;

        debug!(
            pattern = %self.id,
            automaton = automaton.name(),
            hypothesis = %self.hypothesis,
            steps = self.trace.len(),
            "Finished abstraction pattern"
        );
        Ok(())
    }

    // ── Internal ────────────────────────────────────────────────────────

    /// Apply the intrinsic extent of `observation` to every network that
    /// mentions its variables.
    pub(crate) fn anchor(&mut self, observation: &Observation) {
        for (var, extent) in observation.vars().into_iter().zip(observation.extent()) {
            if !extent.is_unbounded() {
                self.networks.restrict_everywhere(var, extent);
            }
        }
    }

    fn ensure_open(&self) -> InterpretationResult<()> {
        if self.finished {
            Err(InterpretationError::Finished)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for AbstractionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractionPattern")
            .field("id", &self.id)
            .field("automaton", &self.automaton.name())
            .field("initial_state", &self.initial_state)
            .field("final_state", &self.final_state)
            .field("hypothesis", &self.hypothesis)
            .field("trace", &self.trace)
            .field("findings", &self.findings.keys().collect::<Vec<_>>())
            .field("networks", &self.networks.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl fmt::Display for AbstractionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} .. {}] ({} steps)",
            self.automaton.name(),
            self.initial_state,
            self.final_state,
            self.trace.len()
        )
    }
}
