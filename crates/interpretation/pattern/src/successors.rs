//! Lazy exploration of the one-step successors of a pattern.
//!
//! Backward steps come first: they discover where the pattern starts, and
//! they are the most discriminating ones. Forward steps are only considered
//! once the backward boundary has reached the start state, and are computed
//! only after every backward candidate has been produced.
//!
//! A candidate that turns out inconsistent is dropped, never returned as an
//! error.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::vec;

use tracing::{debug, trace, warn};

use interpretation_types::{InterpretationError, InterpretationResult};

use crate::automaton::StateId;
use crate::pattern::{AbstractionPattern, Step};
use crate::transition::Transition;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Backward,
    Forward,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Backward => "backward",
            Self::Forward => "forward",
        }
    }

    /// The state a step in this direction moves.
    fn boundary(self, pattern: &AbstractionPattern) -> &StateId {
        match self {
            Self::Backward => &pattern.initial_state,
            Self::Forward => &pattern.final_state,
        }
    }
}

/// Iterator over the valid successors of a pattern.
///
/// Each item is an independent branch; the explored pattern is left
/// untouched.
pub struct Successors<'a> {
    pattern: &'a AbstractionPattern,
    backward: vec::IntoIter<Arc<Transition>>,
    forward: Option<vec::IntoIter<Arc<Transition>>>,
}

impl<'a> Successors<'a> {
    fn new(pattern: &'a AbstractionPattern) -> Self {
        let backward = if pattern.finished {
            Vec::new()
        } else {
            pattern.automaton.transitions_into(&pattern.initial_state)
        };
        Self {
            pattern,
            backward: backward.into_iter(),
            forward: None,
        }
    }

    fn forward_transitions(&self) -> Vec<Arc<Transition>> {
        let pattern = self.pattern;
        if pattern.finished || &pattern.initial_state != pattern.automaton.start_state() {
            return Vec::new();
        }
        pattern.automaton.transitions_out_of(&pattern.final_state)
    }
}

impl Iterator for Successors<'_> {
    type Item = AbstractionPattern;

    fn next(&mut self) -> Option<Self::Item> {
        for transition in self.backward.by_ref() {
            match self.pattern.step_backward(&transition) {
                Ok(candidate) => return Some(candidate),
                Err(err) => self.pattern.report_pruned(Direction::Backward, &transition, &err),
            }
        }

        if self.forward.is_none() {
            self.forward = Some(self.forward_transitions().into_iter());
        }
        let forward = self.forward.as_mut()?;
        for transition in forward.by_ref() {
            match self.pattern.step_forward(&transition) {
                Ok(candidate) => return Some(candidate),
                Err(err) => self.pattern.report_pruned(Direction::Forward, &transition, &err),
            }
        }
        None
    }
}

impl AbstractionPattern {
    /// The valid patterns one transition away from this one, produced
    /// lazily.
    pub fn successors(&self) -> Successors<'_> {
        Successors::new(self)
    }

    /// Take `transition` backwards from the initial state.
    ///
    /// Prepending a step changes the relative order of everything already
    /// constrained, so the networks are rebuilt from the whole trace.
    fn step_backward(&self, transition: &Arc<Transition>) -> InterpretationResult<Self> {
        let mut pattern = self.branch();
        pattern.initial_state = transition.source().clone();
        let observation = transition.new_observation().map(Arc::new);
        if let (Some(ty), Some(obs)) = (transition.observable(), &observation) {
            pattern
                .evidence
                .entry(ty.clone())
                .or_default()
                .insert(0, Arc::clone(obs));
            pattern.findings.insert(obs.id(), Arc::clone(obs));
        }
        pattern.trace.insert(
            0,
            Step {
                transition: Arc::clone(transition),
                observation,
            },
        );

        pattern.rebuild()?;
        pattern.report_created(Direction::Backward, transition);
        Ok(pattern)
    }

    /// Take `transition` forwards from the final state.
    fn step_forward(&self, transition: &Arc<Transition>) -> InterpretationResult<Self> {
        let mut pattern = self.branch();
        pattern.final_state = transition.target().clone();
        let observation = transition.new_observation().map(Arc::new);
        if let (Some(ty), Some(obs)) = (transition.observable(), &observation) {
            pattern
                .evidence
                .entry(ty.clone())
                .or_default()
                .push(Arc::clone(obs));
            pattern.findings.insert(obs.id(), Arc::clone(obs));
        }
        pattern.trace.push(Step {
            transition: Arc::clone(transition),
            observation: observation.clone(),
        });

        transition.temporal_constraint(&mut pattern, observation.as_ref())?;
        if let Some(obs) = &observation {
            pattern.anchor(obs);
        }
        pattern.check_temporal_consistency(&BTreeSet::new())?;
        // Nothing to wait for on epsilon steps.
        if observation.is_none() {
            transition.general_constraint(&mut pattern, None)?;
        }

        pattern.report_created(Direction::Forward, transition);
        Ok(pattern)
    }

    /// Discard every network and replay the base constraint and the whole
    /// trace, front to back.
    ///
    /// General constraints of a step only run once no step up to it holds a
    /// finding.
    fn rebuild(&mut self) -> InterpretationResult<()> {
        self.networks.reset();
        let automaton = Arc::clone(&self.automaton);
        automaton.base_constraint(self)?;

        let mut resolved = true;
        for idx in 0..self.trace.len() {
            let step = self.trace[idx].clone();
            step.transition
                .temporal_constraint(self, step.observation.as_ref())?;
            if let Some(obs) = &step.observation {
                self.anchor(obs);
                resolved &= !self.is_finding(obs.id());
            }
            self.check_temporal_consistency(&BTreeSet::new())?;
            if resolved && self.config.replay_general_constraints {
                step.transition
                    .general_constraint(self, step.observation.as_ref())?;
            }
        }
        Ok(())
    }

    fn report_created(&self, direction: Direction, transition: &Transition) {
        trace!(
            pattern = %self.id,
            automaton = self.automaton.name(),
            direction = direction.as_str(),
            transition = %transition,
            state = %direction.boundary(self),
            steps = self.trace.len(),
            "Produced successor"
        );
    }

    fn report_pruned(&self, direction: Direction, transition: &Transition, err: &InterpretationError) {
        if err.is_inconsistency() {
            debug!(
                pattern = %self.id,
                automaton = self.automaton.name(),
                direction = direction.as_str(),
                transition = %transition,
                reason = %err,
                "Pruned inconsistent successor"
            );
        } else {
            warn!(
                pattern = %self.id,
                automaton = self.automaton.name(),
                direction = direction.as_str(),
                transition = %transition,
                reason = %err,
                "Dropped successor after constraint hook failure"
            );
        }
    }
}
