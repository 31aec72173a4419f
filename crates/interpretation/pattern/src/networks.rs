//! The set of constraint networks owned by one pattern.
//!
//! Networks share variables (the hypothesis' three variables above all), so
//! a tighter bound found in one network has to reach every other network
//! mentioning the same variable. [`NetworkSet`] keeps an explicit
//! variable → owning networks index for that, and runs the propagation as a
//! worklist until no network has anything left to minimize.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::trace;

use interpretation_tnet::ConstraintNetwork;
use interpretation_types::{InterpretationError, InterpretationResult, Interval, TimeVar};

/// Ordered, never empty list of constraint networks.
///
/// New constraints always go to the last network.
#[derive(Clone, Debug)]
pub struct NetworkSet {
    networks: Vec<ConstraintNetwork>,
    owners: BTreeMap<TimeVar, BTreeSet<usize>>,
}

impl NetworkSet {
    /// A set holding one fresh network.
    pub fn new() -> Self {
        Self {
            networks: vec![ConstraintNetwork::new()],
            owners: BTreeMap::new(),
        }
    }

    /// Drop every network and start over with one fresh network.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Start a new network; later constraints go there. Returns its index.
    pub fn open(&mut self) -> usize {
        self.networks.push(ConstraintNetwork::new());
        self.networks.len() - 1
    }

    pub fn networks(&self) -> &[ConstraintNetwork] {
        &self.networks
    }

    pub fn last(&self) -> &ConstraintNetwork {
        &self.networks[self.last_index()]
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Always `false`: the set holds at least one network.
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Whether any network mentions `var`.
    pub fn contains(&self, var: TimeVar) -> bool {
        self.owners.contains_key(&var)
    }

    /// Indices of the networks mentioning `var`.
    pub fn owners(&self, var: TimeVar) -> impl Iterator<Item = usize> + '_ {
        self.owners.get(&var).into_iter().flatten().copied()
    }

    fn last_index(&self) -> usize {
        self.networks.len() - 1
    }

    fn register(&mut self, idx: usize, var: TimeVar) {
        self.owners.entry(var).or_default().insert(idx);
    }

    // ── Adding knowledge (last network) ─────────────────────────────────

    pub fn add_constraint(&mut self, a: TimeVar, b: TimeVar, interval: Interval) {
        let idx = self.last_index();
        self.networks[idx].add_constraint(a, b, interval);
        self.register(idx, a);
        self.register(idx, b);
    }

    pub fn restrict(&mut self, var: TimeVar, interval: Interval) -> bool {
        let idx = self.last_index();
        self.register(idx, var);
        self.networks[idx].restrict(var, interval)
    }

    pub fn set_before(&mut self, a: TimeVar, b: TimeVar) {
        self.add_constraint(a, b, Interval::at_least(0.0));
    }

    pub fn set_equal(&mut self, a: TimeVar, b: TimeVar) {
        self.add_constraint(a, b, Interval::point(0.0));
    }

    pub fn set_between(&mut self, a: TimeVar, b: TimeVar, c: TimeVar) {
        self.set_before(a, b);
        self.set_before(b, c);
    }

    /// Restrict `var` in every network that already mentions it. Returns
    /// whether any of them got tighter.
    pub fn restrict_everywhere(&mut self, var: TimeVar, interval: Interval) -> bool {
        let Some(owners) = self.owners.get(&var) else {
            return false;
        };
        let mut tighter = false;
        for &idx in owners {
            tighter |= self.networks[idx].restrict(var, interval);
        }
        tighter
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Intersection of the bounds every owning network has for `var`.
    pub fn bounds(&self, var: TimeVar) -> Option<Interval> {
        self.owners(var)
            .filter_map(|idx| self.networks[idx].bounds(var))
            .reduce(|a, b| a.intersection(&b))
    }

    /// Tightest derived bound on `b - a` from the first network holding both.
    pub fn distance(&self, a: TimeVar, b: TimeVar) -> Option<Interval> {
        self.owners(a)
            .filter(|idx| self.networks[*idx].contains(b))
            .find_map(|idx| self.networks[idx].distance(a, b))
    }

    // ── Substitution ────────────────────────────────────────────────────

    /// Rename `old` to `new` in every network mentioning it.
    pub fn substitute(&mut self, old: TimeVar, new: TimeVar) {
        if old == new {
            return;
        }
        let Some(owners) = self.owners.remove(&old) else {
            return;
        };
        for &idx in &owners {
            self.networks[idx].substitute(old, new);
        }
        self.owners.entry(new).or_default().extend(owners);
    }

    // ── Propagation ─────────────────────────────────────────────────────

    /// Minimize to a fixpoint.
    ///
    /// The worklist starts with every unconstrained network and every network
    /// mentioning one of `seeds`. Every variable shared by several networks
    /// is first brought to the intersection of its owners' bounds, so a
    /// network opened after its neighbours were minimized still sees what
    /// they know. From then on each variable whose bound changes is shared
    /// again, and the owners that learn something are minimized too.
    /// Returns every variable whose bound changed along the way.
    pub fn propagate(
        &mut self,
        seeds: &BTreeSet<TimeVar>,
        max_steps: usize,
    ) -> InterpretationResult<BTreeSet<TimeVar>> {
        let mut queued = vec![false; self.networks.len()];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for var in seeds {
            for idx in self.owners.get(var).into_iter().flatten() {
                queued[*idx] = true;
            }
        }
        for (idx, network) in self.networks.iter().enumerate() {
            if network.is_unconstrained() {
                queued[idx] = true;
            }
        }
        queue.extend((0..queued.len()).filter(|idx| queued[*idx]));

        let shared: Vec<TimeVar> = self
            .owners
            .iter()
            .filter(|(_, owners)| owners.len() > 1)
            .map(|(var, _)| *var)
            .collect();
        for var in shared {
            self.share(var, &mut queued, &mut queue);
        }

        let mut changed_all = BTreeSet::new();
        let mut steps = 0usize;
        while let Some(idx) = queue.pop_front() {
            queued[idx] = false;
            steps += 1;
            if steps > max_steps {
                return Err(InterpretationError::TemporalInconsistency(format!(
                    "propagation did not reach a fixpoint after {max_steps} minimizations"
                )));
            }

            let changed = self.networks[idx].minimize()?;
            for var in changed {
                self.share(var, &mut queued, &mut queue);
                changed_all.insert(var);
            }
        }

        if steps > 0 {
            trace!(
                networks = self.networks.len(),
                steps,
                changed = changed_all.len(),
                "Propagated temporal constraints"
            );
        }
        Ok(changed_all)
    }

    /// Restrict `var` in each of its owners to the intersection of their
    /// bounds. Owners that get tighter are queued for minimization.
    fn share(&mut self, var: TimeVar, queued: &mut [bool], queue: &mut VecDeque<usize>) {
        let owners: Vec<usize> = self.owners(var).collect();
        if owners.len() < 2 {
            return;
        }
        let Some(bound) = self.bounds(var).filter(|bound| !bound.is_unbounded()) else {
            return;
        };
        for idx in owners {
            if self.networks[idx].restrict(var, bound) && !queued[idx] {
                queued[idx] = true;
                queue.push_back(idx);
            }
        }
    }
}

impl Default for NetworkSet {
    fn default() -> Self {
        Self::new()
    }
}
