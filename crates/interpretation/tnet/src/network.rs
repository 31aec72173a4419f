//! Simple temporal network with lazy minimization.
//!
//! Constraints are stored explicitly, keyed by the (ordered) pair of nodes
//! they relate. Unary bounds are differences against an implicit origin
//! node. Minimization builds the distance graph of the explicit constraints
//! and closes it with Floyd–Warshall; the closure is kept so that derived
//! distances between any two variables can be queried afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::trace;

use interpretation_types::{InterpretationError, InterpretationResult, Interval, TimeVar};

/// A node of the distance graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Node {
    /// Time zero. Unary bounds are edges from here.
    Origin,
    Var(TimeVar),
}

impl Node {
    fn rename(self, old: TimeVar, new: TimeVar) -> Node {
        match self {
            Node::Var(v) if v == old => Node::Var(new),
            other => other,
        }
    }

    fn mentions(&self, var: TimeVar) -> bool {
        matches!(self, Node::Var(v) if *v == var)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Origin => write!(f, "origin"),
            Node::Var(v) => write!(f, "{v}"),
        }
    }
}

/// All-pairs shortest distances from the last minimization.
#[derive(Clone, Debug)]
struct Closure {
    index: BTreeMap<Node, usize>,
    dist: Vec<Vec<f64>>,
}

impl Closure {
    fn interval(&self, a: Node, b: Node) -> Option<Interval> {
        let i = *self.index.get(&a)?;
        let j = *self.index.get(&b)?;
        Some(Interval::new(-self.dist[j][i], self.dist[i][j]))
    }
}

// ── Constraint Network ──────────────────────────────────────────────────

/// A temporal constraint network over [`TimeVar`]s.
#[derive(Clone, Debug)]
pub struct ConstraintNetwork {
    /// Explicit constraints. `(a, b) -> iv` means `b - a ∈ iv`, with `a <= b`.
    constraints: BTreeMap<(Node, Node), Interval>,
    /// Variables mentioned by at least one constraint.
    vars: BTreeSet<TimeVar>,
    /// Tightest bounds found by the last minimization.
    bounds: BTreeMap<TimeVar, Interval>,
    closure: Option<Closure>,
    /// Constraints were added since the last minimization.
    pending: bool,
}

impl ConstraintNetwork {
    /// Create an empty network. It is unconstrained until first minimized.
    pub fn new() -> Self {
        Self {
            constraints: BTreeMap::new(),
            vars: BTreeSet::new(),
            bounds: BTreeMap::new(),
            closure: None,
            pending: true,
        }
    }

    /// Whether the network holds knowledge that has not been minimized yet.
    ///
    /// A freshly created network is unconstrained.
    pub fn is_unconstrained(&self) -> bool {
        self.pending
    }

    pub fn contains(&self, var: TimeVar) -> bool {
        self.vars.contains(&var)
    }

    pub fn variables(&self) -> impl Iterator<Item = TimeVar> + '_ {
        self.vars.iter().copied()
    }

    /// Number of variables in the network.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    // ── Adding knowledge ────────────────────────────────────────────────

    /// Constrain `b - a` to lie in `interval`.
    ///
    /// Repeated constraints on the same pair are intersected.
    pub fn add_constraint(&mut self, a: TimeVar, b: TimeVar, interval: Interval) {
        if self.tighten(Node::Var(a), Node::Var(b), interval) {
            self.pending = true;
        }
    }

    /// Constrain the value of `var` to lie in `interval`.
    ///
    /// Returns whether this made the network's knowledge about `var`
    /// tighter. A bound already implied by the current minimized bounds is
    /// not recorded.
    pub fn restrict(&mut self, var: TimeVar, interval: Interval) -> bool {
        if !self.pending {
            if let Some(bound) = self.bounds.get(&var) {
                if interval.includes(bound) {
                    return false;
                }
            }
        }
        let tighter = self.tighten(Node::Origin, Node::Var(var), interval);
        if tighter {
            self.pending = true;
        }
        tighter
    }

    /// `a <= b`.
    pub fn set_before(&mut self, a: TimeVar, b: TimeVar) {
        self.add_constraint(a, b, Interval::at_least(0.0));
    }

    /// `a == b`.
    pub fn set_equal(&mut self, a: TimeVar, b: TimeVar) {
        self.add_constraint(a, b, Interval::point(0.0));
    }

    /// `a <= b <= c`.
    pub fn set_between(&mut self, a: TimeVar, b: TimeVar, c: TimeVar) {
        self.set_before(a, b);
        self.set_before(b, c);
    }

    /// Record `b - a ∈ interval` in normalized form. Returns whether the
    /// stored knowledge changed.
    fn tighten(&mut self, a: Node, b: Node, interval: Interval) -> bool {
        let (key, interval) = if a <= b {
            ((a, b), interval)
        } else {
            ((b, a), interval.negate())
        };
        for node in [key.0, key.1] {
            if let Node::Var(v) = node {
                self.vars.insert(v);
            }
        }
        match self.constraints.get_mut(&key) {
            Some(existing) => {
                let narrowed = existing.intersection(&interval);
                if narrowed == *existing {
                    false
                } else {
                    *existing = narrowed;
                    true
                }
            }
            None => {
                self.constraints.insert(key, interval);
                true
            }
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Current bound of `var`: the last minimized bound, or the declared one
    /// if the variable has not been through a minimization yet.
    pub fn bounds(&self, var: TimeVar) -> Option<Interval> {
        if !self.vars.contains(&var) {
            return None;
        }
        self.bounds
            .get(&var)
            .copied()
            .or_else(|| self.constraints.get(&(Node::Origin, Node::Var(var))).copied())
            .or_else(|| Some(Interval::unbounded()))
    }

    /// The explicit constraint on `b - a`, if one was stated.
    pub fn constraint_between(&self, a: TimeVar, b: TimeVar) -> Option<Interval> {
        let (na, nb) = (Node::Var(a), Node::Var(b));
        if na <= nb {
            self.constraints.get(&(na, nb)).copied()
        } else {
            self.constraints.get(&(nb, na)).map(Interval::negate)
        }
    }

    /// Tightest derived bound on `b - a` as of the last minimization.
    pub fn distance(&self, a: TimeVar, b: TimeVar) -> Option<Interval> {
        self.closure
            .as_ref()
            .and_then(|c| c.interval(Node::Var(a), Node::Var(b)))
    }

    // ── Substitution ────────────────────────────────────────────────────

    /// Rename every occurrence of `old` to `new`.
    ///
    /// Bound values are carried over untouched. If `new` is already in the
    /// network the two variables are merged: parallel constraints are
    /// intersected and the network needs minimizing again.
    pub fn substitute(&mut self, old: TimeVar, new: TimeVar) {
        if old == new || !self.vars.contains(&old) {
            return;
        }
        let merging = self.vars.contains(&new);

        let moved: Vec<(Node, Node)> = self
            .constraints
            .keys()
            .filter(|(a, b)| a.mentions(old) || b.mentions(old))
            .copied()
            .collect();
        self.vars.remove(&old);
        for key in moved {
            if let Some(interval) = self.constraints.remove(&key) {
                self.tighten(key.0.rename(old, new), key.1.rename(old, new), interval);
            }
        }
        self.vars.insert(new);

        if let Some(bound) = self.bounds.remove(&old) {
            let merged = match self.bounds.get(&new) {
                Some(existing) if merging => existing.intersection(&bound),
                _ => bound,
            };
            self.bounds.insert(new, merged);
        }

        if merging {
            self.closure = None;
            self.pending = true;
        } else if let Some(closure) = self.closure.as_mut() {
            if let Some(idx) = closure.index.remove(&Node::Var(old)) {
                closure.index.insert(Node::Var(new), idx);
            }
        }
        trace!(old = %old, new = %new, merging, "Substituted temporal variable");
    }

    // ── Minimization ────────────────────────────────────────────────────

    /// Compute the tightest bounds induced by the constraints.
    ///
    /// Returns the variables whose bound changed since the previous
    /// minimization (a variable seen for the first time counts as
    /// previously unbounded). Fails if the constraints are unsatisfiable;
    /// the network is then left pending.
    pub fn minimize(&mut self) -> InterpretationResult<BTreeSet<TimeVar>> {
        let nodes: Vec<Node> = std::iter::once(Node::Origin)
            .chain(self.vars.iter().map(|v| Node::Var(*v)))
            .collect();
        let index: BTreeMap<Node, usize> = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        let n = nodes.len();

        let mut dist = vec![vec![f64::INFINITY; n]; n];
        for (i, row) in dist.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        for (&(a, b), interval) in &self.constraints {
            if interval.is_empty() {
                return Err(InterpretationError::TemporalInconsistency(format!(
                    "empty constraint {interval} between {a} and {b}"
                )));
            }
            let (i, j) = (index[&a], index[&b]);
            dist[i][j] = dist[i][j].min(interval.upper);
            dist[j][i] = dist[j][i].min(-interval.lower);
        }

        for k in 0..n {
            for i in 0..n {
                let dik = dist[i][k];
                if dik == f64::INFINITY {
                    continue;
                }
                for j in 0..n {
                    let via = dik + dist[k][j];
                    if via < dist[i][j] {
                        dist[i][j] = via;
                    }
                }
            }
        }

        if let Some(i) = (0..n).find(|&i| dist[i][i] < 0.0) {
            return Err(InterpretationError::TemporalInconsistency(format!(
                "negative cycle through {}",
                nodes[i]
            )));
        }

        let mut changed = BTreeSet::new();
        for (i, node) in nodes.iter().enumerate().skip(1) {
            if let Node::Var(var) = node {
                let bound = Interval::new(-dist[i][0], dist[0][i]);
                let previous = self
                    .bounds
                    .get(var)
                    .copied()
                    .unwrap_or_else(Interval::unbounded);
                if bound != previous {
                    changed.insert(*var);
                }
                self.bounds.insert(*var, bound);
            }
        }

        self.closure = Some(Closure { index, dist });
        self.pending = false;
        trace!(
            variables = self.vars.len(),
            constraints = self.constraints.len(),
            changed = changed.len(),
            "Minimized temporal network"
        );
        Ok(changed)
    }
}

impl Default for ConstraintNetwork {
    fn default() -> Self {
        Self::new()
    }
}
