//! Observations: evidence and hypotheses with a temporal extent.
//!
//! An [`Observation`] is identified by its [`ObservationId`], never by its
//! content: two observations with the same kind and extent are still
//! different pieces of evidence. The id order is the creation order, which
//! gives observations the deterministic total order patterns rely on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::interval::Interval;
use crate::var::TimeVar;

static NEXT_OBSERVATION: AtomicU64 = AtomicU64::new(1);

// ── Identifier Types ────────────────────────────────────────────────────

/// Stable identity of an observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObservationId(pub u64);

impl ObservationId {
    /// Allocate a new, unique observation id.
    pub fn next() -> Self {
        Self(NEXT_OBSERVATION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obs:{}", self.0)
    }
}

/// Name of an observable class (e.g. `"qrs"`, `"p_wave"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObservableType(pub String);

impl ObservableType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObservableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObservableType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

// ── Observation ─────────────────────────────────────────────────────────

/// An evidentiary event with a temporal extent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Observation {
    id: ObservationId,
    kind: ObservableType,
    /// Broader observable classes this observation also stands for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    supertypes: Vec<ObservableType>,
    start: TimeVar,
    time: TimeVar,
    end: TimeVar,
    /// Intrinsic knowledge about `start`, `time` and `end`, in that order.
    extent: [Interval; 3],
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, serde_json::Value>,
}

impl Observation {
    /// Create an observation of `kind` with fresh variables and no temporal
    /// knowledge.
    pub fn new(kind: impl Into<ObservableType>) -> Self {
        Self {
            id: ObservationId::next(),
            kind: kind.into(),
            supertypes: Vec::new(),
            start: TimeVar::fresh(),
            time: TimeVar::fresh(),
            end: TimeVar::fresh(),
            extent: [Interval::unbounded(); 3],
            attributes: BTreeMap::new(),
        }
    }

    /// An observation known to span exactly `[start, end]`, with its
    /// reference time at `time`.
    pub fn at(kind: impl Into<ObservableType>, start: f64, time: f64, end: f64) -> Self {
        Self::new(kind).with_extent(
            Interval::point(start),
            Interval::point(time),
            Interval::point(end),
        )
    }

    pub fn with_extent(mut self, start: Interval, time: Interval, end: Interval) -> Self {
        self.extent = [start, time, end];
        self
    }

    pub fn with_supertype(mut self, kind: impl Into<ObservableType>) -> Self {
        self.supertypes.push(kind.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Deep copy with a new identity and new temporal variables.
    ///
    /// Kind, extent and attributes are kept.
    pub fn fork(&self) -> Self {
        Self {
            id: ObservationId::next(),
            kind: self.kind.clone(),
            supertypes: self.supertypes.clone(),
            start: TimeVar::fresh(),
            time: TimeVar::fresh(),
            end: TimeVar::fresh(),
            extent: self.extent,
            attributes: self.attributes.clone(),
        }
    }

    pub fn id(&self) -> ObservationId {
        self.id
    }

    pub fn kind(&self) -> &ObservableType {
        &self.kind
    }

    /// Whether this observation can stand for an observable of type `kind`.
    pub fn is_a(&self, kind: &ObservableType) -> bool {
        &self.kind == kind || self.supertypes.contains(kind)
    }

    pub fn start(&self) -> TimeVar {
        self.start
    }

    pub fn time(&self) -> TimeVar {
        self.time
    }

    pub fn end(&self) -> TimeVar {
        self.end
    }

    /// The three temporal variables, in `start`, `time`, `end` order.
    pub fn vars(&self) -> [TimeVar; 3] {
        [self.start, self.time, self.end]
    }

    pub fn extent(&self) -> [Interval; 3] {
        self.extent
    }

    /// Intrinsic knowledge about one of this observation's variables.
    pub fn extent_of(&self, var: TimeVar) -> Option<Interval> {
        self.vars()
            .iter()
            .position(|v| *v == var)
            .map(|idx| self.extent[idx])
    }

    /// Replace the intrinsic knowledge of one of this observation's
    /// variables. Returns `false` if `var` does not belong to it.
    pub fn set_extent_of(&mut self, var: TimeVar, bound: Interval) -> bool {
        match self.vars().iter().position(|v| *v == var) {
            Some(idx) => {
                self.extent[idx] = bound;
                true
            }
            None => false,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.attributes
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
    }
}

impl PartialEq for Observation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Observation {}

impl PartialOrd for Observation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Observation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::hash::Hash for Observation {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}
