//! Closed intervals over time units.
//!
//! An [`Interval`] bounds either the value of a temporal variable or the
//! difference between two of them. Either end may be infinite. Intersections
//! are allowed to produce an *empty* interval (`lower > upper`); constraint
//! networks treat an empty interval as unsatisfiable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// A closed interval `[lower, upper]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    /// Create a new interval. `lower > upper` yields an empty interval.
    #[inline]
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// A single point.
    #[inline]
    pub fn point(value: f64) -> Self {
        Self::new(value, value)
    }

    /// The whole time line.
    #[inline]
    pub fn unbounded() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// `[lower, +inf)`.
    #[inline]
    pub fn at_least(lower: f64) -> Self {
        Self::new(lower, f64::INFINITY)
    }

    /// `(-inf, upper]`.
    #[inline]
    pub fn at_most(upper: f64) -> Self {
        Self::new(f64::NEG_INFINITY, upper)
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Whether `other` lies completely inside this interval.
    #[inline]
    pub fn includes(&self, other: &Interval) -> bool {
        other.is_empty() || (self.lower <= other.lower && other.upper <= self.upper)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lower > self.upper || self.lower.is_nan() || self.upper.is_nan()
    }

    /// Whether neither end is finite.
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.lower == f64::NEG_INFINITY && self.upper == f64::INFINITY
    }

    /// Width of the interval (infinite if either end is).
    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Intersection of two intervals, possibly empty.
    #[inline]
    pub fn intersection(&self, other: &Interval) -> Interval {
        Interval::new(self.lower.max(other.lower), self.upper.min(other.upper))
    }

    /// Interval translated by `offset`.
    #[inline]
    pub fn shift(&self, offset: f64) -> Interval {
        Interval::new(self.lower + offset, self.upper + offset)
    }

    /// `{-x | x in self}`: flips a difference `b - a` into `a - b`.
    #[inline]
    pub fn negate(&self) -> Interval {
        Interval::new(-self.upper, -self.lower)
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl From<RangeInclusive<f64>> for Interval {
    fn from(range: RangeInclusive<f64>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "∅");
        }
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}
