//! # interpretation-types
//!
//! Shared vocabulary of the interpretation core.
//!
//! Everything the constraint networks and the abstraction patterns exchange
//! lives here: temporal variable handles, the interval algebra used for
//! temporal bounds, observations (the evidence and the hypotheses built from
//! it), and the error type every layer reports through.
//!
//! Observations are immutable once shared. A pattern that needs a different
//! observation at some position replaces the whole `Arc<Observation>`; the
//! only observation a pattern mutates is its own hypothesis, which it owns
//! exclusively.

#![deny(unsafe_code)]

pub mod error;
pub mod interval;
pub mod observation;
pub mod var;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use error::{verify, InterpretationError, InterpretationResult};
pub use interval::Interval;
pub use observation::{ObservableType, Observation, ObservationId};
pub use var::TimeVar;
