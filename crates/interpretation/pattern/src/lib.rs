//! # interpretation-pattern
//!
//! Abstraction patterns: automaton-driven, branching construction of
//! temporal interpretations.
//!
//! An [`Automaton`] describes which sequences of lower-level evidence justify
//! a hypothesis. An [`AbstractionPattern`] is one partial walk over that
//! automaton: it holds the hypothesis, the evidence found so far, the
//! findings still waiting for confirmation, and the temporal constraint
//! networks tying all of them together.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────┐
//! │  external search strategy   │  (best-first, beam, …)
//! └──────────────┬──────────────┘
//!                │ successors() / match_finding() / finish()
//! ┌──────────────▼──────────────┐      ┌────────────────────┐
//! │     AbstractionPattern      │─────▶│     Automaton      │
//! │  trace · evidence · findings│      │ states/transitions │
//! └──────────────┬──────────────┘      └─────────┬──────────┘
//!                │ NetworkSet                    │ temporal / general hooks
//! ┌──────────────▼──────────────┐                │
//! │    ConstraintNetwork × n    │◀───────────────┘
//! └─────────────────────────────┘
//! ```
//!
//! Exploring never mutates a pattern: [`AbstractionPattern::successors`]
//! yields independent branches and silently drops the inconsistent ones.

#![deny(unsafe_code)]

pub mod automaton;
pub mod config;
pub mod networks;
pub mod pattern;
pub mod successors;
pub mod transition;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use automaton::{basic_temporal_constraint, Automaton, PatternAutomaton, PatternHook, StateId};
pub use config::PatternConfig;
pub use networks::NetworkSet;
pub use pattern::{AbstractionPattern, PatternId, Step};
pub use successors::Successors;
pub use transition::{ConstraintHook, Role, Transition};

pub use interpretation_tnet::ConstraintNetwork;
pub use interpretation_types::{
    verify, InterpretationError, InterpretationResult, Interval, ObservableType, Observation,
    ObservationId, TimeVar,
};
