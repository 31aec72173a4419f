//! # interpretation-tnet
//!
//! Temporal constraint networks for the interpretation core.
//!
//! A [`ConstraintNetwork`] is a Simple Temporal Network: it holds bounds on
//! differences between temporal variables (`b - a ∈ [lo, hi]`) and bounds on
//! single variables, and computes the tightest bounds they induce with an
//! all-pairs shortest-path closure.
//!
//! Networks are lazy. Adding constraints only records them and
//! marks the network as pending; [`ConstraintNetwork::minimize`] does the
//! closure, fails on unsatisfiability, and reports which variables got a new
//! tightest bound. A caller owning several networks that share variables uses
//! that report to decide which sibling networks must be minimized next.

#![deny(unsafe_code)]

pub mod network;

pub use network::ConstraintNetwork;
