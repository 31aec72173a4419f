//! Property tests: temporal propagation reaches a fixpoint.

use std::collections::BTreeSet;

use interpretation_pattern::{
    AbstractionPattern, Interval, NetworkSet, PatternAutomaton, TimeVar, Transition,
};
use interpretation_tests::{confirmed, first_path, rhythm};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

/// A random difference constraint between two of `n` variables. Integral
/// bounds keep every path length exact.
fn arb_constraint(n: usize) -> impl Strategy<Value = (usize, usize, f64, f64)> {
    (0..n, 0..n, -10i32..10, 0i32..10)
        .prop_filter("distinct endpoints", |(a, b, _, _)| a != b)
        .prop_map(|(a, b, lo, width)| (a, b, f64::from(lo), f64::from(lo + width)))
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn second_consistency_check_changes_nothing(depth in 1usize..6, matched in any::<bool>()) {
        let root = AbstractionPattern::new(rhythm()).unwrap();
        let mut pattern = first_path(root, depth).pop().unwrap();
        if matched {
            let beats = pattern.evidence(&"beat".into()).to_vec();
            for (idx, beat) in beats.iter().enumerate() {
                let at = idx as f64;
                pattern.match_finding(beat, confirmed("beat", at - 0.05, at + 0.05)).unwrap();
            }
        }

        let vars: BTreeSet<TimeVar> = pattern.hypothesis().vars().into_iter().collect();
        pattern.check_temporal_consistency(&vars).unwrap();
        let changed = pattern.check_temporal_consistency(&vars).unwrap();
        prop_assert!(changed.is_empty(), "{:?}", changed);
    }

    #[test]
    fn split_networks_agree_with_a_single_one(
        constraints in prop::collection::vec(arb_constraint(5), 1..10),
        split in 0usize..10,
    ) {
        let vars: Vec<TimeVar> = (0..5).map(|_| TimeVar::fresh()).collect();
        let mut single = NetworkSet::new();
        let mut split_set = NetworkSet::new();
        for (i, &(a, b, lo, hi)) in constraints.iter().enumerate() {
            single.add_constraint(vars[a], vars[b], Interval::new(lo, hi));
            if i == split {
                split_set.open();
            }
            split_set.add_constraint(vars[a], vars[b], Interval::new(lo, hi));
        }
        single.restrict(vars[0], Interval::point(0.0));
        split_set.restrict(vars[0], Interval::point(0.0));

        let single_ok = single.propagate(&BTreeSet::new(), 10_000).is_ok();
        let split_ok = split_set.propagate(&BTreeSet::new(), 10_000).is_ok();
        // splitting can only lose information, never invent a contradiction
        if split_ok {
            for var in &vars {
                if let (Some(whole), Some(parts)) = (single.bounds(*var), split_set.bounds(*var)) {
                    if single_ok {
                        prop_assert!(parts.includes(&whole), "{} vs {}", parts, whole);
                    }
                }
            }
        } else {
            prop_assert!(!single_ok);
        }
    }

    #[test]
    fn anchored_observation_bounds_its_successor(at in -100.0f64..100.0) {
        let automaton = PatternAutomaton::new("pair", "pair", "S0")
            .with_transition(Transition::observing("S0", "S1", "x").with_temporal(|pattern, obs| {
                if let Some(obs) = obs {
                    let start = pattern.hypothesis().start();
                    pattern.set_equal(start, obs.time());
                }
                Ok(())
            }))
            .with_transition(Transition::observing("S1", "S2", "y").with_temporal(|pattern, obs| {
                if let Some(obs) = obs {
                    let start = pattern.hypothesis().start();
                    pattern.constrain(start, obs.time(), Interval::new(1.0, 2.0));
                }
                Ok(())
            }))
            .with_final("S2");
        let root = AbstractionPattern::new(std::sync::Arc::new(automaton)).unwrap();
        let mut first = root.successors().next().unwrap();
        let x = first.evidence(&"x".into())[0].clone();
        first.match_finding(&x, confirmed("x", at - 0.1, at + 0.1)).unwrap();

        let second = first.successors().next().unwrap();
        let y = second.evidence(&"y".into())[0].clone();
        let bound = second.bounds(y.time()).unwrap();
        prop_assert!((bound.lower - (at + 1.0)).abs() < 1e-9);
        prop_assert!((bound.upper - (at + 2.0)).abs() < 1e-9);
    }
}
