//! End-to-end test: discovering earlier evidence by walking backward.
//!
//! The automaton has a loop on its start state, so a pattern that already
//! holds its last beat can keep prepending earlier beats. Every backward step
//! rebuilds the networks from the whole trace.

use std::sync::Arc;

use interpretation_pattern::{
    AbstractionPattern, Automaton, InterpretationError, PatternAutomaton, Role, StateId, Transition,
};
use interpretation_tests::{confirmed, init_tracing, rr_constraint};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `S0 -[beat]-> S0` (earlier beats), `S0 -[beat]-> S1` (last beat), final
/// `S1`. Earlier beats must be narrow once they are confirmed.
fn trailing_beats() -> Arc<dyn Automaton> {
    Arc::new(
        PatternAutomaton::new("trailing beats", "rhythm", "S0")
            .with_transition(
                Transition::observing("S0", "S0", "beat")
                    .with_label("earlier")
                    .with_temporal(rr_constraint)
                    .with_general(|_pattern, obs| {
                        if let Some(obs) = obs {
                            let [start, _, end] = obs.extent();
                            interpretation_pattern::verify(end.upper - start.lower <= 0.5, || {
                                format!("{obs} is too wide for a beat")
                            })?;
                        }
                        Ok(())
                    }),
            )
            .with_transition(
                Transition::observing("S0", "S1", "beat")
                    .with_label("last")
                    .with_temporal(rr_constraint),
            )
            .with_transition(
                Transition::observing("S1", "S1", "noise").with_role(Role::Environment),
            )
            .with_final("S1"),
    )
}

/// A pattern holding only its confirmed last beat at `at`.
fn with_last_beat(at: f64) -> anyhow::Result<AbstractionPattern> {
    let pattern = AbstractionPattern::new(trailing_beats())?;
    let mut last = pattern
        .successors()
        .find(|p| p.final_state() == &StateId::new("S1"))
        .ok_or_else(|| anyhow::anyhow!("no forward successor"))?;
    let finding = Arc::clone(&last.evidence(&"beat".into())[0]);
    last.match_finding(&finding, confirmed("beat", at - 0.05, at + 0.05))?;
    Ok(last)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn backward_candidates_come_first() -> anyhow::Result<()> {
    init_tracing();
    let last = with_last_beat(10.0)?;

    let candidates: Vec<_> = last.successors().collect();
    // one backward step through the start loop, one forward noise step
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].trace()[0].transition.label(), "earlier");
    assert_eq!(candidates[1].trace().len(), 2);
    assert_eq!(candidates[1].trace()[1].transition.role(), Role::Environment);
    Ok(())
}

#[test]
fn prepended_beat_is_bounded_by_the_later_one() -> anyhow::Result<()> {
    init_tracing();
    let last = with_last_beat(10.0)?;
    let earlier = last
        .successors()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no backward successor"))?;

    let beats = earlier.evidence(&"beat".into());
    assert_eq!(beats.len(), 2);
    assert!(earlier.is_finding(beats[0].id()));
    assert_eq!(earlier.get_step(&beats[0]), Some(0));
    assert_eq!(earlier.get_step(&beats[1]), Some(1));
    let (previous, next) = earlier.get_consecutive(&beats[0])?;
    assert!(previous.is_none());
    assert_eq!(next.map(|o| o.id()), Some(beats[1].id()));

    let bound = earlier
        .bounds(beats[0].time())
        .ok_or_else(|| anyhow::anyhow!("earlier beat not constrained"))?;
    assert!((bound.lower - 8.8).abs() < 1e-9, "{bound}");
    assert!((bound.upper - 9.4).abs() < 1e-9, "{bound}");
    assert_eq!(earlier.networks().len(), 1);
    Ok(())
}

#[test]
fn backward_steps_repeat_through_the_loop() -> anyhow::Result<()> {
    init_tracing();
    let mut pattern = with_last_beat(10.0)?;
    for expected in [2, 3, 4] {
        let next = pattern
            .successors()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no backward successor"))?;
        pattern = next;
        assert_eq!(pattern.evidence(&"beat".into()).len(), expected);
    }
    // the earliest of four beats is 1.8 to 3.6 before the last one
    let earliest = Arc::clone(&pattern.evidence(&"beat".into())[0]);
    let bound = pattern
        .bounds(earliest.time())
        .ok_or_else(|| anyhow::anyhow!("earliest beat not constrained"))?;
    assert!((bound.lower - 6.4).abs() < 1e-9, "{bound}");
    assert!((bound.upper - 8.2).abs() < 1e-9, "{bound}");
    Ok(())
}

#[test]
fn matching_the_earlier_beat_completes_the_pattern() -> anyhow::Result<()> {
    init_tracing();
    let last = with_last_beat(10.0)?;
    let mut earlier = last
        .successors()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no backward successor"))?;
    let finding = Arc::clone(&earlier.evidence(&"beat".into())[0]);

    earlier.match_finding(&finding, confirmed("beat", 8.95, 9.05))?;
    assert!(earlier.sufficient_evidence());
    assert!(earlier.abstracts(&earlier.evidence(&"beat".into())[0])?);
    earlier.finish()?;
    Ok(())
}

#[test]
fn general_constraint_rejects_a_wide_match() -> anyhow::Result<()> {
    init_tracing();
    let last = with_last_beat(10.0)?;
    let mut earlier = last
        .successors()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no backward successor"))?;
    let finding = Arc::clone(&earlier.evidence(&"beat".into())[0]);

    let err = earlier
        .match_finding(&finding, confirmed("beat", 8.5, 9.5))
        .unwrap_err();
    assert!(matches!(err, InterpretationError::ConstraintViolated(_)), "{err}");
    Ok(())
}

#[test]
fn earlier_beat_out_of_rhythm_is_rejected() -> anyhow::Result<()> {
    init_tracing();
    let last = with_last_beat(10.0)?;
    let mut earlier = last
        .successors()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no backward successor"))?;
    let finding = Arc::clone(&earlier.evidence(&"beat".into())[0]);

    let err = earlier
        .match_finding(&finding, confirmed("beat", 4.95, 5.05))
        .unwrap_err();
    assert!(matches!(err, InterpretationError::TemporalInconsistency(_)), "{err}");
    Ok(())
}
