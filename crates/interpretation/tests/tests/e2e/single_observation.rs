//! End-to-end test: one hypothesis supported by one observation.
//!
//! Walks the pattern from creation to a finished hypothesis: exploration
//! produces a finding, the finding blocks `finish` until it is matched, and
//! the finalizer then assigns the derived attributes.

use std::sync::Arc;

use interpretation_pattern::{AbstractionPattern, InterpretationError, Interval, Observation, StateId};
use interpretation_tests::{confirmed, init_tracing, single_observation};
use serde_json::json;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn exploration_yields_one_candidate_with_one_finding() -> anyhow::Result<()> {
    init_tracing();
    let pattern = AbstractionPattern::new(single_observation())?;

    let candidates: Vec<_> = pattern.successors().collect();
    assert_eq!(candidates.len(), 1);
    let candidate = &candidates[0];

    assert_eq!(candidate.final_state(), &StateId::new("S1"));
    assert_eq!(candidate.initial_state(), &StateId::new("S0"));
    let evidence = candidate.evidence(&"A".into());
    assert_eq!(evidence.len(), 1);
    assert!(candidate.is_finding(evidence[0].id()));
    assert_eq!(candidate.findings().count(), 1);
    Ok(())
}

#[test]
fn finish_waits_for_the_match() -> anyhow::Result<()> {
    init_tracing();
    let pattern = AbstractionPattern::new(single_observation())?;
    let mut candidate = pattern
        .successors()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no successor"))?;
    let finding = Arc::clone(&candidate.evidence(&"A".into())[0]);

    let err = candidate.finish().unwrap_err();
    assert!(matches!(err, InterpretationError::InsufficientEvidence(_)));

    let a = confirmed("A", 10.0, 14.0);
    candidate.match_finding(&finding, Arc::clone(&a))?;
    assert!(candidate.sufficient_evidence());
    candidate.finish()?;

    let hypothesis = candidate.into_hypothesis();
    assert_eq!(hypothesis.attribute("supporting"), Some(&json!(1)));
    assert_eq!(hypothesis.attribute("earliest_end"), Some(&json!(12.0)));
    assert_eq!(
        hypothesis.extent_of(hypothesis.start()),
        Some(Interval::at_most(12.0))
    );
    Ok(())
}

#[test]
fn exploring_does_not_touch_the_parent() -> anyhow::Result<()> {
    init_tracing();
    let pattern = AbstractionPattern::new(single_observation())?;
    let mut candidate = pattern
        .successors()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no successor"))?;
    let finding = Arc::clone(&candidate.evidence(&"A".into())[0]);
    candidate.match_finding(&finding, confirmed("A", 0.0, 1.0))?;
    candidate.finish()?;

    assert!(pattern.trace().is_empty());
    assert!(pattern.evidence(&"A".into()).is_empty());
    assert!(!pattern.is_finished());
    assert!(pattern.hypothesis().attribute("supporting").is_none());
    assert_eq!(pattern.successors().count(), 1);
    Ok(())
}

#[test]
fn match_rejects_wrong_observations() -> anyhow::Result<()> {
    init_tracing();
    let pattern = AbstractionPattern::new(single_observation())?;
    let mut candidate = pattern
        .successors()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no successor"))?;
    let finding = Arc::clone(&candidate.evidence(&"A".into())[0]);

    let err = candidate
        .match_finding(&finding, confirmed("B", 0.0, 1.0))
        .unwrap_err();
    assert!(matches!(err, InterpretationError::TypeMismatch { .. }));

    let stranger = Observation::new("A");
    let err = candidate
        .match_finding(&stranger, confirmed("A", 0.0, 1.0))
        .unwrap_err();
    assert_eq!(err, InterpretationError::UnrelatedObservation(stranger.id()));

    // the failed attempts left the finding in place
    assert!(candidate.is_finding(finding.id()));
    Ok(())
}
