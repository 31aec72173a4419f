//! Property tests: a branch never changes the pattern it was taken from.

use interpretation_pattern::AbstractionPattern;
use interpretation_tests::{confirmed, first_path, rhythm};
use proptest::prelude::*;

proptest! {
    #[test]
    fn matching_in_a_branch_leaves_the_parent_alone(depth in 1usize..6, at in 0.0f64..1.0) {
        let root = AbstractionPattern::new(rhythm()).unwrap();
        let path = first_path(root, depth);
        let parent = path.last().unwrap();
        let findings_before: Vec<_> = parent.findings().map(|f| f.id()).collect();
        let trace_before = parent.trace().len();

        let mut child = parent.branch();
        prop_assert_ne!(child.hypothesis().id(), parent.hypothesis().id());
        for (a, b) in child.hypothesis().vars().iter().zip(parent.hypothesis().vars().iter()) {
            prop_assert_ne!(a, b);
        }

        let first = child.evidence(&"beat".into()).first().cloned();
        if let Some(first) = first {
            // the first beat is tied to the hypothesis start only, any time fits
            child.match_finding(&first, confirmed("beat", at - 0.05, at + 0.05)).unwrap();
        }
        child.hypothesis_mut().set_attribute("touched", serde_json::json!(true));

        let findings_after: Vec<_> = parent.findings().map(|f| f.id()).collect();
        prop_assert_eq!(findings_before, findings_after);
        prop_assert_eq!(parent.trace().len(), trace_before);
        prop_assert!(parent.hypothesis().attribute("touched").is_none());
    }

    #[test]
    fn successors_never_alter_their_source(depth in 0usize..5) {
        let root = AbstractionPattern::new(rhythm()).unwrap();
        let path = first_path(root, depth);
        let pattern = path.last().unwrap();
        let before = pattern.to_string();
        let findings = pattern.findings().count();

        let produced = pattern.successors().count();
        prop_assert!(produced <= 1);
        prop_assert_eq!(pattern.to_string(), before);
        prop_assert_eq!(pattern.findings().count(), findings);
    }
}
