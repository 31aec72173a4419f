//! Configuration for abstraction pattern exploration.

use serde::{Deserialize, Serialize};

/// Tuning knobs shared by a pattern and every branch derived from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Maximum number of network minimizations one consistency check may
    /// run before the propagation is declared non-convergent.
    pub max_propagation_steps: usize,
    /// Whether rebuilding the networks after a backward step also re-runs
    /// general constraints of fully resolved prefixes. When disabled, general
    /// constraints only run when findings are matched.
    pub replay_general_constraints: bool,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            max_propagation_steps: 10_000,
            replay_general_constraints: true,
        }
    }
}
