//! Temporal variable handles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VAR: AtomicU64 = AtomicU64::new(1);

/// Handle to a temporal variable.
///
/// Handles carry no value: the bounds of a variable live in the constraint
/// networks that mention it. Every call to [`TimeVar::fresh`] yields a handle
/// never seen before in the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeVar(pub u64);

impl TimeVar {
    /// Allocate a new, unique variable.
    pub fn fresh() -> Self {
        Self(NEXT_VAR.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TimeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}
