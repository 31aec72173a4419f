//! Error types shared by the constraint networks and the pattern driver.

use thiserror::Error;

use crate::observation::{ObservableType, ObservationId};

/// Errors raised while building or checking an interpretation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InterpretationError {
    /// A temporal constraint network became unsatisfiable.
    #[error("temporal inconsistency: {0}")]
    TemporalInconsistency(String),

    /// A general (non-temporal) constraint rejected the interpretation.
    #[error("constraint violated: {0}")]
    ConstraintViolated(String),

    /// The pattern cannot be finished with the evidence it holds.
    #[error("insufficient evidence: {0}")]
    InsufficientEvidence(String),

    /// The same observation would appear twice in one evidence list.
    #[error("duplicated observation {0} in pattern evidence")]
    DuplicatedEvidence(ObservationId),

    /// The observation is not part of the pattern's evidence.
    #[error("observation {0} is not related to this pattern")]
    UnrelatedObservation(ObservationId),

    /// An observation cannot stand for the expected observable.
    #[error("{found} observation cannot stand for {expected}")]
    TypeMismatch {
        expected: ObservableType,
        found: ObservableType,
    },

    /// An automaton definition is malformed.
    #[error("invalid automaton: {0}")]
    InvalidAutomaton(String),

    /// The pattern was already finished and is closed to changes.
    #[error("pattern already finished")]
    Finished,
}

impl InterpretationError {
    /// Whether this error means "the interpretation is inconsistent", as
    /// opposed to a misuse of the API.
    pub fn is_inconsistency(&self) -> bool {
        matches!(
            self,
            Self::TemporalInconsistency(_)
                | Self::ConstraintViolated(_)
                | Self::InsufficientEvidence(_)
        )
    }
}

/// Result type for interpretation operations.
pub type InterpretationResult<T> = Result<T, InterpretationError>;

/// Turn a failed check into a [`InterpretationError::ConstraintViolated`].
///
/// The message is only built when the check fails.
pub fn verify<F, S>(condition: bool, message: F) -> InterpretationResult<()>
where
    F: FnOnce() -> S,
    S: Into<String>,
{
    if condition {
        Ok(())
    } else {
        Err(InterpretationError::ConstraintViolated(message().into()))
    }
}
