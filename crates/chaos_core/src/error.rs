use thiserror::Error;

use crate::{Phase, PowerCenterId};

/// Every way a store mutation can be refused. The store is unchanged after
/// any of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("Unknown power center: {0}")]
    UnknownPowerCenter(String),

    #[error("Invalid power center id: {0:?}")]
    InvalidPowerCenterId(String),

    #[error("Duplicate power center: {0}")]
    DuplicatePowerCenter(PowerCenterId),

    #[error("{field} must be a finite number")]
    NonFinite { field: String },

    #[error("{field} out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Score cannot be negative: {0}")]
    NegativeScore(f64),

    #[error("Day must be >= 1 (got {0})")]
    InvalidDay(u32),

    #[error("Invalid phase \"{0}\"")]
    InvalidPhase(String),

    #[error("Cannot {action} outside ACTIVE phase (current: {phase})")]
    InactivePhase { action: &'static str, phase: Phase },
}

impl StateError {
    pub(crate) fn non_finite(field: impl Into<String>) -> Self {
        StateError::NonFinite {
            field: field.into(),
        }
    }
}
