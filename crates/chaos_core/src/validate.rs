//! Invariant checks and numeric correction.
//!
//! `validate_snapshot` is the only place that decides whether a candidate
//! state is acceptable. Clamping corrects in-range numeric drift; it is never
//! used to paper over unknown ids or non-finite input.

use std::collections::BTreeSet;

use crate::{PowerCenterId, Snapshot, StateError};

pub const BOUNDED_MIN: f64 = 0.0;
pub const BOUNDED_MAX: f64 = 100.0;

/// Clamps a bounded field (energy, chaos, power) into `[0, 100]`.
pub fn clamp_bounded(field: &str, value: f64) -> Result<f64, StateError> {
    if !value.is_finite() {
        return Err(StateError::non_finite(field));
    }
    // `+ 0.0` folds -0.0 into 0.0 so diffs never report a sign flip.
    Ok(value.clamp(BOUNDED_MIN, BOUNDED_MAX) + 0.0)
}

/// Floors score at zero. No upper bound.
pub fn clamp_score(value: f64) -> Result<f64, StateError> {
    if !value.is_finite() {
        return Err(StateError::non_finite("score"));
    }
    Ok(value.max(0.0) + 0.0)
}

pub fn check_day(day: u32) -> Result<u32, StateError> {
    if day < 1 {
        return Err(StateError::InvalidDay(day));
    }
    Ok(day)
}

fn check_bounded(field: &str, value: f64) -> Result<(), StateError> {
    if !value.is_finite() {
        return Err(StateError::non_finite(field));
    }
    if !(BOUNDED_MIN..=BOUNDED_MAX).contains(&value) {
        return Err(StateError::OutOfRange {
            field: field.to_string(),
            value,
            min: BOUNDED_MIN,
            max: BOUNDED_MAX,
        });
    }
    Ok(())
}

/// Checks all five invariants against a fully formed candidate.
///
/// 1. energy and chaos finite and in `[0, 100]`
/// 2. score finite and `>= 0`
/// 3. day `>= 1`
/// 4. every power key is known
/// 5. every power value finite and in `[0, 100]`
pub fn validate_snapshot(
    candidate: &Snapshot,
    known: &BTreeSet<PowerCenterId>,
) -> Result<(), StateError> {
    check_bounded("energy", candidate.energy)?;
    check_bounded("chaos", candidate.chaos)?;
    if !candidate.score.is_finite() {
        return Err(StateError::non_finite("score"));
    }
    if candidate.score < 0.0 {
        return Err(StateError::NegativeScore(candidate.score));
    }
    check_day(candidate.day)?;
    for (id, value) in &candidate.power {
        if !known.contains(id) {
            return Err(StateError::UnknownPowerCenter(id.0.clone()));
        }
        check_bounded(&format!("power center {id}"), *value)?;
    }
    Ok(())
}
