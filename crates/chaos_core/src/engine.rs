use std::collections::BTreeMap;

use rand::Rng;

use crate::{
    CascadeRule, ChangeMeta, Effects, EffectsOutcome, GameContent, GameState, PowerCenterId,
    PowerChange, StateError,
};

/// Upper bound on follow-up waves triggered by a single decision.
pub const MAX_CASCADE_DEPTH: usize = 4;

pub const DAILY_TURN_SOURCE: &str = "daily_turn";
pub const CASCADE_SOURCE: &str = "cascade";

#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    pub day: u32,
    pub upkeep: EffectsOutcome,
    pub drift: Option<PowerChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub primary: EffectsOutcome,
    pub cascades: Vec<PowerChange>,
}

/// Advance the session by one day.
///
/// Order of operations, all inside one store transaction:
/// 1. Increment the day counter.
/// 2. Apply daily upkeep (energy drain, score gain).
/// 3. Maybe drift one random power center.
///
/// On any failure the transaction is rolled back and the error returned.
pub fn advance_day(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
) -> Result<DayReport, StateError> {
    transactional(state, |state| run_day(state, content, rng))
}

fn run_day(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
) -> Result<DayReport, StateError> {
    let c = &content.constants;
    let day = state.set_day(state.day().saturating_add(1))?;

    let upkeep = Effects {
        energy_delta: -c.daily_energy_drain,
        score_delta: c.daily_score_gain,
        ..Effects::default()
    };
    let upkeep = state.apply_effects(&upkeep, ChangeMeta::from_source(DAILY_TURN_SOURCE))?;

    let mut drift = None;
    if rng.gen::<f64>() < c.drift_probability {
        // BTreeSet order keeps the pick deterministic for a given seed.
        let centers: Vec<&PowerCenterId> = state.known_power_centers().iter().collect();
        if !centers.is_empty() {
            let target = centers[rng.gen_range(0..centers.len())].clone();
            let amount = (rng.gen::<f64>() - 0.5) * c.drift_span;
            drift = Some(state.update_power(target.as_str(), amount, "Daily drift")?);
        }
    }

    Ok(DayReport { day, upkeep, drift })
}

/// Apply a decision's effect bundle, then propagate cascade rules.
///
/// Cascades are computed from the *requested* deltas, not the clamped
/// results, and are applied wave by wave until no rule fires or
/// `MAX_CASCADE_DEPTH` is reached. Everything is one transaction: an
/// unknown id anywhere rolls back the primary bundle too.
pub fn apply_decision(
    state: &mut GameState,
    effects: &Effects,
    meta: ChangeMeta,
    content: &GameContent,
) -> Result<DecisionOutcome, StateError> {
    transactional(state, |state| {
        let primary = state.apply_effects(effects, meta)?;

        let mut wave: BTreeMap<PowerCenterId, f64> = BTreeMap::new();
        for (raw, delta) in &effects.power {
            if let Some(id) = PowerCenterId::normalize(raw) {
                *wave.entry(id).or_insert(0.0) += delta;
            }
        }

        let mut cascades = Vec::new();
        for _ in 0..MAX_CASCADE_DEPTH {
            let follow_ups = cascade_deltas(&wave, &content.cascades);
            if follow_ups.is_empty() {
                break;
            }
            let bundle = Effects {
                power: follow_ups
                    .iter()
                    .map(|(id, delta)| (id.0.clone(), *delta))
                    .collect(),
                ..Effects::default()
            };
            let meta = ChangeMeta::from_source(CASCADE_SOURCE).with_reason("Cascade effect");
            let outcome = state.apply_effects(&bundle, meta)?;
            cascades.extend(outcome.power_changes);
            wave = follow_ups;
        }

        Ok(DecisionOutcome { primary, cascades })
    })
}

/// Follow-up deltas produced by one wave of changes. Deltas aimed at the
/// same target are summed.
pub fn cascade_deltas(
    wave: &BTreeMap<PowerCenterId, f64>,
    rules: &[CascadeRule],
) -> BTreeMap<PowerCenterId, f64> {
    let mut out = BTreeMap::new();
    for (trigger, delta) in wave {
        for rule in rules.iter().filter(|r| &r.trigger == trigger) {
            if rule.condition.holds(*delta) {
                *out.entry(rule.target.clone()).or_insert(0.0) += delta * rule.factor;
            }
        }
    }
    out.retain(|_, delta| *delta != 0.0);
    out
}

fn transactional<T>(
    state: &mut GameState,
    body: impl FnOnce(&mut GameState) -> Result<T, StateError>,
) -> Result<T, StateError> {
    state.begin();
    match body(state) {
        Ok(value) => {
            state.commit(None);
            Ok(value)
        }
        Err(err) => {
            tracing::debug!("rolling back turn: {err}");
            state.rollback();
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CascadeCondition;

    fn id(raw: &str) -> PowerCenterId {
        PowerCenterId(raw.to_string())
    }

    fn rule(trigger: &str, target: &str, factor: f64, condition: CascadeCondition) -> CascadeRule {
        CascadeRule {
            trigger: id(trigger),
            target: id(target),
            factor,
            condition,
        }
    }

    #[test]
    fn rule_fires_only_past_threshold() {
        let rules = vec![rule(
            "media",
            "public",
            0.4,
            CascadeCondition::AbsAbove { threshold: 10.0 },
        )];
        let quiet = cascade_deltas(&BTreeMap::from([(id("media"), 10.0)]), &rules);
        assert!(quiet.is_empty());

        let loud = cascade_deltas(&BTreeMap::from([(id("media"), -20.0)]), &rules);
        assert!((loud[&id("public")] - -8.0).abs() < 1e-9);
    }

    #[test]
    fn below_condition_is_signed() {
        let rules = vec![rule(
            "congress",
            "public",
            0.15,
            CascadeCondition::Below { threshold: -15.0 },
        )];
        assert!(cascade_deltas(&BTreeMap::from([(id("congress"), 30.0)]), &rules).is_empty());
        let out = cascade_deltas(&BTreeMap::from([(id("congress"), -20.0)]), &rules);
        assert!((out[&id("public")] - -3.0).abs() < 1e-9);
    }

    #[test]
    fn deltas_to_same_target_are_summed() {
        let rules = vec![
            rule("media", "public", 0.5, CascadeCondition::AbsAbove { threshold: 0.0 }),
            rule("congress", "public", 0.5, CascadeCondition::AbsAbove { threshold: 0.0 }),
        ];
        let wave = BTreeMap::from([(id("media"), 10.0), (id("congress"), 4.0)]);
        let out = cascade_deltas(&wave, &rules);
        assert_eq!(out.len(), 1);
        assert!((out[&id("public")] - 7.0).abs() < 1e-9);
    }
}
