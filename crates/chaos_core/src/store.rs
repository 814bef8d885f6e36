//! The transactional simulation store.
//!
//! Every mutation follows the same path: build a full candidate snapshot,
//! run `validate_snapshot` on it, swap it in, then notify listeners. A
//! failed call leaves the store exactly as it was.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;

use crate::diff::diff;
use crate::listeners::{ChangeEvent, ListenerResult, Listeners, SubscriptionId};
use crate::validate::{check_day, clamp_bounded, clamp_score, validate_snapshot};
use crate::{
    ChangeKind, ChangeMeta, Effects, Field, InitialState, Phase, PowerCenterId, PowerChange,
    PowerChangeRecord, Snapshot, StateDiff, StateError, TxPhase,
};

/// Result of a successful `apply_effects` call.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectsOutcome {
    pub diff: StateDiff,
    pub snapshot: Snapshot,
    pub power_changes: Vec<PowerChange>,
}

#[derive(Debug)]
pub struct GameState {
    state: Snapshot,
    known: BTreeSet<PowerCenterId>,
    phase: Phase,
    history: Vec<PowerChangeRecord>,
    transactions: Vec<Snapshot>,
    listeners: Listeners,
}

impl GameState {
    pub fn new(initial: InitialState) -> Result<Self, StateError> {
        let mut known = BTreeSet::new();
        let mut power = BTreeMap::new();
        for seed in &initial.power_centers {
            let id = PowerCenterId::normalize(&seed.id)
                .ok_or_else(|| StateError::InvalidPowerCenterId(seed.id.clone()))?;
            let value = clamp_bounded(&format!("power center {id}"), seed.value)?;
            if !known.insert(id.clone()) {
                return Err(StateError::DuplicatePowerCenter(id));
            }
            power.insert(id, value);
        }

        let state = Snapshot {
            day: check_day(initial.day)?,
            energy: clamp_bounded("energy", initial.energy)?,
            chaos: clamp_bounded("chaos", initial.chaos)?,
            score: clamp_score(initial.score)?,
            power,
        };
        validate_snapshot(&state, &known)?;

        Ok(Self {
            state,
            known,
            phase: Phase::default(),
            history: Vec::new(),
            transactions: Vec::new(),
            listeners: Listeners::default(),
        })
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Owned copy of the full state.
    pub fn snapshot(&self) -> Snapshot {
        self.state.clone()
    }

    pub fn day(&self) -> u32 {
        self.state.day
    }

    pub fn energy(&self) -> f64 {
        self.state.energy
    }

    pub fn chaos(&self) -> f64 {
        self.state.chaos
    }

    pub fn score(&self) -> f64 {
        self.state.score
    }

    pub fn power(&self, id: &str) -> Option<f64> {
        self.state.power_of(id)
    }

    pub fn known_power_centers(&self) -> &BTreeSet<PowerCenterId> {
        &self.known
    }

    pub fn is_known(&self, id: &str) -> bool {
        PowerCenterId::normalize(id).is_some_and(|id| self.known.contains(&id))
    }

    /// Append-only log of every non-zero power change.
    pub fn power_history(&self) -> &[PowerChangeRecord] {
        &self.history
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!(from = %self.phase, to = %phase, "phase change");
        }
        self.phase = phase;
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    pub fn on_change<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) -> ListenerResult + Send + 'static,
    {
        self.listeners.subscribe(Box::new(listener))
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn off_change(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Saves the current state and returns the new nesting depth.
    pub fn begin(&mut self) -> usize {
        self.transactions.push(self.state.clone());
        let depth = self.transactions.len();
        tracing::debug!(depth, "transaction begin");
        depth
    }

    /// Restores the most recently saved state. Returns `None` when no
    /// transaction is open.
    pub fn rollback(&mut self) -> Option<StateDiff> {
        let saved = self.transactions.pop()?;
        let previous = std::mem::replace(&mut self.state, saved);
        let diff = diff(&previous, &self.state);
        tracing::debug!(
            depth = self.transactions.len(),
            changed = ?diff.changed_keys(),
            "transaction rollback"
        );
        let meta = ChangeMeta {
            kind: Some(ChangeKind::Transaction),
            phase: Some(TxPhase::Rollback),
            ..ChangeMeta::default()
        };
        if !diff.is_empty() {
            self.emit(diff.clone(), previous, meta);
        }
        Some(diff)
    }

    /// Drops the most recently saved state, keeping everything applied since
    /// `begin`. Non-empty `meta` is announced as a zero-diff commit event.
    /// Returns `false` when no transaction is open.
    pub fn commit(&mut self, meta: Option<ChangeMeta>) -> bool {
        if self.transactions.pop().is_none() {
            return false;
        }
        tracing::debug!(depth = self.transactions.len(), "transaction commit");
        if let Some(meta) = meta.filter(|m| !m.is_empty()) {
            let meta = ChangeMeta {
                phase: Some(TxPhase::Commit),
                kind: meta.kind.or(Some(ChangeKind::Transaction)),
                ..meta
            };
            self.emit(StateDiff::default(), self.state.clone(), meta);
        }
        true
    }

    pub fn transaction_depth(&self) -> usize {
        self.transactions.len()
    }

    // -----------------------------------------------------------------------
    // Single-field setters
    // -----------------------------------------------------------------------

    pub fn set_day(&mut self, day: u32) -> Result<u32, StateError> {
        let day = check_day(day)?;
        self.update_field(Field::Day, |next| next.day = day)?;
        Ok(self.state.day)
    }

    pub fn set_energy(&mut self, energy: f64) -> Result<f64, StateError> {
        let energy = clamp_bounded("energy", energy)?;
        self.update_field(Field::Energy, |next| next.energy = energy)?;
        Ok(self.state.energy)
    }

    pub fn set_chaos(&mut self, chaos: f64) -> Result<f64, StateError> {
        let chaos = clamp_bounded("chaos", chaos)?;
        self.update_field(Field::Chaos, |next| next.chaos = chaos)?;
        Ok(self.state.chaos)
    }

    pub fn set_score(&mut self, score: f64) -> Result<f64, StateError> {
        let score = clamp_score(score)?;
        self.update_field(Field::Score, |next| next.score = score)?;
        Ok(self.state.score)
    }

    fn update_field(
        &mut self,
        field: Field,
        apply: impl FnOnce(&mut Snapshot),
    ) -> Result<(), StateError> {
        let mut next = self.state.clone();
        apply(&mut next);
        let meta = ChangeMeta {
            kind: Some(ChangeKind::Field),
            field: Some(field),
            ..ChangeMeta::default()
        };
        self.commit_candidate(next, meta)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Power and effect bundles
    // -----------------------------------------------------------------------

    /// Moves one power center by `delta`, clamped into `[0, 100]`.
    pub fn update_power(
        &mut self,
        id: &str,
        delta: f64,
        reason: &str,
    ) -> Result<PowerChange, StateError> {
        self.require_active("update power centers")?;
        let center = self.resolve(id)?;
        if !delta.is_finite() {
            return Err(StateError::non_finite(format!("power delta for {center}")));
        }

        let old_value = self.state.power.get(&center).copied().unwrap_or(0.0);
        let new_value = clamp_bounded(&format!("power center {center}"), old_value + delta)?;
        let mut next = self.state.clone();
        next.power.insert(center.clone(), new_value);

        let change = PowerChange::new(center, old_value, new_value, reason.to_string());
        let changes = vec![change.clone()];
        let meta = ChangeMeta {
            kind: Some(ChangeKind::Power),
            reason: Some(reason.to_string()),
            power_changes: changes.clone(),
            ..ChangeMeta::default()
        };
        self.commit_candidate(next, meta)?;
        self.record_history(&changes);
        Ok(change)
    }

    /// Applies a whole effect bundle or nothing.
    ///
    /// Every power key must name a known center, even keys whose delta is
    /// zero. Keys that normalize to the same id accumulate into one change.
    pub fn apply_effects(
        &mut self,
        effects: &Effects,
        meta: ChangeMeta,
    ) -> Result<EffectsOutcome, StateError> {
        self.require_active("apply effects")?;

        // Same check order as `update_power`: phase, ids, then finiteness.
        let resolved = effects
            .power
            .iter()
            .map(|(raw_id, delta)| Ok((self.resolve(raw_id)?, *delta)))
            .collect::<Result<Vec<(PowerCenterId, f64)>, StateError>>()?;

        for (field, delta) in [
            ("chaos delta", effects.chaos_delta),
            ("energy delta", effects.energy_delta),
            ("score delta", effects.score_delta),
        ] {
            if !delta.is_finite() {
                return Err(StateError::non_finite(field));
            }
        }
        if let Some((center, _)) = resolved.iter().find(|(_, delta)| !delta.is_finite()) {
            return Err(StateError::non_finite(format!("power delta for {center}")));
        }

        let current = &self.state;
        let mut next = Snapshot {
            day: current.day,
            energy: clamp_bounded("energy", current.energy + effects.energy_delta)?,
            chaos: clamp_bounded("chaos", current.chaos + effects.chaos_delta)?,
            score: clamp_score(current.score + effects.score_delta)?,
            power: current.power.clone(),
        };

        let mut touched: Vec<PowerCenterId> = Vec::new();
        for (center, delta) in resolved {
            let old_value = next.power.get(&center).copied().unwrap_or(0.0);
            let new_value = clamp_bounded(&format!("power center {center}"), old_value + delta)?;
            next.power.insert(center.clone(), new_value);
            if !touched.contains(&center) {
                touched.push(center);
            }
        }

        let power_changes: Vec<PowerChange> = touched
            .into_iter()
            .filter_map(|center| {
                let old_value = current.power.get(&center).copied().unwrap_or(0.0);
                let new_value = next.power.get(&center).copied().unwrap_or(0.0);
                let reason = meta.reason_for(&center);
                let change = PowerChange::new(center, old_value, new_value, reason);
                (change.change != 0.0).then_some(change)
            })
            .collect();

        let meta = ChangeMeta {
            kind: meta.kind.or(Some(ChangeKind::Effects)),
            power_changes: power_changes.clone(),
            ..meta
        };
        let diff = self.commit_candidate(next, meta)?;
        self.record_history(&power_changes);
        Ok(EffectsOutcome {
            diff,
            snapshot: self.state.clone(),
            power_changes,
        })
    }

    // -----------------------------------------------------------------------
    // Validation and diffing
    // -----------------------------------------------------------------------

    /// Checks a candidate against every invariant, using this store's known
    /// power centers.
    pub fn validate(&self, candidate: &Snapshot) -> Result<(), StateError> {
        validate_snapshot(candidate, &self.known)
    }

    pub fn diff(prev: &Snapshot, next: &Snapshot) -> StateDiff {
        diff(prev, next)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require_active(&self, action: &'static str) -> Result<(), StateError> {
        if self.phase == Phase::Active {
            Ok(())
        } else {
            tracing::debug!(phase = %self.phase, action, "mutation refused outside ACTIVE phase");
            Err(StateError::InactivePhase {
                action,
                phase: self.phase,
            })
        }
    }

    fn resolve(&self, raw: &str) -> Result<PowerCenterId, StateError> {
        match PowerCenterId::normalize(raw) {
            Some(id) if self.known.contains(&id) => Ok(id),
            _ => {
                tracing::debug!(id = raw, "rejected unknown power center");
                Err(StateError::UnknownPowerCenter(raw.to_string()))
            }
        }
    }

    fn record_history(&mut self, changes: &[PowerChange]) {
        let day = self.state.day;
        let recorded_at = Utc::now();
        self.history.extend(
            changes
                .iter()
                .filter(|c| c.change != 0.0)
                .map(|change| PowerChangeRecord {
                    change: change.clone(),
                    day,
                    recorded_at,
                }),
        );
    }

    /// Validates, swaps in `next`, and notifies if anything changed.
    fn commit_candidate(
        &mut self,
        next: Snapshot,
        meta: ChangeMeta,
    ) -> Result<StateDiff, StateError> {
        self.validate(&next)?;
        let previous = std::mem::replace(&mut self.state, next);
        let diff = diff(&previous, &self.state);
        if !diff.is_empty() {
            self.emit(diff.clone(), previous, meta);
        }
        Ok(diff)
    }

    fn emit(&mut self, diff: StateDiff, previous: Snapshot, meta: ChangeMeta) {
        if self.listeners.is_empty() {
            return;
        }
        let event = ChangeEvent {
            diff,
            previous,
            next: self.state.clone(),
            meta,
        };
        let failures = self.listeners.emit(&event);
        if failures > 0 {
            tracing::debug!(
                failures,
                listeners = self.listeners.len(),
                "change delivered with listener failures"
            );
        }
    }
}
