//! Structural diff between two snapshots.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{PowerCenterId, Snapshot};

/// Exactly what changed between two snapshots. Absent entries are unchanged.
///
/// Power entries are `(before, after)`; `None` means the key was missing on
/// that side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateDiff {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chaos: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub power: BTreeMap<PowerCenterId, (Option<f64>, Option<f64>)>,
}

#[allow(clippy::float_cmp)]
fn changed(prev: f64, next: f64) -> Option<(f64, f64)> {
    (prev != next).then_some((prev, next))
}

#[allow(clippy::float_cmp)]
fn power_changed(prev: Option<f64>, next: Option<f64>) -> bool {
    prev != next
}

/// Pure, stateless diff of `prev` → `next`.
pub fn diff(prev: &Snapshot, next: &Snapshot) -> StateDiff {
    let keys: BTreeSet<&PowerCenterId> = prev.power.keys().chain(next.power.keys()).collect();
    let power = keys
        .into_iter()
        .filter_map(|key| {
            let before = prev.power.get(key).copied();
            let after = next.power.get(key).copied();
            power_changed(before, after).then(|| (key.clone(), (before, after)))
        })
        .collect();

    StateDiff {
        day: (prev.day != next.day).then_some((prev.day, next.day)),
        energy: changed(prev.energy, next.energy),
        chaos: changed(prev.chaos, next.chaos),
        score: changed(prev.score, next.score),
        power,
    }
}

impl StateDiff {
    pub fn is_empty(&self) -> bool {
        self.day.is_none()
            && self.energy.is_none()
            && self.chaos.is_none()
            && self.score.is_none()
            && self.power.is_empty()
    }

    /// Dotted names of every changed field: `energy`, `power.media`, ...
    pub fn changed_keys(&self) -> Vec<String> {
        let scalars = [
            ("day", self.day.is_some()),
            ("energy", self.energy.is_some()),
            ("chaos", self.chaos.is_some()),
            ("score", self.score.is_some()),
        ];
        scalars
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(name, _)| name.to_string())
            .chain(self.power.keys().map(|id| format!("power.{id}")))
            .collect()
    }

    /// Replays the "after" side of every entry onto `base`.
    ///
    /// `diff(a, b).apply_to(a) == b` for any pair of snapshots.
    pub fn apply_to(&self, base: &Snapshot) -> Snapshot {
        let mut next = base.clone();
        if let Some((_, day)) = self.day {
            next.day = day;
        }
        if let Some((_, energy)) = self.energy {
            next.energy = energy;
        }
        if let Some((_, chaos)) = self.chaos {
            next.chaos = chaos;
        }
        if let Some((_, score)) = self.score {
            next.score = score;
        }
        for (id, (_, after)) in &self.power {
            match after {
                Some(value) => {
                    next.power.insert(id.clone(), *value);
                }
                None => {
                    next.power.remove(id);
                }
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> PowerCenterId {
        PowerCenterId(raw.to_string())
    }

    fn snap(energy: f64, power: &[(&str, f64)]) -> Snapshot {
        Snapshot {
            day: 1,
            energy,
            chaos: 0.0,
            score: 0.0,
            power: power.iter().map(|(k, v)| (id(k), *v)).collect(),
        }
    }

    #[test]
    fn identical_snapshots_have_empty_diff() {
        let a = snap(50.0, &[("media", 40.0)]);
        let d = diff(&a, &a.clone());
        assert!(d.is_empty());
        assert!(d.changed_keys().is_empty());
    }

    #[test]
    fn scalar_and_power_changes_are_reported() {
        let a = snap(50.0, &[("media", 40.0), ("public", 55.0)]);
        let b = snap(45.0, &[("media", 48.0), ("public", 55.0)]);
        let d = diff(&a, &b);
        assert_eq!(d.energy, Some((50.0, 45.0)));
        assert_eq!(d.power.get(&id("media")), Some(&(Some(40.0), Some(48.0))));
        assert!(!d.power.contains_key(&id("public")));
        assert_eq!(d.changed_keys(), vec!["energy", "power.media"]);
    }

    #[test]
    fn keys_on_one_side_only_count_as_changed() {
        let a = snap(50.0, &[("media", 40.0)]);
        let b = snap(50.0, &[("science", 10.0)]);
        let d = diff(&a, &b);
        assert_eq!(d.power.get(&id("media")), Some(&(Some(40.0), None)));
        assert_eq!(d.power.get(&id("science")), Some(&(None, Some(10.0))));
    }

    #[test]
    fn apply_to_reconstructs_target() {
        let a = snap(50.0, &[("media", 40.0), ("public", 55.0)]);
        let mut b = snap(12.5, &[("media", 0.0), ("science", 3.0)]);
        b.day = 9;
        b.score = 250.0;
        assert_eq!(diff(&a, &b).apply_to(&a), b);
    }

    #[test]
    fn empty_fields_are_skipped_when_serialized() {
        let a = snap(50.0, &[("media", 40.0)]);
        let b = snap(60.0, &[("media", 40.0)]);
        let json = serde_json::to_value(diff(&a, &b)).unwrap();
        assert_eq!(json, serde_json::json!({ "energy": [50.0, 60.0] }));
    }
}
