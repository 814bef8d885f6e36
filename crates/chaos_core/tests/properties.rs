#![allow(clippy::float_cmp)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chaos_core::{
    diff, ChangeEvent, ChangeMeta, Effects, GameState, InitialState, PowerCenterSeed, Snapshot,
};
use proptest::prelude::*;

fn store() -> GameState {
    GameState::new(InitialState::with_power_centers(vec![
        PowerCenterSeed::new("media", 40.0),
        PowerCenterSeed::new("public", 55.0),
    ]))
    .unwrap()
}

fn in_bounds(snap: &Snapshot) -> bool {
    let bounded = |v: f64| (0.0..=100.0).contains(&v);
    bounded(snap.energy)
        && bounded(snap.chaos)
        && snap.score >= 0.0
        && snap.day >= 1
        && snap.power.values().all(|v| bounded(*v))
}

#[derive(Debug, Clone)]
enum Op {
    Energy(f64),
    Chaos(f64),
    Score(f64),
    Power(bool, f64),
    Bundle(f64, f64, f64),
    /// `begin`, set energy, move media, then `rollback`.
    Speculate(f64, f64),
}

fn op() -> impl Strategy<Value = Op> {
    let value = -1.0e6..1.0e6_f64;
    prop_oneof![
        value.clone().prop_map(Op::Energy),
        value.clone().prop_map(Op::Chaos),
        value.clone().prop_map(Op::Score),
        (any::<bool>(), value.clone()).prop_map(|(media, d)| Op::Power(media, d)),
        (value.clone(), value.clone(), value.clone()).prop_map(|(c, e, p)| Op::Bundle(c, e, p)),
        (value.clone(), value).prop_map(|(e, d)| Op::Speculate(e, d)),
    ]
}

fn center(media: bool) -> &'static str {
    if media {
        "media"
    } else {
        "public"
    }
}

fn apply(state: &mut GameState, op: Op) {
    match op {
        Op::Energy(v) => {
            state.set_energy(v).unwrap();
        }
        Op::Chaos(v) => {
            state.set_chaos(v).unwrap();
        }
        Op::Score(v) => {
            state.set_score(v).unwrap();
        }
        Op::Power(media, d) => {
            state.update_power(center(media), d, "prop").unwrap();
        }
        Op::Bundle(c, e, p) => {
            let effects = Effects {
                chaos_delta: c,
                energy_delta: e,
                ..Effects::default()
            }
            .with_power("public", p)
            .with_power("media", 0.0);
            state.apply_effects(&effects, ChangeMeta::default()).unwrap();
        }
        Op::Speculate(e, d) => {
            state.begin();
            state.set_energy(e).unwrap();
            state.update_power("media", d, "speculative").unwrap();
            state.rollback().unwrap();
        }
    }
}

/// Dotted names of every field that differs between two snapshots.
fn differing_fields(prev: &Snapshot, next: &Snapshot) -> BTreeSet<String> {
    let mut fields = BTreeSet::new();
    if prev.day != next.day {
        fields.insert("day".to_string());
    }
    for (name, a, b) in [
        ("energy", prev.energy, next.energy),
        ("chaos", prev.chaos, next.chaos),
        ("score", prev.score, next.score),
    ] {
        if a != b {
            fields.insert(name.to_string());
        }
    }
    let ids: BTreeSet<_> = prev.power.keys().chain(next.power.keys()).collect();
    for id in ids {
        if prev.power.get(id) != next.power.get(id) {
            fields.insert(format!("power.{id}"));
        }
    }
    fields
}

proptest! {
    #[test]
    fn test_state_stays_in_bounds(ops in prop::collection::vec(op(), 1..40)) {
        let mut state = store();
        for op in ops {
            apply(&mut state, op);
            prop_assert!(in_bounds(&state.snapshot()));
        }
    }

    #[test]
    fn test_every_event_reports_exactly_what_changed(ops in prop::collection::vec(op(), 1..40)) {
        let mut state = store();
        let seen: Arc<Mutex<Vec<ChangeEvent>>> = Arc::default();
        let sink = Arc::clone(&seen);
        state.on_change(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        });

        for op in ops {
            apply(&mut state, op);
        }

        for event in seen.lock().unwrap().iter() {
            prop_assert_eq!(&event.diff, &diff(&event.previous, &event.next));
            prop_assert!(!event.diff.is_empty());
            let reported: BTreeSet<String> = event.diff.changed_keys().into_iter().collect();
            prop_assert_eq!(reported, differing_fields(&event.previous, &event.next));
        }
        prop_assert_eq!(state.transaction_depth(), 0);
    }

    #[test]
    fn test_unknown_center_never_mutates(c in -50.0..50.0_f64, e in -50.0..50.0_f64, d in -50.0..50.0_f64) {
        let mut state = store();
        let before = state.snapshot();
        let effects = Effects { chaos_delta: c, energy_delta: e, ..Effects::default() }
            .with_power("media", d)
            .with_power("nobody", d);
        prop_assert!(state.apply_effects(&effects, ChangeMeta::default()).is_err());
        prop_assert!(state.update_power("nobody", d, "").is_err());
        prop_assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_diff_reconstructs_target(
        e in 0.0..=100.0_f64,
        c in 0.0..=100.0_f64,
        s in 0.0..1.0e6_f64,
        day in 1u32..1000,
        media in 0.0..=100.0_f64,
    ) {
        let a = store().snapshot();
        let mut b = a.clone();
        b.energy = e;
        b.chaos = c;
        b.score = s;
        b.day = day;
        b.power.insert(chaos_core::PowerCenterId("media".to_string()), media);

        let d = diff(&a, &b);
        prop_assert_eq!(d.apply_to(&a), b.clone());

        // Only fields that actually differ are reported.
        let expected: usize = [a.energy != b.energy, a.chaos != b.chaos, a.score != b.score, a.day != b.day]
            .iter()
            .filter(|x| **x)
            .count()
            + usize::from(a.power != b.power);
        prop_assert_eq!(d.changed_keys().len(), expected);
    }
}
