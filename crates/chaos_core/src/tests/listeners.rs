use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_listener_receives_diff_and_meta() {
    let mut state = media_public_state();
    let log = record_events(&mut state);

    let effects = Effects {
        chaos_delta: 5.0,
        energy_delta: -10.0,
        ..Effects::default()
    }
    .with_power("media", 8.0);
    let meta = ChangeMeta::from_source("test").with_power_reason("media", "unit-test");
    state.apply_effects(&effects, meta).unwrap();

    let events = log.lock().unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.diff.chaos, Some((0.0, 5.0)));
    assert_eq!(event.diff.energy, Some((100.0, 90.0)));
    assert_eq!(event.diff.power[&pid("media")], (Some(40.0), Some(48.0)));
    assert!(!event.diff.power.contains_key(&pid("public")));
    assert_eq!(event.meta.source.as_deref(), Some("test"));
    assert_eq!(event.meta.kind, Some(ChangeKind::Effects));
    assert_eq!(event.meta.power_changes[0].reason, "unit-test");
    assert!(approx(event.previous.energy, 100.0));
    assert!(approx(event.next.energy, 90.0));
}

#[test]
fn test_field_setter_meta_names_the_field() {
    let mut state = media_state();
    let log = record_events(&mut state);
    state.set_chaos(20.0).unwrap();
    let events = log.lock().unwrap();
    assert_eq!(events[0].meta.kind, Some(ChangeKind::Field));
    assert_eq!(events[0].meta.field, Some(Field::Chaos));
    assert_eq!(events[0].diff.changed_keys(), vec!["chaos"]);
}

#[test]
fn test_same_value_emits_nothing() {
    let mut state = media_state();
    let log = record_events(&mut state);
    state.set_energy(50.0).unwrap();
    state.set_energy(50.0).unwrap();
    state.set_energy(120.0).unwrap();
    state.set_energy(100.0).unwrap();
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn test_failing_listener_does_not_block_others() {
    let mut state = media_state();
    state.on_change(|_| Err("listener exploded".into()));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    state.on_change(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    state.set_chaos(10.0).unwrap();
    assert!(approx(state.chaos(), 10.0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_panicking_listener_is_contained() {
    let mut state = media_state();
    state.on_change(|_| panic!("boom"));
    let log = record_events(&mut state);
    state.set_energy(42.0).unwrap();
    assert!(approx(state.energy(), 42.0));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_listeners_run_in_registration_order() {
    let mut state = media_state();
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        state.on_change(move |_| {
            order.lock().unwrap().push(tag);
            Ok(())
        });
    }
    state.set_day(2).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let mut state = media_state();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let id = state.on_change(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    state.set_chaos(1.0).unwrap();
    assert!(state.off_change(id));
    assert!(!state.off_change(id));
    state.set_chaos(2.0).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.listener_count(), 0);
}

#[test]
fn test_change_event_serializes() {
    let mut state = media_state();
    let log = record_events(&mut state);
    state.update_power("media", 2.0, "Poll").unwrap();
    let json = serde_json::to_value(&log.lock().unwrap()[0]).unwrap();
    assert_eq!(json["meta"]["kind"], "power");
    assert_eq!(json["meta"]["reason"], "Poll");
    assert_eq!(json["diff"]["power"]["media"][1], 42.0);
    assert!(json["diff"].get("energy").is_none());
}
