#![allow(clippy::float_cmp)]

use super::*;
use crate::test_fixtures::{base_content, base_state, make_rng, media_public_state, media_state};
use std::sync::{Arc, Mutex};

mod listeners;

// --- Shared test helpers ------------------------------------------------

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn pid(raw: &str) -> PowerCenterId {
    PowerCenterId(raw.to_string())
}

/// Subscribes a listener that clones every event into a shared log.
fn record_events(state: &mut GameState) -> Arc<Mutex<Vec<ChangeEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    state.on_change(move |event| {
        sink.lock().unwrap().push(event.clone());
        Ok(())
    });
    log
}
