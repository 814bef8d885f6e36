//! Change subscribers.
//!
//! Listeners run synchronously, in registration order, while the store is
//! still mutably borrowed. A listener can therefore never call back into the
//! store that is notifying it.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::{ChangeMeta, Snapshot, StateDiff};

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;
pub type ListenerResult = Result<(), ListenerError>;

type BoxedListener = Box<dyn FnMut(&ChangeEvent) -> ListenerResult + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Payload delivered to every listener after a successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub diff: StateDiff,
    pub previous: Snapshot,
    pub next: Snapshot,
    pub meta: ChangeMeta,
}

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, BoxedListener)>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl Listeners {
    pub(crate) fn subscribe(&mut self, listener: BoxedListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delivers `event` to every listener. Errors and panics are logged and
    /// swallowed. Returns how many listeners failed.
    pub(crate) fn emit(&mut self, event: &ChangeEvent) -> usize {
        let mut failures = 0;
        for (id, listener) in &mut self.entries {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    tracing::warn!(subscription = id.0, "GameState listener error: {err}");
                }
                Err(panic) => {
                    failures += 1;
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_string());
                    tracing::warn!(subscription = id.0, "GameState listener panicked: {message}");
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn event() -> ChangeEvent {
        let snap = Snapshot {
            day: 1,
            energy: 100.0,
            chaos: 0.0,
            score: 0.0,
            power: BTreeMap::new(),
        };
        ChangeEvent {
            diff: StateDiff::default(),
            previous: snap.clone(),
            next: snap,
            meta: ChangeMeta::default(),
        }
    }

    #[test]
    fn test_emit_counts_errors_and_panics() {
        let mut listeners = Listeners::default();
        listeners.subscribe(Box::new(|_: &ChangeEvent| -> ListenerResult { Err("nope".into()) }));
        listeners.subscribe(Box::new(|_: &ChangeEvent| -> ListenerResult { panic!("boom") }));
        listeners.subscribe(Box::new(|_: &ChangeEvent| -> ListenerResult { Ok(()) }));
        assert_eq!(listeners.emit(&event()), 2);
        assert_eq!(listeners.len(), 3);
    }

    #[test]
    fn test_emit_without_failures_returns_zero() {
        let mut listeners = Listeners::default();
        listeners.subscribe(Box::new(|_: &ChangeEvent| -> ListenerResult { Ok(()) }));
        assert_eq!(listeners.emit(&event()), 0);
    }
}
