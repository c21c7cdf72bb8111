// ── State store ──
//
// The authoritative in-memory snapshot of one device, with push-based
// change notification via a `watch` channel. Poll and push paths write
// concurrently; the merge runs under the channel's internal guard, so
// field-level updates from one path never overwrite the other's fields.

use tokio::sync::watch;

use crate::model::{DeviceState, StateDelta};

/// Owner of the [`DeviceState`] snapshot for one device session.
#[derive(Debug)]
pub struct StateStore {
    snapshot: watch::Sender<DeviceState>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Create a store with every field unknown.
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(DeviceState::default());
        Self { snapshot }
    }

    /// The current snapshot (cheap clone of a small struct).
    pub fn current(&self) -> DeviceState {
        self.snapshot.borrow().clone()
    }

    /// Merge a partial update and return the resulting snapshot.
    ///
    /// An empty delta is a no-op: the unchanged snapshot is returned and
    /// subscribers are not notified. Subscribers are also left alone when
    /// the delta carries only values identical to the current state.
    pub fn apply(&self, delta: &StateDelta) -> DeviceState {
        if delta.is_empty() {
            return self.current();
        }

        let mut merged = DeviceState::default();
        self.snapshot.send_if_modified(|state| {
            let changed = state.merge(delta);
            merged = state.clone();
            changed
        });
        merged
    }

    /// Update only the liveness flag.
    pub fn set_online(&self, online: bool) -> DeviceState {
        self.apply(&StateDelta::online(online))
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.snapshot.subscribe()
    }
}
