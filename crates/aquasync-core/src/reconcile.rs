// ── Reconciler ──
//
// Translates the two raw vendor shapes -- poll responses and push
// messages -- into StateStore partial updates. The push protocol is
// schema-inconsistent across firmware revisions (named codes on some,
// raw capability indices on others), so dispatch runs a prioritized
// matcher chain: named-code matcher first, numeric-index fallback
// second. One malformed entry never aborts the rest of its message.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use aquasync_api::{CodeValue, map_code_value};

use crate::config::DpRegistry;
use crate::model::StateDelta;
use crate::push::{BIZ_OFFLINE, BIZ_ONLINE, PushEnvelope};
use crate::store::StateStore;

// Named status codes understood without registry configuration.
const CODE_SWITCH: &str = "switch";
const CODE_MODE: &str = "mode";
const CODE_COOLDOWN: &str = "temp_set";

/// A single typed field update decoded from a vendor entry.
#[derive(Debug, Clone, PartialEq)]
enum FieldUpdate {
    Switch(bool),
    Mode(String),
    Cooldown(i64),
    Pump(String),
}

impl FieldUpdate {
    fn into_delta(self) -> StateDelta {
        match self {
            Self::Switch(v) => StateDelta::switch(v),
            Self::Mode(v) => StateDelta::mode(v),
            Self::Cooldown(v) => StateDelta::cooldown(v),
            Self::Pump(v) => StateDelta::pump(v),
        }
    }
}

/// Merges poll responses and push messages into the [`StateStore`].
pub struct Reconciler {
    device_id: String,
    registry: DpRegistry,
    store: Arc<StateStore>,
}

impl Reconciler {
    pub fn new(device_id: impl Into<String>, registry: DpRegistry, store: Arc<StateStore>) -> Self {
        Self {
            device_id: device_id.into(),
            registry,
            store,
        }
    }

    // ── Poll path ────────────────────────────────────────────────────

    /// Project a status response (list of `{code, value}`) into one
    /// partial update. Unknown codes are logged and skipped.
    pub fn apply_status(&self, entries: &[CodeValue]) {
        let mapped = map_code_value(entries);

        let mut delta = StateDelta::default();
        for (code, value) in &mapped {
            match self.decode_code(code, value) {
                Some(FieldUpdate::Switch(v)) => delta.switch = Some(v),
                Some(FieldUpdate::Mode(v)) => delta.mode = Some(v),
                Some(FieldUpdate::Cooldown(v)) => delta.cooldown = Some(v),
                Some(FieldUpdate::Pump(v)) => delta.pump = Some(v),
                None => debug!(%code, "status code not mapped, skipping"),
            }
        }

        if delta.is_empty() {
            debug!("status response produced no recognized fields");
            return;
        }
        self.store.apply(&delta);
    }

    /// Project the cloud-side liveness flag.
    pub fn apply_online(&self, online: bool) {
        self.store.set_online(online);
    }

    /// Project a capability-specific poll read (cooldown or pump).
    pub fn apply_capability(&self, name: &str, value: &Value) {
        let update = if name == self.registry.cooldown_capability {
            decode_cooldown(value)
        } else if name == self.registry.pump_capability {
            decode_pump(value)
        } else {
            debug!(capability = name, "capability read not mapped, skipping");
            return;
        };

        match update {
            Some(update) => {
                self.store.apply(&update.into_delta());
            }
            None => warn!(
                capability = name,
                %value,
                "capability value has an unusable shape, keeping prior value"
            ),
        }
    }

    // ── Push path ────────────────────────────────────────────────────

    /// Handle one push message. Never blocks, never fails: messages for
    /// other devices and entries with unusable shapes are logged and
    /// dropped, and the remaining entries of the message still apply.
    pub fn on_message(&self, msg: &PushEnvelope) {
        match msg.dev_id.as_deref() {
            Some(id) if id == self.device_id => {}
            other => {
                debug!(device = ?other, "push message for a different device, dropping");
                return;
            }
        }

        // Liveness events carry no status array.
        match msg.biz_code.as_deref() {
            Some(BIZ_ONLINE) => {
                self.store.set_online(true);
                return;
            }
            Some(BIZ_OFFLINE) => {
                self.store.set_online(false);
                return;
            }
            Some(other) => debug!(biz_code = other, "unhandled biz code"),
            None => {}
        }

        let Some(status) = msg.status.as_deref() else {
            debug!("push message without status array, dropping");
            return;
        };

        for entry in status {
            // Each recognized field applies atomically; a bad entry only
            // loses itself.
            for update in self.decode_entry(entry) {
                self.store.apply(&update.into_delta());
            }
        }
    }

    /// Decode one status entry into zero or more typed updates.
    fn decode_entry(&self, entry: &Value) -> Vec<FieldUpdate> {
        let Some(object) = entry.as_object() else {
            warn!(%entry, "status entry is not an object, dropping");
            return Vec::new();
        };

        // Named form: {"code": "...", "value": ...}
        if let Some(code) = object.get("code").and_then(Value::as_str) {
            let Some(value) = object.get("value") else {
                warn!(code, "status entry has a code but no value, dropping");
                return Vec::new();
            };
            return match self.decode_code(code, value) {
                Some(update) => vec![update],
                None => {
                    debug!(code, "unrecognized status code, dropping");
                    Vec::new()
                }
            };
        }

        // Index form: {"102": 5, "28": "pump_1", "t": 1658188139}
        let mut updates = Vec::new();
        for (key, value) in object {
            if key == "t" {
                continue;
            }
            match self.decode_code(key, value) {
                Some(update) => updates.push(update),
                None => debug!(index = key.as_str(), "unrecognized status index, dropping"),
            }
        }
        updates
    }

    /// The matcher chain: named codes first, registry indices second.
    fn decode_code(&self, code: &str, value: &Value) -> Option<FieldUpdate> {
        match code {
            CODE_SWITCH => return decode_switch(value),
            CODE_MODE => return decode_mode(value),
            CODE_COOLDOWN => return decode_cooldown(value),
            _ => {}
        }

        if self.registry.cooldown_indices.iter().any(|i| i == code) {
            return decode_cooldown(value);
        }
        if self.registry.pump_indices.iter().any(|i| i == code) {
            return decode_pump(value);
        }
        None
    }
}

// ── Value decoders ───────────────────────────────────────────────────

fn decode_switch(value: &Value) -> Option<FieldUpdate> {
    value.as_bool().map(FieldUpdate::Switch)
}

fn decode_mode(value: &Value) -> Option<FieldUpdate> {
    value.as_str().map(|s| FieldUpdate::Mode(s.to_owned()))
}

fn decode_cooldown(value: &Value) -> Option<FieldUpdate> {
    value.as_i64().map(FieldUpdate::Cooldown)
}

fn decode_pump(value: &Value) -> Option<FieldUpdate> {
    match value {
        Value::String(s) => Some(FieldUpdate::Pump(s.clone())),
        // Some firmware reports the pump slot as a bare number.
        Value::Number(n) => Some(FieldUpdate::Pump(n.to_string())),
        _ => None,
    }
}
