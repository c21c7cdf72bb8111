// ── Device-state model ──

use serde::Serialize;

/// The reconciled view of the irrigation controller.
///
/// Every field starts unknown and is filled in independently as poll
/// responses and push messages arrive. Fields are never reset as a
/// group: a partial update leaves untouched fields at their last known
/// value, and `online = false` does not clear data fields -- stale but
/// present beats empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceState {
    /// Watering on/off.
    pub switch: Option<bool>,
    /// Operating mode code (vendor enum, e.g. `"auto"` / `"manual"`).
    pub mode: Option<String>,
    /// Cooldown timer setting, vendor units.
    pub cooldown: Option<i64>,
    /// Selected pump identifier.
    pub pump: Option<String>,
    /// Cloud-side liveness flag.
    pub online: Option<bool>,
}

impl DeviceState {
    /// Liveness as surfaced to collaborators: unknown counts as offline.
    pub fn is_online(&self) -> bool {
        self.online.unwrap_or(false)
    }

    /// Merge a partial update into this state. Only fields present in
    /// the delta are touched. Returns `true` if any field's value
    /// actually changed.
    pub(crate) fn merge(&mut self, delta: &StateDelta) -> bool {
        let mut changed = false;

        fn assign<T: Clone + PartialEq>(slot: &mut Option<T>, incoming: &Option<T>, changed: &mut bool) {
            if let Some(value) = incoming {
                if slot.as_ref() != Some(value) {
                    *slot = Some(value.clone());
                    *changed = true;
                }
            }
        }

        assign(&mut self.switch, &delta.switch, &mut changed);
        assign(&mut self.mode, &delta.mode, &mut changed);
        assign(&mut self.cooldown, &delta.cooldown, &mut changed);
        assign(&mut self.pump, &delta.pump, &mut changed);
        assign(&mut self.online, &delta.online, &mut changed);
        changed
    }
}

/// Field-wise partial update of [`DeviceState`]. `None` means "leave
/// the field alone".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    pub switch: Option<bool>,
    pub mode: Option<String>,
    pub cooldown: Option<i64>,
    pub pump: Option<String>,
    pub online: Option<bool>,
}

impl StateDelta {
    pub fn is_empty(&self) -> bool {
        self.switch.is_none()
            && self.mode.is_none()
            && self.cooldown.is_none()
            && self.pump.is_none()
            && self.online.is_none()
    }

    pub fn switch(value: bool) -> Self {
        Self {
            switch: Some(value),
            ..Self::default()
        }
    }

    pub fn mode(value: impl Into<String>) -> Self {
        Self {
            mode: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn cooldown(value: i64) -> Self {
        Self {
            cooldown: Some(value),
            ..Self::default()
        }
    }

    pub fn pump(value: impl Into<String>) -> Self {
        Self {
            pump: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn online(value: bool) -> Self {
        Self {
            online: Some(value),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_touches_only_present_fields() {
        let mut state = DeviceState {
            switch: Some(false),
            mode: Some("manual".into()),
            cooldown: Some(120),
            pump: None,
            online: Some(true),
        };

        let changed = state.merge(&StateDelta::switch(true));
        assert!(changed);
        assert_eq!(state.switch, Some(true));
        assert_eq!(state.mode.as_deref(), Some("manual"));
        assert_eq!(state.cooldown, Some(120));
        assert_eq!(state.online, Some(true));
    }

    #[test]
    fn merge_of_identical_value_reports_no_change() {
        let mut state = DeviceState {
            switch: Some(true),
            ..DeviceState::default()
        };
        assert!(!state.merge(&StateDelta::switch(true)));
    }

    #[test]
    fn offline_does_not_clear_data_fields() {
        let mut state = DeviceState {
            switch: Some(true),
            mode: Some("auto".into()),
            ..DeviceState::default()
        };
        state.merge(&StateDelta::online(false));
        assert_eq!(state.switch, Some(true));
        assert_eq!(state.mode.as_deref(), Some("auto"));
        assert!(!state.is_online());
    }
}
