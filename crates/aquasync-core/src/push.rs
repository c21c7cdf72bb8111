// ── Push-message shapes ──
//
// The push transport itself is an external collaborator (an MQTT-like
// client object); the core only consumes decoded envelopes. Decoding is
// deliberately loose: the vendor varies the message shape between
// firmware and protocol revisions, so everything is optional and
// unknown fields are ignored.

use serde::Deserialize;
use serde_json::Value;

/// Liveness biz codes carried by presence messages. Such messages have
/// no `status` array.
pub const BIZ_ONLINE: &str = "online";
pub const BIZ_OFFLINE: &str = "offline";

/// One push message from the vendor message bus.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEnvelope {
    /// Device the message concerns; messages for other devices are
    /// dropped by the reconciler.
    #[serde(default)]
    pub dev_id: Option<String>,
    #[serde(default)]
    pub product_key: Option<String>,
    /// Lifecycle event code (`"online"` / `"offline"` among others).
    #[serde(default)]
    pub biz_code: Option<String>,
    #[serde(default)]
    pub biz_data: Option<Value>,
    /// Status entries: named `{code, value}` objects or raw
    /// capability-index keyed objects (`{"102": 5, "t": ...}`),
    /// depending on firmware.
    #[serde(default)]
    pub status: Option<Vec<Value>>,
}

impl PushEnvelope {
    /// Convenience constructor for a status message.
    pub fn status_message(dev_id: impl Into<String>, status: Vec<Value>) -> Self {
        Self {
            dev_id: Some(dev_id.into()),
            status: Some(status),
            ..Self::default()
        }
    }

    /// Convenience constructor for a liveness message.
    pub fn liveness_message(dev_id: impl Into<String>, online: bool) -> Self {
        Self {
            dev_id: Some(dev_id.into()),
            biz_code: Some(if online { BIZ_ONLINE } else { BIZ_OFFLINE }.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_a_named_status_message() {
        let raw = json!({
            "devId": "device-1",
            "productKey": "pk",
            "status": [{ "code": "switch", "value": true, "t": 1 }]
        });
        let msg: PushEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.dev_id.as_deref(), Some("device-1"));
        assert_eq!(msg.status.unwrap().len(), 1);
    }

    #[test]
    fn decodes_a_liveness_message_without_status() {
        let raw = json!({ "devId": "device-1", "bizCode": "offline", "bizData": {} });
        let msg: PushEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.biz_code.as_deref(), Some(BIZ_OFFLINE));
        assert!(msg.status.is_none());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = json!({ "devId": "device-1", "dataId": "x", "sn": 42 });
        assert!(serde_json::from_value::<PushEnvelope>(raw).is_ok());
    }
}
