// ── Wire types for the cloud API ──
//
// Envelope and payload shapes as the vendor sends them. Decoding is
// deliberately tolerant: unknown fields are ignored and optional fields
// default, because the cloud adds fields between firmware revisions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The vendor envelope wrapped around every response body.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub msg: Option<String>,
    /// Server timestamp, present on most responses.
    #[serde(default)]
    pub t: Option<i64>,
}

/// One `{code, value}` pair as used by status reports and commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeValue {
    pub code: String,
    pub value: Value,
}

impl CodeValue {
    pub fn new(code: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

/// Flatten a list of `{code, value}` pairs into a code-keyed lookup,
/// preserving first-seen order. Later duplicates overwrite earlier ones.
pub fn map_code_value(entries: &[CodeValue]) -> IndexMap<String, Value> {
    let mut result = IndexMap::with_capacity(entries.len());
    for entry in entries {
        result.insert(entry.code.clone(), entry.value.clone());
    }
    result
}

/// Payload of a successful token issuance.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Seconds until expiry, relative to issuance.
    pub expire_time: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
}

/// Device detail as returned by the device endpoint; only the liveness
/// flag is consumed here.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceDetail {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub online: bool,
}

/// One capability descriptor from the device specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub code: String,
    #[serde(default)]
    pub r#type: Option<String>,
    pub values: CapabilityValues,
}

/// Capability value constraints. Enum capabilities carry a `range`,
/// numeric ones carry `step`/`min`/`max`/`unit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValues {
    Range {
        range: Vec<String>,
    },
    Numeric {
        #[serde(default)]
        step: Option<f64>,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        unit: Option<String>,
    },
    /// Some firmware revisions send `values` as a JSON-encoded string
    /// instead of an inline object.
    Encoded(String),
}

impl CapabilityValues {
    /// Resolve the [`Encoded`](Self::Encoded) form by decoding the inner
    /// JSON string; inline forms pass through unchanged.
    pub fn decoded(&self) -> Option<CapabilityValues> {
        match self {
            Self::Encoded(raw) => {
                let inner: CapabilityValues = serde_json::from_str(raw).ok()?;
                match inner {
                    // A string that decodes to another string is garbage.
                    Self::Encoded(_) => None,
                    other => Some(other),
                }
            }
            other => Some(other.clone()),
        }
    }
}

/// The `status` section of a device specification: the ordered set of
/// capability descriptors the device reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specification {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Vec<CapabilityDescriptor>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn map_code_value_round_trip() {
        let entries = vec![
            CodeValue::new("switch", true),
            CodeValue::new("mode", "auto"),
        ];
        let mapped = map_code_value(&entries);
        assert_eq!(mapped.get("switch"), Some(&json!(true)));
        assert_eq!(mapped.get("mode"), Some(&json!("auto")));
        assert_eq!(mapped.len(), 2);
    }

    #[test]
    fn map_code_value_preserves_insertion_order() {
        let entries = vec![
            CodeValue::new("b", 1),
            CodeValue::new("a", 2),
        ];
        let mapped = map_code_value(&entries);
        let keys: Vec<&String> = mapped.keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn capability_values_inline_range() {
        let raw = json!({"range": ["auto", "manual"]});
        let values: CapabilityValues = serde_json::from_value(raw).unwrap();
        match values.decoded().unwrap() {
            CapabilityValues::Range { range } => assert_eq!(range, ["auto", "manual"]),
            other => panic!("expected Range, got {other:?}"),
        }
    }

    #[test]
    fn capability_values_encoded_string() {
        let raw = json!("{\"step\":1,\"min\":0,\"max\":86400,\"unit\":\"s\"}");
        let values: CapabilityValues = serde_json::from_value(raw).unwrap();
        match values.decoded().unwrap() {
            CapabilityValues::Numeric { min, max, .. } => {
                assert_eq!(min, Some(0.0));
                assert_eq!(max, Some(86_400.0));
            }
            other => panic!("expected Numeric, got {other:?}"),
        }
    }

    #[test]
    fn envelope_tolerates_missing_msg() {
        let raw = json!({"success": true, "result": {"online": true}, "t": 1});
        let envelope: Envelope<DeviceDetail> = serde_json::from_value(raw).unwrap();
        assert!(envelope.success);
        assert!(envelope.result.unwrap().online);
    }
}
