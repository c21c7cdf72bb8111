// ── Session configuration ──

use std::time::Duration;

use secrecy::SecretString;

use crate::error::CoreError;

/// Capability registry: which capability endpoints and which raw numeric
/// status indices map to the cooldown and pump fields.
///
/// The push protocol is schema-inconsistent across firmware revisions --
/// some devices report cooldown under the named `temp_set` code, others
/// under a raw capability index (`"102"` on current firmware, `"56"` on
/// older ones). The named codes are always recognized; the index sets
/// are configuration.
#[derive(Debug, Clone)]
pub struct DpRegistry {
    /// Capability endpoint name for cooldown reads/writes.
    pub cooldown_capability: String,
    /// Capability endpoint name for pump selection reads/writes.
    pub pump_capability: String,
    /// Raw status indices recognized as cooldown updates.
    pub cooldown_indices: Vec<String>,
    /// Raw status indices recognized as pump updates.
    pub pump_indices: Vec<String>,
}

impl Default for DpRegistry {
    fn default() -> Self {
        Self {
            cooldown_capability: "temp_set".into(),
            pump_capability: "pump".into(),
            cooldown_indices: vec!["102".into()],
            pump_indices: vec!["28".into()],
        }
    }
}

/// Everything one device session needs, supplied by the external config
/// layer and consumed read-only by the core. One instance per configured
/// device -- there is no process-wide registry.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Vendor device identifier.
    pub device_id: String,
    /// Cloud project client id (signing material).
    pub client_id: String,
    /// Cloud project secret (signing material).
    pub secret: SecretString,
    /// API server hostname, e.g. `openapi.tuyaeu.com`.
    pub server: String,
    /// Cloud-account username; consumed once by the external auth
    /// bootstrap collaborator, carried read-only here.
    pub username: Option<String>,
    /// Cloud-account password for the same bootstrap step.
    pub password: Option<SecretString>,
    /// Polling cadence for status/online/capability reads.
    pub poll_interval: Duration,
    /// Code-to-field mapping configuration.
    pub registry: DpRegistry,
}

impl SessionConfig {
    /// Minimal session configuration with defaults for everything the
    /// caller does not care about.
    pub fn new(
        device_id: impl Into<String>,
        client_id: impl Into<String>,
        secret: SecretString,
        server: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            client_id: client_id.into(),
            secret,
            server: server.into(),
            username: None,
            password: None,
            poll_interval: Duration::from_secs(30),
            registry: DpRegistry::default(),
        }
    }

    /// Reject configurations that cannot produce a working session.
    pub fn validate(&self) -> Result<(), CoreError> {
        use secrecy::ExposeSecret;

        if self.device_id.is_empty() {
            return Err(CoreError::Configuration { field: "device_id" });
        }
        if self.client_id.is_empty() {
            return Err(CoreError::Configuration { field: "client_id" });
        }
        if self.secret.expose_secret().is_empty() {
            return Err(CoreError::Configuration { field: "secret" });
        }
        if self.server.is_empty() {
            return Err(CoreError::Configuration { field: "server" });
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::Configuration { field: "poll_interval" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig::new("device-1", "client-1", "secret".to_string().into(), "api.example")
    }

    #[test]
    fn valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn empty_fields_are_rejected_by_name() {
        let mut missing_device = config();
        missing_device.device_id.clear();
        match missing_device.validate() {
            Err(CoreError::Configuration { field }) => assert_eq!(field, "device_id"),
            other => panic!("expected Configuration error, got {other:?}"),
        }

        let mut missing_secret = config();
        missing_secret.secret = String::new().into();
        assert!(matches!(
            missing_secret.validate(),
            Err(CoreError::Configuration { field: "secret" })
        ));
    }
}
