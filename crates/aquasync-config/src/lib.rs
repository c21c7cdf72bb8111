//! Configuration loading for aquasync.
//!
//! A single TOML file (`aquasync.toml`) plus an `AQUASYNC_*` environment
//! overlay resolve into an `aquasync_core::SessionConfig`. The file
//! lives in the platform config directory by default; CLI flags can
//! point anywhere else.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use aquasync_core::{DpRegistry, SessionConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config shape ───────────────────────────────────────────────

/// On-disk configuration for one device session.
#[derive(Debug, Deserialize, Serialize)]
pub struct FileConfig {
    /// Vendor device identifier.
    pub device_id: String,
    /// Cloud project client id.
    pub client_id: String,
    /// Cloud project secret.
    pub secret: String,
    /// API server hostname, e.g. "openapi.tuyaeu.com".
    pub server: String,

    /// Cloud-account credentials for the auth bootstrap collaborator.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Capability endpoint for cooldown reads/writes.
    #[serde(default = "default_cooldown_capability")]
    pub cooldown_capability: String,
    /// Capability endpoint for pump reads/writes.
    #[serde(default = "default_pump_capability")]
    pub pump_capability: String,
    /// Raw status indices recognized as cooldown updates (firmware-
    /// dependent: "102" on current revisions, "56" on older ones).
    #[serde(default = "default_cooldown_indices")]
    pub cooldown_indices: Vec<String>,
    /// Raw status indices recognized as pump updates.
    #[serde(default = "default_pump_indices")]
    pub pump_indices: Vec<String>,
}

fn default_poll_interval_secs() -> u64 {
    30
}
fn default_cooldown_capability() -> String {
    "temp_set".into()
}
fn default_pump_capability() -> String {
    "pump".into()
}
fn default_cooldown_indices() -> Vec<String> {
    vec!["102".into()]
}
fn default_pump_indices() -> Vec<String> {
    vec!["28".into()]
}

impl FileConfig {
    /// Translate into the core session configuration.
    pub fn into_session_config(self) -> SessionConfig {
        SessionConfig {
            device_id: self.device_id,
            client_id: self.client_id,
            secret: self.secret.into(),
            server: self.server,
            username: self.username,
            password: self.password.map(Into::into),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            registry: DpRegistry {
                cooldown_capability: self.cooldown_capability,
                pump_capability: self.pump_capability,
                cooldown_indices: self.cooldown_indices,
                pump_indices: self.pump_indices,
            },
        }
    }
}

/// Starter configuration with placeholder credentials, for
/// `aquasync config init`.
pub fn template() -> FileConfig {
    FileConfig {
        device_id: "your-device-id".into(),
        client_id: "your-iot-project-client-id".into(),
        secret: "your-iot-project-secret".into(),
        server: "openapi.tuyaeu.com".into(),
        username: None,
        password: None,
        poll_interval_secs: default_poll_interval_secs(),
        cooldown_capability: default_cooldown_capability(),
        pump_capability: default_pump_capability(),
        cooldown_indices: default_cooldown_indices(),
        pump_indices: default_pump_indices(),
    }
}

/// Render a config as pretty TOML.
pub fn to_toml(config: &FileConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

// ── Loading ─────────────────────────────────────────────────────────

/// Default config file location: `{platform config dir}/aquasync/aquasync.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "aquasync").map(|dirs| dirs.config_dir().join("aquasync.toml"))
}

/// Load configuration from the given file (or the default location),
/// with `AQUASYNC_*` environment variables taking precedence.
///
/// The file may be absent as long as the environment provides every
/// required field.
pub fn load(path: Option<&Path>) -> Result<SessionConfig, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(default_config_path)
        .unwrap_or_else(|| PathBuf::from("aquasync.toml"));

    let file_config: FileConfig = Figment::new()
        .merge(Toml::file(&path))
        .merge(Env::prefixed("AQUASYNC_"))
        .extract()?;

    Ok(file_config.into_session_config())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_values_load_with_defaults_applied() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "aquasync.toml",
                r#"
                    device_id = "device-1"
                    client_id = "client-1"
                    secret = "shhh"
                    server = "openapi.tuyaeu.com"
                "#,
            )?;

            let config = load(Some(Path::new("aquasync.toml"))).unwrap();
            assert_eq!(config.device_id, "device-1");
            assert_eq!(config.server, "openapi.tuyaeu.com");
            assert_eq!(config.poll_interval, Duration::from_secs(30));
            assert_eq!(config.registry.cooldown_capability, "temp_set");
            assert_eq!(config.registry.cooldown_indices, vec!["102".to_owned()]);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "aquasync.toml",
                r#"
                    device_id = "device-1"
                    client_id = "client-1"
                    secret = "shhh"
                    server = "openapi.tuyaeu.com"
                    poll_interval_secs = 60
                "#,
            )?;
            jail.set_env("AQUASYNC_SERVER", "openapi.tuyaus.com");
            jail.set_env("AQUASYNC_POLL_INTERVAL_SECS", "15");

            let config = load(Some(Path::new("aquasync.toml"))).unwrap();
            assert_eq!(config.server, "openapi.tuyaus.com");
            assert_eq!(config.poll_interval, Duration::from_secs(15));
            Ok(())
        });
    }

    #[test]
    fn custom_registry_indices_are_honored() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "aquasync.toml",
                r#"
                    device_id = "device-1"
                    client_id = "client-1"
                    secret = "shhh"
                    server = "openapi.tuyaeu.com"
                    cooldown_indices = ["56"]
                "#,
            )?;

            let config = load(Some(Path::new("aquasync.toml"))).unwrap();
            assert_eq!(config.registry.cooldown_indices, vec!["56".to_owned()]);
            Ok(())
        });
    }

    #[test]
    fn template_renders_and_reloads() {
        let rendered = to_toml(&template()).unwrap();
        let parsed: FileConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.server, "openapi.tuyaeu.com");
        assert_eq!(parsed.poll_interval_secs, 30);
    }

    #[test]
    fn missing_required_fields_fail() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("aquasync.toml", r#"device_id = "device-1""#)?;
            assert!(load(Some(Path::new("aquasync.toml"))).is_err());
            Ok(())
        });
    }
}
