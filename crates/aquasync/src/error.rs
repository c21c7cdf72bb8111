use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] aquasync_config::ConfigError),

    #[error(transparent)]
    Core(#[from] aquasync_core::CoreError),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code: config problems are usage errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            _ => 1,
        }
    }
}
