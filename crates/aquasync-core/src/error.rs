use thiserror::Error;

/// Top-level error type for the `aquasync-core` crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Cloud API failure, forwarded from the api crate.
    #[error(transparent)]
    Api(#[from] aquasync_api::Error),

    /// A required configuration field is missing or empty. Fatal at
    /// session bootstrap -- the engine never enters `Syncing`.
    #[error("configuration error: missing required field `{field}`")]
    Configuration { field: &'static str },

    /// The engine was asked to start twice or after being stopped.
    #[error("engine already started")]
    AlreadyStarted,
}
