use thiserror::Error;

/// Top-level error type for the `aquasync-api` crate.
///
/// Covers every failure mode of the signed cloud API surface: transport,
/// non-2xx HTTP responses, vendor envelope failures, and token issuance.
/// `aquasync-core` maps these into its own error type for callers.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-2xx HTTP status from the cloud endpoint.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Signing material produced an invalid header value.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    // ── Vendor envelope ─────────────────────────────────────────────
    /// The envelope arrived with `success: false`.
    #[error("API error: {message}")]
    Api { message: String },

    /// Token issuance failed -- fatal for that refresh attempt only.
    #[error("Token issuance failed: {message}")]
    Token { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on the
    /// next poll tick (never retried inline).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` for failures reported by the vendor envelope rather
    /// than the transport.
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::Token { .. })
    }
}
