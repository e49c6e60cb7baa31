use thiserror::Error;

/// Top-level error type for the `mysmartbike-api` crate.
///
/// Every failure the request path can produce is classified into one of
/// these variants: vendor rejection, transport, data, and lifecycle.
/// The CLI maps them into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The vendor rejected the request. Raised for a non-2xx HTTP status
    /// and for a body whose `status` field is present but not a success.
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        /// HTTP status code, when the rejection came from the HTTP layer.
        status: Option<u16>,
        /// Raw decoded response, kept for diagnostics.
        response: Option<serde_json::Value>,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, TLS, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header value from configuration could not be encoded.
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },

    /// The HTTP session could not be opened (bad proxy, TLS backend, ...).
    #[error("Failed to open HTTP session: {0}")]
    Session(String),

    /// The caller cancelled the request before it completed.
    #[error("Request cancelled")]
    Cancelled,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// `last_position_date` did not match `YYYY-MM-DD HH:MM:SS`.
    #[error("Invalid position timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl Error {
    /// Returns `true` if the vendor rejected the credentials or the request.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// The HTTP status that caused this error, if there was one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } => *status,
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Errors that `ignore_errors` is allowed to downgrade to "no response".
    ///
    /// Cancellation and local setup problems are never swallowed.
    pub(crate) fn is_ignorable(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. }
                | Self::Transport(_)
                | Self::Timeout { .. }
                | Self::Deserialization { .. }
        )
    }
}
