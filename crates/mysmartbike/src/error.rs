//! CLI error types with miette diagnostics.
//!
//! Maps API and config errors into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use mysmartbike_api::Error as ApiError;
use mysmartbike_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const DATA: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the MySmartBike API")]
    #[diagnostic(
        code(mysmartbike::connection_failed),
        help(
            "Check your network connection and proxy settings.\n\
             Try: mysmartbike -vv login"
        )
    )]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("The API returned no usable response")]
    #[diagnostic(
        code(mysmartbike::no_response),
        help("The service may be down for maintenance. Try again later.")
    )]
    NoResponse,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(mysmartbike::auth_failed),
        help(
            "Verify your e-mail and password.\n\
             Run: mysmartbike config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(mysmartbike::no_credentials),
        help(
            "Configure credentials with: mysmartbike config init\n\
             Or set MYSMARTBIKE_USERNAME and MYSMARTBIKE_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Bike '{serial}' not found")]
    #[diagnostic(
        code(mysmartbike::not_found),
        help("Run: mysmartbike bikes list to see available bikes")
    )]
    NotFound { serial: String },

    #[error("Unexpected data from the API: {message}")]
    #[diagnostic(code(mysmartbike::invalid_data))]
    InvalidData { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(mysmartbike::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(mysmartbike::config),
        help("Inspect the file with: mysmartbike config show")
    )]
    Config(Box<ConfigError>),

    // ── Timeout / interruption ───────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(mysmartbike::timeout),
        help("Increase timeout with --timeout or try again later.")
    )]
    Timeout { seconds: u64 },

    #[error("Interrupted")]
    #[diagnostic(code(mysmartbike::interrupted))]
    Interrupted,

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NoResponse => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::InvalidData { .. } => exit_code::DATA,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Interrupted => exit_code::INTERRUPTED,
            Self::Config(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }

    /// Map an API error, attributing auth failures to `profile`.
    pub fn from_api(err: ApiError, profile: &str) -> Self {
        match err {
            ApiError::Authentication { message, .. } => Self::AuthFailed {
                profile: profile.into(),
                message,
            },
            ApiError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            ApiError::Cancelled => Self::Interrupted,
            ApiError::Transport(e) => Self::ConnectionFailed {
                source: Box::new(e),
            },
            ApiError::Session(reason) => Self::ConnectionFailed {
                source: reason.into(),
            },
            ApiError::InvalidUrl(e) => Self::Validation {
                field: "base_uri".into(),
                reason: e.to_string(),
            },
            ApiError::InvalidHeader { name, reason } => Self::Validation {
                field: name.into(),
                reason,
            },
            err @ (ApiError::Deserialization { .. } | ApiError::InvalidTimestamp { .. }) => {
                Self::InvalidData {
                    message: err.to_string(),
                }
            }
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}
