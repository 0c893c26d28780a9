//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable process exit code.

use miette::Diagnostic;
use thiserror::Error;

use stationflow_config::ConfigError;
use stationflow_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the backend at {url}")]
    #[diagnostic(
        code(stationflow::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Self-signed certificate? Try --insecure (-k)."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(stationflow::timeout),
        help("Increase the timeout with --timeout or check the backend.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(stationflow::auth_failed),
        help("Check the username and password, then run: stationflow auth login")
    )]
    AuthFailed { message: String },

    #[error("Your session has expired")]
    #[diagnostic(
        code(stationflow::session_expired),
        help("Sign in again with: stationflow auth login")
    )]
    SessionExpired,

    #[error("Sign in required to {action}")]
    #[diagnostic(
        code(stationflow::not_signed_in),
        help("Run: stationflow auth login")
    )]
    NotSignedIn { action: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(stationflow::no_credentials),
        help(
            "Pass --username, set STATIONFLOW_USERNAME and STATIONFLOW_PASSWORD,\n\
             or run: stationflow config set-password"
        )
    )]
    NoCredentials { profile: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(code(stationflow::permission_denied))]
    PermissionDenied { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(stationflow::not_found),
        help("Run: stationflow {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Not found: {message}")]
    #[diagnostic(code(stationflow::not_found))]
    Missing { message: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Rejected by the backend: {message}")]
    #[diagnostic(code(stationflow::rejected))]
    Rejected { message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(stationflow::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(stationflow::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(stationflow::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: stationflow config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(stationflow::no_config),
        help(
            "Create a profile with: stationflow config init\n\
             or pass --api-url. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(stationflow::config))]
    Config { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(stationflow::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    #[diagnostic(code(stationflow::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. }
            | Self::SessionExpired
            | Self::NotSignedIn { .. }
            | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } | Self::Missing { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::SessionExpired => Self::SessionExpired,
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::StationNotFound { id } => Self::NotFound {
                resource_type: "station".into(),
                identifier: id.to_string(),
                list_command: "stations list".into(),
            },
            CoreError::NotFound { message } => Self::Missing { message },
            CoreError::InvalidRecord { id, reason } => Self::ApiError {
                message: format!("station {id} is malformed: {reason}"),
                status: None,
            },
            CoreError::ValidationFailed { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::NotSignedIn { action } => Self::NotSignedIn { action },
            CoreError::PermissionDenied { message } => Self::PermissionDenied { message },
            CoreError::Rejected { message } => Self::Rejected { message },
            CoreError::RoutingFailed { message } => Self::ApiError {
                message: format!("routing: {message}"),
                status: None,
            },
            CoreError::Api { message, status } => Self::ApiError { message, status },
            CoreError::Config { message } => Self::Config { message },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
