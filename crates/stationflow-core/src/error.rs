// ── Core error types ──
//
// User-facing errors from stationflow-core. Consumers never see HTTP
// status codes or JSON parse failures directly; the
// `From<stationflow_api::Error>` impl translates transport-layer errors
// into domain variants.

use thiserror::Error;

use crate::model::StationId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired -- sign in again")]
    SessionExpired,

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Station not found: {id}")]
    StationNotFound { id: StationId },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Invalid station record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Sign in required to {action}")]
    NotSignedIn { action: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Rejected by backend: {message}")]
    Rejected { message: String },

    #[error("Routing failed: {message}")]
    RoutingFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<stationflow_api::Error> for CoreError {
    fn from(err: stationflow_api::Error) -> Self {
        use stationflow_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::AuthenticationFailed { message },
            Api::Unauthorized => CoreError::SessionExpired,
            Api::Forbidden { message } => CoreError::PermissionDenied { message },
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::Api { status: 404, message } => CoreError::NotFound { message },
            Api::Api {
                status: 400 | 409 | 422 | 429,
                message,
            } => CoreError::Rejected { message },
            Api::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            Api::PushConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("push channel: {reason}"),
            },
            Api::Routing { message } => CoreError::RoutingFailed { message },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_statuses_map_to_domain_variants() {
        let not_found: CoreError = stationflow_api::Error::Api {
            status: 404,
            message: "Station not found".into(),
        }
        .into();
        assert!(matches!(not_found, CoreError::NotFound { .. }));

        let limited: CoreError = stationflow_api::Error::Api {
            status: 429,
            message: "Daily limit reached".into(),
        }
        .into();
        assert!(matches!(limited, CoreError::Rejected { ref message } if message == "Daily limit reached"));

        let expired: CoreError = stationflow_api::Error::Unauthorized.into();
        assert!(expired.is_session_expired());
    }
}
