//! Client errors
//!
//! Every public operation returns [`ZyncResult`]. Preflight evaluation errors
//! and a missing script host never reach this type; they are logged and the
//! affected rule (or pass) is skipped.

use zync_preflight::PreflightError;
use zync_protocol::{Endpoint, ProtocolError};

use crate::config::ConfigError;
use crate::session::TransportError;

/// Errors raised by the client
#[derive(Debug, thiserror::Error)]
pub enum ZyncError {
    /// Missing or invalid setting (job type, credentials, params)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Liveness check against the site failed
    #[error("Zync is down at URL: {url}")]
    ServiceDown { url: String },

    /// Credentials rejected or no session cookie issued
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// An endpoint answered with a non-success code
    #[error("{endpoint} failed: {message}")]
    RemoteProtocol { endpoint: Endpoint, message: String },

    /// A preflight rule blocked the submission
    #[error("{message}")]
    PreflightViolation { message: String, matches: Vec<String> },

    /// The service rejected the job
    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ZyncError {
    /// Stable label for logging
    pub fn label(&self) -> &'static str {
        match self {
            ZyncError::Configuration(_) | ZyncError::Config(_) => "configuration",
            ZyncError::ServiceDown { .. } => "service_down",
            ZyncError::Authentication(_) => "authentication",
            ZyncError::RemoteProtocol { .. } | ZyncError::Protocol(_) | ZyncError::Json(_) => {
                "remote_protocol"
            }
            ZyncError::PreflightViolation { .. } => "preflight_violation",
            ZyncError::Submission(_) => "submission",
            ZyncError::Transport(_) => "transport",
        }
    }

    /// Returns true if a preflight rule blocked the operation
    pub fn is_preflight_violation(&self) -> bool {
        matches!(self, ZyncError::PreflightViolation { .. })
    }
}

impl From<PreflightError> for ZyncError {
    fn from(error: PreflightError) -> Self {
        match error {
            PreflightError::Configuration(message) => ZyncError::Configuration(message),
            PreflightError::RemoteProtocol(message) => ZyncError::RemoteProtocol {
                endpoint: Endpoint::GetPreflightChecks,
                message,
            },
            PreflightError::Unreachable { timed_out: true, .. } => {
                ZyncError::Transport(TransportError::Timeout)
            }
            PreflightError::Unreachable { message, .. } => {
                ZyncError::Transport(TransportError::ConnectionFailed(message))
            }
            PreflightError::Violation {
                message, matches, ..
            } => ZyncError::PreflightViolation { message, matches },
        }
    }
}

/// Result type for client operations
pub type ZyncResult<T> = Result<T, ZyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_maps_to_message() {
        let error: ZyncError = PreflightError::Violation {
            rule_index: 2,
            message: "Missing plugins: mtoa".to_string(),
            matches: vec!["mtoa".to_string()],
        }
        .into();

        assert!(error.is_preflight_violation());
        assert_eq!(error.to_string(), "Missing plugins: mtoa");
        assert_eq!(error.label(), "preflight_violation");
    }

    #[test]
    fn test_rule_service_error_names_endpoint() {
        let error: ZyncError = PreflightError::RemoteProtocol("no such job type".to_string()).into();
        match &error {
            ZyncError::RemoteProtocol { endpoint, .. } => {
                assert_eq!(*endpoint, Endpoint::GetPreflightChecks)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(error.to_string().contains("lib/get_preflight_checks.php"));
    }

    #[test]
    fn test_unreachable_rule_service_is_transport() {
        let error: ZyncError = PreflightError::Unreachable {
            message: "Request timed out".to_string(),
            timed_out: true,
        }
        .into();
        assert!(matches!(error, ZyncError::Transport(TransportError::Timeout)));
        assert_eq!(error.label(), "transport");

        let error: ZyncError = PreflightError::Unreachable {
            message: "connection refused".to_string(),
            timed_out: false,
        }
        .into();
        assert!(matches!(error, ZyncError::Transport(TransportError::ConnectionFailed(ref m)) if m == "connection refused"));
    }

    #[test]
    fn test_configuration_label() {
        let error: ZyncError = PreflightError::Configuration("job type is not set".to_string()).into();
        assert_eq!(error.label(), "configuration");
    }
}
