//! Error types for the EasyTL client.
//!
//! Every fallible operation in the crate returns [`EasyTLError`]. Like the
//! other error types in this crate it implements Display, Debug, Clone,
//! PartialEq, Eq, and std::error::Error.
//!
//! Per-frame stream errors never surface here: the stream consumer recovers
//! from them locally. Only transport, configuration, and API failures do.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while talking to the translation API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EasyTLError {
    /// The specific error that occurred
    pub kind: EasyTLErrorKind,
}

/// Specific EasyTL error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EasyTLErrorKind {
    /// Configuration error (file, builder, or CLI input)
    Configuration {
        /// The configuration field that was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },
    /// Network error when communicating with the API
    Network {
        /// Description of the network error
        message: String,
    },
    /// API answered with a non-success status
    Api {
        /// HTTP status code
        status_code: u16,
        /// Response body or canonical reason
        message: String,
    },
    /// Missing, expired, or rejected credentials
    Authentication {
        /// Reason for authentication failure
        reason: String,
    },
    /// Translation request failed validation
    InvalidRequest {
        /// The request field that was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },
    /// Reading the response body failed mid-stream
    Stream {
        /// Description of the streaming error
        message: String,
    },
    /// A response body could not be decoded
    Parse {
        /// Description of the parse error
        message: String,
    },
    /// Local token storage failed
    Storage {
        /// File involved
        path: PathBuf,
        /// The reason for failure
        reason: String,
    },
    /// A session task ended abnormally
    Session {
        /// Description of the failure
        reason: String,
    },
}

impl EasyTLError {
    /// Creates a new EasyTLError with the given kind.
    #[must_use]
    pub fn new(kind: EasyTLErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(EasyTLErrorKind::Configuration {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(EasyTLErrorKind::Network {
            message: message.into(),
        })
    }

    /// Creates an API error.
    #[must_use]
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(EasyTLErrorKind::Api {
            status_code,
            message: message.into(),
        })
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::new(EasyTLErrorKind::Authentication {
            reason: reason.into(),
        })
    }

    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(EasyTLErrorKind::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a stream error.
    #[must_use]
    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(EasyTLErrorKind::Stream {
            message: message.into(),
        })
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(EasyTLErrorKind::Parse {
            message: message.into(),
        })
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::new(EasyTLErrorKind::Storage {
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// Creates a session error.
    #[must_use]
    pub fn session(reason: impl Into<String>) -> Self {
        Self::new(EasyTLErrorKind::Session {
            reason: reason.into(),
        })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, EasyTLErrorKind::Configuration { .. })
    }

    /// Returns true if this is an authentication error, including HTTP 401/403.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(
            self.kind,
            EasyTLErrorKind::Authentication { .. }
                | EasyTLErrorKind::Api {
                    status_code: 401 | 403,
                    ..
                }
        )
    }

    /// Returns true if this is a transport-level failure.
    ///
    /// Transport failures end a stream session with the failure marker.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            EasyTLErrorKind::Network { .. }
                | EasyTLErrorKind::Api { .. }
                | EasyTLErrorKind::Stream { .. }
        )
    }

    /// Returns the HTTP status code if the API rejected the request.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            EasyTLErrorKind::Api { status_code, .. } => Some(status_code),
            _ => None,
        }
    }
}

impl fmt::Display for EasyTLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EasyTLErrorKind::Configuration { field, reason } => {
                write!(f, "invalid configuration for '{}': {}", field, reason)
            }
            EasyTLErrorKind::Network { message } => {
                write!(
                    f,
                    "network error communicating with translation API: {}; check network connectivity",
                    message
                )
            }
            EasyTLErrorKind::Api {
                status_code,
                message,
            } => {
                write!(f, "API error (HTTP {}): {}", status_code, message)
            }
            EasyTLErrorKind::Authentication { reason } => {
                write!(f, "authentication failed: {}; try logging in again", reason)
            }
            EasyTLErrorKind::InvalidRequest { field, reason } => {
                write!(f, "invalid translation request field '{}': {}", field, reason)
            }
            EasyTLErrorKind::Stream { message } => {
                write!(f, "streaming error: {}", message)
            }
            EasyTLErrorKind::Parse { message } => {
                write!(f, "failed to parse API response: {}", message)
            }
            EasyTLErrorKind::Storage { path, reason } => {
                write!(
                    f,
                    "failed to access '{}': {}; check permissions",
                    path.display(),
                    reason
                )
            }
            EasyTLErrorKind::Session { reason } => {
                write!(f, "translation session failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for EasyTLError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_display() {
        let error = EasyTLError::configuration("api.base_url", "relative URL without a base");

        let message = error.to_string();
        assert!(message.contains("api.base_url"));
        assert!(message.contains("relative URL"));
        assert!(error.is_configuration());
    }

    #[test]
    fn network_error_display() {
        let error = EasyTLError::network("connection refused");

        let message = error.to_string();
        assert!(message.contains("network error"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn api_error_display_includes_status() {
        let error = EasyTLError::api(502, "bad gateway");

        let message = error.to_string();
        assert!(message.contains("502"));
        assert!(message.contains("bad gateway"));
        assert_eq!(error.status_code(), Some(502));
    }

    #[test]
    fn unauthorized_status_counts_as_authentication() {
        assert!(EasyTLError::api(401, "unauthorized").is_authentication());
        assert!(EasyTLError::api(403, "forbidden").is_authentication());
        assert!(!EasyTLError::api(500, "oops").is_authentication());
        assert!(EasyTLError::authentication("token expired").is_authentication());
    }

    #[test]
    fn transport_errors() {
        assert!(EasyTLError::network("reset").is_transport());
        assert!(EasyTLError::api(500, "oops").is_transport());
        assert!(EasyTLError::stream("connection closed").is_transport());
        assert!(!EasyTLError::parse("bad json").is_transport());
        assert!(!EasyTLError::configuration("x", "y").is_transport());
    }

    #[test]
    fn storage_error_display_includes_path() {
        let error = EasyTLError::storage("/nonexistent/token", "permission denied");

        let message = error.to_string();
        assert!(message.contains("/nonexistent/token"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn status_code_is_none_for_other_errors() {
        assert_eq!(EasyTLError::network("x").status_code(), None);
    }

    #[test]
    fn errors_are_clone_and_eq() {
        let error1 = EasyTLError::session("task panicked");
        let error2 = error1.clone();
        assert_eq!(error1, error2);
        assert_ne!(error1, EasyTLError::session("other"));
    }
}
