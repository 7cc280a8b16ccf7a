//! Authorization hand-off error types.
//!
//! `AuthError` covers every failure the hand-off can surface to a caller.
//! A missing or invalid login token is deliberately absent here: it is the
//! [`Authentication::NeedsLogin`](crate::oauth::gate::Authentication) outcome,
//! which the flow controller turns into a login redirect.

use std::error::Error as StdError;
use std::fmt;

/// Boxed underlying cause carried by infrastructure errors.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur while registering clients or handling an authorize call.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required parameter is missing or malformed.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the offending parameter.
        message: String,
    },

    /// A client with the same identifier is already registered.
    #[error("Client '{client_id}' already exists")]
    DuplicateClient {
        /// The colliding client identifier.
        client_id: String,
    },

    /// The referenced record does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Description of what was looked up.
        message: String,
    },

    /// The durable store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the failed operation.
        message: String,
        /// Underlying cause, when available.
        #[source]
        source: Option<BoxError>,
    },

    /// The authorization engine rejected the request.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a `Validation` error for a required parameter that is absent.
    #[must_use]
    pub fn missing_parameter(name: &str) -> Self {
        Self::Validation {
            message: format!("missing required parameter: {name}"),
        }
    }

    /// Creates a new `DuplicateClient` error.
    #[must_use]
    pub fn duplicate_client(client_id: impl Into<String>) -> Self {
        Self::DuplicateClient {
            client_id: client_id.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error without an underlying cause.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `Storage` error wrapping its cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new `Protocol` error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller supplied bad input (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::DuplicateClient { .. } | Self::NotFound { .. }
        )
    }

    /// Returns `true` if this is a server-side failure (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::DuplicateClient { .. } | Self::NotFound { .. } => ErrorCategory::Client,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Protocol { .. } => ErrorCategory::Protocol,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of hand-off errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request parameter validation.
    Validation,
    /// Client registry conflicts and lookups.
    Client,
    /// Durable store failures.
    Infrastructure,
    /// Authorization engine failures.
    Protocol,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Client => write!(f, "client"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Protocol => write!(f, "protocol"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::missing_parameter("redirect_uri");
        assert_eq!(
            err.to_string(),
            "Validation error: missing required parameter: redirect_uri"
        );

        let err = AuthError::duplicate_client("app-1");
        assert_eq!(err.to_string(), "Client 'app-1' already exists");

        let err = AuthError::protocol("unsupported response type: token");
        assert_eq!(
            err.to_string(),
            "Protocol error: unsupported response type: token"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(AuthError::validation("bad").is_client_error());
        assert!(AuthError::duplicate_client("x").is_client_error());
        assert!(AuthError::not_found("client x").is_client_error());

        assert!(AuthError::storage("db down").is_server_error());
        assert!(AuthError::protocol("nope").is_server_error());
        assert!(AuthError::internal("boom").is_server_error());
    }

    #[test]
    fn test_storage_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "connection reset");
        let err = AuthError::storage_with_source("failed to save session", io);

        let source = err.source().expect("source is preserved");
        assert_eq!(source.to_string(), "connection reset");
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::validation("x").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AuthError::duplicate_client("x").category(),
            ErrorCategory::Client
        );
        assert_eq!(
            AuthError::storage("x").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Protocol.to_string(), "protocol");
    }
}
