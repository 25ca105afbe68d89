//! Custom error types for the common library
//!
//! This module defines the failure taxonomy shared by the gateway client,
//! the session layer and the web shell. Every remote or local failure is
//! folded into [`ClientError`] before it leaves the layer that produced it.

use thiserror::Error;

/// Message shown for any request that could not complete at the transport level
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// Custom error type for client operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// A required field was empty or out of bounds; no request was sent
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credential; requires a fresh login
    #[error("{0}")]
    Auth(String),

    /// The request could not complete
    #[error("Network error. Please try again.")]
    Network,

    /// Non-2xx response carrying a server-supplied message
    #[error("{message}")]
    Server { status: u16, message: String },

    /// A 2xx response whose body did not match the expected record
    #[error("Unexpected response from server: {0}")]
    InvalidResponse(String),

    /// The credential could not be persisted or removed
    #[error("Credential storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Whether this failure means the current credential is no longer usable
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }

    /// Whether the user can reasonably retry the same operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network | ClientError::Server { .. })
    }
}

/// Type alias for Result with ClientError
pub type ApiResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_surfaced_verbatim() {
        let err = ClientError::Server {
            status: 400,
            message: "Email already registered".to_string(),
        };
        assert_eq!(err.to_string(), "Email already registered");

        let err = ClientError::Auth("Could not validate credentials".to_string());
        assert_eq!(err.to_string(), "Could not validate credentials");
    }

    #[test]
    fn test_network_message_is_generic() {
        assert_eq!(ClientError::Network.to_string(), NETWORK_ERROR_MESSAGE);
    }

    #[test]
    fn test_classification() {
        assert!(ClientError::Auth("expired".into()).is_auth());
        assert!(!ClientError::Network.is_auth());
        assert!(ClientError::Network.is_retryable());
        assert!(!ClientError::Validation("Title is required".into()).is_retryable());
    }
}
