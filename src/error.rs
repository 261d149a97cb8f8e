//! Top-level error type for chat fabric operations
//!
//! Module-local failures (transport, broker, client, config) each carry
//! their own `thiserror` enum; this type aggregates them for the binaries
//! and for callers that drive a whole process lifecycle.

use thiserror::Error;

/// Main error type for fabric operations
#[derive(Debug, Error)]
pub enum FabricError {
    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Broker error: {0}")]
    Broker(#[from] crate::broker::BrokerError),

    #[error("Client protocol error: {0}")]
    Client(#[from] crate::client::ClientError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl FabricError {
    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type for fabric operations
pub type FabricResult<T> = Result<T, FabricError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    #[test]
    fn test_internal_error_constructor() {
        let error = FabricError::internal("unexpected state");
        assert!(matches!(error, FabricError::Internal { .. }));
        assert_eq!(error.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_transport_error_conversion() {
        let error: FabricError = TransportError::Desynchronized.into();
        assert!(matches!(error, FabricError::Transport(_)));
        assert!(error.to_string().starts_with("Transport error"));
    }

    #[test]
    fn test_client_error_conversion() {
        let error: FabricError = crate::client::ClientError::NoChannels.into();
        assert!(matches!(error, FabricError::Client(_)));
    }
}
