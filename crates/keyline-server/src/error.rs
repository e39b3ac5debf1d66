// ============================================
// File: crates/keyline-server/src/error.rs
// ============================================
//! # Server Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use keyline_core::error::CoreError;
use keyline_transport::error::TransportError;

use crate::services::accounts::AccountError;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// Path that was read
        path: String,
        /// Read or parse failure
        reason: String,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Dotted name of the offending field
        field: String,
        /// What's wrong with it
        reason: String,
    },

    /// The registry is full; the connection is refused.
    #[error("Session limit reached: max {limit} sessions")]
    SessionLimitReached {
        /// Configured maximum
        limit: usize,
    },

    /// The server sent something the client cannot interpret.
    #[error("Peer violated the protocol: {reason}")]
    ProtocolViolation {
        /// What was unexpected
        reason: String,
    },

    /// The transport reached end of stream.
    #[error("Connection closed before {stage}")]
    ConnectionClosed {
        /// What the client was waiting for
        stage: String,
    },

    /// No reply within the client's timeout.
    #[error("Timed out waiting for {operation}")]
    Timeout {
        /// What the client was waiting for
        operation: String,
    },

    /// The server answered a request with an ERROR message.
    #[error("Server replied with error {code}")]
    RemoteError {
        /// Error code name, or the raw payload if unknown
        code: String,
    },

    /// Account store failure.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Secure channel failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ServerError {
    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ProtocolViolation` error.
    pub fn protocol_violation(reason: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            reason: reason.into(),
        }
    }

    /// Creates a `ConnectionClosed` error.
    pub fn connection_closed(stage: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            stage: stage.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Creates a `RemoteError` error.
    pub fn remote_error(code: impl Into<String>) -> Self {
        Self::RemoteError {
            code: code.into(),
        }
    }

    /// Returns `true` for configuration problems.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns `true` if the session registry refused the connection.
    #[must_use]
    pub const fn is_session_error(&self) -> bool {
        matches!(self, Self::SessionLimitReached { .. })
    }
}
