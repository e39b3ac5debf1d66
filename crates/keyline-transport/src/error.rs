// ============================================
// File: crates/keyline-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types specific to transport layer operations:
//! socket setup, line framing and connection I/O.
//!
//! ## Error Categories
//! 1. **Network Errors**: bind/connect/send/receive failures
//! 2. **Framing Errors**: oversized or non-UTF-8 frames
//! 3. **Configuration Errors**: invalid addresses
//! 4. **Lifecycle**: shutdown, peer closed
//!
//! ## ⚠️ Important Note for Next Developer
//! - A framing error leaves the byte stream out of sync; close the
//!   connection instead of reading on
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Network Errors
    // ========================================

    /// Failed to bind to address.
    #[error("Failed to bind to {addr}: {reason}")]
    BindFailed {
        /// Address we tried to bind to
        addr: SocketAddr,
        /// Why binding failed
        reason: String,
    },

    /// Failed to connect to a remote endpoint.
    #[error("Failed to connect to {addr}: {reason}")]
    ConnectFailed {
        /// Remote address
        addr: String,
        /// Why connecting failed
        reason: String,
    },

    /// Send operation failed.
    #[error("Failed to send: {reason}")]
    SendFailed {
        /// Why send failed
        reason: String,
    },

    /// Receive operation failed.
    #[error("Failed to receive: {reason}")]
    ReceiveFailed {
        /// Why receive failed
        reason: String,
    },

    /// Address already in use.
    #[error("Address {addr} already in use")]
    AddressInUse {
        /// The address that's in use
        addr: SocketAddr,
    },

    // ========================================
    // Framing Errors
    // ========================================

    /// A frame exceeded the configured maximum.
    #[error("Frame exceeds {limit} bytes")]
    FrameTooLarge {
        /// Configured maximum frame length
        limit: usize,
    },

    /// A frame could not be represented on the wire.
    #[error("Invalid frame: {reason}")]
    InvalidFrame {
        /// What's wrong with the frame
        reason: String,
    },

    // ========================================
    // Configuration Errors
    // ========================================

    /// Invalid socket address.
    #[error("Invalid address: {addr}")]
    InvalidAddress {
        /// The invalid address string
        addr: String,
    },

    // ========================================
    // Lifecycle Errors
    // ========================================

    /// Transport is shutting down.
    #[error("Transport is shutting down")]
    ShuttingDown,

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `BindFailed` error.
    pub fn bind_failed(addr: SocketAddr, reason: impl Into<String>) -> Self {
        Self::BindFailed {
            addr,
            reason: reason.into(),
        }
    }

    /// Creates a `ConnectFailed` error.
    pub fn connect_failed(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectFailed {
            addr: addr.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidFrame` error.
    pub fn invalid_frame(reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            reason: reason.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this is a network-related error.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(
            self,
            Self::BindFailed { .. }
                | Self::ConnectFailed { .. }
                | Self::SendFailed { .. }
                | Self::ReceiveFailed { .. }
                | Self::AddressInUse { .. }
        )
    }

    /// Returns `true` if the peer violated the framing rules.
    #[must_use]
    pub const fn is_framing_error(&self) -> bool {
        matches!(self, Self::FrameTooLarge { .. } | Self::InvalidFrame { .. })
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            context: "unspecified I/O operation".into(),
            source: err,
        }
    }
}

// ============================================
// Tests
// ============================================
