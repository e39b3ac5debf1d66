// ============================================
// File: crates/keyline-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines the error taxonomy of the secure channel: key agreement,
//! frame codec and session state machine all report through `CoreError`.
//!
//! ## Error Categories
//! 1. **Re-key recoverable**: `NoKey`, `InvalidPeerKey`, `Decrypt`.
//!    The session drops back to the key exchange.
//! 2. **Bad request**: `Malformed`, `UnknownMessageType`, `BadRequest`.
//!    Reported to the peer as ERROR(BAD_REQ); the session survives.
//! 3. **Local failures**: key generation, encryption, derivation, misuse
//!    (`ExchangeNotStarted`, `SessionClosed`).
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include scalar or key bytes in error messages
//! - `Decrypt` deliberately carries no detail: padding and MAC failures
//!   must be indistinguishable to the peer
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use keyline_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for the secure channel.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Channel Errors
    // ========================================

    /// An operation needed the shared key before the handshake finished.
    #[error("No shared key established")]
    NoKey,

    /// The peer's public point is not on the configured curve.
    #[error("Invalid peer key: {reason}")]
    InvalidPeerKey {
        /// Why the point was rejected
        reason: String,
    },

    /// The frame does not parse.
    #[error("Malformed frame: {reason}")]
    Malformed {
        /// What's wrong with the frame
        reason: String,
    },

    /// Integrity or padding check failed (wrong key, tampering).
    #[error("Decryption failed")]
    Decrypt,

    /// The decrypted message carries a type code outside the closed set.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u64),

    /// An unkeyed frame outside the key-exchange set.
    #[error("Bad request: {reason}")]
    BadRequest {
        /// What was received
        reason: String,
    },

    // ========================================
    // Cryptographic Errors
    // ========================================

    /// Failed to generate a private scalar.
    #[error("Key generation failed: {context}")]
    KeyGeneration {
        /// What was being generated
        context: String,
    },

    /// Scalar multiplication or point handling failed.
    #[error("Key exchange failed: {reason}")]
    KeyExchange {
        /// Why key exchange failed
        reason: String,
    },

    /// Encryption operation failed.
    #[error("Encryption failed: {context}")]
    Encryption {
        /// What was being encrypted
        context: String,
    },

    /// Key derivation failed.
    #[error("Key derivation failed: {reason}")]
    KeyDerivation {
        /// Why derivation failed
        reason: String,
    },

    // ========================================
    // State Errors
    // ========================================

    /// `derive_shared_key` was called before `begin_exchange`.
    #[error("Key exchange not started")]
    ExchangeNotStarted,

    /// The session was closed and its key material disposed.
    #[error("Session is closed")]
    SessionClosed,

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `InvalidPeerKey` error.
    pub fn invalid_peer_key(reason: impl Into<String>) -> Self {
        Self::InvalidPeerKey {
            reason: reason.into(),
        }
    }

    /// Creates a `Malformed` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Creates a `BadRequest` error.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest {
            reason: reason.into(),
        }
    }

    /// Creates a `KeyGeneration` error.
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    /// Creates a `KeyExchange` error.
    pub fn key_exchange(reason: impl Into<String>) -> Self {
        Self::KeyExchange {
            reason: reason.into(),
        }
    }

    /// Creates an `Encryption` error.
    pub fn encryption(context: impl Into<String>) -> Self {
        Self::Encryption {
            context: context.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if the session recovers by re-running the key exchange.
    #[must_use]
    pub const fn is_rekey_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoKey | Self::InvalidPeerKey { .. } | Self::Decrypt
        )
    }

    /// Returns `true` if the peer should be told ERROR(BAD_REQ).
    #[must_use]
    pub const fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::UnknownMessageType(_) | Self::BadRequest { .. }
        )
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::malformed("expected 3 fields, got 2");
        assert!(err.to_string().contains("3 fields"));

        let err = CoreError::UnknownMessageType(42);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::NoKey.is_rekey_recoverable());
        assert!(CoreError::Decrypt.is_rekey_recoverable());
        assert!(CoreError::invalid_peer_key("off curve").is_rekey_recoverable());
        assert!(!CoreError::malformed("x").is_rekey_recoverable());

        assert!(CoreError::malformed("x").is_bad_request());
        assert!(CoreError::UnknownMessageType(9).is_bad_request());
        assert!(!CoreError::Decrypt.is_bad_request());
    }

    #[test]
    fn test_decrypt_has_no_detail() {
        assert_eq!(CoreError::Decrypt.to_string(), "Decryption failed");
    }

    #[test]
    fn test_common_error_conversion() {
        let common = CommonError::invalid_length(16, 3);
        let core: CoreError = common.into();
        assert!(matches!(core, CoreError::Common(_)));
    }
}
