// ============================================
// File: crates/keyline-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Every accepted connection gets an opaque identifier that shows up in
//! logs, in the server's session registry and in error messages.
//!
//! ## Main Functionality
//! - `SessionId`: 16 random bytes, displayed as base64
//!
//! ## ⚠️ Important Note for Next Developer
//! - SessionId is generated from the thread RNG; it is an identifier, not
//!   a secret, but it is still zeroized on drop
//! - Display/FromStr use standard base64 and must stay symmetric
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Size of SessionId in bytes
pub const SESSION_ID_SIZE: usize = 16;

// ============================================
// SessionId
// ============================================

/// Unique identifier for a connection-bound session.
///
/// # Example
/// ```
/// use keyline_common::types::SessionId;
///
/// let session_id = SessionId::generate();
/// let restored: SessionId = session_id.to_string().parse().unwrap();
/// assert_eq!(session_id, restored);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Zeroize, ZeroizeOnDrop)]
pub struct SessionId([u8; SESSION_ID_SIZE]);

impl SessionId {
    /// Creates a new `SessionId` from raw bytes.
    ///
    /// Returns `None` if `bytes` is not exactly 16 bytes long.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let id: [u8; SESSION_ID_SIZE] = bytes.try_into().ok()?;
        Some(Self(id))
    }

    /// Generates a new random `SessionId`.
    #[must_use]
    pub fn generate() -> Self {
        let mut id = [0u8; SESSION_ID_SIZE];
        rand::thread_rng().fill_bytes(&mut id);
        Self(id)
    }

    /// Returns the raw bytes of the session ID.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SESSION_ID_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 4 bytes are enough to correlate log lines
        write!(
            f,
            "SessionId({:02x}{:02x}{:02x}{:02x}...)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64.encode(self.0))
    }
}

impl FromStr for SessionId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64.decode(s)?;
        Self::from_bytes(&bytes)
            .ok_or_else(|| CommonError::invalid_length(SESSION_ID_SIZE, bytes.len()))
    }
}

impl Serialize for SessionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&BASE64.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl AsRef<[u8]> for SessionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_generate_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_id_from_bytes_length() {
        assert!(SessionId::from_bytes(&[7u8; SESSION_ID_SIZE]).is_some());
        assert!(SessionId::from_bytes(&[7u8; 15]).is_none());
        assert!(SessionId::from_bytes(&[]).is_none());
    }

    #[test]
    fn test_session_id_display_parse() {
        let id = SessionId::from_bytes(&[0xABu8; SESSION_ID_SIZE]).unwrap();
        let text = id.to_string();
        let parsed: SessionId = text.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_session_id_parse_errors() {
        assert!(matches!(
            "not base64!!".parse::<SessionId>(),
            Err(CommonError::Decoding { .. })
        ));
        // Valid base64, wrong length
        assert!(matches!(
            "AAAA".parse::<SessionId>(),
            Err(CommonError::InvalidLength { expected: 16, actual: 3 })
        ));
    }

    #[test]
    fn test_session_id_debug_truncated() {
        let id = SessionId::from_bytes(&[0x11u8; SESSION_ID_SIZE]).unwrap();
        assert_eq!(format!("{id:?}"), "SessionId(11111111...)");
    }

    #[test]
    fn test_session_id_serde_as_string() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            id: SessionId,
        }

        let wrapper = Wrapper {
            id: SessionId::generate(),
        };
        let text = toml::to_string(&wrapper).unwrap();
        assert!(text.contains(&wrapper.id.to_string()));

        let back: Wrapper = toml::from_str(&text).unwrap();
        assert_eq!(back.id, wrapper.id);
    }
}
