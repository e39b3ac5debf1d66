// ============================================
// File: crates/keyline-core/src/protocol/handshake.rs
// ============================================
//! # Cleartext Handshake Frames
//!
//! ## Creation Reason
//! Before a shared key exists, only two frames may cross the wire:
//! key shares and error reports. This module emits and recognises them.
//!
//! ## Wire Format
//! ```text
//! key share:  "0," <x hex> "," <y hex>     (emitted)
//!             "1," <x hex> "," <y hex>     (accepted as well)
//! error:      "0"  |  "0," <decimal code>
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Encrypted frames never start with "0" or "1" as a whole field: their
//!   first field is the hex length of `code,payload`, which is at least 2
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake frames

use crate::crypto::KeyShare;
use crate::protocol::messages::ErrorCode;

/// A recognised cleartext frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeFrame {
    /// Peer's public share.
    KeyShare(KeyShare),
    /// Peer error report; `None` when the code is absent or unknown.
    Error(Option<ErrorCode>),
}

/// Encodes our key share.
#[must_use]
pub fn encode_key_share(share: &KeyShare) -> String {
    format!("0,{},{}", share.x, share.y)
}

/// Encodes a cleartext error.
#[must_use]
pub fn encode_error(code: ErrorCode) -> String {
    format!("0,{}", code.code())
}

/// Classifies a cleartext frame.
///
/// Returns `None` if the frame is neither a key share nor an error.
#[must_use]
pub fn parse(frame: &str) -> Option<HandshakeFrame> {
    let fields: Vec<&str> = frame.split(',').collect();
    match fields.as_slice() {
        ["0" | "1", x, y] => Some(HandshakeFrame::KeyShare(KeyShare {
            x: (*x).to_string(),
            y: (*y).to_string(),
        })),
        ["0"] => Some(HandshakeFrame::Error(None)),
        ["0", code] => Some(HandshakeFrame::Error(ErrorCode::parse(code))),
        _ => None,
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn share() -> KeyShare {
        KeyShare {
            x: "0d".into(),
            y: "0a".into(),
        }
    }

    #[test]
    fn test_key_share_frame() {
        let frame = encode_key_share(&share());
        assert_eq!(frame, "0,0d,0a");
        assert_eq!(parse(&frame), Some(HandshakeFrame::KeyShare(share())));
        assert_eq!(parse("1,0d,0a"), Some(HandshakeFrame::KeyShare(share())));
    }

    #[test]
    fn test_error_frame() {
        assert_eq!(encode_error(ErrorCode::BadRequest), "0,2");
        assert_eq!(
            parse("0,2"),
            Some(HandshakeFrame::Error(Some(ErrorCode::BadRequest)))
        );
        assert_eq!(parse("0"), Some(HandshakeFrame::Error(None)));
        assert_eq!(parse("0,77"), Some(HandshakeFrame::Error(None)));
    }

    #[test]
    fn test_other_frames() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("3,alice,pw"), None);
        assert_eq!(parse("1"), None);
        assert_eq!(parse("0,a,b,c"), None);
        assert_eq!(parse("f,00112233445566778899aabbccddeeff,00"), None);
    }
}
