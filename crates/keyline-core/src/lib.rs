// ============================================
// File: crates/keyline-core/src/lib.rs
// ============================================
//! # Keyline Core - Secure Channel Library
//!
//! ## Creation Reason
//! Provides the key agreement, frame codec and session state machine of
//! the Keyline secure channel. Both the server and the client drive their
//! connections through this crate.
//!
//! ## Main Functionality
//!
//! ### Crypto Module ([`crypto`])
//! - Curve capability (secp256k1, P-256, toy curve)
//! - Block cipher capability (AES-CBC)
//! - Random source capability (OS, fixed)
//! - ECDH key agreement and shared key derivation
//!
//! ### Protocol Module ([`protocol`])
//! - Message type and result codes
//! - Cleartext key-exchange frames
//! - Encrypted frame codec
//!
//! ### Session Module ([`session`])
//! - `SecureSession`: Unkeyed / Keyed / Closed state machine
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              keyline-server                         │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   keyline-core          keyline-transport           │
//! │   You are here              │                       │
//! │         │                   │                       │
//! │         └──────────┬────────┘                       │
//! │                    ▼                                │
//! │             keyline-common                          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Guarantees
//! - **Confidentiality**: AES-CBC with a fresh random IV per frame
//! - **Integrity**: HMAC-SHA256 over length, IV and ciphertext
//! - **Key validation**: peer points are checked against the curve
//!   before any key is installed
//!
//! ## ⚠️ Important Note for Next Developer
//! - Production curves and ciphers use audited RustCrypto implementations
//! - ALL secret types MUST implement Zeroize for secure cleanup
//! - The frame format is shared with existing clients; keep it stable
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod protocol;
pub mod session;

// Re-export commonly used items
pub use crypto::{CipherSuite, CurveKind, KeyAgreement, KeyShare, SharedKey};
pub use error::{CoreError, Result};
pub use protocol::{DecodedMessage, ErrorCode, MessageType, SecureCodec};
pub use session::{
    ChannelSuite, Reply, RequestHandler, SecureSession, SessionEvent, SessionState,
};
