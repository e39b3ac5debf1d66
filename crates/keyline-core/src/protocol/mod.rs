// ============================================
// File: crates/keyline-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the line-oriented wire protocol: message codes, the cleartext
//! handshake frames and the encrypted frame codec.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`messages`]: message type and result codes
//! - [`handshake`]: cleartext key-share and error frames
//! - [`codec`]: encrypted frame encode/decode
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Key Exchange (cleartext)                 │
//! │                                                             │
//! │  Client ──────── "0,<x>,<y>" ──────────────────────► Server │
//! │  Client ◄─────── "0,<x>,<y>" ─────────────────────── Server │
//! │                                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Keyed Phase                              │
//! │                                                             │
//! │  Client ══════ "<len>,<iv>,<ct‖tag>" ════════════════ Server │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format Principles
//! - Frames are ASCII text; fields are separated by ','
//! - Every binary value is lowercase hex
//! - One frame per line at the transport layer
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod handshake;
pub mod messages;

// Re-export primary types
pub use codec::{DecodedMessage, SecureCodec};
pub use handshake::HandshakeFrame;
pub use messages::{
    CreateResult, ErrorCode, LoginResult, MessageType, UpdateResult, VerifyResult,
};
