// ============================================
// File: crates/keyline-transport/src/lib.rs
// ============================================
//! # Keyline Transport - Frame I/O Layer
//!
//! ## Creation Reason
//! Moves whole text frames between a Keyline client and server. The
//! session layer never sees bytes or sockets, only frames.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: `FrameTransport` / `FrameListener` abstractions
//! - [`tcp`]: newline-delimited frames over TCP
//! - [`memory`]: in-process connected pair
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              keyline-server                         │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   keyline-core         keyline-transport            │
//! │         │              You are here ◄──             │
//! │         ▼                                           │
//! │   keyline-common                                    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Frames are single lines; senders must never embed '\n'
//! - Always use traits for testability
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod memory;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use tcp::{TcpFrameListener, TcpFrameTransport};
pub use traits::{ConnectionInfo, FrameListener, FrameTransport, DEFAULT_MAX_FRAME_LEN};
