// ============================================
// File: crates/keyline-common/src/lib.rs
// ============================================
//! # Keyline Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Provides foundational types shared by every Keyline crate so that
//! connection identifiers, timestamps and base errors look the same
//! everywhere.
//!
//! ## Main Functionality
//! - [`types`]: `SessionId` connection identifier
//! - [`time`]: `AtomicInstant` for lock-free activity tracking
//! - [`error`]: Common error type and result alias
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              keyline-server                         │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   keyline-core         keyline-transport            │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             keyline-common  ◄── You are here        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is a leaf: no internal dependencies
//! - Security-sensitive types must implement Zeroize
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use time::AtomicInstant;
pub use types::SessionId;
