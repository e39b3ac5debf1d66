// ============================================
// File: crates/keyline-server/src/handlers/mod.rs
// ============================================
//! # Connection Handlers
//!
//! ## Creation Reason
//! Per-connection processing: the frame loop that drives a secure
//! session over a transport, and the dispatcher that answers account
//! requests once the channel is keyed.
//!
//! ### Submodules
//! - [`connection`]: frame loop and teardown
//! - [`request`]: CREATE / LOGIN / VERIFY / UPDATE dispatch
//!
//! ## Data Flow
//! ```text
//!   transport ──frame──► SecureSession ──decoded──► AccountDispatcher
//!       ▲                     │                           │
//!       └──────frames─────────┴───────── reply ◄──────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Touch the session record on every inbound frame
//! - Teardown must run on every exit path
//!
//! ## Last Modified
//! v0.1.0 - Initial handlers structure

pub mod connection;
pub mod request;

pub use connection::ConnectionHandler;
pub use request::{AccountDispatcher, LoginContext};
