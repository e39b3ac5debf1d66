// ============================================
// File: crates/keyline-server/src/lib.rs
// ============================================
//! # Keyline Server Library
//!
//! ## Creation Reason
//! Serves account operations over the Keyline secure channel: accepts
//! connections, runs one secure session per connection and answers
//! CREATE / LOGIN / VERIFY / UPDATE requests once the channel is keyed.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: Server configuration management
//! - [`server`]: Main server orchestration
//! - [`services`]: Business logic services
//!   - [`services::session`]: Live connection registry
//!   - [`services::accounts`]: Account store and policy
//! - [`handlers`]: Connection driver and request dispatch
//! - [`client`]: Peer side of the channel
//! - [`error`]: Server-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Keyline Server                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐    │
//! │  │   Config    │────►│   Server    │────►│    Handlers     │    │
//! │  │             │     │ Orchestrator│     │ connection/req  │    │
//! │  └─────────────┘     └──────┬──────┘     └────────┬────────┘    │
//! │                             │                     │             │
//! │                   ┌─────────┴─────────┬───────────┘             │
//! │                   ▼                   ▼                         │
//! │            ┌─────────────┐     ┌─────────────┐                  │
//! │            │  Session    │     │  Account    │                  │
//! │            │  Manager    │     │  Service    │                  │
//! │            └─────────────┘     └─────────────┘                  │
//! │                                                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  keyline-core: SecureSession     keyline-transport: TCP frames  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Configuration changes require restart (no hot-reload)
//! - Graceful shutdown waits for active sessions
//! - Accounts live in memory unless another `AccountService` is given
//!
//! ## Last Modified
//! v0.1.0 - Initial server library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod services;

// Re-export primary types
pub use client::Client;
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use server::Server;
pub use services::{AccountService, InMemoryAccounts, SessionManager};
