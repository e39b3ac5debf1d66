// ============================================
// File: crates/keyline-server/src/services/mod.rs
// ============================================
//! # Server Services
//!
//! ## Creation Reason
//! Business logic for the Keyline server, kept apart from sockets and
//! the secure channel.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`accounts`]: account store and username/password policy
//! - [`session`]: live connection registry
//!
//! ## Service Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Service Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────────┐   ┌─────────────────────────────────┐ │
//! │  │  AccountService  │   │      SessionManager             │ │
//! │  │                  │   │  - Register connections         │ │
//! │  │  - create/login  │   │  - Track key state              │ │
//! │  │  - verify/update │   │  - Idle expiry                  │ │
//! │  └──────────────────┘   └─────────────────────────────────┘ │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Services are shared across connection tasks behind `Arc`
//! - Neither service ever sees key material
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod accounts;
pub mod session;

pub use accounts::{
    AccountError, AccountPolicy, AccountService, CreateOutcome, InMemoryAccounts,
};
pub use session::{SessionManager, SessionRecord, SessionStats, StatsSnapshot};
