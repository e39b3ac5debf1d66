// ============================================
// File: crates/keyline-server/src/handlers/request.rs
// ============================================
//! # Account Request Dispatcher
//!
//! ## Creation Reason
//! Turns decoded CREATE / LOGIN / VERIFY / UPDATE messages into account
//! service calls and result-code replies. One dispatcher lives in each
//! connection and remembers who logged in on it.
//!
//! ## Payloads
//! ```text
//! CREATE  username,password   ──► CREATE  <CreateResult>[,<verification key>]
//! LOGIN   username,password   ──► LOGIN   <LoginResult>
//! VERIFY  username,key        ──► VERIFY  <VerifyResult>
//! UPDATE  username,data       ──► UPDATE  <UpdateResult>
//! store failure               ──► ERROR   0 (DATABASE)
//! payload without ','         ──► ERROR   2 (BAD_REQ)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - VERIFY and UPDATE only act on the username logged in on this
//!   connection; anything else answers LOGIN
//! - The second field keeps any further commas
//!
//! ## Last Modified
//! v0.1.0 - Initial request dispatcher

use std::sync::Arc;

use tracing::{debug, warn};

use keyline_core::protocol::{
    DecodedMessage, ErrorCode, LoginResult, MessageType, UpdateResult, VerifyResult,
};
use keyline_core::session::{Reply, RequestHandler};

use crate::services::accounts::{AccountResult, AccountService};
use crate::services::session::SessionRecord;

// ============================================
// LoginContext
// ============================================

/// Who is logged in on a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginContext {
    username: Option<String>,
    verified: bool,
}

impl LoginContext {
    /// Logged-in username, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns `true` if logged in with a verified account.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.verified
    }

    fn is(&self, username: &str) -> bool {
        self.username.as_deref() == Some(username)
    }

    fn apply_login(&mut self, username: &str, result: LoginResult) {
        match result {
            LoginResult::Success => {
                self.username = Some(username.to_string());
                self.verified = true;
            }
            LoginResult::Verify => {
                self.username = Some(username.to_string());
                self.verified = false;
            }
            LoginResult::BadPassword | LoginResult::NoUser => *self = Self::default(),
        }
    }
}

// ============================================
// AccountDispatcher
// ============================================

/// Per-connection `RequestHandler` for account operations.
pub struct AccountDispatcher {
    accounts: Arc<dyn AccountService>,
    login: LoginContext,
    record: Option<Arc<SessionRecord>>,
}

impl AccountDispatcher {
    /// Creates a dispatcher with nobody logged in.
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountService>) -> Self {
        Self {
            accounts,
            login: LoginContext::default(),
            record: None,
        }
    }

    /// Attaches the registry record used for request counters and logs.
    #[must_use]
    pub fn with_record(mut self, record: Arc<SessionRecord>) -> Self {
        self.record = Some(record);
        self
    }

    /// Current login state.
    #[must_use]
    pub const fn login(&self) -> &LoginContext {
        &self.login
    }

    fn create(&mut self, username: &str, password: &str) -> AccountResult<String> {
        let outcome = self.accounts.create(username, password)?;
        Ok(match outcome.verification_key {
            Some(key) => format!("{},{key}", outcome.result.code()),
            None => outcome.result.code().to_string(),
        })
    }

    fn login_user(&mut self, username: &str, password: &str) -> AccountResult<LoginResult> {
        let result = self.accounts.login(username, password)?;
        self.login.apply_login(username, result);
        Ok(result)
    }

    fn verify(&mut self, username: &str, key: &str) -> AccountResult<VerifyResult> {
        if !self.login.is(username) {
            return Ok(VerifyResult::Login);
        }
        let result = self.accounts.verify(username, key)?;
        if result == VerifyResult::Success {
            self.login.verified = true;
        }
        Ok(result)
    }

    fn update(&mut self, username: &str, data: &str) -> AccountResult<UpdateResult> {
        if !self.login.is(username) {
            return Ok(UpdateResult::Login);
        }
        if !self.login.verified {
            return Ok(UpdateResult::Verify);
        }
        self.accounts.update(username, data)
    }

    fn dispatch(&mut self, message: &DecodedMessage) -> Option<Reply> {
        let message_type = message.message_type;

        if message_type == MessageType::Error {
            debug!(
                session_id = ?self.record.as_ref().map(|r| &r.id),
                payload = %message.payload,
                "Peer reported an error"
            );
            return None;
        }

        let Some((first, second)) = message.payload.split_once(',') else {
            return Some(Reply::error(ErrorCode::BadRequest));
        };

        let payload = match message_type {
            MessageType::Create => self.create(first, second),
            MessageType::Login => self.login_user(first, second).map(|r| r.code().to_string()),
            MessageType::Verify => self.verify(first, second).map(|r| r.code().to_string()),
            MessageType::Update => self.update(first, second).map(|r| r.code().to_string()),
            MessageType::Error | MessageType::KeyShare => {
                return Some(Reply::error(ErrorCode::BadRequest));
            }
        };

        match payload {
            Ok(payload) => {
                debug!(
                    session_id = ?self.record.as_ref().map(|r| &r.id),
                    operation = %message_type,
                    username = first,
                    "Account request handled"
                );
                Some(Reply::new(message_type, payload))
            }
            Err(e) => {
                warn!(
                    session_id = ?self.record.as_ref().map(|r| &r.id),
                    operation = %message_type,
                    error = %e,
                    "Account store failed"
                );
                Some(Reply::error(ErrorCode::Database))
            }
        }
    }
}

impl RequestHandler for AccountDispatcher {
    fn handle(&mut self, message: &DecodedMessage) -> Option<Reply> {
        if let Some(record) = &self.record {
            record.stats.record_request();
        }
        self.dispatch(message)
    }
}

impl std::fmt::Debug for AccountDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountDispatcher")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
