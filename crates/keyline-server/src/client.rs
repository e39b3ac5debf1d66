// ============================================
// File: crates/keyline-server/src/client.rs
// ============================================
//! # Keyline Client
//!
//! ## Creation Reason
//! The peer side of the channel: completes the key exchange with a
//! server and issues account operations over it. Used by the `request`
//! CLI command and the integration tests.
//!
//! ## Main Functionality
//! - `Client::connect`: TCP connect plus key exchange
//! - `Client::with_transport`: same over any `FrameTransport`
//! - `request`: one sealed request, one decoded reply
//! - Typed helpers for CREATE / LOGIN / VERIFY / UPDATE
//!
//! ## ⚠️ Important Note for Next Developer
//! - The client must use the server's curve and cipher
//! - A request interrupted by a key restart fails; the channel re-keys
//!   and the caller may retry
//!
//! ## Last Modified
//! v0.1.0 - Initial client

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, info};

use keyline_common::SessionId;
use keyline_core::crypto::OsRandom;
use keyline_core::protocol::{
    CreateResult, DecodedMessage, ErrorCode, LoginResult, MessageType, UpdateResult,
    VerifyResult,
};
use keyline_core::session::{ChannelSuite, Reply, RequestHandler, SecureSession, SessionEvent};
use keyline_transport::{FrameTransport, TcpFrameTransport};

use crate::error::{Result, ServerError};

/// Default wait for the key exchange and for each reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================
// ReplyInbox
// ============================================

/// Collects decoded server messages; never answers them.
#[derive(Debug, Default)]
struct ReplyInbox {
    replies: VecDeque<DecodedMessage>,
}

impl RequestHandler for ReplyInbox {
    fn handle(&mut self, message: &DecodedMessage) -> Option<Reply> {
        self.replies.push_back(message.clone());
        None
    }
}

// ============================================
// Client
// ============================================

/// A keyed connection to a Keyline server.
pub struct Client<T = TcpFrameTransport> {
    transport: T,
    session: SecureSession<ReplyInbox>,
    timeout: Duration,
}

impl Client<TcpFrameTransport> {
    /// Connects over TCP and completes the key exchange.
    ///
    /// # Errors
    /// Connection failures, or `Timeout` if no key is agreed in time.
    pub async fn connect(
        addr: impl AsRef<str>,
        suite: &ChannelSuite,
        max_frame_len: usize,
    ) -> Result<Self> {
        let transport = TcpFrameTransport::connect(addr, max_frame_len).await?;
        Self::with_transport(transport, suite).await
    }
}

impl<T: FrameTransport> Client<T> {
    /// Completes the key exchange over an existing transport.
    ///
    /// # Errors
    /// Transport failures, or `Timeout` if no key is agreed in time.
    pub async fn with_transport(transport: T, suite: &ChannelSuite) -> Result<Self> {
        let session = SecureSession::new(
            SessionId::generate(),
            suite,
            Box::new(OsRandom),
            ReplyInbox::default(),
        );
        let mut client = Self {
            transport,
            session,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        };

        let opening = client.session.handle(SessionEvent::Opened)?;
        client.send_all(opening).await?;

        let wait = client.timeout;
        tokio::time::timeout(wait, client.pump_until_keyed())
            .await
            .map_err(|_| ServerError::timeout("key exchange"))??;

        info!(
            session_id = %client.session.id(),
            peer = ?client.transport.peer_addr(),
            "Client channel keyed"
        );
        Ok(client)
    }

    /// Changes how long each request waits for its reply.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns `true` while the channel holds a key.
    #[must_use]
    pub fn is_keyed(&self) -> bool {
        self.session.is_keyed()
    }

    /// Sends one request and waits for the next decoded message.
    ///
    /// # Errors
    /// - `Timeout` if nothing arrives in time
    /// - `ProtocolViolation` if the key exchange restarted meanwhile
    /// - `ConnectionClosed` if the server hung up
    pub async fn request(&mut self, message_type: MessageType, payload: &str) -> Result<DecodedMessage> {
        if !self.session.is_keyed() {
            let wait = self.timeout;
            tokio::time::timeout(wait, self.pump_until_keyed())
                .await
                .map_err(|_| ServerError::timeout("key exchange"))??;
        }

        let frame = self.session.seal(message_type, payload)?;
        self.transport.send_frame(&frame).await?;
        debug!(session_id = %self.session.id(), operation = %message_type, "Request sent");

        let wait = self.timeout;
        tokio::time::timeout(wait, self.pump_until_reply())
            .await
            .map_err(|_| ServerError::timeout(format!("{message_type} reply")))?
    }

    /// Registers an account; returns the result and verification key.
    ///
    /// # Errors
    /// See [`Client::request`]; also `RemoteError` for an ERROR reply.
    pub async fn create(&mut self, username: &str, password: &str) -> Result<(CreateResult, Option<String>)> {
        let reply = self.expect_reply(MessageType::Create, &format!("{username},{password}")).await?;
        let (code, key) = match reply.split_once(',') {
            Some((code, key)) => (code, Some(key.to_string())),
            None => (reply.as_str(), None),
        };
        let result = CreateResult::parse(code)
            .ok_or_else(|| ServerError::protocol_violation(format!("unknown CREATE code '{code}'")))?;
        Ok((result, key))
    }

    /// Logs in on this connection.
    ///
    /// # Errors
    /// See [`Client::create`].
    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginResult> {
        let reply = self.expect_reply(MessageType::Login, &format!("{username},{password}")).await?;
        LoginResult::parse(&reply)
            .ok_or_else(|| ServerError::protocol_violation(format!("unknown LOGIN code '{reply}'")))
    }

    /// Verifies the logged-in account.
    ///
    /// # Errors
    /// See [`Client::create`].
    pub async fn verify(&mut self, username: &str, key: &str) -> Result<VerifyResult> {
        let reply = self.expect_reply(MessageType::Verify, &format!("{username},{key}")).await?;
        VerifyResult::parse(&reply)
            .ok_or_else(|| ServerError::protocol_violation(format!("unknown VERIFY code '{reply}'")))
    }

    /// Stores profile data for the logged-in account.
    ///
    /// # Errors
    /// See [`Client::create`].
    pub async fn update(&mut self, username: &str, data: &str) -> Result<UpdateResult> {
        let reply = self.expect_reply(MessageType::Update, &format!("{username},{data}")).await?;
        UpdateResult::parse(&reply)
            .ok_or_else(|| ServerError::protocol_violation(format!("unknown UPDATE code '{reply}'")))
    }

    /// Disposes of the key and closes the transport.
    ///
    /// # Errors
    /// Transport shutdown failures.
    pub async fn close(mut self) -> Result<()> {
        self.session.handle(SessionEvent::Closed)?;
        self.transport.shutdown().await?;
        Ok(())
    }

    // ========================================
    // Internals
    // ========================================

    async fn expect_reply(&mut self, message_type: MessageType, payload: &str) -> Result<String> {
        let reply = self.request(message_type, payload).await?;
        match reply.message_type {
            t if t == message_type => Ok(reply.payload),
            MessageType::Error => Err(ServerError::remote_error(
                ErrorCode::parse(&reply.payload)
                    .map_or_else(|| reply.payload.clone(), |code| code.to_string()),
            )),
            other => Err(ServerError::protocol_violation(format!(
                "expected {message_type} reply, got {other}"
            ))),
        }
    }

    async fn pump_until_keyed(&mut self) -> Result<()> {
        while !self.session.is_keyed() {
            self.pump_one("key exchange").await?;
        }
        Ok(())
    }

    async fn pump_until_reply(&mut self) -> Result<DecodedMessage> {
        loop {
            if let Some(reply) = self.session.handler_mut().replies.pop_front() {
                return Ok(reply);
            }
            if !self.session.is_keyed() {
                return Err(ServerError::protocol_violation(
                    "key exchange restarted before the reply arrived",
                ));
            }
            self.pump_one("reply").await?;
        }
    }

    async fn pump_one(&mut self, stage: &str) -> Result<()> {
        let frame = self
            .transport
            .recv_frame()
            .await?
            .ok_or_else(|| ServerError::connection_closed(stage))?;
        let out = self.session.handle(SessionEvent::Received(&frame))?;
        self.send_all(out).await
    }

    async fn send_all(&mut self, frames: Vec<String>) -> Result<()> {
        for frame in frames {
            self.transport.send_frame(&frame).await?;
        }
        Ok(())
    }
}

impl<T> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("session_id", self.session.id())
            .field("state", &self.session.state())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
