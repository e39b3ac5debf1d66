// ============================================
// File: crates/keyline-server/src/handlers/connection.rs
// ============================================
//! # Connection Handler
//!
//! ## Creation Reason
//! Owns one accepted connection end to end: the transport, the
//! `SecureSession` and the registry record other tasks use to observe
//! and stop it.
//!
//! ## Frame Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  1. Opened → send our key share                             │
//! │                                                             │
//! │  2. select! {                                               │
//! │       server shutdown      → stop                           │
//! │       record.closed()      → stop (idle expiry, admin)      │
//! │       transport.recv_frame → session.handle → send frames   │
//! │     }                                                       │
//! │                                                             │
//! │  3. Teardown (every exit path)                              │
//! │     session Closed → key material wiped                     │
//! │     transport shutdown                                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Protocol errors from the peer are answered by the session and
//!   never end the loop; only transport errors and local crypto
//!   failures do
//! - The handler does not remove itself from the registry; the
//!   server does that once `run` returns
//!
//! ## Last Modified
//! v0.1.0 - Initial connection handler

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use keyline_core::crypto::OsRandom;
use keyline_core::session::{ChannelSuite, SecureSession, SessionEvent, SessionState};
use keyline_transport::FrameTransport;

use crate::error::{Result, ServerError};
use crate::handlers::request::AccountDispatcher;
use crate::services::accounts::AccountService;
use crate::services::session::SessionRecord;

/// Drives one secure session over a frame transport.
pub struct ConnectionHandler<T> {
    transport: T,
    record: Arc<SessionRecord>,
    session: SecureSession<AccountDispatcher>,
}

impl<T: FrameTransport> ConnectionHandler<T> {
    /// Creates a handler for an accepted connection.
    #[must_use]
    pub fn new(
        transport: T,
        record: Arc<SessionRecord>,
        suite: &ChannelSuite,
        accounts: Arc<dyn AccountService>,
    ) -> Self {
        let dispatcher = AccountDispatcher::new(accounts).with_record(Arc::clone(&record));
        let session = SecureSession::new(record.id.clone(), suite, Box::new(OsRandom), dispatcher);

        Self {
            transport,
            record,
            session,
        }
    }

    /// Runs the frame loop until the peer leaves, the record is closed
    /// or the server shuts down. Teardown always runs.
    ///
    /// # Errors
    /// Transport failures and local crypto failures.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let result = self.drive(&mut shutdown_rx).await;
        match result {
            Err(ServerError::Transport(ref e)) if e.is_framing_error() => {
                debug!(session_id = %self.record.id, error = %e, "Peer broke framing rules");
            }
            Err(ServerError::Transport(ref e)) if e.is_network_error() => {
                debug!(session_id = %self.record.id, error = %e, "Connection lost");
            }
            Err(ref e) => {
                warn!(session_id = %self.record.id, error = %e, "Connection ended with error");
            }
            Ok(()) => {}
        }
        self.teardown().await;
        result
    }

    async fn drive(&mut self, shutdown_rx: &mut broadcast::Receiver<()>) -> Result<()> {
        let opening = self.session.handle(SessionEvent::Opened)?;
        self.send_all(opening).await?;

        let record = Arc::clone(&self.record);

        loop {
            let frame = tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!(session_id = %record.id, "Connection stopping for server shutdown");
                    return Ok(());
                }
                () = record.closed() => {
                    debug!(session_id = %record.id, "Connection closed by registry");
                    return Ok(());
                }
                frame = self.transport.recv_frame() => frame?,
            };

            let Some(frame) = frame else {
                debug!(session_id = %record.id, "Peer closed connection");
                return Ok(());
            };

            self.on_frame(&frame).await?;
        }
    }

    async fn on_frame(&mut self, frame: &str) -> Result<()> {
        self.record.touch();
        self.record.stats.record_rx(frame.len() as u64);
        trace!(session_id = %self.record.id, len = frame.len(), "Frame received");

        let out = self.session.handle(SessionEvent::Received(frame))?;

        self.record.set_key_state(self.session.state());
        self.record.stats.set_rekeys(self.session.rekey_count());

        self.send_all(out).await
    }

    async fn send_all(&mut self, frames: Vec<String>) -> Result<()> {
        for frame in frames {
            self.transport.send_frame(&frame).await?;
            self.record.stats.record_tx(frame.len() as u64);
        }
        Ok(())
    }

    async fn teardown(&mut self) {
        // Cannot fail for the Closed event
        let _ = self.session.handle(SessionEvent::Closed);
        self.record.set_key_state(SessionState::Closed);

        if let Err(e) = self.transport.shutdown().await {
            debug!(session_id = %self.record.id, error = %e, "Transport shutdown failed");
        }
    }
}

impl<T> std::fmt::Debug for ConnectionHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("session_id", &self.record.id)
            .field("state", &self.session.state())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
