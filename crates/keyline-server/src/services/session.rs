// ============================================
// File: crates/keyline-server/src/services/session.rs
// ============================================
//! # Session Management Service
//!
//! ## Creation Reason
//! Tracks every live connection: limits, idle timeouts, key state and
//! traffic counters. The cryptographic session itself stays inside the
//! connection task; this registry only holds what other tasks need.
//!
//! ## Main Functionality
//! - `SessionRecord`: shared per-connection bookkeeping
//! - `SessionManager`: registration, lookup, expiry
//! - `SessionStats`: lock-free counters
//!
//! ## Session Lifecycle
//! ```text
//! ┌──────────┐   accept    ┌─────────┐  key agreed  ┌────────┐
//! │  (none)  │ ──────────► │ Unkeyed │ ───────────► │ Keyed  │
//! └──────────┘             └────┬────┘ ◄─────────── └───┬────┘
//!                               │       key error       │
//!                   ┌───────────┴───────────┬───────────┘
//!                   ▼                       ▼
//!               timeout               peer closed / error
//!                   │                       │
//!                   └──────────┬────────────┘
//!                              ▼
//!                         ┌────────┐
//!                         │ Closed │
//!                         └────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Sessions are stored in a DashMap for concurrent access
//! - Expiry only signals the connection task; the task owns teardown
//! - Counters are atomic for lock-free frame handling
//!
//! ## Last Modified
//! v0.1.0 - Initial session management

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::{debug, info};

use keyline_common::time::AtomicInstant;
use keyline_common::types::SessionId;
use keyline_core::SessionState;

use crate::error::{Result, ServerError};

// ============================================
// Session Statistics
// ============================================

/// Session statistics.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub frames_rx: AtomicU64,
    pub frames_tx: AtomicU64,
    pub bytes_rx: AtomicU64,
    pub bytes_tx: AtomicU64,
    pub rekeys: AtomicU64,
    pub requests: AtomicU64,
}

impl SessionStats {
    pub fn record_rx(&self, bytes: u64) {
        self.bytes_rx.fetch_add(bytes, Ordering::Relaxed);
        self.frames_rx.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tx(&self, bytes: u64) {
        self.bytes_tx.fetch_add(bytes, Ordering::Relaxed);
        self.frames_tx.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_rekeys(&self, rekeys: u64) {
        self.rekeys.store(rekeys, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_rx: self.frames_rx.load(Ordering::Relaxed),
            frames_tx: self.frames_tx.load(Ordering::Relaxed),
            bytes_rx: self.bytes_rx.load(Ordering::Relaxed),
            bytes_tx: self.bytes_tx.load(Ordering::Relaxed),
            rekeys: self.rekeys.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_rx: u64,
    pub frames_tx: u64,
    pub bytes_rx: u64,
    pub bytes_tx: u64,
    pub rekeys: u64,
    pub requests: u64,
}

// ============================================
// SessionRecord
// ============================================

/// Shared view of one connection.
pub struct SessionRecord {
    pub id: SessionId,
    pub peer: Option<SocketAddr>,
    pub created_at: Instant,
    pub last_activity: AtomicInstant,
    key_state: RwLock<SessionState>,
    closing: AtomicBool,
    close_notify: Notify,
    pub stats: SessionStats,
}

impl SessionRecord {
    #[must_use]
    pub fn new(id: SessionId, peer: Option<SocketAddr>) -> Self {
        let now = Instant::now();
        Self {
            id,
            peer,
            created_at: now,
            last_activity: AtomicInstant::from_instant(now),
            key_state: RwLock::new(SessionState::Unkeyed),
            closing: AtomicBool::new(false),
            close_notify: Notify::new(),
            stats: SessionStats::default(),
        }
    }

    #[must_use]
    pub fn key_state(&self) -> SessionState {
        *self.key_state.read()
    }

    pub fn set_key_state(&self, state: SessionState) {
        let mut current = self.key_state.write();
        if *current != state {
            debug!(session_id = %self.id, from = %*current, to = %state, "Key state changed");
            *current = state;
        }
    }

    #[must_use]
    pub fn is_keyed(&self) -> bool {
        self.key_state() == SessionState::Keyed
    }

    pub fn touch(&self) {
        self.last_activity.store(Instant::now());
    }

    #[must_use]
    pub fn idle_time(&self) -> Duration {
        self.last_activity.elapsed()
    }

    #[must_use]
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.idle_time() > timeout
    }

    /// Asks the owning connection task to shut down.
    pub fn request_close(&self) {
        self.closing.store(true, Ordering::Release);
        self.close_notify.notify_waiters();
    }

    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Resolves once `request_close` has been called.
    pub async fn closed(&self) {
        loop {
            let notified = self.close_notify.notified();
            if self.is_closing() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecord")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("key_state", &self.key_state())
            .field("idle_time", &self.idle_time())
            .field("closing", &self.is_closing())
            .finish_non_exhaustive()
    }
}

// ============================================
// Session Manager
// ============================================

/// Manages all live sessions.
pub struct SessionManager {
    sessions: DashMap<SessionId, Arc<SessionRecord>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
            idle_timeout,
        }
    }

    /// Registers a new connection.
    ///
    /// # Errors
    /// Returns `SessionLimitReached` if max sessions exceeded.
    pub fn create(&self, peer: Option<SocketAddr>) -> Result<Arc<SessionRecord>> {
        if self.sessions.len() >= self.max_sessions {
            return Err(ServerError::SessionLimitReached {
                limit: self.max_sessions,
            });
        }

        let id = SessionId::generate();
        let record = Arc::new(SessionRecord::new(id.clone(), peer));
        self.sessions.insert(id.clone(), Arc::clone(&record));

        info!(
            session_id = %id,
            peer = ?peer,
            "Session created"
        );

        Ok(record)
    }

    pub fn remove(&self, id: &SessionId) -> Option<Arc<SessionRecord>> {
        let removed = self.sessions.remove(id).map(|(_, s)| s);

        if let Some(ref record) = removed {
            let stats = record.stats.snapshot();
            info!(
                session_id = %id,
                frames_rx = stats.frames_rx,
                frames_tx = stats.frames_tx,
                requests = stats.requests,
                rekeys = stats.rekeys,
                "Session removed"
            );
        }

        removed
    }

    /// Signals the connection task and drops the record.
    pub fn close(&self, id: &SessionId) {
        if let Some(record) = self.remove(id) {
            record.request_close();
        }
    }

    /// Signals every connection task.
    pub fn close_all(&self) {
        for entry in &self.sessions {
            entry.value().request_close();
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[must_use]
    pub fn keyed_count(&self) -> usize {
        self.sessions.iter().filter(|r| r.value().is_keyed()).count()
    }

    /// Closes sessions idle for longer than the timeout.
    pub fn cleanup_expired(&self) -> Vec<SessionId> {
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(self.idle_timeout))
            .map(|entry| entry.key().clone())
            .collect();

        for id in &expired {
            debug!(session_id = %id, "Session expired");
            self.close(id);
        }

        if !expired.is_empty() {
            info!("Cleaned up {} expired sessions", expired.len());
        }

        expired
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.count())
            .field("max_sessions", &self.max_sessions)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

// ============================================
// Tests
// ============================================
