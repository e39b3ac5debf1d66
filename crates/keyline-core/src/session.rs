// ============================================
// File: crates/keyline-core/src/session.rs
// ============================================
//! # Secure Session State Machine
//!
//! ## Creation Reason
//! Drives one connection through the key exchange and the keyed phase.
//! The session is transport-agnostic: it consumes events and returns the
//! frames to write, so the same code runs in the server, in the client
//! and in tests.
//!
//! ## State Machine
//! ```text
//!              Opened: begin exchange, send share
//!                        │
//!                        ▼
//!   ┌──────────────► Unkeyed ◄────────────────────────┐
//!   │                    │  KEY_SHARE, derive ok,      │
//!   │   derive fails:    │  answer with own share      │ Decrypt error, off-curve
//!   │   re-send share    ▼                             │ KEY_SHARE or cleartext
//!   └──────────────── (stay)        Keyed ─────────────┘ ERROR: clear key,
//!                        └────────────► │                new scalar, send share
//!                                       │ decoded request ─► handler ─► encrypted reply
//!                                       │ cleartext KEY_SHARE (new key) ─► adopt, re-send share
//!                                       │ cleartext KEY_SHARE (same key) ─► ignore
//!                                       │ anything else ─► encrypted ERROR(BAD_REQ)
//!
//!   any state ── Closed ──► zeroize ──► Closed
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Unkeyed input that is neither KEY_SHARE nor ERROR is answered with
//!   cleartext "0,2" and never reaches the handler
//! - A failed derivation never replaces the installed key
//! - Every unkeyed input is answered with our share. A keyed peer drops
//!   a share it already knows, which is what ends the exchange
//!
//! ## Last Modified
//! v0.1.0 - Initial session state machine

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use keyline_common::SessionId;

use crate::crypto::{
    AesCbc, CbcCipher, CipherSuite, CurveCapability, CurveKind, KeyAgreement, PrivateScalar,
    RandomSource,
};
use crate::error::{CoreError, Result};
use crate::protocol::handshake::{self, HandshakeFrame};
use crate::protocol::{DecodedMessage, ErrorCode, MessageType, SecureCodec};

// ============================================
// ChannelSuite
// ============================================

/// Curve and cipher shared by every session of an endpoint.
#[derive(Debug, Clone)]
pub struct ChannelSuite {
    curve: Arc<dyn CurveCapability>,
    cipher: Arc<dyn CbcCipher>,
}

impl ChannelSuite {
    /// Creates a suite from explicit capabilities.
    #[must_use]
    pub fn new(curve: Arc<dyn CurveCapability>, cipher: Arc<dyn CbcCipher>) -> Self {
        Self { curve, cipher }
    }

    /// Creates a suite from configuration choices.
    #[must_use]
    pub fn from_kinds(curve: CurveKind, cipher: CipherSuite) -> Self {
        Self::new(curve.capability(), Arc::new(AesCbc::new(cipher)))
    }

    /// The curve capability.
    #[must_use]
    pub fn curve(&self) -> &Arc<dyn CurveCapability> {
        &self.curve
    }

    /// The cipher capability.
    #[must_use]
    pub fn cipher(&self) -> &Arc<dyn CbcCipher> {
        &self.cipher
    }
}

impl Default for ChannelSuite {
    fn default() -> Self {
        Self::from_kinds(CurveKind::default(), CipherSuite::default())
    }
}

// ============================================
// Events and Handlers
// ============================================

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No shared key; only cleartext key-exchange frames are valid.
    Unkeyed,
    /// Shared key installed; frames are encrypted.
    Keyed,
    /// Terminal; key material disposed.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unkeyed => write!(f, "unkeyed"),
            Self::Keyed => write!(f, "keyed"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent<'a> {
    /// The connection was established.
    Opened,
    /// A frame arrived (line terminator already stripped).
    Received(&'a str),
    /// The connection is going away.
    Closed,
}

/// A message to send back under the session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Message type
    pub message_type: MessageType,
    /// Payload text
    pub payload: String,
}

impl Reply {
    /// Creates a reply.
    pub fn new(message_type: MessageType, payload: impl Into<String>) -> Self {
        Self {
            message_type,
            payload: payload.into(),
        }
    }

    /// An ERROR reply carrying `code`.
    #[must_use]
    pub fn error(code: ErrorCode) -> Self {
        Self::new(MessageType::Error, code.code().to_string())
    }
}

/// Receives decoded messages in the keyed phase.
pub trait RequestHandler: Send {
    /// Handles one message, optionally producing a reply.
    fn handle(&mut self, message: &DecodedMessage) -> Option<Reply>;
}

impl<F> RequestHandler for F
where
    F: FnMut(&DecodedMessage) -> Option<Reply> + Send,
{
    fn handle(&mut self, message: &DecodedMessage) -> Option<Reply> {
        self(message)
    }
}

// ============================================
// SecureSession
// ============================================

/// One endpoint of a secure channel.
///
/// # Example
/// ```
/// use keyline_core::crypto::OsRandom;
/// use keyline_core::session::{ChannelSuite, Reply, SecureSession, SessionEvent, SessionState};
/// use keyline_core::protocol::DecodedMessage;
/// use keyline_common::SessionId;
///
/// let suite = ChannelSuite::default();
/// let echo = |m: &DecodedMessage| Some(Reply::new(m.message_type, m.payload.clone()));
/// let mut server = SecureSession::new(SessionId::generate(), &suite, Box::new(OsRandom), echo);
/// let mut client = SecureSession::new(SessionId::generate(), &suite, Box::new(OsRandom), |_: &DecodedMessage| -> Option<Reply> { None });
///
/// let to_client = server.handle(SessionEvent::Opened).unwrap();
/// let to_server = client.handle(SessionEvent::Opened).unwrap();
/// client.handle(SessionEvent::Received(&to_client[0])).unwrap();
/// server.handle(SessionEvent::Received(&to_server[0])).unwrap();
/// assert_eq!(client.state(), SessionState::Keyed);
/// assert_eq!(server.state(), SessionState::Keyed);
/// ```
pub struct SecureSession<H> {
    id: SessionId,
    state: SessionState,
    agreement: KeyAgreement,
    codec: SecureCodec,
    rng: Box<dyn RandomSource>,
    handler: H,
    rekeys: u64,
}

impl<H: RequestHandler> SecureSession<H> {
    /// Creates an unkeyed session.
    pub fn new(id: SessionId, suite: &ChannelSuite, rng: Box<dyn RandomSource>, handler: H) -> Self {
        Self {
            id,
            state: SessionState::Unkeyed,
            agreement: KeyAgreement::new(Arc::clone(&suite.curve)),
            codec: SecureCodec::new(Arc::clone(&suite.cipher)),
            rng,
            handler,
            rekeys: 0,
        }
    }

    // ========================================
    // Accessors
    // ========================================

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` in the keyed phase.
    #[must_use]
    pub fn is_keyed(&self) -> bool {
        self.state == SessionState::Keyed
    }

    /// Number of times the key exchange restarted or the peer re-keyed.
    #[must_use]
    pub const fn rekey_count(&self) -> u64 {
        self.rekeys
    }

    /// The key agreement (for inspection).
    #[must_use]
    pub const fn agreement(&self) -> &KeyAgreement {
        &self.agreement
    }

    /// The request handler.
    #[must_use]
    pub const fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutable access to the request handler.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    // ========================================
    // Event Processing
    // ========================================

    /// Feeds one event and returns the frames to write, in order.
    ///
    /// Protocol errors from the peer are answered on the wire and do not
    /// surface here.
    ///
    /// # Errors
    /// - `SessionClosed` for events after `Closed`
    /// - local crypto failures (scalar generation, cipher setup)
    pub fn handle(&mut self, event: SessionEvent<'_>) -> Result<Vec<String>> {
        match (self.state, event) {
            (SessionState::Closed, SessionEvent::Closed) => Ok(Vec::new()),
            (SessionState::Closed, _) => Err(CoreError::SessionClosed),
            (_, SessionEvent::Closed) => {
                self.close();
                Ok(Vec::new())
            }
            (SessionState::Keyed, SessionEvent::Opened) => Ok(Vec::new()),
            (SessionState::Unkeyed, SessionEvent::Opened) => {
                if !self.agreement.has_exchange() {
                    self.agreement.begin_exchange(self.rng.as_mut())?;
                }
                Ok(vec![self.share_frame()?])
            }
            (SessionState::Unkeyed, SessionEvent::Received(frame)) => self.on_unkeyed(frame),
            (SessionState::Keyed, SessionEvent::Received(frame)) => self.on_keyed(frame),
        }
    }

    /// Starts the exchange with a fixed scalar instead of a random one.
    ///
    /// # Errors
    /// Returns `SessionClosed` after close, or the curve's error.
    pub fn open_with_scalar(&mut self, scalar: PrivateScalar) -> Result<Vec<String>> {
        if self.state == SessionState::Closed {
            return Err(CoreError::SessionClosed);
        }
        self.agreement.begin_exchange_with(scalar)?;
        self.agreement.clear_shared_key();
        self.state = SessionState::Unkeyed;
        Ok(vec![self.share_frame()?])
    }

    /// Encrypts an outgoing message.
    ///
    /// # Errors
    /// `NoKey` before the handshake completes, `SessionClosed` after close.
    pub fn seal(&mut self, message_type: MessageType, payload: &str) -> Result<String> {
        if self.state == SessionState::Closed {
            return Err(CoreError::SessionClosed);
        }
        self.codec.encode(
            self.agreement.shared_key(),
            message_type,
            payload,
            self.rng.as_mut(),
        )
    }

    /// Disposes of all key material.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            self.agreement.clear();
            self.state = SessionState::Closed;
            debug!(session_id = %self.id, "Session closed");
        }
    }

    // ========================================
    // Unkeyed Phase
    // ========================================

    fn on_unkeyed(&mut self, frame: &str) -> Result<Vec<String>> {
        // A frame can arrive before Opened; our share must still go out
        if !self.agreement.has_exchange() {
            self.agreement.begin_exchange(self.rng.as_mut())?;
        }

        let mut out = Vec::new();
        match handshake::parse(frame) {
            Some(HandshakeFrame::KeyShare(share)) => {
                match self.agreement.derive_shared_key(&share.x, &share.y) {
                    Ok(()) => {
                        self.state = SessionState::Keyed;
                        info!(
                            session_id = %self.id,
                            curve = self.agreement.curve().name(),
                            "Shared key established"
                        );
                    }
                    Err(e) => {
                        warn!(session_id = %self.id, error = %e, "Rejected peer key share");
                    }
                }
            }
            Some(HandshakeFrame::Error(code)) => {
                debug!(session_id = %self.id, code = ?code, "Peer error during key exchange");
            }
            None => {
                let err = CoreError::bad_request("frame outside key exchange");
                debug!(session_id = %self.id, error = %err, "Rejected unkeyed frame");
                out.push(handshake::encode_error(ErrorCode::BadRequest));
            }
        }

        // Always answer with our share; a keyed peer drops duplicates
        out.push(self.share_frame()?);
        Ok(out)
    }

    // ========================================
    // Keyed Phase
    // ========================================

    fn on_keyed(&mut self, frame: &str) -> Result<Vec<String>> {
        if let Some(cleartext) = handshake::parse(frame) {
            return self.on_keyed_handshake(cleartext);
        }

        match self.codec.decode(self.agreement.shared_key(), frame) {
            Ok(message) => self.dispatch(&message),
            Err(e) if e.is_rekey_recoverable() => {
                warn!(session_id = %self.id, error = %e, "Frame failed authentication, restarting key exchange");
                self.restart_exchange()
            }
            Err(e) if e.is_bad_request() => {
                debug!(session_id = %self.id, error = %e, "Bad frame in keyed phase");
                Ok(vec![self.seal_reply(&Reply::error(ErrorCode::BadRequest))?])
            }
            Err(e) => Err(e),
        }
    }

    fn on_keyed_handshake(&mut self, frame: HandshakeFrame) -> Result<Vec<String>> {
        match frame {
            HandshakeFrame::KeyShare(share) => {
                match self.agreement.candidate_shared_key(&share.x, &share.y) {
                    Ok(candidate) if Some(&candidate) == self.agreement.shared_key() => {
                        debug!(session_id = %self.id, "Duplicate key share ignored");
                        Ok(Vec::new())
                    }
                    Ok(candidate) => {
                        self.agreement.install(candidate);
                        self.rekeys += 1;
                        info!(session_id = %self.id, rekeys = self.rekeys, "Peer re-keyed");
                        Ok(vec![self.share_frame()?])
                    }
                    Err(e) if e.is_rekey_recoverable() => {
                        warn!(session_id = %self.id, error = %e, "Invalid peer key share, restarting key exchange");
                        self.restart_exchange()
                    }
                    Err(e) if e.is_bad_request() => {
                        debug!(session_id = %self.id, error = %e, "Malformed key share");
                        Ok(vec![self.seal_reply(&Reply::error(ErrorCode::BadRequest))?])
                    }
                    Err(e) => Err(e),
                }
            }
            HandshakeFrame::Error(code) => {
                warn!(session_id = %self.id, code = ?code, "Peer lost the key, restarting key exchange");
                self.restart_exchange()
            }
        }
    }

    fn dispatch(&mut self, message: &DecodedMessage) -> Result<Vec<String>> {
        if message.message_type == MessageType::KeyShare {
            debug!(session_id = %self.id, "Encrypted KEY_SHARE rejected");
            return Ok(vec![self.seal_reply(&Reply::error(ErrorCode::BadRequest))?]);
        }

        match self.handler.handle(message) {
            Some(reply) => Ok(vec![self.seal_reply(&reply)?]),
            None => Ok(Vec::new()),
        }
    }

    fn restart_exchange(&mut self) -> Result<Vec<String>> {
        self.agreement.clear_shared_key();
        self.agreement.begin_exchange(self.rng.as_mut())?;
        self.state = SessionState::Unkeyed;
        self.rekeys += 1;
        Ok(vec![self.share_frame()?])
    }

    // ========================================
    // Helpers
    // ========================================

    fn share_frame(&self) -> Result<String> {
        self.agreement
            .current_share()
            .map(handshake::encode_key_share)
            .ok_or(CoreError::ExchangeNotStarted)
    }

    fn seal_reply(&mut self, reply: &Reply) -> Result<String> {
        self.codec.encode(
            self.agreement.shared_key(),
            reply.message_type,
            &reply.payload,
            self.rng.as_mut(),
        )
    }
}

impl<H> fmt::Debug for SecureSession<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("rekeys", &self.rekeys)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::ToyCurve;
    use crate::crypto::{CurvePoint, FixedRandom, KeyShare, OsRandom, SharedKey};

    type Handler = Box<dyn FnMut(&DecodedMessage) -> Option<Reply> + Send>;

    fn echo() -> Handler {
        Box::new(|m: &DecodedMessage| Some(Reply::new(m.message_type, m.payload.clone())))
    }

    fn silent() -> Handler {
        Box::new(|_: &DecodedMessage| -> Option<Reply> { None })
    }

    fn session(handler: Handler) -> SecureSession<Handler> {
        SecureSession::new(SessionId::generate(), &ChannelSuite::default(), Box::new(OsRandom), handler)
    }

    /// Delivers frames back and forth until both sides go quiet.
    fn pump(
        a: &mut SecureSession<Handler>,
        b: &mut SecureSession<Handler>,
        mut to_b: Vec<String>,
    ) -> (Vec<String>, Vec<String>) {
        let mut seen_a = Vec::new();
        let mut seen_b = Vec::new();
        for _ in 0..16 {
            if to_b.is_empty() {
                break;
            }
            let mut to_a = Vec::new();
            for frame in to_b.drain(..) {
                seen_b.push(frame.clone());
                to_a.extend(b.handle(SessionEvent::Received(&frame)).unwrap());
            }
            for frame in to_a {
                seen_a.push(frame.clone());
                to_b.extend(a.handle(SessionEvent::Received(&frame)).unwrap());
            }
        }
        (seen_a, seen_b)
    }

    fn keyed_pair() -> (SecureSession<Handler>, SecureSession<Handler>) {
        let mut client = session(silent());
        let mut server = session(echo());
        let hello = server.handle(SessionEvent::Opened).unwrap();
        let mut first = client.handle(SessionEvent::Opened).unwrap();
        for frame in &hello {
            first.extend(client.handle(SessionEvent::Received(frame)).unwrap());
        }
        pump(&mut client, &mut server, first);
        assert!(client.is_keyed());
        assert!(server.is_keyed());
        (client, server)
    }

    #[test]
    fn test_opened_sends_share() {
        let mut s = session(silent());
        let out = s.handle(SessionEvent::Opened).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("0,"));
        assert_eq!(out[0].split(',').count(), 3);
        assert_eq!(s.state(), SessionState::Unkeyed);
    }

    #[test]
    fn test_handshake_symmetry() {
        let (client, server) = keyed_pair();
        assert_eq!(client.agreement().shared_key(), server.agreement().shared_key());
    }

    #[test]
    fn test_unkeyed_request_rejected() {
        let mut s = session(echo());
        s.handle(SessionEvent::Opened).unwrap();
        let out = s.handle(SessionEvent::Received("3,alice,secret")).unwrap();
        assert_eq!(out[0], "0,2");
        assert!(out[1].starts_with("0,"));
        assert_eq!(s.state(), SessionState::Unkeyed);
    }

    #[test]
    fn test_unkeyed_error_resends_share() {
        let mut s = session(silent());
        let hello = s.handle(SessionEvent::Opened).unwrap();
        let out = s.handle(SessionEvent::Received("0,3")).unwrap();
        assert_eq!(out, hello);
    }

    #[test]
    fn test_received_before_opened_sends_share() {
        let mut server = session(silent());
        let mut client = session(silent());
        let hello = client.handle(SessionEvent::Opened).unwrap();
        let out = server.handle(SessionEvent::Received(&hello[0])).unwrap();
        assert!(server.is_keyed());
        assert_eq!(out.len(), 1);
        client.handle(SessionEvent::Received(&out[0])).unwrap();
        assert_eq!(client.agreement().shared_key(), server.agreement().shared_key());
    }

    #[test]
    fn test_invalid_share_unkeyed() {
        let mut s = session(silent());
        let hello = s.handle(SessionEvent::Opened).unwrap();
        let out = s.handle(SessionEvent::Received("0,1,1")).unwrap();
        assert_eq!(out, hello);
        assert_eq!(s.state(), SessionState::Unkeyed);
        assert!(s.agreement().shared_key().is_none());
    }

    fn open(client: &SecureSession<Handler>, frame: &str) -> DecodedMessage {
        SecureCodec::new(Arc::new(AesCbc::default()))
            .decode(client.agreement().shared_key(), frame)
            .unwrap()
    }

    #[test]
    fn test_request_dispatch() {
        let (mut client, mut server) = keyed_pair();
        let frame = client.seal(MessageType::Login, "alice,pw").unwrap();
        let out = server.handle(SessionEvent::Received(&frame)).unwrap();
        assert_eq!(out.len(), 1);

        let reply = open(&client, &out[0]);
        assert_eq!(reply.message_type, MessageType::Login);
        assert_eq!(reply.payload, "alice,pw");
    }

    #[test]
    fn test_handler_without_reply() {
        let (mut client, mut server) = keyed_pair();
        let frame = server.seal(MessageType::Verify, "0").unwrap();
        assert!(client.handle(SessionEvent::Received(&frame)).unwrap().is_empty());
        assert!(client.is_keyed());
    }

    #[test]
    fn test_encrypted_key_share_is_bad_request() {
        let (mut client, mut server) = keyed_pair();
        let frame = client.seal(MessageType::KeyShare, "aa,bb").unwrap();
        let out = server.handle(SessionEvent::Received(&frame)).unwrap();
        let decoded = open(&client, &out[0]);
        assert_eq!(decoded.message_type, MessageType::Error);
        assert_eq!(decoded.payload, "2");
        assert!(server.is_keyed());
    }

    #[test]
    fn test_keyed_malformed_is_encrypted_bad_request() {
        let (client, mut server) = keyed_pair();
        let out = server.handle(SessionEvent::Received("3,alice,pw")).unwrap();
        let decoded = open(&client, &out[0]);
        assert_eq!(decoded.message_type, MessageType::Error);
        assert_eq!(decoded.payload, "2");
        assert!(server.is_keyed());
    }

    #[test]
    fn test_decrypt_failure_restarts_exchange() {
        let (mut client, mut server) = keyed_pair();
        let old_key = server.agreement().shared_key().cloned();

        let mut frame = client.seal(MessageType::Login, "a,b").unwrap();
        // Flip one ciphertext nibble
        let last = frame.pop().unwrap();
        frame.push(if last == '0' { '1' } else { '0' });

        let out = server.handle(SessionEvent::Received(&frame)).unwrap();
        assert_eq!(server.state(), SessionState::Unkeyed);
        assert!(server.agreement().shared_key().is_none());
        assert_eq!(server.rekey_count(), 1);

        // Client adopts the new share, both converge on a fresh key
        pump(&mut server, &mut client, out);
        assert!(server.is_keyed());
        assert!(client.is_keyed());
        assert_eq!(client.agreement().shared_key(), server.agreement().shared_key());
        assert_ne!(server.agreement().shared_key().cloned(), old_key);
    }

    #[test]
    fn test_duplicate_share_ignored() {
        let (client, mut server) = keyed_pair();
        let share = client.agreement().current_share().unwrap().clone();
        let frame = handshake::encode_key_share(&share);
        assert!(server.handle(SessionEvent::Received(&frame)).unwrap().is_empty());
        assert!(server.is_keyed());
        assert_eq!(server.rekey_count(), 0);
    }

    #[test]
    fn test_keyed_off_curve_share_restarts_exchange() {
        let (mut client, mut server) = keyed_pair();
        let old_share = server.agreement().current_share().cloned();

        let out = server.handle(SessionEvent::Received("0,1,1")).unwrap();
        assert_eq!(server.state(), SessionState::Unkeyed);
        assert!(server.agreement().shared_key().is_none());
        assert_ne!(server.agreement().current_share().cloned(), old_share);
        assert_eq!(server.rekey_count(), 1);
        assert_eq!(out, vec![handshake::encode_key_share(server.agreement().current_share().unwrap())]);

        pump(&mut server, &mut client, out);
        assert!(server.is_keyed());
        assert_eq!(client.agreement().shared_key(), server.agreement().shared_key());
    }

    #[test]
    fn test_keyed_malformed_share_keeps_key() {
        let (client, mut server) = keyed_pair();
        let before = server.agreement().shared_key().cloned();
        let out = server.handle(SessionEvent::Received("0,zz,1")).unwrap();
        assert_eq!(server.agreement().shared_key().cloned(), before);
        assert!(server.is_keyed());

        let decoded = open(&client, &out[0]);
        assert_eq!(decoded.message_type, MessageType::Error);
        assert_eq!(decoded.payload, "2");
    }

    #[test]
    fn test_keyed_cleartext_error_restarts_exchange() {
        let (mut client, mut server) = keyed_pair();
        let old_share = server.agreement().current_share().cloned();

        let out = server.handle(SessionEvent::Received("0,3")).unwrap();
        assert_eq!(server.state(), SessionState::Unkeyed);
        assert!(server.agreement().shared_key().is_none());
        assert_ne!(server.agreement().current_share().cloned(), old_share);
        assert_eq!(out, vec![handshake::encode_key_share(server.agreement().current_share().unwrap())]);

        pump(&mut server, &mut client, out);
        assert!(server.is_keyed());
        assert_eq!(client.agreement().shared_key(), server.agreement().shared_key());
        assert_eq!(server.rekey_count(), 1);
        assert_eq!(client.rekey_count(), 1);
    }

    #[test]
    fn test_close_disposes_keys() {
        let (mut client, _server) = keyed_pair();
        client.handle(SessionEvent::Closed).unwrap();
        assert_eq!(client.state(), SessionState::Closed);
        assert!(client.agreement().shared_key().is_none());
        assert!(matches!(
            client.handle(SessionEvent::Received("0,2")),
            Err(CoreError::SessionClosed)
        ));
        assert!(matches!(
            client.seal(MessageType::Login, "x"),
            Err(CoreError::SessionClosed)
        ));
        // Closing twice is harmless
        assert!(client.handle(SessionEvent::Closed).unwrap().is_empty());
    }

    #[test]
    fn test_seal_requires_key() {
        let mut s = session(silent());
        s.handle(SessionEvent::Opened).unwrap();
        assert!(matches!(s.seal(MessageType::Login, "x"), Err(CoreError::NoKey)));
    }

    #[test]
    fn test_toy_curve_scalars() {
        let curve: Arc<dyn CurveCapability> = Arc::new(ToyCurve::textbook());
        let suite = ChannelSuite::new(curve, Arc::new(AesCbc::default()));
        let mut a = SecureSession::new(SessionId::generate(), &suite, Box::new(FixedRandom::new(vec![7])), silent());
        let mut b = SecureSession::new(SessionId::generate(), &suite, Box::new(FixedRandom::new(vec![11])), silent());

        let a_hello = a.handle(SessionEvent::Opened).unwrap();
        let b_hello = b.handle(SessionEvent::Opened).unwrap();
        assert_eq!(
            a.agreement().current_share(),
            Some(&KeyShare::from_point(&CurvePoint::from_u64(0, 6)))
        );
        a.handle(SessionEvent::Received(&b_hello[0])).unwrap();
        b.handle(SessionEvent::Received(&a_hello[0])).unwrap();

        let expected = SharedKey::from_point(&CurvePoint::from_u64(5, 1)).unwrap();
        assert_eq!(a.agreement().shared_key(), Some(&expected));
        assert_eq!(b.agreement().shared_key(), Some(&expected));
    }
}
