//! End-to-end handshake tests: two sessions wired back to back.

use std::collections::VecDeque;
use std::sync::Arc;

use keyline_common::SessionId;
use keyline_core::crypto::curve::{NistP256, Secp256k1, ToyCurve};
use keyline_core::crypto::{
    AesCbc, CipherSuite, CurveCapability, CurvePoint, FixedRandom, KeyShare, OsRandom,
    RandomSource, SharedKey,
};
use keyline_core::{
    ChannelSuite, DecodedMessage, MessageType, Reply, SecureSession, SessionEvent, SessionState,
};

type Handler = Box<dyn FnMut(&DecodedMessage) -> Option<Reply> + Send>;

fn upper_echo() -> Handler {
    Box::new(|m: &DecodedMessage| Some(Reply::new(m.message_type, m.payload.to_uppercase())))
}

fn silent() -> Handler {
    Box::new(|_: &DecodedMessage| -> Option<Reply> { None })
}

fn endpoint(suite: &ChannelSuite, rng: Box<dyn RandomSource>, handler: Handler) -> SecureSession<Handler> {
    SecureSession::new(SessionId::generate(), suite, rng, handler)
}

/// Runs both sessions until no frames are in flight.
fn converge(a: &mut SecureSession<Handler>, b: &mut SecureSession<Handler>) {
    let mut to_a: VecDeque<String> = b.handle(SessionEvent::Opened).unwrap().into();
    let mut to_b: VecDeque<String> = a.handle(SessionEvent::Opened).unwrap().into();

    for _ in 0..64 {
        if to_a.is_empty() && to_b.is_empty() {
            return;
        }
        if let Some(frame) = to_b.pop_front() {
            to_a.extend(b.handle(SessionEvent::Received(&frame)).unwrap());
        }
        if let Some(frame) = to_a.pop_front() {
            to_b.extend(a.handle(SessionEvent::Received(&frame)).unwrap());
        }
    }
    panic!("sessions did not converge");
}

#[test]
fn test_toy_curve_scalars_7_and_11() {
    let curve: Arc<dyn CurveCapability> = Arc::new(ToyCurve::textbook());
    let suite = ChannelSuite::new(curve, Arc::new(AesCbc::default()));
    let mut a = endpoint(&suite, Box::new(FixedRandom::new(vec![7])), silent());
    let mut b = endpoint(&suite, Box::new(FixedRandom::new(vec![11])), upper_echo());

    converge(&mut a, &mut b);

    assert_eq!(
        a.agreement().current_share(),
        Some(&KeyShare::from_point(&CurvePoint::from_u64(0, 6)))
    );
    assert_eq!(
        b.agreement().current_share(),
        Some(&KeyShare::from_point(&CurvePoint::from_u64(13, 10)))
    );

    // 7 · 11 = 77 ≡ 1 (mod 19), so the shared point is G itself
    let expected = SharedKey::from_point(&CurvePoint::from_u64(5, 1)).unwrap();
    assert_eq!(a.agreement().shared_key(), Some(&expected));
    assert_eq!(b.agreement().shared_key(), Some(&expected));
}

fn request_roundtrip(suite: &ChannelSuite) {
    let mut client = endpoint(suite, Box::new(OsRandom), silent());
    let mut server = endpoint(suite, Box::new(OsRandom), upper_echo());
    converge(&mut client, &mut server);
    assert_eq!(client.state(), SessionState::Keyed);
    assert_eq!(server.state(), SessionState::Keyed);

    let request = client.seal(MessageType::Update, "bio,hello").unwrap();
    let replies = server.handle(SessionEvent::Received(&request)).unwrap();
    assert_eq!(replies.len(), 1);

    let decoded = keyline_core::SecureCodec::new(Arc::clone(suite.cipher()))
        .decode(client.agreement().shared_key(), &replies[0])
        .unwrap();
    assert_eq!(decoded.message_type, MessageType::Update);
    assert_eq!(decoded.payload, "BIO,HELLO");
}

#[test]
fn test_secp256k1_aes128() {
    request_roundtrip(&ChannelSuite::new(Arc::new(Secp256k1), Arc::new(AesCbc::default())));
}

#[test]
fn test_p256_aes256() {
    request_roundtrip(&ChannelSuite::new(
        Arc::new(NistP256),
        Arc::new(AesCbc::new(CipherSuite::Aes256Cbc)),
    ));
}

#[test]
fn test_toy_curve_full_channel() {
    let curve: Arc<dyn CurveCapability> = Arc::new(ToyCurve::textbook());
    request_roundtrip(&ChannelSuite::new(curve, Arc::new(AesCbc::default())));
}

#[test]
fn test_mismatched_curves_never_key() {
    // A P-256 point is not on secp256k1 and vice versa
    let k1 = ChannelSuite::new(Arc::new(Secp256k1), Arc::new(AesCbc::default()));
    let p256 = ChannelSuite::new(Arc::new(NistP256), Arc::new(AesCbc::default()));
    let mut a = endpoint(&k1, Box::new(OsRandom), silent());
    let mut b = endpoint(&p256, Box::new(OsRandom), silent());

    let a_hello = a.handle(SessionEvent::Opened).unwrap();
    let b_hello = b.handle(SessionEvent::Opened).unwrap();
    let a_out = a.handle(SessionEvent::Received(&b_hello[0])).unwrap();
    let b_out = b.handle(SessionEvent::Received(&a_hello[0])).unwrap();

    assert_eq!(a.state(), SessionState::Unkeyed);
    assert_eq!(b.state(), SessionState::Unkeyed);
    // Each side answers with its own share again
    assert_eq!(a_out, a_hello);
    assert_eq!(b_out, b_hello);
}

#[test]
fn test_peer_restart_converges() {
    let suite = ChannelSuite::default();
    let mut client = endpoint(&suite, Box::new(OsRandom), silent());
    let mut server = endpoint(&suite, Box::new(OsRandom), upper_echo());
    converge(&mut client, &mut server);
    let first_key = server.agreement().shared_key().cloned();

    // Client forgets everything and reconnects on the same server session
    let mut client = endpoint(&suite, Box::new(OsRandom), silent());
    let hello = client.handle(SessionEvent::Opened).unwrap();
    let back = server.handle(SessionEvent::Received(&hello[0])).unwrap();
    for frame in &back {
        client.handle(SessionEvent::Received(frame)).unwrap();
    }

    assert!(client.is_keyed());
    assert_eq!(client.agreement().shared_key(), server.agreement().shared_key());
    assert_ne!(server.agreement().shared_key().cloned(), first_key);
    assert_eq!(server.rekey_count(), 1);
}
