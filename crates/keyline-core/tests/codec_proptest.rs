//! Randomized property tests for the secure frame codec.
//!
//! Uses proptest to check that frames round-trip, that every frame gets a
//! fresh IV and that damaged frames are always rejected.

use std::collections::HashSet;
use std::sync::Arc;

use keyline_core::crypto::{AesCbc, CipherSuite, CurvePoint, OsRandom, SharedKey};
use keyline_core::{CoreError, MessageType, SecureCodec};
use proptest::prelude::*;

fn key() -> SharedKey {
    SharedKey::from_point(&CurvePoint::from_u64(0x1234_5678, 0x9abc_def0)).unwrap()
}

fn codec(suite: CipherSuite) -> SecureCodec {
    SecureCodec::new(Arc::new(AesCbc::new(suite)))
}

fn message_type() -> impl Strategy<Value = MessageType> {
    (0u64..=5).prop_map(|code| MessageType::from_code(code).unwrap())
}

fn suite() -> impl Strategy<Value = CipherSuite> {
    prop_oneof![Just(CipherSuite::Aes128Cbc), Just(CipherSuite::Aes256Cbc)]
}

/// Flips one of the low seven bits so the frame stays ASCII.
fn flip(frame: &str, index: usize, bit: u8) -> String {
    let mut bytes = frame.as_bytes().to_vec();
    bytes[index] ^= 1 << bit;
    String::from_utf8(bytes).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip(
        suite in suite(),
        message_type in message_type(),
        payload in "[ -~]{0,200}",
    ) {
        let key = key();
        let codec = codec(suite);
        let frame = codec.encode(Some(&key), message_type, &payload, &mut OsRandom).unwrap();
        let decoded = codec.decode(Some(&key), &frame).unwrap();
        prop_assert_eq!(decoded.message_type, message_type);
        prop_assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn prop_frames_are_lowercase_hex_fields(payload in "[ -~]{0,64}") {
        let frame = codec(CipherSuite::Aes128Cbc)
            .encode(Some(&key()), MessageType::Update, &payload, &mut OsRandom)
            .unwrap();
        let fields: Vec<&str> = frame.split(',').collect();
        prop_assert_eq!(fields.len(), 3);
        for field in fields {
            prop_assert!(field.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn prop_truncation_rejected(payload in "[ -~]{0,80}", cut in any::<prop::sample::Index>()) {
        let key = key();
        let codec = codec(CipherSuite::Aes128Cbc);
        let frame = codec.encode(Some(&key), MessageType::Login, &payload, &mut OsRandom).unwrap();
        let truncated = &frame[..cut.index(frame.len())];

        let result = codec.decode(Some(&key), truncated);
        prop_assert!(
            matches!(result, Err(CoreError::Malformed { .. } | CoreError::Decrypt)),
            "truncated frame decoded as {:?}",
            result
        );
    }

    #[test]
    fn prop_bit_flip_rejected(
        payload in "[ -~]{0,80}",
        at in any::<prop::sample::Index>(),
        bit in 0u8..7,
    ) {
        let key = key();
        let codec = codec(CipherSuite::Aes128Cbc);
        let frame = codec.encode(Some(&key), MessageType::Create, &payload, &mut OsRandom).unwrap();
        let damaged = flip(&frame, at.index(frame.len()), bit);

        match codec.decode(Some(&key), &damaged) {
            Err(CoreError::Malformed { .. } | CoreError::Decrypt) => {}
            // Hex is case-insensitive: 'a' -> 'A' still names the same byte
            Ok(decoded) => {
                prop_assert_eq!(damaged.to_ascii_lowercase(), frame);
                prop_assert_eq!(decoded.payload, payload);
            }
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }

    #[test]
    fn prop_wrong_key_rejected(payload in "[ -~]{0,80}", y in 1u64..u64::MAX) {
        let key = key();
        let other = SharedKey::from_point(&CurvePoint::from_u64(0x1234_5678, y)).unwrap();
        prop_assume!(other != key);

        let codec = codec(CipherSuite::Aes128Cbc);
        let frame = codec.encode(Some(&key), MessageType::Verify, &payload, &mut OsRandom).unwrap();
        prop_assert!(matches!(codec.decode(Some(&other), &frame), Err(CoreError::Decrypt)));
    }
}

#[test]
fn test_iv_never_repeats() {
    let key = key();
    let codec = codec(CipherSuite::Aes128Cbc);
    let mut seen = HashSet::new();
    for _ in 0..256 {
        let frame = codec
            .encode(Some(&key), MessageType::Login, "alice,pw", &mut OsRandom)
            .unwrap();
        let iv = frame.split(',').nth(1).unwrap().to_string();
        assert!(seen.insert(iv), "IV reused");
    }
}
