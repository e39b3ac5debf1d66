// ============================================
// File: crates/keyline-core/src/crypto/keys.rs
// ============================================
//! # Cryptographic Key Types
//!
//! ## Creation Reason
//! Defines the key types of the channel with proper security properties
//! (Zeroize on drop, constant-time comparison, redacted Debug).
//!
//! ## Main Functionality
//! - `PrivateScalar`: secret scalar in `[1, n-1]`
//! - `KeyShare`: public point as two zero-padded hex strings
//! - `SharedKey`: 64-byte key derived from the shared point
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  PrivateScalar (per exchange)                              │
//! │  ├─ Drawn by rejection sampling against the curve order    │
//! │  └─ Replaced whenever the exchange restarts                │
//! │                                                            │
//! │  KeyShare (public)                                         │
//! │  └─ scalar · G, sent in cleartext as "0,<x>,<y>"           │
//! │                                                            │
//! │  SharedKey (per session)                                   │
//! │  ├─ x ‖ y of scalar · peer_point                           │
//! │  ├─ first key_len bytes key the block cipher               │
//! │  └─ HKDF output keys the frame MAC                         │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL secret types MUST implement Zeroize
//! - Use constant-time comparison for key equality
//!
//! ## Last Modified
//! v0.1.0 - Initial key type definitions

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::curve::{bit_length, Coordinate, CurveCapability, CurvePoint};
use super::kdf::derive_mac_key;
use super::random::RandomSource;
use super::{COORDINATE_HEX_LEN, COORDINATE_SIZE, MAC_KEY_SIZE, MAX_SCALAR_ATTEMPTS, SHARED_KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// PrivateScalar
// ============================================

/// Secret scalar in `[1, n-1]`, big-endian.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateScalar(Coordinate);

impl PrivateScalar {
    /// Draws a uniformly random scalar below `order`.
    ///
    /// Samples `bit_length(order)` bits and rejects zero and values
    /// `>= order`.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the order is degenerate or no valid
    /// scalar was drawn within the attempt limit.
    pub fn generate(rng: &mut dyn RandomSource, order: &Coordinate) -> Result<Self> {
        let bits = bit_length(order);
        if bits < 2 {
            return Err(CoreError::key_generation("curve order too small"));
        }

        for _ in 0..MAX_SCALAR_ATTEMPTS {
            let mut drawn = rng.random_bits(bits);
            let mut candidate = [0u8; COORDINATE_SIZE];
            candidate[COORDINATE_SIZE - drawn.len()..].copy_from_slice(&drawn);
            drawn.zeroize();

            if candidate != [0u8; COORDINATE_SIZE] && candidate < *order {
                return Ok(Self(candidate));
            }
            candidate.zeroize();
        }

        Err(CoreError::key_generation(format!(
            "no scalar below the group order after {MAX_SCALAR_ATTEMPTS} attempts"
        )))
    }

    /// Creates a scalar from explicit bytes, checking `1 <= s < order`.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the value is out of range.
    pub fn from_bytes(bytes: Coordinate, order: &Coordinate) -> Result<Self> {
        if bytes == [0u8; COORDINATE_SIZE] || bytes >= *order {
            return Err(CoreError::key_generation("scalar out of range"));
        }
        Ok(Self(bytes))
    }

    /// Returns the raw scalar bytes.
    pub(crate) const fn as_bytes(&self) -> &Coordinate {
        &self.0
    }
}

impl fmt::Debug for PrivateScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateScalar([REDACTED])")
    }
}

// ============================================
// KeyShare
// ============================================

/// Public key share: the coordinates of `scalar · G` as lowercase,
/// 64-digit hex strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShare {
    /// X coordinate (hex)
    pub x: String,
    /// Y coordinate (hex)
    pub y: String,
}

impl KeyShare {
    /// Encodes a curve point.
    #[must_use]
    pub fn from_point(point: &CurvePoint) -> Self {
        Self {
            x: hex::encode(point.x),
            y: hex::encode(point.y),
        }
    }
}

/// Parses a hex coordinate of at most 64 digits, left-padding shorter input.
///
/// # Errors
/// Returns `Malformed` for empty, oversized or non-hex input.
pub fn parse_coordinate(text: &str) -> Result<Coordinate> {
    if text.is_empty() {
        return Err(CoreError::malformed("empty coordinate"));
    }
    if text.len() > COORDINATE_HEX_LEN {
        return Err(CoreError::malformed(format!(
            "coordinate has {} hex digits, max {COORDINATE_HEX_LEN}",
            text.len()
        )));
    }

    let padded = format!("{text:0>width$}", width = COORDINATE_HEX_LEN);
    let mut out = [0u8; COORDINATE_SIZE];
    hex::decode_to_slice(&padded, &mut out)
        .map_err(|e| CoreError::malformed(format!("coordinate is not hex: {e}")))?;
    Ok(out)
}

// ============================================
// SharedKey
// ============================================

/// 64-byte shared key: x ‖ y of the shared point.
///
/// # Security
/// - Zeroed on drop
/// - Never logged or serialized
/// - Constant-time comparison
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey {
    material: [u8; SHARED_KEY_SIZE],
    mac_key: [u8; MAC_KEY_SIZE],
}

impl SharedKey {
    /// Derives the key from the shared point.
    ///
    /// The material equals the bytes of the concatenated 64-digit hex
    /// coordinates, i.e. `x ‖ y`.
    ///
    /// # Errors
    /// Returns `KeyDerivation` if the MAC key cannot be derived.
    pub fn from_point(point: &CurvePoint) -> Result<Self> {
        let mut material = [0u8; SHARED_KEY_SIZE];
        material[..COORDINATE_SIZE].copy_from_slice(&point.x);
        material[COORDINATE_SIZE..].copy_from_slice(&point.y);
        let mac_key = derive_mac_key(&material)?;
        Ok(Self { material, mac_key })
    }

    /// Computes `scalar · peer` and derives the key from the result.
    ///
    /// # Errors
    /// Returns `InvalidPeerKey` if `peer` is off the curve.
    pub fn agree(
        curve: &dyn CurveCapability,
        scalar: &PrivateScalar,
        peer: &CurvePoint,
    ) -> Result<Self> {
        if !curve.is_on_curve(peer) {
            return Err(CoreError::invalid_peer_key(format!(
                "point is not on {}",
                curve.name()
            )));
        }
        let mut shared = curve.scalar_mul(peer, scalar.as_bytes())?;
        let key = Self::from_point(&shared);
        shared.x.zeroize();
        shared.y.zeroize();
        key
    }

    /// Returns the full key material.
    ///
    /// # Security Warning
    /// Do not log or store the returned bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SHARED_KEY_SIZE] {
        &self.material
    }

    /// Returns the first `len` bytes, used as the block cipher key.
    ///
    /// # Errors
    /// Returns `Encryption` if `len` exceeds the key size.
    pub fn cipher_key(&self, len: usize) -> Result<&[u8]> {
        self.material
            .get(..len)
            .ok_or_else(|| CoreError::encryption(format!("cipher wants {len} key bytes")))
    }

    /// Returns the frame MAC key.
    #[must_use]
    pub const fn mac_key(&self) -> &[u8; MAC_KEY_SIZE] {
        &self.mac_key
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material
        write!(f, "SharedKey([REDACTED])")
    }
}

impl PartialEq for SharedKey {
    fn eq(&self, other: &Self) -> bool {
        self.material.ct_eq(&other.material).into()
    }
}

impl Eq for SharedKey {}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::{coordinate_from_u64, ToyCurve};
    use crate::crypto::random::{FixedRandom, OsRandom};
    use crate::crypto::CurveKind;

    #[test]
    fn test_scalar_generate_in_range() {
        let curve = CurveKind::Secp256k1.capability();
        let order = curve.order();
        for _ in 0..16 {
            let s = PrivateScalar::generate(&mut OsRandom, &order).unwrap();
            assert!(s.as_bytes() < &order);
            assert_ne!(s.as_bytes(), &[0u8; COORDINATE_SIZE]);
        }
    }

    #[test]
    fn test_scalar_generate_fixed() {
        let order = ToyCurve::textbook().order();
        let s = PrivateScalar::generate(&mut FixedRandom::new(vec![7]), &order).unwrap();
        assert_eq!(s.as_bytes(), &coordinate_from_u64(7));
    }

    #[test]
    fn test_scalar_generate_rejects_out_of_range() {
        let order = ToyCurve::textbook().order();
        // 0 and 25 are rejected, 3 is accepted
        let mut rng = FixedRandom::new(vec![0, 25, 3]);
        let s = PrivateScalar::generate(&mut rng, &order).unwrap();
        assert_eq!(s.as_bytes(), &coordinate_from_u64(3));
    }

    #[test]
    fn test_scalar_generate_gives_up() {
        let order = ToyCurve::textbook().order();
        let err = PrivateScalar::generate(&mut FixedRandom::new(vec![0]), &order).unwrap_err();
        assert!(matches!(err, CoreError::KeyGeneration { .. }));
    }

    #[test]
    fn test_scalar_from_bytes_range() {
        let order = coordinate_from_u64(19);
        assert!(PrivateScalar::from_bytes(coordinate_from_u64(18), &order).is_ok());
        assert!(PrivateScalar::from_bytes(coordinate_from_u64(19), &order).is_err());
        assert!(PrivateScalar::from_bytes([0u8; COORDINATE_SIZE], &order).is_err());
    }

    #[test]
    fn test_scalar_debug_redacted() {
        let s = PrivateScalar::from_bytes(coordinate_from_u64(7), &coordinate_from_u64(19)).unwrap();
        assert_eq!(format!("{s:?}"), "PrivateScalar([REDACTED])");
    }

    #[test]
    fn test_key_share_encoding_is_padded() {
        let share = KeyShare::from_point(&CurvePoint::from_u64(0, 6));
        assert_eq!(share.x.len(), COORDINATE_HEX_LEN);
        assert_eq!(share.y.len(), COORDINATE_HEX_LEN);
        assert!(share.y.ends_with("06"));
        assert_eq!(parse_coordinate(&share.y).unwrap(), coordinate_from_u64(6));
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("d").unwrap(), coordinate_from_u64(13));
        assert_eq!(parse_coordinate("0D").unwrap(), coordinate_from_u64(13));
        assert!(matches!(parse_coordinate(""), Err(CoreError::Malformed { .. })));
        assert!(matches!(parse_coordinate("xyz"), Err(CoreError::Malformed { .. })));
        assert!(matches!(
            parse_coordinate(&"1".repeat(COORDINATE_HEX_LEN + 1)),
            Err(CoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_shared_key_matches_hex_concatenation() {
        let point = CurvePoint::from_u64(5, 1);
        let key = SharedKey::from_point(&point).unwrap();
        let share = KeyShare::from_point(&point);
        let expected = hex::decode(format!("{}{}", share.x, share.y)).unwrap();
        assert_eq!(key.as_bytes().as_slice(), expected.as_slice());
        assert_eq!(key.cipher_key(16).unwrap(), &expected[..16]);
        assert!(key.cipher_key(SHARED_KEY_SIZE + 1).is_err());
    }

    #[test]
    fn test_agree_rejects_off_curve() {
        let curve = ToyCurve::textbook();
        let scalar = PrivateScalar::from_bytes(coordinate_from_u64(7), &curve.order()).unwrap();
        let err = SharedKey::agree(&curve, &scalar, &CurvePoint::from_u64(5, 2)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPeerKey { .. }));
    }

    #[test]
    fn test_shared_key_equality_and_debug() {
        let a = SharedKey::from_point(&CurvePoint::from_u64(5, 1)).unwrap();
        let b = SharedKey::from_point(&CurvePoint::from_u64(5, 1)).unwrap();
        let c = SharedKey::from_point(&CurvePoint::from_u64(6, 3)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(format!("{a:?}"), "SharedKey([REDACTED])");
    }
}
