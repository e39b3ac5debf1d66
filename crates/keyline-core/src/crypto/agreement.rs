// ============================================
// File: crates/keyline-core/src/crypto/agreement.rs
// ============================================
//! # Key Agreement
//!
//! ## Creation Reason
//! Owns the local scalar, the public share and the current shared key of
//! one session, and enforces that a peer point is validated before any
//! key is installed.
//!
//! ## Main Functionality
//! ```text
//! begin_exchange ──► scalar s, share sG
//!                        │
//!   peer (x, y) ─────────┤ parse hex ─► Malformed
//!                        │ on curve? ─► InvalidPeerKey (prior key kept)
//!                        ▼
//!                  SharedKey(s · peer)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A failed derivation must leave the previous shared key untouched
//! - `begin_exchange` overwrites the scalar; the old one is zeroized
//!
//! ## Last Modified
//! v0.1.0 - Initial key agreement

use std::sync::Arc;

use tracing::debug;

use super::curve::CurveCapability;
use super::keys::{parse_coordinate, KeyShare, PrivateScalar, SharedKey};
use super::random::RandomSource;
use super::CurvePoint;
use crate::error::{CoreError, Result};

/// Per-session ECDH state.
#[derive(Debug)]
pub struct KeyAgreement {
    curve: Arc<dyn CurveCapability>,
    scalar: Option<PrivateScalar>,
    share: Option<KeyShare>,
    shared: Option<SharedKey>,
}

impl KeyAgreement {
    /// Creates an agreement over `curve` with no exchange in progress.
    #[must_use]
    pub fn new(curve: Arc<dyn CurveCapability>) -> Self {
        Self {
            curve,
            scalar: None,
            share: None,
            shared: None,
        }
    }

    /// Returns the curve in use.
    #[must_use]
    pub fn curve(&self) -> &dyn CurveCapability {
        self.curve.as_ref()
    }

    // ========================================
    // Exchange
    // ========================================

    /// Draws a fresh scalar and returns the public share to send.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if no scalar could be drawn.
    pub fn begin_exchange(&mut self, rng: &mut dyn RandomSource) -> Result<KeyShare> {
        let scalar = PrivateScalar::generate(rng, &self.curve.order())?;
        self.begin_exchange_with(scalar)
    }

    /// Starts the exchange with a caller-provided scalar.
    ///
    /// # Errors
    /// Returns `KeyExchange` if `scalar · G` fails.
    pub fn begin_exchange_with(&mut self, scalar: PrivateScalar) -> Result<KeyShare> {
        let public = self
            .curve
            .scalar_mul(&self.curve.generator(), scalar.as_bytes())?;
        let share = KeyShare::from_point(&public);

        self.scalar = Some(scalar);
        self.share = Some(share.clone());
        debug!(curve = self.curve.name(), "Key exchange started");
        Ok(share)
    }

    /// Returns `true` once a scalar has been drawn.
    #[must_use]
    pub const fn has_exchange(&self) -> bool {
        self.scalar.is_some()
    }

    /// The share produced by the last `begin_exchange`.
    #[must_use]
    pub const fn current_share(&self) -> Option<&KeyShare> {
        self.share.as_ref()
    }

    // ========================================
    // Derivation
    // ========================================

    /// Computes the key a peer share would produce without installing it.
    ///
    /// # Errors
    /// - `ExchangeNotStarted` if no scalar exists
    /// - `Malformed` if a coordinate is not hex of at most 64 digits
    /// - `InvalidPeerKey` if the point is not on the curve
    pub fn candidate_shared_key(&self, x: &str, y: &str) -> Result<SharedKey> {
        let scalar = self.scalar.as_ref().ok_or(CoreError::ExchangeNotStarted)?;
        let peer = CurvePoint::new(parse_coordinate(x)?, parse_coordinate(y)?);
        SharedKey::agree(self.curve.as_ref(), scalar, &peer)
    }

    /// Derives and installs the shared key from the peer's share.
    ///
    /// On error the previously installed key (if any) is unchanged.
    ///
    /// # Errors
    /// Same as [`candidate_shared_key`](Self::candidate_shared_key).
    pub fn derive_shared_key(&mut self, x: &str, y: &str) -> Result<()> {
        let key = self.candidate_shared_key(x, y)?;
        self.install(key);
        Ok(())
    }

    /// Installs an already validated key.
    pub fn install(&mut self, key: SharedKey) {
        self.shared = Some(key);
    }

    /// The installed shared key.
    #[must_use]
    pub const fn shared_key(&self) -> Option<&SharedKey> {
        self.shared.as_ref()
    }

    /// Drops the shared key, keeping the scalar.
    pub fn clear_shared_key(&mut self) {
        self.shared = None;
    }

    /// Drops all secret material.
    pub fn clear(&mut self) {
        self.shared = None;
        self.scalar = None;
        self.share = None;
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::{coordinate_from_u64, ToyCurve};
    use crate::crypto::random::OsRandom;
    use crate::crypto::CurveKind;

    fn toy_with_scalar(k: u64) -> KeyAgreement {
        let curve: Arc<dyn CurveCapability> = Arc::new(ToyCurve::textbook());
        let scalar = PrivateScalar::from_bytes(coordinate_from_u64(k), &curve.order()).unwrap();
        let mut agreement = KeyAgreement::new(curve);
        agreement.begin_exchange_with(scalar).unwrap();
        agreement
    }

    #[test]
    fn test_derive_before_begin() {
        let mut agreement = KeyAgreement::new(Arc::new(ToyCurve::textbook()));
        assert!(!agreement.has_exchange());
        let err = agreement.derive_shared_key("5", "1").unwrap_err();
        assert!(matches!(err, CoreError::ExchangeNotStarted));
        assert!(agreement.shared_key().is_none());
    }

    #[test]
    fn test_toy_agreement() {
        let mut alice = toy_with_scalar(7);
        let mut bob = toy_with_scalar(11);

        let a_share = alice.current_share().unwrap().clone();
        let b_share = bob.current_share().unwrap().clone();
        assert_eq!(a_share, KeyShare::from_point(&CurvePoint::from_u64(0, 6)));
        assert_eq!(b_share, KeyShare::from_point(&CurvePoint::from_u64(13, 10)));

        alice.derive_shared_key(&b_share.x, &b_share.y).unwrap();
        bob.derive_shared_key(&a_share.x, &a_share.y).unwrap();
        assert_eq!(alice.shared_key(), bob.shared_key());

        let expected = SharedKey::from_point(&CurvePoint::from_u64(5, 1)).unwrap();
        assert_eq!(alice.shared_key(), Some(&expected));
    }

    #[test]
    fn test_secp256k1_agreement() {
        let curve = CurveKind::Secp256k1.capability();
        let mut alice = KeyAgreement::new(curve.clone());
        let mut bob = KeyAgreement::new(curve);

        let a = alice.begin_exchange(&mut OsRandom).unwrap();
        let b = bob.begin_exchange(&mut OsRandom).unwrap();
        alice.derive_shared_key(&b.x, &b.y).unwrap();
        bob.derive_shared_key(&a.x, &a.y).unwrap();

        assert!(alice.shared_key().is_some());
        assert_eq!(alice.shared_key(), bob.shared_key());
    }

    #[test]
    fn test_invalid_point_keeps_prior_key() {
        let mut alice = toy_with_scalar(7);
        let bob = toy_with_scalar(11);
        let b = bob.current_share().unwrap().clone();
        alice.derive_shared_key(&b.x, &b.y).unwrap();
        let before = alice.shared_key().cloned();

        let err = alice.derive_shared_key("5", "2").unwrap_err();
        assert!(matches!(err, CoreError::InvalidPeerKey { .. }));
        assert_eq!(alice.shared_key().cloned(), before);

        let err = alice.derive_shared_key("zz", "1").unwrap_err();
        assert!(matches!(err, CoreError::Malformed { .. }));
        assert_eq!(alice.shared_key().cloned(), before);
    }

    #[test]
    fn test_short_hex_is_left_padded() {
        let mut alice = toy_with_scalar(7);
        // (13, 10) written without padding
        alice.derive_shared_key("d", "a").unwrap();
        let expected = SharedKey::from_point(&CurvePoint::from_u64(5, 1)).unwrap();
        assert_eq!(alice.shared_key(), Some(&expected));
    }

    #[test]
    fn test_clear() {
        let mut alice = toy_with_scalar(7);
        alice.derive_shared_key("d", "a").unwrap();
        alice.clear_shared_key();
        assert!(alice.shared_key().is_none());
        assert!(alice.has_exchange());

        alice.clear();
        assert!(!alice.has_exchange());
        assert!(alice.current_share().is_none());
    }
}
