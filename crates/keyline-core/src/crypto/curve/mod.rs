// ============================================
// File: crates/keyline-core/src/crypto/curve/mod.rs
// ============================================
//! # Elliptic Curve Capability
//!
//! ## Creation Reason
//! Key agreement only needs four things from a curve: its generator, its
//! order, an on-curve test and scalar multiplication. Hiding the concrete
//! curve behind `CurveCapability` lets the channel run over secp256k1,
//! P-256 or a small textbook curve with the same code.
//!
//! ## Main Functionality
//! - `CurvePoint`: affine point as two 32-byte big-endian coordinates
//! - `CurveCapability`: the trait every curve adapter implements
//! - `CurveKind`: configuration-level choice of production curve
//!
//! ## ⚠️ Important Note for Next Developer
//! - Coordinates are always 32 bytes, zero-padded on the left; the wire
//!   format depends on it
//! - `scalar_mul` must reject the point at infinity as a result
//!
//! ## Last Modified
//! v0.1.0 - Initial curve abstraction

mod sec;
mod toy;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crypto::COORDINATE_SIZE;
use crate::error::Result;

pub use sec::{NistP256, Secp256k1};
pub use toy::ToyCurve;

// ============================================
// Types
// ============================================

/// One big-endian, zero-padded coordinate (or scalar).
pub type Coordinate = [u8; COORDINATE_SIZE];

/// Affine curve point.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CurvePoint {
    /// X coordinate
    pub x: Coordinate,
    /// Y coordinate
    pub y: Coordinate,
}

impl CurvePoint {
    /// Creates a point from two coordinates.
    #[must_use]
    pub const fn new(x: Coordinate, y: Coordinate) -> Self {
        Self { x, y }
    }

    /// Creates a point from small integer coordinates (toy curves, tests).
    #[must_use]
    pub fn from_u64(x: u64, y: u64) -> Self {
        Self {
            x: coordinate_from_u64(x),
            y: coordinate_from_u64(y),
        }
    }
}

impl fmt::Debug for CurvePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurvePoint({}, {})", hex::encode(self.x), hex::encode(self.y))
    }
}

/// Encodes a `u64` as a left-padded coordinate.
#[must_use]
pub fn coordinate_from_u64(value: u64) -> Coordinate {
    let mut out = [0u8; COORDINATE_SIZE];
    out[COORDINATE_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Number of significant bits in a big-endian value.
#[must_use]
pub fn bit_length(value: &Coordinate) -> usize {
    value
        .iter()
        .position(|&b| b != 0)
        .map_or(0, |i| (COORDINATE_SIZE - i) * 8 - value[i].leading_zeros() as usize)
}

// ============================================
// CurveCapability
// ============================================

/// Elliptic-curve operations consumed by key agreement.
///
/// Implementations must be stateless; a single instance is shared by
/// every session on the server.
pub trait CurveCapability: Send + Sync + fmt::Debug {
    /// Human-readable curve name for logs.
    fn name(&self) -> &'static str;

    /// Order of the generator, big-endian.
    fn order(&self) -> Coordinate;

    /// The curve's generator point.
    fn generator(&self) -> CurvePoint;

    /// Returns `true` if `point` lies on the curve and is not the identity.
    fn is_on_curve(&self, point: &CurvePoint) -> bool;

    /// Computes `scalar · point`.
    ///
    /// # Errors
    /// Returns `KeyExchange` if the point is not on the curve, the scalar
    /// is out of range, or the result is the point at infinity.
    fn scalar_mul(&self, point: &CurvePoint, scalar: &Coordinate) -> Result<CurvePoint>;

    /// Bit length of the group order.
    fn order_bits(&self) -> usize {
        bit_length(&self.order())
    }
}

// ============================================
// CurveKind
// ============================================

/// Production curves selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    /// secp256k1 (Koblitz curve)
    #[default]
    Secp256k1,
    /// NIST P-256 (secp256r1)
    P256,
}

impl CurveKind {
    /// Builds the shared capability for this curve.
    #[must_use]
    pub fn capability(self) -> Arc<dyn CurveCapability> {
        match self {
            Self::Secp256k1 => Arc::new(Secp256k1),
            Self::P256 => Arc::new(NistP256),
        }
    }
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secp256k1 => write!(f, "secp256k1"),
            Self::P256 => write!(f, "p256"),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_length() {
        assert_eq!(bit_length(&[0u8; COORDINATE_SIZE]), 0);
        assert_eq!(bit_length(&coordinate_from_u64(1)), 1);
        assert_eq!(bit_length(&coordinate_from_u64(19)), 5);
        assert_eq!(bit_length(&coordinate_from_u64(256)), 9);
        assert_eq!(bit_length(&[0xFFu8; COORDINATE_SIZE]), 256);
    }

    #[test]
    fn test_coordinate_from_u64() {
        let c = coordinate_from_u64(0x0102);
        assert_eq!(c[30], 0x01);
        assert_eq!(c[31], 0x02);
        assert!(c[..30].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_curve_kind_capability() {
        assert_eq!(CurveKind::Secp256k1.capability().name(), "secp256k1");
        assert_eq!(CurveKind::P256.capability().name(), "p256");
        assert_eq!(CurveKind::default(), CurveKind::Secp256k1);
    }

    #[test]
    fn test_curve_kind_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            curve: CurveKind,
        }

        let w: Wrapper = toml::from_str("curve = \"p256\"").unwrap();
        assert_eq!(w.curve, CurveKind::P256);
        let w: Wrapper = toml::from_str("curve = \"secp256k1\"").unwrap();
        assert_eq!(w.curve, CurveKind::Secp256k1);
    }
}
