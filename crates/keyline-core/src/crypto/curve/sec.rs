// ============================================
// File: crates/keyline-core/src/crypto/curve/sec.rs
// ============================================
//! # SEC Curve Adapters
//!
//! ## Creation Reason
//! Wraps the RustCrypto `k256` and `p256` crates behind `CurveCapability`.
//! Both crates expose the same `elliptic-curve` API, so one macro
//! generates both adapters.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Point validation goes through SEC1 decoding, which checks that the
//!   coordinates are field elements and that the point is on the curve
//! - Scalars at or above the group order are rejected, not reduced
//!
//! ## Last Modified
//! v0.1.0 - secp256k1 and P-256 adapters

use super::{Coordinate, CurveCapability, CurvePoint};
use crate::crypto::COORDINATE_SIZE;
use crate::error::{CoreError, Result};

/// Parses a 64-digit hex constant at compile time.
const fn const_coordinate(hex: &str) -> Coordinate {
    const fn nibble(c: u8) -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => panic!("invalid hex digit"),
        }
    }

    let bytes = hex.as_bytes();
    assert!(bytes.len() == COORDINATE_SIZE * 2, "coordinate must be 64 hex digits");

    let mut out = [0u8; COORDINATE_SIZE];
    let mut i = 0;
    while i < COORDINATE_SIZE {
        out[i] = (nibble(bytes[2 * i]) << 4) | nibble(bytes[2 * i + 1]);
        i += 1;
    }
    out
}

macro_rules! sec_curve {
    (
        $(#[$meta:meta])*
        $name:ident, $krate:ident, $label:literal, $order:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $name {
            const ORDER: Coordinate = const_coordinate($order);

            fn to_affine(point: &CurvePoint) -> Option<$krate::AffinePoint> {
                use $krate::elliptic_curve::sec1::FromEncodedPoint;

                let encoded = $krate::EncodedPoint::from_affine_coordinates(
                    $krate::FieldBytes::from_slice(&point.x),
                    $krate::FieldBytes::from_slice(&point.y),
                    false,
                );
                Option::from($krate::AffinePoint::from_encoded_point(&encoded))
            }

            fn from_affine(affine: &$krate::AffinePoint) -> Result<CurvePoint> {
                use $krate::elliptic_curve::sec1::ToEncodedPoint;

                let encoded = affine.to_encoded_point(false);
                match (encoded.x(), encoded.y()) {
                    (Some(x), Some(y)) => {
                        let mut point = CurvePoint::default();
                        point.x.copy_from_slice(x);
                        point.y.copy_from_slice(y);
                        Ok(point)
                    }
                    _ => Err(CoreError::key_exchange("result is the point at infinity")),
                }
            }
        }

        impl CurveCapability for $name {
            fn name(&self) -> &'static str {
                $label
            }

            fn order(&self) -> Coordinate {
                Self::ORDER
            }

            fn generator(&self) -> CurvePoint {
                use $krate::elliptic_curve::sec1::ToEncodedPoint;

                let generator = $krate::AffinePoint::from($krate::ProjectivePoint::GENERATOR);
                let encoded = generator.to_encoded_point(false);
                let mut point = CurvePoint::default();
                if let (Some(x), Some(y)) = (encoded.x(), encoded.y()) {
                    point.x.copy_from_slice(x);
                    point.y.copy_from_slice(y);
                }
                point
            }

            fn is_on_curve(&self, point: &CurvePoint) -> bool {
                Self::to_affine(point).is_some()
            }

            fn scalar_mul(&self, point: &CurvePoint, scalar: &Coordinate) -> Result<CurvePoint> {
                use $krate::elliptic_curve::ff::PrimeField;

                let affine = Self::to_affine(point)
                    .ok_or_else(|| CoreError::key_exchange("point is not on the curve"))?;
                let scalar: Option<$krate::Scalar> =
                    $krate::Scalar::from_repr($krate::FieldBytes::clone_from_slice(scalar)).into();
                let scalar =
                    scalar.ok_or_else(|| CoreError::key_exchange("scalar exceeds group order"))?;

                let product = $krate::ProjectivePoint::from(affine) * scalar;
                Self::from_affine(&$krate::AffinePoint::from(product))
            }
        }
    };
}

sec_curve!(
    /// secp256k1, the curve used by Bitcoin and Ethereum.
    Secp256k1,
    k256,
    "secp256k1",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141"
);

sec_curve!(
    /// NIST P-256 (secp256r1).
    NistP256,
    p256,
    "p256",
    "FFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551"
);

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::coordinate_from_u64;

    fn check_curve(curve: &dyn CurveCapability) {
        let g = curve.generator();
        assert!(curve.is_on_curve(&g));

        let two = coordinate_from_u64(2);
        let three = coordinate_from_u64(3);
        let six = coordinate_from_u64(6);

        // 3·(2G) == 6G == 2·(3G)
        let two_g = curve.scalar_mul(&g, &two).unwrap();
        let three_g = curve.scalar_mul(&g, &three).unwrap();
        let six_g = curve.scalar_mul(&g, &six).unwrap();
        assert_eq!(curve.scalar_mul(&two_g, &three).unwrap(), six_g);
        assert_eq!(curve.scalar_mul(&three_g, &two).unwrap(), six_g);
        assert!(curve.is_on_curve(&six_g));
    }

    #[test]
    fn test_secp256k1_arithmetic() {
        check_curve(&Secp256k1);
        assert_eq!(Secp256k1.order_bits(), 256);
    }

    #[test]
    fn test_p256_arithmetic() {
        check_curve(&NistP256);
        assert_eq!(NistP256.order_bits(), 256);
    }

    #[test]
    fn test_secp256k1_generator_value() {
        let g = Secp256k1.generator();
        assert_eq!(
            hex::encode(g.x),
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    #[test]
    fn test_off_curve_point_rejected() {
        let mut g = Secp256k1.generator();
        g.y[31] ^= 1;
        assert!(!Secp256k1.is_on_curve(&g));
        assert!(Secp256k1.scalar_mul(&g, &coordinate_from_u64(2)).is_err());
    }

    #[test]
    fn test_zero_point_rejected() {
        assert!(!Secp256k1.is_on_curve(&CurvePoint::default()));
        assert!(!NistP256.is_on_curve(&CurvePoint::default()));
    }

    #[test]
    fn test_scalar_bounds() {
        let g = Secp256k1.generator();
        // Zero scalar yields the identity
        assert!(Secp256k1.scalar_mul(&g, &[0u8; COORDINATE_SIZE]).is_err());
        // Order itself is not a canonical scalar
        assert!(Secp256k1.scalar_mul(&g, &Secp256k1.order()).is_err());
    }

    #[test]
    #[should_panic(expected = "invalid hex digit")]
    fn test_const_coordinate_rejects_bad_digit() {
        let _ = const_coordinate(
            "ZZ00000000000000000000000000000000000000000000000000000000000000",
        );
    }
}
