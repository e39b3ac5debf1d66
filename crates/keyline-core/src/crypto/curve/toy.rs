// ============================================
// File: crates/keyline-core/src/crypto/curve/toy.rs
// ============================================
//! # Toy Curve
//!
//! ## Creation Reason
//! Short-Weierstrass curve over a small prime field, for deterministic
//! handshake tests where every intermediate value fits in a notebook.
//!
//! ## Main Functionality
//! ```text
//! y² = x³ + a·x + b  (mod p)
//!
//! textbook(): p = 17, a = 2, b = 2, G = (5, 1), |G| = 19
//!   7·G = (0, 6)    11·G = (13, 10)    77·G = G
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - NOT a secure curve; never select it from configuration
//! - Field arithmetic uses u128 intermediates, so p must fit in a u64
//!
//! ## Last Modified
//! v0.1.0 - Initial toy curve

use super::{coordinate_from_u64, Coordinate, CurveCapability, CurvePoint};
use crate::crypto::COORDINATE_SIZE;
use crate::error::{CoreError, Result};

/// Affine point, `None` is the point at infinity.
type Affine = Option<(u64, u64)>;

/// Small prime-field curve with a single generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToyCurve {
    p: u64,
    a: u64,
    b: u64,
    g: (u64, u64),
    n: u64,
}

impl ToyCurve {
    /// Creates a curve from its parameters.
    ///
    /// `p` must be an odd prime and `g` a point of order `n`.
    #[must_use]
    pub const fn new(p: u64, a: u64, b: u64, g: (u64, u64), n: u64) -> Self {
        Self { p, a, b, g, n }
    }

    /// The classic teaching curve `y² = x³ + 2x + 2` over GF(17).
    #[must_use]
    pub const fn textbook() -> Self {
        Self::new(17, 2, 2, (5, 1), 19)
    }

    // ========================================
    // Field Arithmetic
    // ========================================

    #[allow(clippy::cast_possible_truncation)]
    fn mul(&self, x: u64, y: u64) -> u64 {
        ((u128::from(x) * u128::from(y)) % u128::from(self.p)) as u64
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_mod(&self, x: u64, y: u64) -> u64 {
        ((u128::from(x) + u128::from(y)) % u128::from(self.p)) as u64
    }

    fn sub(&self, x: u64, y: u64) -> u64 {
        self.add_mod(x, self.p - y % self.p)
    }

    fn pow(&self, mut base: u64, mut exp: u64) -> u64 {
        let mut acc = 1 % self.p;
        base %= self.p;
        while exp > 0 {
            if exp & 1 == 1 {
                acc = self.mul(acc, base);
            }
            base = self.mul(base, base);
            exp >>= 1;
        }
        acc
    }

    /// Inverse via Fermat's little theorem.
    fn inv(&self, x: u64) -> u64 {
        self.pow(x, self.p - 2)
    }

    // ========================================
    // Group Law
    // ========================================

    fn add(&self, lhs: Affine, rhs: Affine) -> Affine {
        let ((x1, y1), (x2, y2)) = match (lhs, rhs) {
            (None, q) => return q,
            (p, None) => return p,
            (Some(p), Some(q)) => (p, q),
        };

        let lambda = if x1 == x2 {
            // P + (-P), including doubling a point with y = 0
            if self.add_mod(y1, y2) == 0 {
                return None;
            }
            let numerator = self.add_mod(self.mul(3, self.mul(x1, x1)), self.a);
            self.mul(numerator, self.inv(self.mul(2, y1)))
        } else {
            self.mul(self.sub(y2, y1), self.inv(self.sub(x2, x1)))
        };

        let x3 = self.sub(self.sub(self.mul(lambda, lambda), x1), x2);
        let y3 = self.sub(self.mul(lambda, self.sub(x1, x3)), y1);
        Some((x3, y3))
    }

    fn to_affine(&self, point: &CurvePoint) -> Option<(u64, u64)> {
        let x = small_coordinate(&point.x)?;
        let y = small_coordinate(&point.y)?;
        if x >= self.p || y >= self.p {
            return None;
        }
        let lhs = self.mul(y, y);
        let rhs = self.add_mod(
            self.add_mod(self.mul(self.mul(x, x), x), self.mul(self.a, x)),
            self.b,
        );
        (lhs == rhs).then_some((x, y))
    }
}

/// Reads a coordinate that fits in a `u64`.
fn small_coordinate(c: &Coordinate) -> Option<u64> {
    let (high, low) = c.split_at(COORDINATE_SIZE - 8);
    if high.iter().any(|&b| b != 0) {
        return None;
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(low);
    Some(u64::from_be_bytes(bytes))
}

impl CurveCapability for ToyCurve {
    fn name(&self) -> &'static str {
        "toy"
    }

    fn order(&self) -> Coordinate {
        coordinate_from_u64(self.n)
    }

    fn generator(&self) -> CurvePoint {
        CurvePoint::from_u64(self.g.0, self.g.1)
    }

    fn is_on_curve(&self, point: &CurvePoint) -> bool {
        self.to_affine(point).is_some()
    }

    fn scalar_mul(&self, point: &CurvePoint, scalar: &Coordinate) -> Result<CurvePoint> {
        let base = self
            .to_affine(point)
            .ok_or_else(|| CoreError::key_exchange("point is not on the curve"))?;

        // Double-and-add, most significant bit first
        let mut acc: Affine = None;
        for byte in scalar {
            for bit in (0..8).rev() {
                acc = self.add(acc, acc);
                if (byte >> bit) & 1 == 1 {
                    acc = self.add(acc, Some(base));
                }
            }
        }

        acc.map(|(x, y)| CurvePoint::from_u64(x, y))
            .ok_or_else(|| CoreError::key_exchange("result is the point at infinity"))
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mul(k: u64) -> Result<CurvePoint> {
        let curve = ToyCurve::textbook();
        curve.scalar_mul(&curve.generator(), &coordinate_from_u64(k))
    }

    #[test]
    fn test_generator_on_curve() {
        let curve = ToyCurve::textbook();
        assert!(curve.is_on_curve(&curve.generator()));
        assert_eq!(curve.order_bits(), 5);
    }

    #[test]
    fn test_known_multiples() {
        assert_eq!(mul(1).unwrap(), CurvePoint::from_u64(5, 1));
        assert_eq!(mul(2).unwrap(), CurvePoint::from_u64(6, 3));
        assert_eq!(mul(7).unwrap(), CurvePoint::from_u64(0, 6));
        assert_eq!(mul(11).unwrap(), CurvePoint::from_u64(13, 10));
        assert_eq!(mul(18).unwrap(), CurvePoint::from_u64(5, 16));
    }

    #[test]
    fn test_order_gives_infinity() {
        assert!(mul(19).is_err());
        assert!(mul(0).is_err());
    }

    #[test]
    fn test_every_multiple_on_curve() {
        let curve = ToyCurve::textbook();
        for k in 1..19 {
            assert!(curve.is_on_curve(&mul(k).unwrap()), "k = {k}");
        }
    }

    #[test]
    fn test_diffie_hellman_commutes() {
        let curve = ToyCurve::textbook();
        let a = coordinate_from_u64(7);
        let b = coordinate_from_u64(11);
        let a_pub = mul(7).unwrap();
        let b_pub = mul(11).unwrap();

        let shared_a = curve.scalar_mul(&b_pub, &a).unwrap();
        let shared_b = curve.scalar_mul(&a_pub, &b).unwrap();
        assert_eq!(shared_a, shared_b);
        // 77 mod 19 = 1
        assert_eq!(shared_a, CurvePoint::from_u64(5, 1));
    }

    #[test]
    fn test_off_curve_rejected() {
        let curve = ToyCurve::textbook();
        assert!(!curve.is_on_curve(&CurvePoint::from_u64(5, 2)));
        assert!(!curve.is_on_curve(&CurvePoint::from_u64(17, 1)));

        let mut wide = CurvePoint::from_u64(5, 1);
        wide.x[0] = 1;
        assert!(!curve.is_on_curve(&wide));
    }
}
