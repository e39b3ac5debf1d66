// ============================================
// File: crates/keyline-core/src/crypto/random.rs
// ============================================
//! # Random Source Capability
//!
//! ## Creation Reason
//! Scalars and IVs are drawn through `RandomSource` so tests can replay a
//! handshake with fixed scalars while production uses the OS generator.
//!
//! ## ⚠️ Important Note for Next Developer
//! - `FixedRandom` is for tests and deterministic demos only
//!
//! ## Last Modified
//! v0.1.0 - Initial random sources

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

/// Source of random bytes.
pub trait RandomSource: Send {
    /// Fills `dest` with random bytes.
    fn fill(&mut self, dest: &mut [u8]);

    /// Returns `ceil(bits / 8)` big-endian bytes with at most `bits`
    /// significant bits.
    fn random_bits(&mut self, bits: usize) -> Vec<u8> {
        let mut out = vec![0u8; bits.div_ceil(8)];
        self.fill(&mut out);
        let excess = out.len() * 8 - bits;
        if let Some(first) = out.first_mut() {
            *first &= 0xFF >> excess;
        }
        out
    }
}

/// Operating-system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&mut self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// Replays a fixed byte sequence, cycling when exhausted.
///
/// # Example
/// ```
/// use keyline_core::crypto::{FixedRandom, RandomSource};
///
/// let mut rng = FixedRandom::new(vec![7]);
/// assert_eq!(rng.random_bits(5), vec![7]);
/// ```
#[derive(Debug, Clone)]
pub struct FixedRandom {
    bytes: Vec<u8>,
    position: usize,
}

impl FixedRandom {
    /// Creates a source replaying `bytes`. An empty sequence yields zeros.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, position: 0 }
    }
}

impl RandomSource for FixedRandom {
    fn fill(&mut self, dest: &mut [u8]) {
        if self.bytes.is_empty() {
            dest.fill(0);
            return;
        }
        for byte in dest.iter_mut() {
            *byte = self.bytes[self.position];
            self.position = (self.position + 1) % self.bytes.len();
        }
    }
}

impl Drop for FixedRandom {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bits_masks_top_byte() {
        let mut rng = FixedRandom::new(vec![0xFF]);
        assert_eq!(rng.random_bits(5), vec![0x1F]);
        assert_eq!(rng.random_bits(8), vec![0xFF]);
        assert_eq!(rng.random_bits(9), vec![0x01, 0xFF]);
        assert!(rng.random_bits(0).is_empty());
    }

    #[test]
    fn test_fixed_random_cycles() {
        let mut rng = FixedRandom::new(vec![1, 2, 3]);
        let mut buf = [0u8; 7];
        rng.fill(&mut buf);
        assert_eq!(buf, [1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn test_fixed_random_empty_is_zero() {
        let mut rng = FixedRandom::new(Vec::new());
        let mut buf = [9u8; 4];
        rng.fill(&mut buf);
        assert_eq!(buf, [0u8; 4]);
    }

    #[test]
    fn test_os_random_varies() {
        let mut rng = OsRandom;
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        rng.fill(&mut a);
        rng.fill(&mut b);
        assert_ne!(a, b);
    }
}
