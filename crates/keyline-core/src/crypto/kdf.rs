// ============================================
// File: crates/keyline-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation Functions
//!
//! ## Main Functionality
//! - `derive_mac_key`: frame MAC key from the 64-byte shared key
//!
//! The cipher key is the shared key prefix itself; only the MAC key goes
//! through HKDF so the two never share bytes.
//!
//! ## Last Modified
//! v0.1.0 - Frame MAC key derivation

use hkdf::Hkdf;
use sha2::Sha256;

use super::{HKDF_MAC_INFO, HKDF_SALT, MAC_KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// Key Derivation
// ============================================

/// Derives the frame MAC key from shared key material.
///
/// ```text
/// mac_key = HKDF-SHA256(
///     ikm:  SharedKey (x ‖ y),
///     salt: "keyline-v1",
///     info: "keyline-frame-mac"
/// )
/// ```
pub fn derive_mac_key(shared_key: &[u8]) -> Result<[u8; MAC_KEY_SIZE]> {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), shared_key);

    let mut key = [0u8; MAC_KEY_SIZE];
    hk.expand(HKDF_MAC_INFO, &mut key)
        .map_err(|_| CoreError::KeyDerivation {
            reason: "HKDF expansion failed".into(),
        })?;
    Ok(key)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_mac_key_deterministic() {
        let material = [0x42u8; 64];
        let key1 = derive_mac_key(&material).unwrap();
        let key2 = derive_mac_key(&material).unwrap();
        assert_eq!(key1, key2);
        assert_ne!(key1, [0u8; MAC_KEY_SIZE]);
    }

    #[test]
    fn test_derive_mac_key_differs_per_input() {
        let a = derive_mac_key(&[0x01u8; 64]).unwrap();
        let b = derive_mac_key(&[0x02u8; 64]).unwrap();
        assert_ne!(a, b);
    }
}
