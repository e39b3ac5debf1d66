// ============================================
// File: crates/keyline-core/src/crypto/cipher.rs
// ============================================
//! # Block Cipher Capability
//!
//! ## Creation Reason
//! The frame codec needs CBC encryption with PKCS#7 padding under a key
//! taken from the shared key. `CbcCipher` keeps the codec independent of
//! the concrete block cipher.
//!
//! ## Main Functionality
//! - `CbcCipher`: encrypt/decrypt trait
//! - `AesCbc`: AES-128-CBC or AES-256-CBC via the `aes` + `cbc` crates
//! - `CipherSuite`: configuration-level choice of key size
//!
//! ## ⚠️ Important Note for Next Developer
//! - CBC alone gives no integrity; the codec adds an HMAC tag on top
//! - Padding failures map to `CoreError::Decrypt` with no detail
//!
//! ## Last Modified
//! v0.1.0 - Initial AES-CBC adapter

use std::fmt;

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::{Deserialize, Serialize};

use crate::crypto::{DEFAULT_CIPHER_KEY_LEN, IV_SIZE};
use crate::error::{CoreError, Result};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

// ============================================
// CbcCipher Trait
// ============================================

/// Block cipher in CBC mode with PKCS#7 padding.
pub trait CbcCipher: Send + Sync + fmt::Debug {
    /// Number of shared-key bytes this cipher consumes as its key.
    fn key_len(&self) -> usize;

    /// Encrypts `plaintext`; output length is a multiple of the block size.
    ///
    /// # Errors
    /// Returns `Encryption` if the key length is wrong.
    fn encrypt(&self, key: &[u8], iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts and unpads `ciphertext`.
    ///
    /// # Errors
    /// Returns `Decrypt` on bad padding, `Encryption` on a bad key length.
    fn decrypt(&self, key: &[u8], iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>>;
}

// ============================================
// CipherSuite
// ============================================

/// Supported AES-CBC variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CipherSuite {
    /// AES-128 keyed with the first 16 shared-key bytes.
    #[default]
    #[serde(rename = "aes-128-cbc")]
    Aes128Cbc,
    /// AES-256 keyed with the first 32 shared-key bytes.
    #[serde(rename = "aes-256-cbc")]
    Aes256Cbc,
}

impl CipherSuite {
    /// Key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128Cbc => DEFAULT_CIPHER_KEY_LEN,
            Self::Aes256Cbc => 32,
        }
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aes128Cbc => write!(f, "aes-128-cbc"),
            Self::Aes256Cbc => write!(f, "aes-256-cbc"),
        }
    }
}

// ============================================
// AesCbc
// ============================================

/// AES in CBC mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesCbc {
    suite: CipherSuite,
}

impl AesCbc {
    /// Creates a cipher for the given suite.
    #[must_use]
    pub const fn new(suite: CipherSuite) -> Self {
        Self { suite }
    }

    /// Returns the configured suite.
    #[must_use]
    pub const fn suite(&self) -> CipherSuite {
        self.suite
    }
}

fn bad_key(key: &[u8]) -> CoreError {
    CoreError::encryption(format!("invalid AES key length {}", key.len()))
}

impl CbcCipher for AesCbc {
    fn key_len(&self) -> usize {
        self.suite.key_len()
    }

    fn encrypt(&self, key: &[u8], iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = match self.suite {
            CipherSuite::Aes128Cbc => Aes128CbcEnc::new_from_slices(key, iv)
                .map_err(|_| bad_key(key))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            CipherSuite::Aes256Cbc => Aes256CbcEnc::new_from_slices(key, iv)
                .map_err(|_| bad_key(key))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        };
        Ok(ciphertext)
    }

    fn decrypt(&self, key: &[u8], iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
        match self.suite {
            CipherSuite::Aes128Cbc => Aes128CbcDec::new_from_slices(key, iv)
                .map_err(|_| bad_key(key))?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            CipherSuite::Aes256Cbc => Aes256CbcDec::new_from_slices(key, iv)
                .map_err(|_| bad_key(key))?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        }
        .map_err(|_| CoreError::Decrypt)
    }
}

// ============================================
// Tests
// ============================================
