// ============================================
// File: crates/keyline-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Collects the capabilities the secure channel consumes (curve, cipher,
//! random source) together with the key agreement built on top of them.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`curve`]: `CurveCapability` trait, secp256k1 / P-256 adapters, toy curve
//! - [`cipher`]: `CbcCipher` trait and the AES-CBC adapter
//! - [`random`]: `RandomSource` trait, OS and fixed sources
//! - [`keys`]: `PrivateScalar`, `SharedKey`, `KeyShare`
//! - [`kdf`]: frame MAC key derivation (HKDF-SHA256)
//! - [`agreement`]: `KeyAgreement` (begin exchange / derive shared key)
//!
//! ## Cryptographic Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Key Exchange (cleartext)                 │
//! │  A                                                    B     │
//! │  │  "0," x(aG) "," y(aG) ───────────────────────────► │     │
//! │  │ ◄─────────────────────────── "0," x(bG) "," y(bG)  │     │
//! │  │                                                    │     │
//! │  │   shared = a·(bG) = b·(aG)                         │     │
//! │  │   SharedKey = x(shared) ‖ y(shared)   (64 bytes)   │     │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Channel (encrypted)                      │
//! │   SharedKey[..key_len] ──► AES-CBC/PKCS#7 ──► ciphertext    │
//! │   HKDF(SharedKey) ──► HMAC-SHA256(len ‖ iv ‖ ct) ──► tag    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Curve and block cipher primitives come from RustCrypto (k256, p256,
//!   aes, cbc); only the toy curve does its own arithmetic and it is not
//!   meant for real traffic
//! - Every secret type implements Zeroize
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod agreement;
pub mod cipher;
pub mod curve;
pub mod kdf;
pub mod keys;
pub mod random;

// Re-export primary types at module level
pub use agreement::KeyAgreement;
pub use cipher::{AesCbc, CbcCipher, CipherSuite};
pub use curve::{Coordinate, CurveCapability, CurveKind, CurvePoint};
pub use keys::{KeyShare, PrivateScalar, SharedKey};
pub use random::{FixedRandom, OsRandom, RandomSource};

// ============================================
// Constants
// ============================================

/// Size of one curve coordinate (and of a scalar) in bytes.
pub const COORDINATE_SIZE: usize = 32;

/// Width of a zero-padded hex coordinate on the wire.
pub const COORDINATE_HEX_LEN: usize = COORDINATE_SIZE * 2;

/// Size of the derived shared key (x ‖ y of the shared point).
pub const SHARED_KEY_SIZE: usize = COORDINATE_SIZE * 2;

/// Number of leading shared-key bytes used as the AES-128 key.
pub const DEFAULT_CIPHER_KEY_LEN: usize = 16;

/// CBC block and IV size in bytes.
pub const IV_SIZE: usize = 16;

/// Size of the HMAC-SHA256 frame tag.
pub const MAC_TAG_SIZE: usize = 32;

/// Size of the frame MAC key.
pub const MAC_KEY_SIZE: usize = 32;

/// Upper bound on rejection-sampling rounds when drawing a scalar.
pub const MAX_SCALAR_ATTEMPTS: usize = 64;

/// HKDF salt for frame MAC key derivation.
pub const HKDF_SALT: &[u8] = b"keyline-v1";

/// HKDF info for frame MAC key derivation.
pub const HKDF_MAC_INFO: &[u8] = b"keyline-frame-mac";
