// ============================================
// File: crates/keyline-core/src/protocol/codec.rs
// ============================================
//! # Secure Channel Codec
//!
//! ## Creation Reason
//! Turns `(type, payload)` into an encrypted, authenticated text frame
//! and back, under the session's shared key.
//!
//! ## Wire Format
//! ```text
//! cleartext = <decimal type> "," <payload>
//! frame     = <hex len(cleartext)> "," <hex iv (32 digits)> "," <hex ct ‖ tag>
//!
//! ct  = CBC-PKCS7(key = SharedKey[..key_len], iv, cleartext)
//! tag = HMAC-SHA256(mac_key, be64(len) ‖ iv ‖ ct)
//! ```
//!
//! ## Parsing Strategy
//! 1. Require a key, then exactly three fields
//! 2. Validate hex and sizes of every field (`Malformed`)
//! 3. Verify the tag, then unpad (`Decrypt`)
//! 4. Check the advisory length, UTF-8 and the type code
//!
//! ## ⚠️ Important Note for Next Developer
//! - A fresh IV is drawn for every frame; never cache it
//! - The length field is advisory and never used to size buffers
//! - Tag verification is constant time (`Mac::verify_slice`)
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::crypto::{
    CbcCipher, RandomSource, SharedKey, IV_SIZE, MAC_TAG_SIZE,
};
use crate::error::{CoreError, Result};
use crate::protocol::messages::MessageType;

type HmacSha256 = Hmac<Sha256>;

/// Smallest ciphertext: one padded block.
const MIN_CIPHERTEXT_LEN: usize = IV_SIZE;

// ============================================
// DecodedMessage
// ============================================

/// A successfully decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Message type
    pub message_type: MessageType,
    /// Everything after the first comma of the cleartext
    pub payload: String,
}

// ============================================
// SecureCodec
// ============================================

/// Encrypting frame codec.
#[derive(Debug, Clone)]
pub struct SecureCodec {
    cipher: Arc<dyn CbcCipher>,
}

impl SecureCodec {
    /// Creates a codec over the given block cipher.
    #[must_use]
    pub fn new(cipher: Arc<dyn CbcCipher>) -> Self {
        Self { cipher }
    }

    /// Encrypts a message into a frame.
    ///
    /// # Errors
    /// - `NoKey` if no shared key is established
    /// - `Encryption` if the cipher rejects the key
    pub fn encode(
        &self,
        key: Option<&SharedKey>,
        message_type: MessageType,
        payload: &str,
        rng: &mut dyn RandomSource,
    ) -> Result<String> {
        let key = key.ok_or(CoreError::NoKey)?;

        let cleartext = format!("{},{payload}", message_type.code());
        let mut iv = [0u8; IV_SIZE];
        rng.fill(&mut iv);

        let cipher_key = key.cipher_key(self.cipher.key_len())?;
        let mut body = self.cipher.encrypt(cipher_key, &iv, cleartext.as_bytes())?;
        let tag = frame_tag(key, cleartext.len() as u64, &iv, &body)?.finalize();
        body.extend_from_slice(&tag.into_bytes());

        Ok(format!(
            "{:x},{},{}",
            cleartext.len(),
            hex::encode(iv),
            hex::encode(body)
        ))
    }

    /// Decrypts and parses a frame.
    ///
    /// # Errors
    /// - `NoKey` if no shared key is established
    /// - `Malformed` on structural problems
    /// - `Decrypt` on tag or padding failure
    /// - `UnknownMessageType` on a code outside the closed set
    pub fn decode(&self, key: Option<&SharedKey>, frame: &str) -> Result<DecodedMessage> {
        let key = key.ok_or(CoreError::NoKey)?;

        let fields: Vec<&str> = frame.split(',').collect();
        let [len_field, iv_field, body_field] = fields.as_slice() else {
            return Err(CoreError::malformed(format!(
                "expected 3 fields, got {}",
                fields.len()
            )));
        };

        let advisory_len = u64::from_str_radix(len_field, 16)
            .map_err(|_| CoreError::malformed("length field is not hex"))?;

        let mut iv = [0u8; IV_SIZE];
        hex::decode_to_slice(iv_field, &mut iv)
            .map_err(|_| CoreError::malformed("IV must be 32 hex digits"))?;

        let body =
            hex::decode(body_field).map_err(|_| CoreError::malformed("ciphertext is not hex"))?;
        if body.len() < MIN_CIPHERTEXT_LEN + MAC_TAG_SIZE
            || (body.len() - MAC_TAG_SIZE) % IV_SIZE != 0
        {
            return Err(CoreError::malformed(format!(
                "ciphertext length {} is not whole blocks plus tag",
                body.len()
            )));
        }
        let (ciphertext, tag) = body.split_at(body.len() - MAC_TAG_SIZE);

        frame_tag(key, advisory_len, &iv, ciphertext)?
            .verify_slice(tag)
            .map_err(|_| CoreError::Decrypt)?;

        let cipher_key = key.cipher_key(self.cipher.key_len())?;
        let cleartext = self.cipher.decrypt(cipher_key, &iv, ciphertext)?;
        if cleartext.len() as u64 != advisory_len {
            return Err(CoreError::malformed(format!(
                "length field says {advisory_len}, cleartext has {}",
                cleartext.len()
            )));
        }

        let cleartext = String::from_utf8(cleartext)
            .map_err(|_| CoreError::malformed("cleartext is not UTF-8"))?;
        let (code, payload) = cleartext.split_once(',').unwrap_or((cleartext.as_str(), ""));
        let code: u64 = code
            .parse()
            .map_err(|_| CoreError::malformed("message type is not a decimal number"))?;
        let message_type =
            MessageType::from_code(code).ok_or(CoreError::UnknownMessageType(code))?;

        Ok(DecodedMessage {
            message_type,
            payload: payload.to_string(),
        })
    }
}

/// Keyed MAC over `be64(len) ‖ iv ‖ ciphertext`.
fn frame_tag(key: &SharedKey, len: u64, iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key.mac_key())
        .map_err(|_| CoreError::encryption("invalid MAC key length"))?;
    mac.update(&len.to_be_bytes());
    mac.update(iv);
    mac.update(ciphertext);
    Ok(mac)
}

// ============================================
// Tests
// ============================================
