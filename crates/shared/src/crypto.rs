//! QR payload cipher and diagnostic hashing.
//!
//! Scan payloads travel as `base64(IV || ciphertext)` where the ciphertext is
//! AES-128-CBC with PKCS#7 padding. The 16-byte key is a deployment secret
//! provisioned out-of-band to match the firmware on physical devices.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Length of the cipher key in bytes.
pub const KEY_LEN: usize = 16;

/// Length of the CBC initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// Error constructing a [`PayloadCipher`] from configuration.
///
/// These are startup errors: the process must refuse to boot on a missing or
/// malformed key rather than fail per-request.
#[derive(Debug, Error)]
pub enum CipherKeyError {
    #[error("QR payload key is not valid hex")]
    InvalidHex,

    #[error("QR payload key must be exactly {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Opaque decryption failure.
///
/// Every failure mode (bad base64, truncated blob, padding error) collapses
/// into this one value so callers cannot distinguish cipher internals.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("payload decryption failed")]
pub struct DecryptError;

/// Symmetric cipher for encrypted scan payloads.
#[derive(Clone)]
pub struct PayloadCipher {
    key: [u8; KEY_LEN],
}

impl PayloadCipher {
    /// Creates a cipher from a raw 16-byte key.
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Creates a cipher from a hex-encoded key string.
    pub fn from_hex(key_hex: &str) -> Result<Self, CipherKeyError> {
        let bytes = hex::decode(key_hex.trim()).map_err(|_| CipherKeyError::InvalidHex)?;
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| CipherKeyError::InvalidLength(v.len()))?;
        Ok(Self::new(key))
    }

    /// Encrypts plaintext bytes into the `base64(IV || ciphertext)` wire form.
    ///
    /// A fresh random IV is generated per call.
    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Aes128CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&ciphertext);
        BASE64.encode(blob)
    }

    /// Decrypts the `base64(IV || ciphertext)` wire form back into plaintext.
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, DecryptError> {
        let blob = BASE64.decode(encoded.trim()).map_err(|_| DecryptError)?;
        if blob.len() <= IV_LEN || (blob.len() - IV_LEN) % 16 != 0 {
            return Err(DecryptError);
        }

        let (iv, ciphertext) = blob.split_at(IV_LEN);
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| DecryptError)?;

        Aes128CbcDec::new(&self.key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| DecryptError)
    }
}

impl std::fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("PayloadCipher").finish_non_exhaustive()
    }
}

/// Computes SHA-256 of the input and returns it as a hex string.
///
/// Used to fingerprint rejected payloads in server-side logs without logging
/// their content.
pub fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}
