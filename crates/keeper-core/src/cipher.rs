//! Field-level encryption of individual secret attributes.
//!
//! Values are encrypted with AES-CBC and PKCS#7 padding, then base64-encoded
//! so they fit in a text column. The AES variant follows the key length:
//! 16, 24 or 32 bytes select AES-128, AES-192 or AES-256.
//!
//! # Key preparation
//!
//! Keys shorter than 16 bytes are rejected. Longer keys are truncated to the
//! largest multiple of 8 not exceeding their length, and the result must be
//! one of the AES key sizes.
//!
//! # IV policy
//!
//! [`IvPolicy::Random`] (the default) draws a fresh 16-byte IV from the OS
//! CSPRNG for every call and stores it in front of the ciphertext:
//! `base64(iv || ciphertext)`. [`IvPolicy::Fixed`] reuses [`LEGACY_IV`] and
//! stores the bare ciphertext, which is only useful for reading values
//! written by older deployments. With a fixed IV, equal plaintexts produce
//! equal ciphertexts.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::CipherError;

/// AES block and IV length.
const BLOCK_LEN: usize = 16;

/// Minimum accepted key length.
pub const MIN_KEY_LEN: usize = 16;

/// IV used by [`IvPolicy::Fixed`].
pub const LEGACY_IV: &[u8; BLOCK_LEN] = b"1234567890123456";

/// How initialization vectors are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IvPolicy {
    /// Fresh random IV per value, stored as a ciphertext prefix.
    #[default]
    Random,
    /// [`LEGACY_IV`] for every value, not stored.
    Fixed,
}

/// Encrypts and decrypts single string values under one key.
///
/// The key is zeroized on drop and never shown in `Debug` output.
#[derive(Clone)]
pub struct FieldCipher {
    key: Zeroizing<Vec<u8>>,
    iv_policy: IvPolicy,
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("key", &"[REDACTED]")
            .field("key_len", &self.key.len())
            .field("iv_policy", &self.iv_policy)
            .finish()
    }
}

/// Validate and truncate a raw key.
///
/// # Errors
///
/// Returns [`CipherError::KeyTooShort`] below 16 bytes and
/// [`CipherError::InvalidKeyLength`] if the truncated length is not 16, 24
/// or 32.
pub fn prepare_key(key: &[u8]) -> Result<&[u8], CipherError> {
    if key.len() < MIN_KEY_LEN {
        return Err(CipherError::KeyTooShort { len: key.len() });
    }
    let truncated = key.len() - key.len() % 8;
    if !matches!(truncated, 16 | 24 | 32) {
        return Err(CipherError::InvalidKeyLength {
            len: key.len(),
            truncated,
        });
    }
    Ok(&key[..truncated])
}

impl FieldCipher {
    /// Build a cipher with a random IV per value.
    ///
    /// # Errors
    ///
    /// Returns the [`prepare_key`] errors.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        Self::with_iv_policy(key, IvPolicy::Random)
    }

    /// Build a cipher with an explicit IV policy.
    ///
    /// # Errors
    ///
    /// Returns the [`prepare_key`] errors.
    pub fn with_iv_policy(key: &[u8], iv_policy: IvPolicy) -> Result<Self, CipherError> {
        let key = prepare_key(key)?;
        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
            iv_policy,
        })
    }

    /// The IV policy this cipher encrypts with.
    #[must_use]
    pub fn iv_policy(&self) -> IvPolicy {
        self.iv_policy
    }

    /// Encrypt one value.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::EmptyInput`] for an empty plaintext.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Err(CipherError::EmptyInput);
        }
        match self.iv_policy {
            IvPolicy::Random => {
                let mut iv = [0u8; BLOCK_LEN];
                OsRng.fill_bytes(&mut iv);
                let body = cbc_encrypt(&self.key, &iv, plaintext.as_bytes())?;
                let mut out = Vec::with_capacity(BLOCK_LEN + body.len());
                out.extend_from_slice(&iv);
                out.extend_from_slice(&body);
                Ok(BASE64.encode(out))
            }
            IvPolicy::Fixed => {
                let body = cbc_encrypt(&self.key, LEGACY_IV, plaintext.as_bytes())?;
                Ok(BASE64.encode(body))
            }
        }
    }

    /// Decrypt one value produced by [`encrypt`](Self::encrypt) under the
    /// same key and IV policy.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::EmptyInput`], [`CipherError::Decode`],
    /// [`CipherError::Padding`] or [`CipherError::Utf8`].
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        if ciphertext.is_empty() {
            return Err(CipherError::EmptyInput);
        }
        let raw = BASE64
            .decode(ciphertext)
            .map_err(|e| CipherError::Decode {
                reason: e.to_string(),
            })?;
        if raw.is_empty() {
            return Err(CipherError::EmptyInput);
        }

        let (iv, body): (&[u8], &[u8]) = match self.iv_policy {
            IvPolicy::Random => {
                if raw.len() < 2 * BLOCK_LEN {
                    return Err(CipherError::Padding);
                }
                raw.split_at(BLOCK_LEN)
            }
            IvPolicy::Fixed => (&LEGACY_IV[..], raw.as_slice()),
        };
        if body.is_empty() || body.len() % BLOCK_LEN != 0 {
            return Err(CipherError::Padding);
        }

        let plain = cbc_decrypt(&self.key, iv, body)?;
        String::from_utf8(plain).map_err(|_| CipherError::Utf8)
    }
}

/// Encrypt `plaintext` under `key` with a random IV.
///
/// # Errors
///
/// Returns the [`prepare_key`] errors or [`CipherError::EmptyInput`].
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<String, CipherError> {
    FieldCipher::new(key)?.encrypt(plaintext)
}

/// Decrypt a value produced by [`encrypt`].
///
/// # Errors
///
/// Returns the [`prepare_key`] errors or any [`FieldCipher::decrypt`] error.
pub fn decrypt(ciphertext: &str, key: &[u8]) -> Result<String, CipherError> {
    FieldCipher::new(key)?.decrypt(ciphertext)
}

fn key_error(key: &[u8]) -> CipherError {
    CipherError::InvalidKeyLength {
        len: key.len(),
        truncated: key.len(),
    }
}

fn cbc_encrypt(key: &[u8], iv: &[u8], plain: &[u8]) -> Result<Vec<u8>, CipherError> {
    let out = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plain)),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plain)),
        _ => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plain)),
    };
    out.map_err(|_| key_error(key))
}

fn cbc_decrypt(key: &[u8], iv: &[u8], body: &[u8]) -> Result<Vec<u8>, CipherError> {
    let out = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(body)),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(body)),
        _ => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(body)),
    };
    out.map_err(|_| key_error(key))?
        .map_err(|_| CipherError::Padding)
}
