// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential vault: AES-256-GCM encryption of tenant bot tokens at rest.
//!
//! Envelope format: `hex(iv):hex(auth_tag):hex(ciphertext)` with a random
//! 96-bit IV and a 128-bit tag.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use std::fmt;
use thiserror::Error;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Vault errors.
///
/// `Integrity` means the tag did not verify: the envelope was tampered with
/// or the key is wrong. Callers must treat it as fatal for the operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("encryption key must be 32 bytes encoded as 64 hex characters")]
    InvalidKey,
    #[error("malformed credential envelope: {0}")]
    Malformed(&'static str),
    #[error("credential failed integrity check")]
    Integrity,
    #[error("encryption failed")]
    Encrypt,
}

/// 256-bit credential-encryption key. Never printed.
#[derive(Clone)]
pub struct VaultKey([u8; KEY_LEN]);

impl VaultKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse the hex form used in the environment (`ENCRYPTION_KEY`).
    pub fn from_hex(encoded: &str) -> Result<Self, VaultError> {
        let bytes = hex::decode(encoded.trim()).map_err(|_| VaultError::InvalidKey)?;
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| VaultError::InvalidKey)?;
        Ok(Self(key))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey(..)")
    }
}

/// Encrypt `plaintext` into an `iv:authTag:ciphertext` envelope.
pub fn encrypt(plaintext: &[u8], key: &VaultKey) -> Result<String, VaultError> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = key
        .cipher()
        .encrypt(&nonce, plaintext)
        .map_err(|_| VaultError::Encrypt)?;

    // aes-gcm appends the tag to the ciphertext
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
    Ok(format!(
        "{}:{}:{}",
        hex::encode(nonce),
        hex::encode(tag),
        hex::encode(ciphertext)
    ))
}

/// Decrypt an envelope produced by [`encrypt`].
pub fn decrypt(envelope: &str, key: &VaultKey) -> Result<Vec<u8>, VaultError> {
    let mut parts = envelope.split(':');
    let (Some(iv), Some(tag), Some(ciphertext), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(VaultError::Malformed("expected three colon-separated segments"));
    };

    let iv = hex::decode(iv).map_err(|_| VaultError::Malformed("iv is not hex"))?;
    let tag = hex::decode(tag).map_err(|_| VaultError::Malformed("auth tag is not hex"))?;
    let mut sealed =
        hex::decode(ciphertext).map_err(|_| VaultError::Malformed("ciphertext is not hex"))?;

    if iv.len() != IV_LEN {
        return Err(VaultError::Malformed("iv must be 96 bits"));
    }
    if tag.len() != TAG_LEN {
        return Err(VaultError::Malformed("auth tag must be 128 bits"));
    }

    sealed.extend_from_slice(&tag);
    key.cipher()
        .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
        .map_err(|_| VaultError::Integrity)
}

/// Decrypt an envelope holding UTF-8 text (bot tokens).
pub fn decrypt_string(envelope: &str, key: &VaultKey) -> Result<String, VaultError> {
    let bytes = decrypt(envelope, key)?;
    String::from_utf8(bytes).map_err(|_| VaultError::Malformed("plaintext is not UTF-8"))
}

#[cfg(test)]
#[path = "vault_tests.rs"]
mod tests;
