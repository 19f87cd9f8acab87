// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HMAC-SHA256 request signing shared by the control API and its clients.
//!
//! Signature = hex(HMAC-SHA256(secret, "METHOD:PATH:timestamp")) where
//! `timestamp` is the literal `x-timestamp` header value (epoch millis).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Maximum accepted distance between a request timestamp and server time
pub const MAX_CLOCK_SKEW_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Error)]
#[error("invalid signing key")]
pub struct SigningError;

/// Canonical string covered by the signature
pub fn canonical_request(method: &str, path: &str, timestamp: &str) -> String {
    format!("{}:{}:{}", method.to_ascii_uppercase(), path, timestamp)
}

/// Compute the hex signature for a request.
pub fn sign(secret: &[u8], method: &str, path: &str, timestamp: &str) -> Result<String, SigningError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SigningError)?;
    mac.update(canonical_request(method, path, timestamp).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex signature in constant time.
///
/// Returns false for non-hex input or a signature of the wrong length.
pub fn verify(secret: &[u8], method: &str, path: &str, timestamp: &str, signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(canonical_request(method, path, timestamp).as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// Compare a presented API key with the configured one in constant time.
///
/// Both sides are reduced to fixed-length HMAC tags first, so neither the
/// first differing byte nor a length mismatch shows up in timing.
pub fn api_key_matches(provided: &str, expected: &str) -> bool {
    let Ok(mut reference) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    reference.update(API_KEY_HEADER.as_bytes());
    let tag = reference.finalize().into_bytes();

    let Ok(mut candidate) = HmacSha256::new_from_slice(provided.as_bytes()) else {
        return false;
    };
    candidate.update(API_KEY_HEADER.as_bytes());
    candidate.verify_slice(&tag).is_ok()
}

/// Replay window check: `|now - timestamp| <= 5 minutes`.
pub fn is_fresh(timestamp_ms: i64, now_ms: i64) -> bool {
    now_ms.abs_diff(timestamp_ms) <= MAX_CLOCK_SKEW_MS.unsigned_abs()
}

#[cfg(test)]
#[path = "signing_tests.rs"]
mod tests;
