// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SECRET: &[u8] = b"shared-secret";

#[test]
fn canonical_form_uppercases_method() {
    assert_eq!(
        canonical_request("post", "/api/bots/t1/start", "1700000000000"),
        "POST:/api/bots/t1/start:1700000000000"
    );
}

#[test]
fn signature_from_correct_key_validates() {
    let sig = sign(SECRET, "POST", "/api/bots/t1/start", "1700000000000").unwrap();
    assert_eq!(sig.len(), 64);
    assert!(verify(SECRET, "POST", "/api/bots/t1/start", "1700000000000", &sig));
}

#[test]
fn flipping_any_byte_invalidates() {
    let sig = sign(SECRET, "GET", "/api/bots", "1").unwrap();
    let bytes = hex::decode(&sig).unwrap();
    for i in 0..bytes.len() {
        let mut tampered = bytes.clone();
        tampered[i] ^= 0x01;
        assert!(
            !verify(SECRET, "GET", "/api/bots", "1", &hex::encode(&tampered)),
            "byte {i} flip accepted"
        );
    }
}

#[yare::parameterized(
    other_method    = { "POST", "/api/bots", "1" },
    other_path      = { "GET", "/api/bots/t1/status", "1" },
    other_timestamp = { "GET", "/api/bots", "2" },
)]
fn signature_binds_every_component(method: &str, path: &str, ts: &str) {
    let sig = sign(SECRET, "GET", "/api/bots", "1").unwrap();
    assert!(!verify(SECRET, method, path, ts, &sig));
}

#[test]
fn wrong_key_fails() {
    let sig = sign(b"other", "GET", "/api/bots", "1").unwrap();
    assert!(!verify(SECRET, "GET", "/api/bots", "1", &sig));
}

#[yare::parameterized(
    truncated = { 62 },
    empty     = { 0 },
)]
fn short_signature_fails(len: usize) {
    let sig = sign(SECRET, "GET", "/api/bots", "1").unwrap();
    assert!(!verify(SECRET, "GET", "/api/bots", "1", &sig[..len]));
}

#[test]
fn non_hex_signature_fails() {
    assert!(!verify(SECRET, "GET", "/api/bots", "1", "not-hex"));
}

#[yare::parameterized(
    identical   = { "key-1", "key-1", true },
    last_byte   = { "key-2", "key-1", false },
    prefix      = { "key-", "key-1", false },
    longer      = { "key-1x", "key-1", false },
    empty       = { "", "key-1", false },
)]
fn api_key_comparison(provided: &str, expected: &str, matches: bool) {
    assert_eq!(api_key_matches(provided, expected), matches);
}

#[yare::parameterized(
    same_instant   = { 1_000_000, 1_000_000, true },
    at_window_edge = { 1_000_000, 1_300_000, true },
    just_expired   = { 1_000_000, 1_300_001, false },
    from_future    = { 1_300_001, 1_000_000, false },
)]
fn freshness_window(ts: i64, now: i64, fresh: bool) {
    assert_eq!(is_fresh(ts, now), fresh);
}
