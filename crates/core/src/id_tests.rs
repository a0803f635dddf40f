// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

// --- define_id! macro tests ---

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId;
}

#[test]
fn define_id_new_and_get() {
    let id = TestId::new(42);
    assert_eq!(id.get(), 42);
}

#[test]
fn define_id_display() {
    assert_eq!(TestId::new(7).to_string(), "7");
}

#[test]
fn define_id_from_u64() {
    let id: TestId = 9.into();
    assert_eq!(id, TestId(9));
}

#[test]
fn define_id_orders_numerically() {
    assert!(TestId::new(2) < TestId::new(10));
}

#[test]
fn define_id_serde_is_transparent() {
    let json = serde_json::to_string(&TestId::new(5)).unwrap();
    assert_eq!(json, "5");
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, TestId::new(5));
}

#[test]
fn define_id_hash_map_lookup() {
    let mut map = HashMap::new();
    map.insert(BlobId::new(3), "blob");
    assert_eq!(map.get(&BlobId::new(3)), Some(&"blob"));
}

// --- InstanceId ---

#[test]
fn instance_ids_are_unique_and_increasing() {
    let a = InstanceId::next();
    let b = InstanceId::next();
    assert_ne!(a, b);
    assert!(b > a);
}

// --- SessionId ---

#[test]
fn session_id_u128_roundtrip() {
    let id = SessionId::from_u128(0xdead_beef);
    assert_eq!(id.as_u128(), 0xdead_beef);
    assert_eq!(id, SessionId::from_u128(0xdead_beef));
}

#[test]
fn session_id_random_ids_differ() {
    assert_ne!(SessionId::new_v4(), SessionId::new_v4());
}

#[test]
fn session_id_short_truncates_hex() {
    let id = SessionId::from_u128(u128::MAX);
    assert_eq!(id.short(8), "ffffffff");
}

#[test]
fn session_id_serializes_as_uuid_string() {
    let id = SessionId::from_u128(1);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"00000000-0000-0000-0000-000000000001\"");
}

// --- Sequence ---

#[test]
fn sequence_starts_at_one_and_increments() {
    let seq = Sequence::new();
    assert_eq!(seq.next_request(), RequestId::new(1));
    assert_eq!(seq.next_request(), RequestId::new(2));
    assert_eq!(seq.next_raw(), 3);
}
