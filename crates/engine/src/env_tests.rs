// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial(env)]
fn defaults_apply_when_unset() {
    std::env::remove_var("RH_START_TIMEOUT_MS");
    std::env::remove_var("RH_STOP_GRACE_MS");
    std::env::remove_var("RH_EVENT_CAPACITY");
    assert_eq!(start_timeout(), Duration::from_secs(30));
    assert_eq!(stop_grace(), Duration::from_secs(2));
    assert_eq!(event_capacity(), 1024);
}

#[test]
#[serial(env)]
fn overrides_are_parsed() {
    std::env::set_var("RH_START_TIMEOUT_MS", "1500");
    std::env::set_var("RH_EVENT_CAPACITY", "16");
    assert_eq!(start_timeout(), Duration::from_millis(1500));
    assert_eq!(event_capacity(), 16);
    std::env::remove_var("RH_START_TIMEOUT_MS");
    std::env::remove_var("RH_EVENT_CAPACITY");
}

#[test]
#[serial(env)]
fn zero_capacity_falls_back_to_default() {
    std::env::set_var("RH_EVENT_CAPACITY", "0");
    assert_eq!(event_capacity(), 1024);
    std::env::remove_var("RH_EVENT_CAPACITY");
}
