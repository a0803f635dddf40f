// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial(env)]
fn connect_timeout_defaults_to_ten_seconds() {
    std::env::remove_var("RH_CONNECT_TIMEOUT_MS");
    assert_eq!(connect_timeout(), Duration::from_secs(10));
}

#[test]
#[serial(env)]
fn connect_timeout_reads_millis() {
    std::env::set_var("RH_CONNECT_TIMEOUT_MS", "250");
    assert_eq!(connect_timeout(), Duration::from_millis(250));
    std::env::set_var("RH_CONNECT_TIMEOUT_MS", "soon");
    assert_eq!(connect_timeout(), Duration::from_secs(10));
    std::env::remove_var("RH_CONNECT_TIMEOUT_MS");
}
