// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn log_filter_defaults_to_warn() {
    std::env::remove_var("RH_LOG");
    assert_eq!(log_filter(), "warn");
}

#[test]
#[serial]
fn log_filter_reads_rh_log() {
    std::env::set_var("RH_LOG", "rh_engine=debug");
    assert_eq!(log_filter(), "rh_engine=debug");
    std::env::remove_var("RH_LOG");
}

#[test]
#[serial]
fn blank_log_filter_falls_back() {
    std::env::set_var("RH_LOG", "  ");
    assert_eq!(log_filter(), "warn");
    std::env::remove_var("RH_LOG");
}
