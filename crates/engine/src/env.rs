// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Host start timeout used when callers don't pass one (default: 30000ms).
pub fn start_timeout() -> Duration {
    parse_duration_ms("RH_START_TIMEOUT_MS").unwrap_or(Duration::from_secs(30))
}

/// How long `stop_host` waits for the host to exit after asking it to (default: 2000ms).
pub fn stop_grace() -> Duration {
    parse_duration_ms("RH_STOP_GRACE_MS").unwrap_or(Duration::from_secs(2))
}

/// Per-session event broadcast capacity (default: 1024).
pub fn event_capacity() -> usize {
    std::env::var("RH_EVENT_CAPACITY")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1024)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
