// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for reaching host interpreter processes

pub mod broker;
mod env;
pub mod traced;
pub mod wire;

pub use broker::{
    AnyBroker, BrokerConnector, BrokerError, BrokerTarget, ConnectionGuard, HostBroker,
    HostConnection, LocalBroker, RemoteBroker, StandardConnector,
};
pub use traced::{TracedBroker, TracedConnector};
pub use wire::WireError;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{
    BrokerCall, FakeBroker, FakeConnector, FakeHost, FakeInterpreter, FakeProgram, HostMode,
};
