// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! rh engine: sessions with host interpreters

mod blobs;
mod broker_slot;
mod callbacks;
pub mod debug;
pub mod env;
mod error;
mod interaction;
mod provider;
mod session;
mod turn;

#[cfg(test)]
mod test_helpers;

pub use callbacks::{HostCallbacks, NoOpCallbacks};
pub use debug::{Breakpoint, BreakpointHit, DebugOptions, DebugSession};
pub use error::{DebugError, SessionError};
pub use interaction::{EvaluationScope, Interaction, PendingTurn};
pub use provider::SessionProvider;
pub use session::{Session, SessionOptions, SessionState};
pub use turn::{Evaluated, Grant, Nesting, WaiterId};

#[cfg(any(test, feature = "test-support"))]
pub use callbacks::RecordingCallbacks;
