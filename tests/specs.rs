//! Behavioral specifications for rh.
//!
//! Session specs drive the engine against the scripted fake interpreter.
//! CLI specs are black-box: they invoke the `rh` binary and check stdout,
//! stderr and exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/errors.rs"]
mod cli_errors;
#[path = "specs/cli/help.rs"]
mod cli_help;

// session/
#[path = "specs/session/blobs.rs"]
mod session_blobs;
#[path = "specs/session/lifecycle.rs"]
mod session_lifecycle;
#[path = "specs/session/turns.rs"]
mod session_turns;

// provider/
#[path = "specs/provider/switching.rs"]
mod provider_switching;

// debug/
#[path = "specs/debug/breakpoints.rs"]
mod debug_breakpoints;
#[path = "specs/debug/stepping.rs"]
mod debug_stepping;
