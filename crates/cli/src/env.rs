// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

// --- Logging ---

/// `EnvFilter` directive for CLI logs (default: `warn`).
pub fn log_filter() -> String {
    std::env::var("RH_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "warn".to_string())
}

// --- Interpreter ---

/// Env var naming the interpreter binary or installation directory.
///
/// Read by clap as the `--interpreter` fallback.
pub const INTERPRETER_VAR: &str = "RH_INTERPRETER";

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
