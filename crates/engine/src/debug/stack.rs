// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stack snapshots reported by `rhost:::describe_stack()`.

use crate::error::DebugError;
use rh_core::{SourceLocation, StackFrame};
use serde_json::Value;

pub(crate) const DESCRIBE_STACK: &str = "rhost:::describe_stack()";

const SOURCING_PREFIXES: [&str; 3] = ["source(", "withVisible(eval(", "eval(ei, envir)"];

/// Frames the host adds while running `source()`.
pub fn is_sourcing_frame(frame: &StackFrame) -> bool {
    !frame.is_global
        && frame
            .call
            .as_deref()
            .is_some_and(|call| SOURCING_PREFIXES.iter().any(|p| call.starts_with(p)))
}

/// Turn an outermost-first description into an innermost-first snapshot.
pub(crate) fn frames_from_value(
    value: Value,
    show_sourcing_frames: bool,
) -> Result<Vec<StackFrame>, DebugError> {
    let mut frames: Vec<StackFrame> = serde_json::from_value(value)
        .map_err(|e| DebugError::MalformedStack(e.to_string()))?;
    if !show_sourcing_frames {
        frames.retain(|f| !is_sourcing_frame(f));
    }
    frames.reverse();
    Ok(frames)
}

/// Location of the innermost frame that is not part of `source()`.
pub(crate) fn top_location(frames: &[StackFrame]) -> Option<SourceLocation> {
    frames
        .iter()
        .find(|f| !is_sourcing_frame(f))
        .and_then(StackFrame::location)
}

/// No user function frames: only the global frame (and sourcing frames).
pub(crate) fn at_global(frames: &[StackFrame]) -> bool {
    frames.iter().all(|f| f.is_global || is_sourcing_frame(f))
}

#[cfg(test)]
#[path = "stack_tests.rs"]
mod tests;
