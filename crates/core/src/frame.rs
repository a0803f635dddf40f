// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source locations and call stack snapshots

use serde::{Deserialize, Serialize};
use std::fmt;

/// A file path plus a 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One frame of the host call stack.
///
/// Field names follow the host's `describe_stack()` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Source file, absent for synthetic frames
    #[serde(rename = "filename", default)]
    pub file_name: Option<String>,
    /// 1-based line number, absent when unknown
    #[serde(default)]
    pub line_number: Option<u32>,
    /// Source text of the call that created the frame
    #[serde(default)]
    pub call: Option<String>,
    #[serde(rename = "env_name", default)]
    pub environment_name: Option<String>,
    #[serde(default)]
    pub is_global: bool,
}

impl StackFrame {
    /// Location of the frame, when both file and line are known.
    pub fn location(&self) -> Option<SourceLocation> {
        match (&self.file_name, self.line_number) {
            (Some(file), Some(line)) => Some(SourceLocation::new(file.clone(), line)),
            _ => None,
        }
    }

    /// True when this frame is at `location`.
    pub fn is_at(&self, location: &SourceLocation) -> bool {
        self.file_name.as_deref() == Some(location.file.as_str())
            && self.line_number == Some(location.line)
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
