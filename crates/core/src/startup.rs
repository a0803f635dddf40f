// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host startup descriptor

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration handed unchanged to whatever launches the host process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStartupInfo {
    /// Display name of the host (shows up in broker logs)
    pub name: String,
    /// Base path of the interpreter installation or binary
    pub interpreter: PathBuf,
    /// Extra command-line arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Requested locale (e.g. "en_US.UTF-8")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Package mirror URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cran_mirror: Option<String>,
    /// Working directory for the host process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl HostStartupInfo {
    pub fn new(name: impl Into<String>, interpreter: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            interpreter: interpreter.into(),
            args: Vec::new(),
            locale: None,
            cran_mirror: None,
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_cran_mirror(mut self, mirror: impl Into<String>) -> Self {
        self.cran_mirror = Some(mirror.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Environment variables implied by the descriptor.
    pub fn env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(locale) = &self.locale {
            env.push(("LANG".to_string(), locale.clone()));
            env.push(("LC_ALL".to_string(), locale.clone()));
        }
        if let Some(mirror) = &self.cran_mirror {
            env.push(("RH_CRAN_MIRROR".to_string(), mirror.clone()));
        }
        env
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
