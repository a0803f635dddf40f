// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use serde_json::Value;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render an evaluation result.
///
/// Text prints strings bare and everything else as compact JSON; `Json`
/// wraps the value in an object.
pub fn format_value(value: &Value, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        OutputFormat::Json => {
            let wrapped = serde_json::json!({ "value": value });
            serde_json::to_string_pretty(&wrapped).unwrap_or_else(|_| wrapped.to_string())
        }
    }
}
