// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    string = { json!("hello"), "hello" },
    number = { json!(42), "42" },
    vector = { json!([1, 2, 3]), "[1,2,3]" },
    null = { json!(null), "null" },
)]
fn text_format(value: Value, expected: &str) {
    assert_eq!(format_value(&value, OutputFormat::Text), expected);
}

#[test]
fn json_format_wraps_value() {
    let out = format_value(&json!("hello"), OutputFormat::Json);
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed, json!({ "value": "hello" }));
}
