// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn frame(file: Option<&str>, line: Option<u32>) -> StackFrame {
    StackFrame {
        file_name: file.map(str::to_string),
        line_number: line,
        call: None,
        environment_name: None,
        is_global: false,
    }
}

#[test]
fn location_requires_file_and_line() {
    assert_eq!(
        frame(Some("a.R"), Some(2)).location(),
        Some(SourceLocation::new("a.R", 2))
    );
    assert_eq!(frame(None, Some(2)).location(), None);
    assert_eq!(frame(Some("a.R"), None).location(), None);
}

#[test]
fn is_at_compares_file_and_line() {
    let f = frame(Some("a.R"), Some(2));
    assert!(f.is_at(&SourceLocation::new("a.R", 2)));
    assert!(!f.is_at(&SourceLocation::new("a.R", 3)));
    assert!(!f.is_at(&SourceLocation::new("b.R", 2)));
}

#[test]
fn frame_parses_host_field_names() {
    let raw = json!({
        "filename": "script.R",
        "line_number": 4,
        "call": "f()",
        "env_name": "<environment>",
        "is_global": false
    });
    let parsed: StackFrame = serde_json::from_value(raw).unwrap();
    assert_eq!(parsed.file_name.as_deref(), Some("script.R"));
    assert_eq!(parsed.environment_name.as_deref(), Some("<environment>"));
    assert_eq!(parsed.line_number, Some(4));
}

#[test]
fn global_frame_tolerates_null_file() {
    let raw = json!({ "filename": null, "is_global": true });
    let parsed: StackFrame = serde_json::from_value(raw).unwrap();
    assert!(parsed.is_global);
    assert!(parsed.file_name.is_none());
}

#[test]
fn location_display() {
    assert_eq!(SourceLocation::new("x.R", 10).to_string(), "x.R:10");
}
