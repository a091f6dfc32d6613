// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

use super::{format_or_json, OutputFormat};

#[derive(Debug, Clone, Serialize)]
struct FakeTask {
    id: String,
    state: String,
}

#[test]
fn format_or_json_json_mode_serializes_without_calling_text_fn() {
    let task = FakeTask { id: "tsk-1".into(), state: "running".into() };
    let mut text_fn_called = false;
    let result = format_or_json(OutputFormat::Json, &task, || text_fn_called = true);
    assert!(result.is_ok());
    assert!(!text_fn_called);
}

#[test]
fn format_or_json_text_mode_calls_text_fn_not_json() {
    let task = FakeTask { id: "tsk-1".into(), state: "running".into() };
    let mut text_fn_called = false;
    let result = format_or_json(OutputFormat::Text, &task, || text_fn_called = true);
    assert!(result.is_ok());
    assert!(text_fn_called);
}

#[test]
fn output_format_default_is_text() {
    assert_eq!(OutputFormat::default(), OutputFormat::Text);
}
