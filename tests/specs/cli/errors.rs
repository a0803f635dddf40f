//! CLI error handling specs

use crate::prelude::*;

const MISSING: &str = "/nonexistent/rh-spec/R";

#[test]
fn eval_with_missing_interpreter_exits_one() {
    cli()
        .args(&["eval", "1", "--interpreter", MISSING])
        .fails()
        .code(1)
        .stderr_has("Error: host binary not found")
        .stderr_has(MISSING);
}

#[test]
fn repl_with_missing_interpreter_exits_one() {
    cli()
        .args(&["repl", "--interpreter", MISSING])
        .fails()
        .code(1)
        .stderr_has("host binary not found");
}

#[test]
fn interpreter_from_env() {
    cli()
        .args(&["eval", "1"])
        .env("RH_INTERPRETER", MISSING)
        .fails()
        .stderr_has(MISSING);
}

#[test]
fn eval_without_interpreter_is_a_usage_error() {
    cli()
        .args(&["eval", "1"])
        .fails()
        .stderr_has("--interpreter");
}

#[test]
fn unsupported_broker_is_reported() {
    cli()
        .args(&["eval", "1", "--interpreter", MISSING, "--broker", "ftp://x"])
        .fails()
        .code(1)
        .stderr_has("cannot reach broker remote@ftp://x");
}
