//! CLI help output specs

use crate::prelude::*;

#[test]
fn rh_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn rh_help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("repl")
        .stdout_has("eval");
}

#[test]
fn rh_eval_help_shows_host_flags() {
    cli()
        .args(&["eval", "--help"])
        .passes()
        .stdout_has("--interpreter")
        .stdout_has("--broker")
        .stdout_has("--timeout-ms")
        .stdout_has("RH_INTERPRETER");
}

#[test]
fn rh_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}
