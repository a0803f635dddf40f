// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod blobs;
mod callbacks;
mod evaluate;
mod lifecycle;

use super::*;
use crate::test_helpers::{
    interpreter_session, manual_session, next_event, options, provider, startup, within,
    ManualSession, TIMEOUT,
};
use crate::SessionProvider;
use rh_adapters::{FakeConnector, FakeProgram};
use rh_core::{DisconnectReason, PromptContext};
use serde_json::json;
