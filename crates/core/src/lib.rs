// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rh-core: shared vocabulary for talking to a host interpreter

pub mod event;
pub mod frame;
pub mod id;
pub mod message;
pub mod startup;

pub use event::{DisconnectReason, SessionEvent};
pub use frame::{SourceLocation, StackFrame};
pub use id::{BlobId, InstanceId, PromptId, RequestId, Sequence, SessionId};
pub use message::{
    CallbackReply, ClientMessage, EvalOutcome, HostCallback, HostMessage, LocatorPoint,
    OutputStream, PromptContext, PromptInfo, ReplyBody,
};
pub use startup::HostStartupInfo;
