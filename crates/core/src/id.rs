// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types
//!
//! Numeric ids are wire-level correlation values assigned by one side of the
//! connection. `SessionId` is the caller-chosen 128-bit key of a session and is
//! deliberately reusable; `InstanceId` tells two sessions created under the same
//! key apart.

use std::sync::atomic::{AtomicU64, Ordering};

/// Define a newtype ID wrapper around `u64`.
///
/// Generates `new()`, `get()`, `Display`, `From<u64>` and transparent serde.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct MyId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

define_id! {
    /// Host-assigned identifier of one console prompt.
    pub struct PromptId;
}

define_id! {
    /// Client-assigned correlation id for evaluations, blob operations and
    /// host callbacks.
    pub struct RequestId;
}

define_id! {
    /// Host-assigned identifier of a blob. Never reused within one session.
    pub struct BlobId;
}

define_id! {
    /// Process-wide unique identity of one session record.
    pub struct InstanceId;
}

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

impl InstanceId {
    /// Allocate the next instance id. Monotonically increasing per process.
    pub fn next() -> Self {
        Self(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Caller-chosen 128-bit session key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Random session key.
    pub fn new_v4() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub const fn from_u128(raw: u128) -> Self {
        Self(uuid::Uuid::from_u128(raw))
    }

    pub const fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }

    /// First `n` hex characters, for log lines.
    pub fn short(&self, n: usize) -> String {
        let s = self.0.simple().to_string();
        s.chars().take(n).collect()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for SessionId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

/// Monotonic counter for client-assigned ids.
#[derive(Debug)]
pub struct Sequence {
    counter: AtomicU64,
}

impl Sequence {
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    pub fn next_request(&self) -> RequestId {
        RequestId(self.counter.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_raw(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
