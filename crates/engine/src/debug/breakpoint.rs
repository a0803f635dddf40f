// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Breakpoint handles and host-side breakpoint tracking.

use super::{BreakpointHit, DebugInner, DebugSession};
use crate::error::DebugError;
use crate::turn::Nesting;
use rh_core::SourceLocation;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const ENTRY_HIT_CAPACITY: usize = 16;

pub(crate) struct BreakpointEntry {
    location: SourceLocation,
    hit_count: AtomicU64,
    hits: broadcast::Sender<BreakpointHit>,
}

impl BreakpointEntry {
    fn new(location: SourceLocation) -> Self {
        let (hits, _) = broadcast::channel(ENTRY_HIT_CAPACITY);
        Self {
            location,
            hit_count: AtomicU64::new(0),
            hits,
        }
    }

    pub(crate) fn record(&self, hit: BreakpointHit) {
        self.hit_count.fetch_add(1, Ordering::SeqCst);
        let _ = self.hits.send(hit);
    }
}

/// `rhost:::<helper>("<file>", <line>)`
fn location_call(helper: &str, location: &SourceLocation) -> String {
    let file = serde_json::to_string(&location.file).unwrap_or_default();
    format!("rhost:::{helper}({file}, {})", location.line)
}

/// A breakpoint set through a [`DebugSession`].
///
/// Creating a breakpoint twice at one location yields handles to the same
/// breakpoint.
#[derive(Clone)]
pub struct Breakpoint {
    entry: Arc<BreakpointEntry>,
    debug: Arc<DebugInner>,
}

impl fmt::Debug for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Breakpoint")
            .field("location", &self.entry.location)
            .field("hit_count", &self.hit_count())
            .finish()
    }
}

impl Breakpoint {
    pub fn location(&self) -> &SourceLocation {
        &self.entry.location
    }

    /// Pauses at this breakpoint so far.
    pub fn hit_count(&self) -> u64 {
        self.entry.hit_count.load(Ordering::SeqCst)
    }

    /// Fires once per pause at this breakpoint.
    pub fn hits(&self) -> broadcast::Receiver<BreakpointHit> {
        self.entry.hits.subscribe()
    }

    /// Remove the breakpoint from the session and the host.
    pub async fn delete(self, cancel: Option<&CancellationToken>) -> Result<(), DebugError> {
        let removed = {
            let mut state = self.debug.state.lock();
            match state.breakpoints.get(&self.entry.location) {
                Some(entry) if Arc::ptr_eq(entry, &self.entry) => {
                    state.breakpoints.remove(&self.entry.location)
                }
                _ => None,
            }
        };
        if removed.is_none() {
            return Ok(());
        }
        let code = location_call("remove_breakpoint", &self.entry.location);
        self.debug
            .session
            .evaluate(&code, Nesting::Reentrant, cancel)
            .await?;
        tracing::info!(location = %self.entry.location, "breakpoint deleted");
        Ok(())
    }
}

impl DebugSession {
    /// Set a breakpoint at `location`, or return the one already there.
    pub async fn create_breakpoint(
        &self,
        location: SourceLocation,
        cancel: Option<&CancellationToken>,
    ) -> Result<Breakpoint, DebugError> {
        let entry = {
            let mut state = self.inner.state.lock();
            if let Some(entry) = state.breakpoints.get(&location) {
                return Ok(Breakpoint {
                    entry: entry.clone(),
                    debug: self.inner.clone(),
                });
            }
            let entry = Arc::new(BreakpointEntry::new(location.clone()));
            state.breakpoints.insert(location.clone(), entry.clone());
            entry
        };

        let code = location_call("add_breakpoint", &location);
        if let Err(e) = self
            .inner
            .session
            .evaluate(&code, Nesting::Reentrant, cancel)
            .await
        {
            let mut state = self.inner.state.lock();
            if state
                .breakpoints
                .get(&location)
                .is_some_and(|existing| Arc::ptr_eq(existing, &entry))
            {
                state.breakpoints.remove(&location);
            }
            return Err(e.into());
        }
        tracing::info!(%location, "breakpoint created");
        Ok(Breakpoint {
            entry,
            debug: self.inner.clone(),
        })
    }
}

#[cfg(test)]
#[path = "breakpoint_tests.rs"]
mod tests;
