// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blob table: correlates blob requests with host replies.
//!
//! Blob traffic is not ordered by the turn manager; requests may be issued
//! while the host is busy and replies arrive whenever the host gets to them.

use crate::error::SessionError;
use rh_core::{BlobId, ReplyBody, RequestId};
use std::collections::{HashMap, HashSet};
use tokio::sync::oneshot;

/// What a pending blob request expects back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BlobRequest {
    Create,
    Get(BlobId),
    Destroy(Vec<BlobId>),
}

pub(crate) type BlobReply = oneshot::Receiver<Result<ReplyBody, SessionError>>;

struct PendingBlob {
    request: BlobRequest,
    tx: oneshot::Sender<Result<ReplyBody, SessionError>>,
}

#[derive(Default)]
pub(crate) struct BlobTable {
    pending: HashMap<RequestId, PendingBlob>,
    live: HashSet<BlobId>,
    /// Highest id the host has handed out; ids only grow within a connection
    newest: Option<BlobId>,
}

impl BlobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, request_id: RequestId, request: BlobRequest) -> BlobReply {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id, PendingBlob { request, tx });
        rx
    }

    /// Stop waiting for a request; a late reply is dropped.
    pub fn abandon(&mut self, request_id: RequestId) {
        self.pending.remove(&request_id);
    }

    pub fn is_pending(&self, request_id: RequestId) -> bool {
        self.pending.contains_key(&request_id)
    }

    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Route a host reply to its request. Unknown request ids are ignored.
    pub fn on_reply(&mut self, request_id: RequestId, body: ReplyBody) {
        let Some(pending) = self.pending.remove(&request_id) else {
            tracing::debug!(request = %request_id, "reply for an untracked blob request");
            return;
        };
        let result = match (&pending.request, body) {
            (_, ReplyBody::Error { message }) => Err(SessionError::Evaluation(message)),
            (BlobRequest::Create, ReplyBody::BlobCreated { blob_id }) => {
                if self.newest.is_some_and(|newest| blob_id <= newest) {
                    tracing::warn!(blob = %blob_id, "host reused a blob id");
                    Err(SessionError::Protocol(format!(
                        "host reused blob id {blob_id}"
                    )))
                } else {
                    self.live.insert(blob_id);
                    self.newest = Some(blob_id);
                    Ok(ReplyBody::BlobCreated { blob_id })
                }
            }
            (BlobRequest::Get(_), body @ ReplyBody::BlobData { .. }) => Ok(body),
            (BlobRequest::Destroy(ids), ReplyBody::BlobsDestroyed) => {
                for id in ids {
                    self.live.remove(id);
                }
                Ok(ReplyBody::BlobsDestroyed)
            }
            (request, body) => {
                tracing::warn!(request = %request_id, ?request, ?body, "mismatched blob reply");
                Err(SessionError::Protocol(format!(
                    "unexpected reply to {request:?}"
                )))
            }
        };
        let _ = pending.tx.send(result);
    }

    /// Fail every pending request. Blob ids belong to one host connection, so
    /// the id bookkeeping is reset too.
    pub fn fail_all(&mut self, err: SessionError) {
        for (_, pending) in self.pending.drain() {
            let _ = pending.tx.send(Err(err.clone()));
        }
        self.live.clear();
        self.newest = None;
    }
}

#[cfg(test)]
#[path = "blobs_tests.rs"]
mod tests;
