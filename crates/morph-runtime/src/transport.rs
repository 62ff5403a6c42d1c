//! The structured message channel between the two execution contexts.
//!
//! Requests and replies are serialized to JSON strings before crossing the
//! channel; the boundary is a serialization boundary by design, mirroring a
//! structured-clone hop, so nothing with host handles can leak across by
//! accident. Every message carries its invocation key; replies for cancelled
//! invocations are dropped at the correlation check, which is how stale
//! background results arriving after a cancel are kept from touching state.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use tracing::{trace, warn};

use morph_core::easing::{EasingFunction, EasingWindow};
use morph_core::snapshot::SnapshotTree;
use morph_core::state::ResultTransferable;

use crate::error::EngineError;

/// A snapshot set shipped to the background context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRequest {
    pub invocation: String,
    /// Ordered snapshots; the last one is the reference state.
    pub snapshots: Vec<SnapshotTree>,
    pub default_easing: EasingFunction,
    /// Per-element timing windows; absent keys span the full runtime.
    pub windows: HashMap<String, EasingWindow>,
    /// Below-the-fold keys whose results are computed but held back until
    /// the start-delayed signal arrives.
    pub deferred: Vec<String>,
}

/// Messages into the background context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    Snapshot { request: SnapshotRequest },
    /// Release the held results for the named invocation.
    StartDelayed { invocation: String },
    Shutdown,
}

/// Messages out of the background context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerReply {
    Result {
        invocation: String,
        result: ResultTransferable,
    },
    /// The deferred second wave for an invocation.
    Delayed {
        invocation: String,
        result: ResultTransferable,
    },
    Failure {
        invocation: String,
        message: String,
    },
}

impl WorkerReply {
    pub fn invocation(&self) -> &str {
        match self {
            Self::Result { invocation, .. }
            | Self::Delayed { invocation, .. }
            | Self::Failure { invocation, .. } => invocation,
        }
    }
}

/// Owning handle to the background worker thread.
///
/// Non-blocking by construction: `send` enqueues, `poll` drains whatever has
/// arrived. Dropping the channel shuts the worker down.
pub struct WorkerChannel {
    sender: Sender<String>,
    receiver: Receiver<String>,
    join: Option<JoinHandle<()>>,
    cancelled: HashSet<String>,
}

impl WorkerChannel {
    /// Spawn the background worker and connect both directions.
    pub fn spawn() -> Self {
        let (request_tx, request_rx) = mpsc::channel::<String>();
        let (reply_tx, reply_rx) = mpsc::channel::<String>();
        let join = thread::spawn(move || crate::worker::run(request_rx, reply_tx));
        Self {
            sender: request_tx,
            receiver: reply_rx,
            join: Some(join),
            cancelled: HashSet::new(),
        }
    }

    /// Encode and enqueue a request.
    pub fn send(&self, request: &WorkerRequest) -> Result<(), EngineError> {
        let payload = serde_json::to_string(request)?;
        self.sender
            .send(payload)
            .map_err(|_| EngineError::Disconnected)
    }

    /// Drain every reply that has arrived, dropping stale ones for
    /// cancelled invocations.
    pub fn poll(&mut self) -> Vec<WorkerReply> {
        let mut replies = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(payload) => match serde_json::from_str::<WorkerReply>(&payload) {
                    Ok(reply) => {
                        if self.cancelled.contains(reply.invocation()) {
                            trace!(invocation = reply.invocation(), "dropped stale reply");
                            continue;
                        }
                        replies.push(reply);
                    }
                    Err(error) => warn!(%error, "undecodable worker reply dropped"),
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        replies
    }

    /// Stop listening for an invocation's results. Idempotent.
    pub fn cancel_invocation(&mut self, invocation: &str) {
        self.cancelled.insert(invocation.to_string());
    }

    /// Terminate the worker thread. Idempotent; a second call is a no-op.
    pub fn shutdown(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = self.send(&WorkerRequest::Shutdown);
            let _ = join.join();
        }
    }
}

impl Drop for WorkerChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}
