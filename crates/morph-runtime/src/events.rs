//! Lifecycle events for transition groups.
//!
//! The runtime is poll-driven, so completion is surfaced the same way the
//! rest of the pipeline is: events accumulate on a queue and the embedder
//! drains them after each `poll`. Every event carries the invocation key it
//! belongs to, so multiple concurrent transitions can share one consumer.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Event emitted when a transition group changes state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionEvent {
    /// Keyframes were applied and playback began.
    Started { invocation: String },
    /// The group reached (or was forced to) its end state.
    Finished { invocation: String },
    /// The group was cancelled and its state rolled back.
    Cancelled { invocation: String },
    /// The background computation failed; the group degraded to a static
    /// end state without playing.
    ComputationFailed { invocation: String, message: String },
}

impl TransitionEvent {
    /// The invocation this event belongs to.
    pub fn invocation(&self) -> &str {
        match self {
            Self::Started { invocation }
            | Self::Finished { invocation }
            | Self::Cancelled { invocation }
            | Self::ComputationFailed { invocation, .. } => invocation,
        }
    }
}

/// FIFO queue of lifecycle events awaiting the embedder.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<TransitionEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TransitionEvent) {
        self.events.push_back(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<TransitionEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
