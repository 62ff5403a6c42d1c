//! Re-entry triggers from the host's observers.
//!
//! The host wires its own mutation/resize/intersection observers; this layer
//! only receives their triggers and decides whether the pipeline must be
//! re-entered from the snapshotter. It also enforces the write discipline:
//! observation is suspended before the engine makes reconciling changes and
//! resumed only after the next frame boundary, so the engine never observes
//! its own writes.

use tracing::debug;

/// What kind of host observation fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactivityTrigger {
    /// The observed subtree mutated underneath a live animation.
    Mutation,
    /// The viewport or an observed element was resized.
    Resize,
    /// An observed element crossed the viewport boundary.
    Intersection,
}

/// Trigger intake and dirty-state tracking for one invocation.
#[derive(Debug)]
pub struct ReactivityLayer {
    observing: bool,
    dirty: bool,
    suspended_for_reconcile: bool,
}

impl Default for ReactivityLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactivityLayer {
    /// Starts disconnected; observation is enabled once playback begins.
    pub fn new() -> Self {
        Self {
            observing: false,
            dirty: false,
            suspended_for_reconcile: false,
        }
    }

    /// Begin routing triggers into the dirty flag.
    pub fn observe(&mut self) {
        self.observing = true;
    }

    /// Stop routing triggers (terminal states).
    pub fn disconnect(&mut self) {
        self.observing = false;
        self.suspended_for_reconcile = false;
    }

    /// A host observer fired. Returns true when the trigger was recorded.
    pub fn notify(&mut self, trigger: ReactivityTrigger) -> bool {
        if !self.observing || self.suspended_for_reconcile {
            return false;
        }
        debug!(?trigger, "reactivity trigger recorded");
        self.dirty = true;
        true
    }

    /// Suspend observation while the engine writes reconciling changes.
    pub fn begin_reconcile(&mut self) {
        self.suspended_for_reconcile = true;
    }

    /// Resume observation; callers invoke this from the next frame boundary
    /// after the reconciling writes committed, never sooner.
    pub fn end_reconcile(&mut self) {
        self.suspended_for_reconcile = false;
    }

    /// Whether a recomputation is owed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Consume the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
