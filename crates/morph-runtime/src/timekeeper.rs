//! The group's single source of truth for elapsed time and play state.
//!
//! One controlling animation with no visual effect, wrapped in an explicit
//! type that exposes only the operations the controller needs; no method
//! interception, just delegation with the timing adjustments applied before
//! the call goes through. Every per-element animation is aligned to this
//! clock right after creation, so late joiners enter already synchronized.

use crate::backend::{HostAnimation, NativePlayState};

/// Fraction of total runtime a seek keeps away from the exact start/end, to
/// sidestep native zero/end-time edge ambiguity.
const SEEK_EDGE_MARGIN: f64 = 0.001;

/// The controlling clock animation for one transition group.
#[derive(Debug)]
pub struct Timekeeper<A: HostAnimation> {
    clock: A,
    total_runtime_ms: f64,
}

impl<A: HostAnimation> Timekeeper<A> {
    /// Wrap a no-effect animation whose duration is the group's total runtime.
    pub fn new(clock: A, total_runtime_ms: f64) -> Self {
        Self {
            clock,
            total_runtime_ms,
        }
    }

    pub fn total_runtime_ms(&self) -> f64 {
        self.total_runtime_ms
    }

    pub fn play(&mut self) {
        self.clock.play();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn cancel(&mut self) {
        self.clock.cancel();
    }

    pub fn finish(&mut self) {
        self.clock.finish();
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    pub fn play_state(&self) -> NativePlayState {
        self.clock.play_state()
    }

    /// Map normalized progress onto the clock, clamped away from the edges.
    ///
    /// Returns the absolute time written, so callers can propagate the same
    /// value to every per-element animation.
    pub fn seek(&mut self, progress: f64) -> f64 {
        let span = self.total_runtime_ms;
        let time = (progress.clamp(0.0, 1.0) * span)
            .clamp(SEEK_EDGE_MARGIN * span, (1.0 - SEEK_EDGE_MARGIN) * span);
        self.clock.set_current_time(time);
        time
    }

    /// Copy the clock's timing onto a freshly created animation so it enters
    /// the group already time-aligned instead of starting from zero.
    pub fn align(&self, animation: &mut A) {
        animation.set_start_time(self.clock.start_time());
        animation.set_current_time(self.clock.current_time());
        animation.set_playback_rate(self.clock.playback_rate());
    }
}
