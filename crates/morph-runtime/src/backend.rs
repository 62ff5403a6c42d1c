//! The animation backend contract.
//!
//! The controller owns lifecycle and synchronization; the backend owns the
//! host: it creates native animation objects, patches live style, and mounts
//! the synthetic wrapper/placeholder pairs for media elements. Elements are
//! addressed by their identity marker, the same string key the background
//! context correlates on, so a backend re-acquires elements by selector
//! after computation completes.

use serde::{Deserialize, Serialize};

use morph_core::easing::EasingFunction;
use morph_core::keyframes::{Keyframe, StyleOverride};
use morph_core::media::MediaMount;

/// Timing a native animation is created with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationTiming {
    /// Delay before the element's window opens, milliseconds.
    pub delay_ms: f64,
    /// Active duration of the element's window, milliseconds.
    pub duration_ms: f64,
    /// Default easing for segments without per-keyframe easing.
    pub easing: EasingFunction,
}

/// Play state reported by a native animation object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativePlayState {
    Idle,
    Running,
    Paused,
    Finished,
}

/// One native animation bound to one live element.
///
/// Times are milliseconds on the group timeline. Implementations must accept
/// writes in any state; the controller uses them to keep every animation
/// aligned with the timekeeper.
pub trait HostAnimation {
    fn play(&mut self);
    fn pause(&mut self);
    fn cancel(&mut self);
    fn finish(&mut self);

    fn set_start_time(&mut self, ms: Option<f64>);
    fn start_time(&self) -> Option<f64>;

    fn set_current_time(&mut self, ms: f64);
    fn current_time(&self) -> f64;

    fn set_playback_rate(&mut self, rate: f64);
    fn playback_rate(&self) -> f64;

    fn play_state(&self) -> NativePlayState;
}

/// Host-side effects the controller needs.
pub trait AnimationBackend {
    type Animation: HostAnimation;

    /// Whether the key still resolves to a live element. Stale keys are
    /// skipped per element, never aborting the group.
    fn contains(&self, key: &str) -> bool;

    /// Bind keyframes to the element with the given key. Returns `None` when
    /// the element no longer exists.
    fn create_animation(
        &mut self,
        key: &str,
        keyframes: &[Keyframe],
        timing: &AnimationTiming,
    ) -> Option<Self::Animation>;

    /// Create the no-effect controlling animation the timekeeper wraps.
    fn create_clock(&mut self, duration_ms: f64) -> Self::Animation;

    /// Apply a one-shot style patch to an element.
    fn apply_override(&mut self, key: &str, style: &StyleOverride);

    /// Revert a previously applied patch.
    fn revert_override(&mut self, key: &str);

    /// Mount a wrapper/placeholder pair and re-parent the media element into
    /// the wrapper. Returns false when the element no longer exists.
    fn mount_media(
        &mut self,
        mount: &MediaMount,
        wrapper_style: &StyleOverride,
        placeholder_style: &StyleOverride,
    ) -> bool;

    /// Swap the media element back into its original slot and discard the
    /// wrapper/placeholder pair. Called on finish and on cancel alike.
    fn unmount_media(&mut self, mount: &MediaMount);

    /// Restore the attribute/style snapshot taken before the first mutation
    /// executed. Called on cancel.
    fn restore_base_state(&mut self);
}
