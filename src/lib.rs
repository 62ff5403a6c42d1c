//! morph: a FLIP-style visual-transition engine.
//!
//! Given a synchronous mutation of a host subtree, morph computes, for every
//! affected element, a keyframe sequence that morphs the element from its
//! pre-mutation layout to its post-mutation one; the caller never specifies
//! intermediate frames. Layout is read from the host through a
//! [`GeometryReader`], the diff and keyframe synthesis run on a background
//! context, and the resulting animations are bound back through an
//! [`AnimationBackend`] and coordinated by one timekeeper.
//!
//! ```ignore
//! use morph::{transition, ReactivityTrigger};
//!
//! let mut handle = transition(reader, backend, root, |host| {
//!     // the caller's "after" mutation
//!     host.apply_layout_change();
//! })?;
//!
//! handle.play()?;
//! // each frame:
//! handle.poll()?;
//! for event in handle.drain_events() {
//!     // Started / Finished / Cancelled / ComputationFailed
//! }
//! ```

pub use morph_runtime::{
    AnimationBackend, AnimationResult, AnimationTiming, BoundingBox, DimensionalDifference,
    EasingFunction, EasingWindow, ElementRecord, EngineError, EventQueue, GeometryReader,
    HostAnimation, Keyframe, MediaPlan, MorphConfig, NativePlayState, PlayState, ReactivityLayer,
    ReactivityTrigger, ResultTransferable, Scheduler, SnapshotTree, Snapshotter, StyleOverride,
    TaskSpawner, Timekeeper, TransitionEvent, TransitionHandle, Wakeup, WindowSize, WorkerChannel,
    WorkerReply, WorkerRequest,
};

pub use morph_runtime::controller;
pub use morph_runtime::scheduler;
pub use morph_runtime::transport;

/// Create a transition for one mutation of the subtree under `root`, with
/// configuration from `morph.toml` when present.
pub fn transition<R, B>(
    reader: R,
    backend: B,
    root: R::Handle,
    mutation: impl FnOnce(&mut R) + 'static,
) -> anyhow::Result<TransitionHandle<R, B>>
where
    R: GeometryReader,
    B: AnimationBackend,
{
    use anyhow::Context;

    let path = std::path::Path::new("morph.toml");
    let config = if path.exists() {
        MorphConfig::load(path).context("loading morph.toml")?
    } else {
        MorphConfig::default()
    };
    Ok(TransitionHandle::new(reader, backend, root, mutation, config))
}

/// Same as [`transition`] but with explicit configuration.
pub fn transition_with_config<R, B>(
    reader: R,
    backend: B,
    root: R::Handle,
    mutation: impl FnOnce(&mut R) + 'static,
    config: MorphConfig,
) -> TransitionHandle<R, B>
where
    R: GeometryReader,
    B: AnimationBackend,
{
    TransitionHandle::new(reader, backend, root, mutation, config)
}
