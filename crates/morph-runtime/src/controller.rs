//! The transition handle: lifecycle for one invocation's animation set.
//!
//! One handle owns one invocation end to end: it captures the before/after
//! snapshots around the caller's mutation, ships them to the background
//! context, binds the returned keyframes as native animations, and keeps the
//! whole set coordinated through the timekeeper for play/pause/seek/cancel/
//! finish. The runtime is poll-driven; embedders call [`TransitionHandle::poll`]
//! from their frame loop to drain worker replies and settle pending work.
//!
//! Failure policy: a failed background computation cancels the timekeeper
//! and degrades to the static end state (the caller's mutation has already
//! committed, so the end state is correct even without animation). A key
//! that no longer resolves when results arrive is skipped for that element
//! only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use morph_core::snapshot::SnapshotTree;
use morph_core::state::{ResultTransferable, WorkerState, compute_result};

use crate::backend::{AnimationBackend, AnimationTiming, HostAnimation};
use crate::config::MorphConfig;
use crate::error::EngineError;
use crate::events::{EventQueue, TransitionEvent};
use crate::reactivity::{ReactivityLayer, ReactivityTrigger};
use crate::reader::GeometryReader;
use crate::snapshotter::Snapshotter;
use crate::timekeeper::Timekeeper;
use crate::transport::{SnapshotRequest, WorkerChannel, WorkerReply, WorkerRequest};

/// Lifecycle state of a transition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// Created; the pipeline has not run.
    Idle,
    Running,
    Paused,
    Finished,
    Cancelled,
}

/// Terminal outcome of a transition group, once it has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationResult {
    Finished,
    Cancelled,
}

/// Where the invocation's computation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComputePhase {
    Idle,
    InFlight,
    Ready,
}

/// Generate a fresh invocation key.
fn next_invocation_key() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("inv-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// One invocation's coordinated animation set.
pub struct TransitionHandle<R: GeometryReader, B: AnimationBackend> {
    invocation: String,
    reader: R,
    backend: B,
    root: R::Handle,
    /// The caller's mutation; consumed by the first capture, or by `finish`
    /// when the pipeline never ran.
    mutation: Option<Box<dyn FnOnce(&mut R)>>,
    config: MorphConfig,
    snapshotter: Snapshotter,
    transport: Option<WorkerChannel>,
    /// The snapshots last shipped, kept for mid-flight recomputation.
    last_snapshots: Vec<SnapshotTree>,
    animations: HashMap<String, B::Animation>,
    timekeeper: Option<Timekeeper<B::Animation>>,
    applied_overrides: Vec<String>,
    mounted_media: Vec<morph_core::media::MediaMount>,
    state: PlayState,
    phase: ComputePhase,
    pending_play: bool,
    pending_seek: Option<(f64, bool)>,
    events: EventQueue,
    reactivity: ReactivityLayer,
}

impl<R: GeometryReader, B: AnimationBackend> TransitionHandle<R, B> {
    /// Create a handle for one mutation of the subtree under `root`.
    ///
    /// Nothing runs until `play` or `seek`; the mutation callback executes
    /// exactly once, between the before and after captures.
    pub fn new(
        reader: R,
        backend: B,
        root: R::Handle,
        mutation: impl FnOnce(&mut R) + 'static,
        config: MorphConfig,
    ) -> Self {
        let invocation = next_invocation_key();
        let snapshotter = Snapshotter::new(&invocation);
        Self {
            invocation,
            reader,
            backend,
            root,
            mutation: Some(Box::new(mutation)),
            config,
            snapshotter,
            transport: None,
            last_snapshots: Vec::new(),
            animations: HashMap::new(),
            timekeeper: None,
            applied_overrides: Vec::new(),
            mounted_media: Vec::new(),
            state: PlayState::Idle,
            phase: ComputePhase::Idle,
            pending_play: false,
            pending_seek: None,
            events: EventQueue::new(),
            reactivity: ReactivityLayer::new(),
        }
    }

    pub fn invocation(&self) -> &str {
        &self.invocation
    }

    pub fn play_state(&self) -> PlayState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == PlayState::Finished
    }

    /// The settled outcome, if any.
    pub fn result(&self) -> Option<AnimationResult> {
        match self.state {
            PlayState::Finished => Some(AnimationResult::Finished),
            PlayState::Cancelled => Some(AnimationResult::Cancelled),
            _ => None,
        }
    }

    pub fn total_runtime_ms(&self) -> f64 {
        self.config.animation.duration_ms
    }

    /// Drain queued lifecycle events, oldest first.
    pub fn drain_events(&mut self) -> Vec<TransitionEvent> {
        self.events.drain()
    }

    /// Inspect a live per-element animation (keyed by identity marker).
    pub fn animation(&self, key: &str) -> Option<&B::Animation> {
        self.animations.get(key)
    }

    pub fn animation_keys(&self) -> Vec<&str> {
        self.animations.keys().map(String::as_str).collect()
    }

    pub fn timekeeper(&self) -> Option<&Timekeeper<B::Animation>> {
        self.timekeeper.as_ref()
    }

    /// Start (or resume) playback.
    ///
    /// The first call triggers the full read → diff → synthesize pipeline;
    /// concurrent calls against an in-flight computation await it rather
    /// than re-trigger; at most one computation runs per invocation.
    pub fn play(&mut self) -> Result<(), EngineError> {
        if matches!(self.state, PlayState::Cancelled | PlayState::Finished) {
            return Ok(());
        }
        self.pending_play = true;
        self.ensure_computation()?;
        if self.phase == ComputePhase::Ready {
            self.start_playback();
        }
        Ok(())
    }

    /// Pause the whole set and keep observing for mutations; a mutation
    /// while paused forces a full recomputation on the next `play`.
    pub fn pause(&mut self) {
        if self.state != PlayState::Running {
            return;
        }
        if let Some(keeper) = &mut self.timekeeper {
            keeper.pause();
        }
        for animation in self.animations.values_mut() {
            animation.pause();
        }
        self.reactivity.observe();
        self.state = PlayState::Paused;
    }

    /// Seek to a normalized progress in `[0, 1]`; `done` forces `finish`
    /// afterwards. Works from idle: seeking triggers the pipeline if it has
    /// not run yet and settles once results arrive.
    pub fn seek(&mut self, progress: f64, done: bool) -> Result<(), EngineError> {
        if !progress.is_finite() {
            return Err(EngineError::InvalidProgress(progress));
        }
        if matches!(self.state, PlayState::Cancelled | PlayState::Finished) {
            return Ok(());
        }
        self.ensure_computation()?;
        if self.phase == ComputePhase::Ready {
            self.apply_seek(progress, done);
        } else {
            self.pending_seek = Some((progress, done));
        }
        Ok(())
    }

    /// Cancel everything and roll back: animations, synthetic elements,
    /// overrides, and the pre-mutation base state. Idempotent.
    pub fn cancel(&mut self) {
        if self.state == PlayState::Cancelled {
            return;
        }
        for animation in self.animations.values_mut() {
            animation.cancel();
        }
        self.animations.clear();
        if let Some(keeper) = &mut self.timekeeper {
            keeper.cancel();
        }
        for mount in std::mem::take(&mut self.mounted_media) {
            self.backend.unmount_media(&mount);
        }
        self.revert_overrides();
        self.backend.restore_base_state();
        if let Some(transport) = self.transport.as_mut() {
            transport.cancel_invocation(&self.invocation);
            transport.shutdown();
        }
        self.reactivity.disconnect();
        self.pending_play = false;
        self.pending_seek = None;
        self.state = PlayState::Cancelled;
        self.events.push(TransitionEvent::Cancelled {
            invocation: self.invocation.clone(),
        });
    }

    /// Force the end state. If no animation was ever created, the caller's
    /// mutation is invoked directly so the end state is still reached.
    pub fn finish(&mut self) {
        if matches!(self.state, PlayState::Cancelled | PlayState::Finished) {
            return;
        }
        if let Some(mutation) = self.mutation.take() {
            debug!(invocation = %self.invocation, "finishing without animation");
            mutation(&mut self.reader);
        }
        for animation in self.animations.values_mut() {
            animation.finish();
        }
        if let Some(keeper) = &mut self.timekeeper {
            keeper.finish();
        }
        for mount in std::mem::take(&mut self.mounted_media) {
            self.backend.unmount_media(&mount);
        }
        self.revert_overrides();
        if self.phase == ComputePhase::InFlight {
            if let Some(transport) = self.transport.as_mut() {
                transport.cancel_invocation(&self.invocation);
            }
        }
        self.reactivity.disconnect();
        self.pending_play = false;
        self.pending_seek = None;
        self.state = PlayState::Finished;
        self.events.push(TransitionEvent::Finished {
            invocation: self.invocation.clone(),
        });
    }

    /// Release the deferred below-the-fold wave.
    pub fn start_delayed(&mut self) -> Result<(), EngineError> {
        if let Some(transport) = &self.transport {
            transport.send(&WorkerRequest::StartDelayed {
                invocation: self.invocation.clone(),
            })?;
        }
        Ok(())
    }

    /// Route a host observer trigger into the reactivity layer.
    pub fn notify(&mut self, trigger: ReactivityTrigger) {
        self.reactivity.notify(trigger);
    }

    /// Drain worker replies and settle pending play/seek requests. Call from
    /// the embedder's frame loop.
    pub fn poll(&mut self) -> Result<(), EngineError> {
        let replies = match self.transport.as_mut() {
            Some(transport) => transport.poll(),
            None => return Ok(()),
        };
        for reply in replies {
            if reply.invocation() != self.invocation {
                continue;
            }
            match reply {
                WorkerReply::Result { result, .. } => self.apply_result(result),
                WorkerReply::Delayed { result, .. } => self.apply_delayed(result),
                WorkerReply::Failure { message, .. } => self.handle_failure(message),
            }
        }
        Ok(())
    }

    /// Run the pipeline if it is not already running or done.
    fn ensure_computation(&mut self) -> Result<(), EngineError> {
        // A mutation observed while paused invalidates the computed result.
        if self.phase == ComputePhase::Ready && self.reactivity.take_dirty() {
            debug!(invocation = %self.invocation, "recomputing after mutation");
            for (_, mut animation) in self.animations.drain() {
                animation.cancel();
            }
            self.phase = ComputePhase::Idle;
        }
        if self.phase != ComputePhase::Idle {
            return Ok(());
        }
        self.phase = ComputePhase::InFlight;

        let snapshots = self.capture_snapshots();
        self.last_snapshots = snapshots.clone();
        let request = SnapshotRequest {
            invocation: self.invocation.clone(),
            snapshots,
            default_easing: self.config.animation.easing,
            windows: HashMap::new(),
            deferred: below_fold_keys(&self.last_snapshots),
        };

        if self.config.worker.enabled {
            let transport = self.transport.get_or_insert_with(WorkerChannel::spawn);
            transport.send(&WorkerRequest::Snapshot { request })?;
        } else {
            // Inline fallback: diff and synthesize on the calling context.
            let mut state = WorkerState::new(request.default_easing);
            let result = compute_result(&request.snapshots, &mut state);
            self.apply_result(result);
        }
        Ok(())
    }

    /// Capture the snapshot set for this computation.
    ///
    /// First run: before-capture, the caller's mutation, after-capture. On
    /// recomputation the previous target becomes the old state and a fresh
    /// capture the new one.
    fn capture_snapshots(&mut self) -> Vec<SnapshotTree> {
        match self.mutation.take() {
            Some(mutation) => {
                let before = self.snapshotter.capture(&mut self.reader, &self.root, 0.0);
                mutation(&mut self.reader);
                let after = self.snapshotter.capture(&mut self.reader, &self.root, 1.0);
                vec![before, after]
            }
            None => {
                let current = self.snapshotter.capture(&mut self.reader, &self.root, 1.0);
                match self.last_snapshots.last() {
                    Some(previous) => {
                        let mut before = previous.clone();
                        retag_offsets(&mut before, 0.0);
                        vec![before, current]
                    }
                    None => {
                        let mut before = current.clone();
                        retag_offsets(&mut before, 0.0);
                        vec![before, current]
                    }
                }
            }
        }
    }

    /// Apply the main result wave: overrides, media mounts, animations.
    fn apply_result(&mut self, result: ResultTransferable) {
        self.phase = ComputePhase::Ready;
        self.ensure_timekeeper();

        // Positioning patches must land before any animation starts.
        for (key, style) in &result.overrides {
            if !self.backend.contains(key) {
                continue;
            }
            self.backend.apply_override(key, style);
            self.applied_overrides.push(key.clone());
        }

        for plan in &result.media {
            if !self.backend.contains(&plan.mount.element) {
                warn!(key = %plan.mount.element, "media element vanished; skipped");
                continue;
            }
            if self
                .backend
                .mount_media(&plan.mount, &plan.wrapper_style, &plan.placeholder_style)
            {
                self.mounted_media.push(plan.mount.clone());
                self.bind(&plan.mount.element, &plan.element_keyframes);
                self.bind(&plan.mount.wrapper, &plan.wrapper_keyframes);
            }
        }

        for (key, frames) in &result.keyframes {
            self.bind(key, frames);
        }

        if self.pending_play {
            self.start_playback();
        } else if self.state == PlayState::Running {
            for animation in self.animations.values_mut() {
                animation.play();
            }
        }
        if let Some((progress, done)) = self.pending_seek.take() {
            self.apply_seek(progress, done);
        }
    }

    /// Apply the deferred second wave; late joiners enter time-aligned.
    fn apply_delayed(&mut self, result: ResultTransferable) {
        if matches!(self.state, PlayState::Cancelled | PlayState::Finished) {
            return;
        }
        let before: Vec<String> = self.animations.keys().cloned().collect();
        self.apply_result(result);
        if self.state == PlayState::Running {
            for (key, animation) in self.animations.iter_mut() {
                if !before.contains(key) {
                    animation.play();
                }
            }
        }
    }

    /// Bind keyframes to one element, created paused and aligned to the
    /// timekeeper. A key that no longer resolves is skipped.
    fn bind(&mut self, key: &str, frames: &[morph_core::keyframes::Keyframe]) {
        if !self.backend.contains(key) {
            warn!(key, "element vanished before results arrived; skipped");
            return;
        }
        let timing = AnimationTiming {
            delay_ms: 0.0,
            duration_ms: self.config.animation.duration_ms,
            easing: self.config.animation.easing,
        };
        let Some(mut animation) = self.backend.create_animation(key, frames, &timing) else {
            warn!(key, "backend declined animation; skipped");
            return;
        };
        animation.pause();
        if let Some(keeper) = &self.timekeeper {
            keeper.align(&mut animation);
        }
        self.animations.insert(key.to_string(), animation);
    }

    fn ensure_timekeeper(&mut self) {
        if self.timekeeper.is_none() {
            let total = self.config.animation.duration_ms;
            let clock = self.backend.create_clock(total);
            self.timekeeper = Some(Timekeeper::new(clock, total));
        }
    }

    fn start_playback(&mut self) {
        if self.phase != ComputePhase::Ready {
            return;
        }
        self.pending_play = false;
        if let Some(keeper) = &mut self.timekeeper {
            keeper.play();
        }
        for animation in self.animations.values_mut() {
            animation.play();
        }
        if self.state != PlayState::Running {
            self.state = PlayState::Running;
            self.reactivity.observe();
            self.events.push(TransitionEvent::Started {
                invocation: self.invocation.clone(),
            });
        }
    }

    fn apply_seek(&mut self, progress: f64, done: bool) {
        self.ensure_timekeeper();
        let Some(keeper) = &mut self.timekeeper else {
            return;
        };
        let time = keeper.seek(progress);
        for animation in self.animations.values_mut() {
            animation.set_current_time(time);
        }
        if done {
            self.finish();
        }
    }

    fn revert_overrides(&mut self) {
        for key in std::mem::take(&mut self.applied_overrides) {
            self.backend.revert_override(&key);
        }
    }

    /// Degrade to the static end state: the mutation has already committed,
    /// so the layout is already correct; only the animation is lost.
    fn handle_failure(&mut self, message: String) {
        warn!(
            invocation = %self.invocation,
            %message,
            "computation failed; degrading to static end state"
        );
        if let Some(keeper) = &mut self.timekeeper {
            keeper.cancel();
        }
        self.phase = ComputePhase::Ready;
        self.pending_play = false;
        self.pending_seek = None;
        self.reactivity.disconnect();
        self.state = PlayState::Finished;
        self.events.push(TransitionEvent::ComputationFailed {
            invocation: self.invocation.clone(),
            message,
        });
        self.events.push(TransitionEvent::Finished {
            invocation: self.invocation.clone(),
        });
    }
}

/// Keys whose element sits entirely below the viewport at every offset;
/// their animation data is computed up front but delivered on demand.
fn below_fold_keys(snapshots: &[SnapshotTree]) -> Vec<String> {
    let mut min_top: HashMap<String, f64> = HashMap::new();
    for snapshot in snapshots {
        collect_min_top(snapshot, &mut min_top);
    }
    let Some(first) = snapshots.first() else {
        return Vec::new();
    };
    let fold = first.record.window.height;
    let mut keys: Vec<String> = min_top
        .into_iter()
        .filter(|(key, top)| *top > fold && key != &first.record.key)
        .map(|(key, _)| key)
        .collect();
    keys.sort();
    keys
}

fn collect_min_top(tree: &SnapshotTree, min_top: &mut HashMap<String, f64>) {
    let entry = min_top
        .entry(tree.record.key.clone())
        .or_insert(f64::INFINITY);
    *entry = entry.min(tree.record.bounds.top);
    for child in &tree.children {
        collect_min_top(child, min_top);
    }
}

fn retag_offsets(tree: &mut SnapshotTree, offset: f64) {
    tree.record.offset = offset;
    for child in &mut tree.children {
        retag_offsets(child, offset);
    }
}
