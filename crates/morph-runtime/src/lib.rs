//! Host-facing runtime for the morph transition engine.
//!
//! This crate wires the pieces around `morph-core`'s math: the geometry
//! reader contract, the tree snapshotter, the background worker transport,
//! the cooperative scheduler, the animation controller with its timekeeper,
//! the reactivity layer, configuration, and the error taxonomy.
//!
//! # Execution model
//!
//! Two cooperative single-threaded contexts communicate only by message
//! passing: the main context owns the host (reader + backend) and the
//! background context owns the math. Everything on the main side is
//! poll-driven: embedders call [`controller::TransitionHandle::poll`] from
//! their frame loop, and completion surfaces as [`events::TransitionEvent`]s.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod reactivity;
pub mod reader;
pub mod scheduler;
pub mod snapshotter;
pub mod timekeeper;
pub mod transport;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use morph_core::{
    BoundingBox, DimensionalDifference, EasingFunction, EasingWindow, ElementRecord, Keyframe,
    MediaPlan, ResultTransferable, SnapshotTree, StyleOverride, WindowSize,
};

pub use backend::{AnimationBackend, AnimationTiming, HostAnimation, NativePlayState};
pub use config::{AnimationConfig, MorphConfig, SchedulerConfig, WorkerConfig};
pub use controller::{AnimationResult, PlayState, TransitionHandle};
pub use error::EngineError;
pub use events::{EventQueue, TransitionEvent};
pub use reactivity::{ReactivityLayer, ReactivityTrigger};
pub use reader::GeometryReader;
pub use scheduler::{Scheduler, TaskSpawner, Wakeup};
pub use snapshotter::Snapshotter;
pub use timekeeper::Timekeeper;
pub use transport::{SnapshotRequest, WorkerChannel, WorkerReply, WorkerRequest};
