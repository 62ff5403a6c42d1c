//! Background-safe math for the morph transition engine.
//!
//! This crate holds everything the background execution context runs: layout
//! snapshots, the tree diff, dimensional-difference math, easing, and the
//! keyframe synthesizer (default and media paths). Nothing here touches host
//! handles, and every type that crosses the transport boundary derives serde.
//!
//! # Architecture
//!
//! ```text
//! SnapshotTree (per offset)
//!   └── diff_snapshots ──► DiffReport
//!         └── compute_result ──► ResultTransferable
//!               ├── synthesize_default (translate/scale/clip keyframes)
//!               └── synthesize_media   (wrapper + placeholder plans)
//! ```

pub mod diff;
pub mod easing;
pub mod geometry;
pub mod keyframes;
pub mod media;
pub mod snapshot;
pub mod state;

pub use diff::{DiffReport, DimensionalDifference, ElementDiff, VisibilityChange, diff_snapshots};
pub use easing::{EasingFunction, EasingWindow};
pub use geometry::{BoundingBox, WindowSize, safe_offset, safe_ratio};
pub use keyframes::{
    Keyframe, StyleOverride, TransformFrame, normalize_border_radius, synthesize_default,
};
pub use media::{MediaMount, MediaPlan, content_size, synthesize_media};
pub use snapshot::{
    ComputedStyle, ElementKind, ElementRecord, ObjectFit, PositionMode, SnapshotTree,
};
pub use state::{
    ElementContribution, ResultTransferable, WorkerState, apply_ancestor_patches, compute_result,
    ingest_report, merge_contribution, synthesize_element,
};
