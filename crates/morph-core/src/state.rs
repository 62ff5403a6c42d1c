//! Invocation-scoped worker state and the synthesis driver.
//!
//! `WorkerState` is the background context's only mutable store: an arena
//! keyed by element key, rebuilt whenever a new snapshot set arrives and
//! discarded when the invocation completes. Nothing here outlives an
//! invocation, which is what keeps concurrent invocations from corrupting
//! each other.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::diff::{VisibilityChange, diff_snapshots};
use crate::easing::{EasingFunction, EasingWindow};
use crate::keyframes::{Keyframe, StyleOverride, synthesize_default};
use crate::media::{MediaPlan, synthesize_media};
use crate::snapshot::{ElementKind, ElementRecord, SnapshotTree};

/// The only data that crosses back from the background context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultTransferable {
    /// Keyframes for default-path elements, keyed by element key.
    pub keyframes: HashMap<String, Vec<Keyframe>>,
    /// One-shot style patches applied at animation start, reverted at end.
    pub overrides: HashMap<String, StyleOverride>,
    /// Wrapper/placeholder plans for media elements (keyframes included).
    pub media: Vec<MediaPlan>,
}

impl ResultTransferable {
    /// True when nothing needs animating.
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty() && self.media.is_empty()
    }

    /// Split out the entries for deferred (below-the-fold) elements.
    ///
    /// Overrides stay in the immediate part: positioning patches must apply
    /// when playback starts, not when the second wave is released.
    pub fn split_deferred(mut self, deferred: &[String]) -> (Self, Self) {
        let mut held = Self::default();
        for key in deferred {
            if let Some(frames) = self.keyframes.remove(key) {
                held.keyframes.insert(key.clone(), frames);
            }
        }
        let (kept, deferred_media) = self
            .media
            .into_iter()
            .partition(|plan| !deferred.contains(&plan.mount.element));
        self.media = kept;
        held.media = deferred_media;
        (self, held)
    }
}

/// Background-context arena for one invocation.
///
/// Maps element key to its ordered readouts, DOM parent, easing window, and
/// (through the records) media ratio and element kind.
#[derive(Debug, Clone)]
pub struct WorkerState {
    readouts: HashMap<String, Vec<ElementRecord>>,
    parents: HashMap<String, Option<String>>,
    windows: HashMap<String, EasingWindow>,
    default_window: EasingWindow,
    /// Depth-first visit order of the last diff pass.
    order: Vec<String>,
}

impl WorkerState {
    pub fn new(default_easing: EasingFunction) -> Self {
        Self {
            readouts: HashMap::new(),
            parents: HashMap::new(),
            windows: HashMap::new(),
            default_window: EasingWindow::full(default_easing),
            order: Vec::new(),
        }
    }

    /// Assign a per-element timing window (stagger, deferred waves).
    pub fn set_window(&mut self, key: &str, window: EasingWindow) {
        self.windows.insert(key.to_string(), window);
    }

    pub fn window_for(&self, key: &str) -> EasingWindow {
        self.windows.get(key).copied().unwrap_or(self.default_window)
    }

    pub fn readouts_for(&self, key: &str) -> Option<&[ElementRecord]> {
        self.readouts.get(key).map(Vec::as_slice)
    }

    pub fn parent_of(&self, key: &str) -> Option<&str> {
        self.parents.get(key).and_then(|p| p.as_deref())
    }

    pub fn visit_order(&self) -> &[String] {
        &self.order
    }

    /// Drop all per-invocation data; called between snapshot arrivals.
    pub fn clear(&mut self) {
        self.readouts.clear();
        self.parents.clear();
        self.order.clear();
    }

    fn record_at_last(&self, key: &str) -> Option<&ElementRecord> {
        self.readouts.get(key).and_then(|records| records.last())
    }
}

/// One element's share of the transferable result.
///
/// Produced by [`synthesize_element`] so a driver can spread synthesis
/// across scheduler tasks and merge contributions as they complete.
#[derive(Debug, Clone, Default)]
pub struct ElementContribution {
    pub keyframes: Option<(String, Vec<Keyframe>)>,
    pub media: Option<MediaPlan>,
    pub override_patch: Option<(String, StyleOverride)>,
}

/// Rebuild the arena from a fresh diff report.
pub fn ingest_report(state: &mut WorkerState, report: &crate::diff::DiffReport) {
    state.clear();
    for element in &report.elements {
        state
            .readouts
            .insert(element.key.clone(), element.records.clone());
        state
            .parents
            .insert(element.key.clone(), element.dom_parent.clone());
        state.order.push(element.key.clone());
    }
}

/// Synthesize one animated element's keyframes and overrides.
pub fn synthesize_element(
    state: &WorkerState,
    element: &crate::diff::ElementDiff,
) -> ElementContribution {
    let window = state.window_for(&element.key);
    let parent_record = element
        .dom_parent
        .as_deref()
        .and_then(|parent| state.record_at_last(parent))
        .cloned();

    let mut contribution = ElementContribution::default();

    let kind = element.records[element.records.len() - 1].kind;
    match kind {
        ElementKind::Media => {
            contribution.media = Some(synthesize_media(
                &element.key,
                &element.records,
                &element.differences,
                parent_record.as_ref(),
                &window,
            ));
        }
        _ => {
            let frames = synthesize_default(&element.records, &element.differences, &window);
            contribution.keyframes = Some((element.key.clone(), frames));
        }
    }

    // Elements that start or end hidden are pinned to their visible-end
    // geometry for the duration of the animation.
    let visible = match element.visibility {
        VisibilityChange::Disappearing => Some(&element.records[0]),
        VisibilityChange::Appearing => Some(&element.records[element.records.len() - 1]),
        VisibilityChange::None => None,
    };
    if let Some(visible) = visible {
        contribution.override_patch = Some((
            element.key.clone(),
            StyleOverride::hidden_placement(visible, parent_record.as_ref()),
        ));
    }

    contribution
}

/// Fold one element's contribution into the transferable result.
pub fn merge_contribution(result: &mut ResultTransferable, contribution: ElementContribution) {
    if let Some((key, frames)) = contribution.keyframes {
        result.keyframes.insert(key, frames);
    }
    if let Some(plan) = contribution.media {
        result.media.push(plan);
    }
    if let Some((key, patch)) = contribution.override_patch {
        result.overrides.insert(key, patch);
    }
}

/// Patch statically positioned ancestors of vanished elements with
/// `position: relative` so the absolute pins resolve against them.
pub fn apply_ancestor_patches(
    state: &WorkerState,
    report: &crate::diff::DiffReport,
    result: &mut ResultTransferable,
) {
    for key in &report.ancestor_overrides {
        let needs_patch = state
            .record_at_last(key)
            .map(|record| record.style.position.is_static())
            .unwrap_or(false);
        if needs_patch {
            result
                .overrides
                .entry(key.clone())
                .or_insert_with(StyleOverride::position_relative);
        }
    }
}

/// Run the full diff → synthesis pass over one snapshot set.
///
/// Rebuilds `state` from the snapshots, then produces the transferable
/// result: default keyframes, media plans, and visibility-driven overrides.
pub fn compute_result(snapshots: &[SnapshotTree], state: &mut WorkerState) -> ResultTransferable {
    let report = diff_snapshots(snapshots);
    ingest_report(state, &report);

    let mut result = ResultTransferable::default();
    for element in report.animated() {
        let contribution = synthesize_element(state, element);
        merge_contribution(&mut result, contribution);
    }
    apply_ancestor_patches(state, &report, &mut result);
    result
}
