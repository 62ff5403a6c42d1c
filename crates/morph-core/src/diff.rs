//! Tree diffing and dimensional-difference math.
//!
//! Two (or more) snapshots of the same subtree are compared by key, and each
//! element's raw bounding-box delta is decomposed into a translate+scale pair
//! expressed relative to its nearest *animated* ancestor. Unchanged ancestors
//! are skipped when threading that reference through, which is what keeps a
//! child from double-composing a scale its parent already renders.
//!
//! The reference state is always the last offset's readout: keyframes invert
//! the final layout back toward the earlier ones and then play to identity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::geometry::{WindowSize, safe_offset, safe_ratio};
use crate::snapshot::{ElementKind, ElementRecord, SnapshotTree};

/// Scales within this distance of 1 (and deltas within it of 0) are neutral.
const NEUTRAL_EPSILON: f64 = 1e-4;

/// Aspect-ratio drift below this is not worth a media animation.
const RATIO_EPSILON: f64 = 1e-3;

/// One element's decomposed difference at one state offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionalDifference {
    pub offset: f64,
    pub left_delta: f64,
    pub top_delta: f64,
    pub width_scale: f64,
    pub height_scale: f64,
}

impl DimensionalDifference {
    /// The identity difference at a given offset.
    pub fn neutral(offset: f64) -> Self {
        Self {
            offset,
            left_delta: 0.0,
            top_delta: 0.0,
            width_scale: 1.0,
            height_scale: 1.0,
        }
    }

    /// True if applying this difference would render no visible change.
    pub fn is_neutral(&self) -> bool {
        self.left_delta.abs() < NEUTRAL_EPSILON
            && self.top_delta.abs() < NEUTRAL_EPSILON
            && (self.width_scale - 1.0).abs() < NEUTRAL_EPSILON
            && (self.height_scale - 1.0).abs() < NEUTRAL_EPSILON
    }
}

/// How an element's visibility changes across the whole invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityChange {
    None,
    /// Invisible at the first offset, visible at the last.
    Appearing,
    /// Visible at the first offset, invisible at the last.
    Disappearing,
}

/// The diff engine's verdict for one element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDiff {
    pub key: String,
    /// Key of the nearest animated ancestor, if any.
    pub parent: Option<String>,
    /// Key of the immediate DOM parent, if any.
    pub dom_parent: Option<String>,
    /// Complete per-offset records; absent offsets synthesized as collapsed.
    pub records: Vec<ElementRecord>,
    /// One difference per offset, relative to the last-offset reference.
    pub differences: Vec<DimensionalDifference>,
    pub animate: bool,
    pub visibility: VisibilityChange,
    /// True if the element's direct child-key set changed between snapshots.
    pub children_changed: bool,
}

/// Everything the diff pass produced for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffReport {
    /// Visited elements in depth-first order. Skipped subtrees are absent.
    pub elements: Vec<ElementDiff>,
    /// Keys of elements that must receive a positioning override because a
    /// child of theirs vanishes mid-flight.
    pub ancestor_overrides: Vec<String>,
}

impl DiffReport {
    /// True when nothing needs animating.
    pub fn is_empty(&self) -> bool {
        self.elements.iter().all(|e| !e.animate)
    }

    /// Iterate only the elements that need animating.
    pub fn animated(&self) -> impl Iterator<Item = &ElementDiff> {
        self.elements.iter().filter(|e| e.animate)
    }
}

/// Decompose one element's box change into an ancestor-corrected difference.
///
/// All ratios are `current / reference`; non-finite results clamp to the
/// neutral value. Text elements scale uniformly (the average of the two axis
/// ratios of their parent is divided out) so glyphs never stretch.
pub fn dimensional_difference(
    current: &ElementRecord,
    reference: &ElementRecord,
    parent_current: Option<&ElementRecord>,
    parent_reference: Option<&ElementRecord>,
) -> DimensionalDifference {
    let (parent_width_scale, parent_height_scale) = match (parent_current, parent_reference) {
        (Some(pc), Some(pr)) => (
            safe_ratio(pc.bounds.width, pr.bounds.width),
            safe_ratio(pc.bounds.height, pr.bounds.height),
        ),
        _ => (1.0, 1.0),
    };

    let (width_scale, height_scale) = match current.kind {
        ElementKind::Text => {
            let raw = safe_ratio(
                current.bounds.width + current.bounds.height,
                reference.bounds.width + reference.bounds.height,
            );
            let parent_uniform = (parent_width_scale + parent_height_scale) / 2.0;
            let corrected = safe_ratio(raw, parent_uniform);
            (corrected, corrected)
        }
        _ => (
            safe_ratio(
                safe_ratio(current.bounds.width, reference.bounds.width),
                parent_width_scale,
            ),
            safe_ratio(
                safe_ratio(current.bounds.height, reference.bounds.height),
                parent_height_scale,
            ),
        ),
    };

    let (cur_ox, cur_oy) = current.origin_point();
    let (ref_ox, ref_oy) = reference.origin_point();
    let (pc_ox, pc_oy) = parent_current.map(|p| p.origin_point()).unwrap_or((0.0, 0.0));
    let (pr_ox, pr_oy) = parent_reference
        .map(|p| p.origin_point())
        .unwrap_or((0.0, 0.0));

    let left_delta = safe_offset((cur_ox - pc_ox) / parent_width_scale - (ref_ox - pr_ox));
    let top_delta = safe_offset((cur_oy - pc_oy) / parent_height_scale - (ref_oy - pr_oy));

    DimensionalDifference {
        offset: current.offset,
        left_delta,
        top_delta,
        width_scale,
        height_scale,
    }
}

/// Diff N snapshots of the same subtree (N ≥ 2, reference = last).
///
/// Fewer than two snapshots yields an empty report.
pub fn diff_snapshots(snapshots: &[SnapshotTree]) -> DiffReport {
    let mut report = DiffReport::default();
    if snapshots.len() < 2 {
        return report;
    }

    let offsets: Vec<f64> = snapshots.iter().map(|s| s.record.offset).collect();
    let roots: Vec<Option<&SnapshotTree>> = snapshots.iter().map(Some).collect();
    let merged = merge_nodes(&roots);

    walk(&merged, &offsets, None, None, &mut report);
    report
}

/// A node of the key-merged tree: the same element across every offset.
struct MergedNode<'a> {
    key: String,
    slots: Vec<Option<&'a SnapshotTree>>,
    children: Vec<MergedNode<'a>>,
}

fn merge_nodes<'a>(slots: &[Option<&'a SnapshotTree>]) -> MergedNode<'a> {
    let key = slots
        .iter()
        .flatten()
        .next()
        .map(|t| t.record.key.clone())
        .unwrap_or_default();

    // Canonical child order comes from the last snapshot the element exists
    // in; children that only exist in earlier snapshots are appended after.
    let mut order: Vec<String> = Vec::new();
    if let Some(last) = slots.iter().rev().flatten().next() {
        for child in &last.children {
            order.push(child.record.key.clone());
        }
    }
    for tree in slots.iter().flatten() {
        for child in &tree.children {
            if !order.contains(&child.record.key) {
                order.push(child.record.key.clone());
            }
        }
    }

    let children = order
        .iter()
        .map(|child_key| {
            let child_slots: Vec<Option<&SnapshotTree>> = slots
                .iter()
                .map(|slot| {
                    slot.and_then(|tree| {
                        tree.children.iter().find(|c| &c.record.key == child_key)
                    })
                })
                .collect();
            merge_nodes(&child_slots)
        })
        .collect();

    MergedNode {
        key,
        slots: slots.to_vec(),
        children,
    }
}

fn walk(
    node: &MergedNode<'_>,
    offsets: &[f64],
    animated_parent: Option<&(String, Vec<ElementRecord>)>,
    dom_parent: Option<&str>,
    report: &mut DiffReport,
) {
    let records = complete_records(node, offsets);
    let first = &records[0];
    let last = &records[records.len() - 1];

    // Invisible at both ends: nothing to morph, and nothing below can be
    // visible either.
    if first.is_invisible() && last.is_invisible() {
        return;
    }

    let visibility = match (first.is_invisible(), last.is_invisible()) {
        (true, false) => VisibilityChange::Appearing,
        (false, true) => VisibilityChange::Disappearing,
        _ => VisibilityChange::None,
    };

    let parent_records = animated_parent.map(|(_, records)| records);
    let differences: Vec<DimensionalDifference> = records
        .iter()
        .map(|record| {
            dimensional_difference(
                record,
                last,
                parent_records.map(|p| &p[index_of(offsets, record.offset)]),
                parent_records.map(|p| &p[p.len() - 1]),
            )
        })
        .collect();

    let children_changed = child_set_changed(node);
    let media_ratio_changing = node_media_ratio_changing(first, last);

    let animate = visibility != VisibilityChange::None
        || children_changed
        || media_ratio_changing
        || differences.iter().any(|d| !d.is_neutral());

    if visibility == VisibilityChange::Disappearing {
        if let Some(parent_key) = dom_parent {
            report.ancestor_overrides.push(parent_key.to_string());
        }
    }

    let diff = ElementDiff {
        key: node.key.clone(),
        parent: animated_parent.map(|(key, _)| key.clone()),
        dom_parent: dom_parent.map(str::to_string),
        records: records.clone(),
        differences,
        animate,
        visibility,
        children_changed,
    };
    report.elements.push(diff);

    // A vanished element's subtree vanishes with it; the override path covers
    // the element itself.
    if visibility == VisibilityChange::Disappearing {
        return;
    }

    let own_reference = (node.key.clone(), records);
    let next_parent = if animate {
        Some(&own_reference)
    } else {
        animated_parent
    };

    for child in &node.children {
        walk(child, offsets, next_parent, Some(node.key.as_str()), report);
    }
}

/// Fill the per-offset record list, synthesizing collapsed entries where the
/// element is absent from a snapshot.
fn complete_records(node: &MergedNode<'_>, offsets: &[f64]) -> Vec<ElementRecord> {
    let anchor = node
        .slots
        .iter()
        .flatten()
        .next()
        .map(|t| t.record.clone());

    node.slots
        .iter()
        .enumerate()
        .map(|(i, slot)| match (slot, &anchor) {
            (Some(tree), _) => tree.record.clone(),
            (None, Some(anchor)) => ElementRecord::collapsed_from(anchor, offsets[i]),
            // Unreachable in practice: merged nodes are built from present
            // records. Collapse to a zero record rather than panic.
            (None, None) => ElementRecord::collapsed(&node.key, offsets[i], WindowSize::default()),
        })
        .collect()
}

fn child_set_changed(node: &MergedNode<'_>) -> bool {
    let set_at = |slot: &Option<&SnapshotTree>| -> BTreeSet<String> {
        slot.map(|t| t.child_key_set()).unwrap_or_default()
    };
    let first = set_at(&node.slots[0]);
    let last = set_at(&node.slots[node.slots.len() - 1]);
    first != last
}

fn node_media_ratio_changing(first: &ElementRecord, last: &ElementRecord) -> bool {
    if first.kind != ElementKind::Media {
        return false;
    }
    if first.bounds.is_empty() || last.bounds.is_empty() {
        return false;
    }
    (first.bounds.aspect() - last.bounds.aspect()).abs() > RATIO_EPSILON
}

fn index_of(offsets: &[f64], offset: f64) -> usize {
    offsets
        .iter()
        .position(|o| (o - offset).abs() < f64::EPSILON)
        .unwrap_or(0)
}
