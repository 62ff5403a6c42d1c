//! Serializable layout-tree snapshots.
//!
//! A snapshot is the unit that crosses the transport boundary: one
//! [`ElementRecord`] per element per state offset, arranged into a
//! [`SnapshotTree`] in depth-first DOM order. The element `key` is the
//! cross-context correlation id, assigned once per element per invocation
//! and reused across every offset, so the diff engine can pair records
//! without holding host handles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::geometry::{BoundingBox, WindowSize};

/// What synthesis path an element takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Ordinary box content; default keyframe path.
    #[default]
    Default,
    /// Text-bearing element; uniform scale correction applies.
    Text,
    /// Replaced content with an intrinsic ratio; wrapper/placeholder path.
    Media,
}

/// Computed `position` value of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionMode {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl PositionMode {
    /// True for elements that establish no positioning context of their own.
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static)
    }
}

/// Computed `object-fit` value of a replaced element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectFit {
    #[default]
    Fill,
    Contain,
    Cover,
    None,
    ScaleDown,
}

/// The enumerated computed-style subset the reader contract exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    /// Raw computed `display` value. `"none"` drives visibility logic.
    pub display: String,
    pub position: PositionMode,
    /// Raw `border-radius` shorthand; normalized later against the target box.
    pub border_radius: String,
    pub object_fit: ObjectFit,
    /// `object-position` as fractional offsets in `[0, 1]` per axis.
    pub object_position: (f64, f64),
    /// `transform-origin` in pixels from the element's top-left corner.
    pub transform_origin: (f64, f64),
    /// The element's own user transform, carried through untouched.
    pub transform: Option<String>,
    pub opacity: f64,
    pub filter: Option<String>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            position: PositionMode::Static,
            border_radius: String::new(),
            object_fit: ObjectFit::Fill,
            object_position: (0.5, 0.5),
            transform_origin: (0.0, 0.0),
            transform: None,
            opacity: 1.0,
            filter: None,
        }
    }
}

impl ComputedStyle {
    /// True when the element is removed from layout entirely.
    pub fn is_display_none(&self) -> bool {
        self.display == "none"
    }
}

/// One element's readout at one state offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Stable identity key; same physical element ⇒ same key at every offset.
    pub key: String,
    /// State offset this record was read at (0 = before, 1 = after).
    pub offset: f64,
    pub bounds: BoundingBox,
    pub window: WindowSize,
    pub style: ComputedStyle,
    pub kind: ElementKind,
    /// Intrinsic width/height ratio for media elements.
    pub media_ratio: Option<f64>,
}

impl ElementRecord {
    /// Synthesize the record of an element absent from one snapshot.
    ///
    /// Appearance and disappearance are modeled as a transition between a
    /// zero-sized collapsed record and a real one, so the diff math needs no
    /// special case for them.
    pub fn collapsed(key: &str, offset: f64, window: WindowSize) -> Self {
        Self {
            key: key.to_string(),
            offset,
            bounds: BoundingBox::collapsed(),
            window,
            style: ComputedStyle {
                display: "none".to_string(),
                ..ComputedStyle::default()
            },
            kind: ElementKind::Default,
            media_ratio: None,
        }
    }

    /// Synthesize a collapsed record anchored at a known counterpart.
    ///
    /// The zero-sized box sits at the counterpart's top-left corner so an
    /// appearing element grows out of its own slot instead of flying in from
    /// the viewport origin.
    pub fn collapsed_from(present: &ElementRecord, offset: f64) -> Self {
        let mut record = Self::collapsed(&present.key, offset, present.window);
        record.bounds.left = present.bounds.left;
        record.bounds.top = present.bounds.top;
        record.kind = present.kind;
        record.media_ratio = present.media_ratio;
        record
    }

    /// True when the element contributes nothing visually at this offset.
    pub fn is_invisible(&self) -> bool {
        self.bounds.is_empty() || self.style.is_display_none()
    }

    /// Absolute transform-origin point in viewport coordinates.
    pub fn origin_point(&self) -> (f64, f64) {
        (
            self.bounds.left + self.style.transform_origin.0,
            self.bounds.top + self.style.transform_origin.1,
        )
    }
}

/// A subtree of element records in depth-first DOM order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTree {
    pub record: ElementRecord,
    pub children: Vec<SnapshotTree>,
}

impl SnapshotTree {
    /// A leaf node with no children.
    pub fn leaf(record: ElementRecord) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }

    /// Find a node by key anywhere in the subtree.
    pub fn find(&self, key: &str) -> Option<&SnapshotTree> {
        if self.record.key == key {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(key))
    }

    /// Every key in the subtree, in depth-first order.
    pub fn keys(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_keys(&mut out);
        out
    }

    fn collect_keys(&self, out: &mut Vec<String>) {
        out.push(self.record.key.clone());
        for child in &self.children {
            child.collect_keys(out);
        }
    }

    /// The set of direct child keys, for reconciliation checks.
    pub fn child_key_set(&self) -> BTreeSet<String> {
        self.children
            .iter()
            .map(|c| c.record.key.clone())
            .collect()
    }

    /// Total number of elements in the subtree.
    pub fn element_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.element_count()).sum::<usize>()
    }
}
