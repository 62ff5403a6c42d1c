//! Replaced-element synthesis: the wrapper/placeholder technique.
//!
//! A replaced element's paint is governed by its intrinsic ratio, so a plain
//! translate+scale misrenders the crop mid-flight. Instead, three coordinated
//! pieces are synthesized: the element itself animates only its internal
//! crop, an absolutely positioned wrapper carries the outer transform and
//! positional clip-path, and an inert placeholder holds the original DOM slot
//! so sibling layout is undisturbed while the element is re-parented into the
//! wrapper. The swap back happens on finish *and* cancel.

use serde::{Deserialize, Serialize};

use crate::diff::DimensionalDifference;
use crate::easing::EasingWindow;
use crate::geometry::{BoundingBox, safe_ratio};
use crate::keyframes::{Keyframe, StyleOverride, TransformFrame, fmt_num};
use crate::snapshot::{ElementRecord, ObjectFit, PositionMode};

/// The element/wrapper/placeholder key triple for one media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMount {
    pub element: String,
    pub wrapper: String,
    pub placeholder: String,
}

impl MediaMount {
    pub fn for_element(key: &str) -> Self {
        Self {
            element: key.to_string(),
            wrapper: wrapper_key(key),
            placeholder: placeholder_key(key),
        }
    }
}

/// Derived key of the synthetic wrapper host for a media element.
pub fn wrapper_key(key: &str) -> String {
    format!("{key}::wrapper")
}

/// Derived key of the synthetic placeholder for a media element.
pub fn placeholder_key(key: &str) -> String {
    format!("{key}::placeholder")
}

/// Everything the controller needs to mount and drive one media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPlan {
    pub mount: MediaMount,
    /// Internal crop/scale animation of the element itself.
    pub element_keyframes: Vec<Keyframe>,
    /// Outer transform + positional clip-path on the wrapper.
    pub wrapper_keyframes: Vec<Keyframe>,
    /// Geometry the wrapper is mounted with (parent-relative, max box sized).
    pub wrapper_style: StyleOverride,
    /// Geometry the placeholder holds the original slot with.
    pub placeholder_style: StyleOverride,
}

/// The rendered content size of a replaced element inside a layout box.
///
/// For `cover` the content spans the larger of the width-driven and
/// height-driven sizes: whichever side is ratio-constrained wins and the
/// other axis overflows (and is cropped).
pub fn content_size(bounds: &BoundingBox, ratio: f64, fit: ObjectFit) -> (f64, f64) {
    if bounds.is_empty() || !ratio.is_finite() || ratio <= 0.0 {
        return (bounds.width, bounds.height);
    }
    match fit {
        ObjectFit::Fill => (bounds.width, bounds.height),
        ObjectFit::Cover => {
            let width = bounds.width.max(bounds.height * ratio);
            (width, width / ratio)
        }
        ObjectFit::Contain | ObjectFit::None | ObjectFit::ScaleDown => {
            let width = bounds.width.min(bounds.height * ratio);
            (width, width / ratio)
        }
    }
}

/// Synthesize the media plan for one element.
///
/// `records` and `differences` are the element's per-offset data from the
/// diff engine; `dom_parent` is the record the wrapper is positioned against.
pub fn synthesize_media(
    key: &str,
    records: &[ElementRecord],
    differences: &[DimensionalDifference],
    dom_parent: Option<&ElementRecord>,
    window: &EasingWindow,
) -> MediaPlan {
    let last = &records[records.len() - 1];
    let ratio = last
        .media_ratio
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or_else(|| last.bounds.aspect());

    let max_width = records
        .iter()
        .map(|r| r.bounds.width)
        .fold(0.0_f64, f64::max);
    let max_height = records
        .iter()
        .map(|r| r.bounds.height)
        .fold(0.0_f64, f64::max);

    let (reference_content_width, _) = content_size(&last.bounds, ratio, last.style.object_fit);
    let reference_shift = content_shift(last, ratio);

    let mut element_keyframes = Vec::with_capacity(records.len());
    let mut wrapper_keyframes = Vec::with_capacity(records.len());

    for (record, difference) in records.iter().zip(differences.iter()) {
        let offset = window.globalize(difference.offset);

        // Internal crop: uniform content scale relative to the reference,
        // plus the object-position shift inside the max bounding box.
        let (content_width, _) = content_size(&record.bounds, ratio, record.style.object_fit);
        let scale = safe_ratio(content_width, reference_content_width);
        let (shift_x, shift_y) = content_shift(record, ratio);
        let element_frame = TransformFrame {
            translate_x: shift_x - reference_shift.0,
            translate_y: shift_y - reference_shift.1,
            scale_x: scale,
            scale_y: scale,
        };
        element_keyframes.push(Keyframe::new(offset, element_frame, window.easing));

        // The wrapper owns position; size is revealed by the clip inset.
        let wrapper_frame = TransformFrame {
            translate_x: difference.left_delta,
            translate_y: difference.top_delta,
            scale_x: 1.0,
            scale_y: 1.0,
        };
        let mut wrapper_kf = Keyframe::new(offset, wrapper_frame, window.easing);
        wrapper_kf.clip_path = Some(format!(
            "inset(0px {}px {}px 0px)",
            fmt_num((max_width - record.bounds.width).max(0.0)),
            fmt_num((max_height - record.bounds.height).max(0.0))
        ));
        wrapper_keyframes.push(wrapper_kf);
    }

    let (parent_left, parent_top) = dom_parent
        .map(|p| (p.bounds.left, p.bounds.top))
        .unwrap_or((0.0, 0.0));

    let wrapper_style = StyleOverride {
        position: Some(PositionMode::Absolute),
        left: Some(last.bounds.left - parent_left),
        top: Some(last.bounds.top - parent_top),
        width: Some(max_width),
        height: Some(max_height),
        border_radius: None,
    };

    let placeholder_style = StyleOverride {
        position: None,
        left: None,
        top: None,
        width: Some(last.bounds.width),
        height: Some(last.bounds.height),
        border_radius: None,
    };

    MediaPlan {
        mount: MediaMount::for_element(key),
        element_keyframes,
        wrapper_keyframes,
        wrapper_style,
        placeholder_style,
    }
}

/// Where the content sits inside its box, from `object-position`.
///
/// CSS aligns the p% point of the content with the p% point of the box, so
/// the content's top-left offset is `(box - content) * p` per axis.
fn content_shift(record: &ElementRecord, ratio: f64) -> (f64, f64) {
    let (content_width, content_height) =
        content_size(&record.bounds, ratio, record.style.object_fit);
    let (px, py) = record.style.object_position;
    (
        (record.bounds.width - content_width) * px,
        (record.bounds.height - content_height) * py,
    )
}
