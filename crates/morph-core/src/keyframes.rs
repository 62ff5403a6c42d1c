//! Keyframe types and the default synthesis path.
//!
//! A keyframe carries everything the host timeline needs for one offset: the
//! inverted transform, an optional clip-path (border radii under non-uniform
//! scale), and opacity/filter entries when those actually vary. Constant
//! values are never re-specified, so they keep composing with whatever other
//! effects the host has running.

use serde::{Deserialize, Serialize};

use crate::diff::DimensionalDifference;
use crate::easing::{EasingFunction, EasingWindow};
use crate::geometry::BoundingBox;
use crate::snapshot::{ElementRecord, PositionMode};

/// The translate+scale pair a dimensional difference renders as.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformFrame {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for TransformFrame {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl TransformFrame {
    /// Lift a dimensional difference into its rendered transform.
    pub fn from_difference(difference: &DimensionalDifference) -> Self {
        Self {
            translate_x: difference.left_delta,
            translate_y: difference.top_delta,
            scale_x: difference.width_scale,
            scale_y: difference.height_scale,
        }
    }

    pub fn is_neutral(&self) -> bool {
        self == &Self::default()
    }

    /// Render as a CSS transform list.
    pub fn to_css(&self) -> String {
        format!(
            "translate({}px, {}px) scale({}, {})",
            fmt_num(self.translate_x),
            fmt_num(self.translate_y),
            fmt_num(self.scale_x),
            fmt_num(self.scale_y)
        )
    }
}

/// A single point on an element's animation timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Position on the group timeline (0.0 to 1.0).
    pub offset: f64,
    pub transform: TransformFrame,
    /// The element's own transform, appended after the synthesized one.
    pub user_transform: Option<String>,
    /// Easing toward the next keyframe.
    pub easing: EasingFunction,
    pub clip_path: Option<String>,
    pub opacity: Option<f64>,
    pub filter: Option<String>,
}

impl Keyframe {
    pub fn new(offset: f64, transform: TransformFrame, easing: EasingFunction) -> Self {
        Self {
            offset: offset.clamp(0.0, 1.0),
            transform,
            user_transform: None,
            easing,
            clip_path: None,
            opacity: None,
            filter: None,
        }
    }

    /// The full transform declaration: synthesized frame, then user transform.
    pub fn css_transform(&self) -> String {
        match &self.user_transform {
            Some(user) => format!("{} {}", self.transform.to_css(), user),
            None => self.transform.to_css(),
        }
    }
}

/// A one-shot style patch applied at animation start and reverted at its end.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleOverride {
    pub position: Option<PositionMode>,
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub border_radius: Option<String>,
}

impl StyleOverride {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// The `position: relative` patch a static ancestor needs so a vanished
    /// child can still be positioned against it.
    pub fn position_relative() -> Self {
        Self {
            position: Some(PositionMode::Relative),
            ..Self::default()
        }
    }

    /// Pin an element that starts or ends hidden to its last real geometry,
    /// parent-relative, so it can fade or collapse in place.
    pub fn hidden_placement(
        last_visible: &ElementRecord,
        dom_parent: Option<&ElementRecord>,
    ) -> Self {
        let (parent_left, parent_top) = dom_parent
            .map(|p| (p.bounds.left, p.bounds.top))
            .unwrap_or((0.0, 0.0));
        Self {
            position: Some(PositionMode::Absolute),
            left: Some(last_visible.bounds.left - parent_left),
            top: Some(last_visible.bounds.top - parent_top),
            width: Some(last_visible.bounds.width),
            height: Some(last_visible.bounds.height),
            border_radius: None,
        }
    }
}

/// Synthesize the default keyframe path for one element.
///
/// One keyframe per offset; radii only when some offset has one, and
/// opacity/filter only when they vary.
pub fn synthesize_default(
    records: &[ElementRecord],
    differences: &[DimensionalDifference],
    window: &EasingWindow,
) -> Vec<Keyframe> {
    let target = &records[records.len() - 1].bounds;
    let any_radius = records
        .iter()
        .any(|r| normalize_border_radius(&r.style.border_radius, target).is_some());
    let opacity_varies = varies(records.iter().map(|r| r.style.opacity));
    let filter_varies = {
        let first = &records[0].style.filter;
        records.iter().any(|r| &r.style.filter != first)
    };

    records
        .iter()
        .zip(differences.iter())
        .map(|(record, difference)| {
            let mut frame = Keyframe::new(
                window.globalize(difference.offset),
                TransformFrame::from_difference(difference),
                window.easing,
            );
            frame.user_transform = record.style.transform.clone();
            if any_radius {
                frame.clip_path = Some(
                    normalize_border_radius(&record.style.border_radius, target)
                        .unwrap_or_else(|| "inset(0px)".to_string()),
                );
            }
            if opacity_varies {
                frame.opacity = Some(record.style.opacity);
            }
            if filter_varies {
                frame.filter = Some(record.style.filter.clone().unwrap_or_else(|| "none".into()));
            }
            frame
        })
        .collect()
}

/// Renormalize a border-radius shorthand against the target box.
///
/// Radius percentages are axis-relative, so pixel values become independent
/// horizontal/vertical percentage pairs of the *final* box; copying the raw
/// string would misrender under non-uniform scale. Elliptical `/` shorthand
/// is unsupported and degrades to no radius.
///
/// Returns `None` when the radius is zero everywhere (callers omit the
/// clip-path entirely in that case).
pub fn normalize_border_radius(radius: &str, target: &BoundingBox) -> Option<String> {
    let radius = radius.trim();
    if radius.is_empty() || radius.contains('/') {
        return None;
    }
    if target.is_empty() {
        return None;
    }

    let values: Vec<RadiusValue> = radius
        .split_whitespace()
        .map(RadiusValue::parse)
        .collect::<Option<_>>()?;
    if values.is_empty() || values.len() > 4 {
        return None;
    }
    if values.iter().all(|v| v.amount == 0.0) {
        return None;
    }

    // CSS shorthand expansion: top-left, top-right, bottom-right, bottom-left.
    let corners = match values.len() {
        1 => [values[0]; 4],
        2 => [values[0], values[1], values[0], values[1]],
        3 => [values[0], values[1], values[2], values[1]],
        _ => [values[0], values[1], values[2], values[3]],
    };

    let horizontal: Vec<String> = corners
        .iter()
        .map(|v| format!("{}%", fmt_num(v.percent_of(target.width))))
        .collect();
    let vertical: Vec<String> = corners
        .iter()
        .map(|v| format!("{}%", fmt_num(v.percent_of(target.height))))
        .collect();

    Some(format!(
        "inset(0px round {} / {})",
        horizontal.join(" "),
        vertical.join(" ")
    ))
}

/// One parsed border-radius component.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RadiusValue {
    amount: f64,
    is_percent: bool,
}

impl RadiusValue {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(number) = raw.strip_suffix('%') {
            return number.parse().ok().map(|amount| Self {
                amount,
                is_percent: true,
            });
        }
        let number = raw.strip_suffix("px").unwrap_or(raw);
        number.parse().ok().map(|amount| Self {
            amount,
            is_percent: false,
        })
    }

    /// The value as a percentage of the given axis length.
    fn percent_of(&self, axis: f64) -> f64 {
        if self.is_percent {
            self.amount
        } else if axis > 0.0 {
            self.amount / axis * 100.0
        } else {
            0.0
        }
    }
}

fn varies<I: Iterator<Item = f64>>(mut values: I) -> bool {
    match values.next() {
        Some(first) => values.any(|v| (v - first).abs() > 1e-9),
        None => false,
    }
}

/// Format a number without a trailing `.00`.
pub(crate) fn fmt_num(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        let formatted = format!("{value:.2}");
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WindowSize;
    use crate::snapshot::{ComputedStyle, ElementKind};

    fn record(offset: f64, w: f64, h: f64) -> ElementRecord {
        ElementRecord {
            key: "k".to_string(),
            offset,
            bounds: BoundingBox::new(0.0, 0.0, w, h),
            window: WindowSize::new(1280.0, 720.0),
            style: ComputedStyle::default(),
            kind: ElementKind::Default,
            media_ratio: None,
        }
    }

    fn difference(offset: f64, dx: f64, sx: f64) -> DimensionalDifference {
        DimensionalDifference {
            offset,
            left_delta: dx,
            top_delta: 0.0,
            width_scale: sx,
            height_scale: sx,
        }
    }

    #[test]
    fn test_transform_css() {
        let frame = TransformFrame {
            translate_x: 10.0,
            translate_y: -5.5,
            scale_x: 1.5,
            scale_y: 2.0,
        };
        assert_eq!(frame.to_css(), "translate(10px, -5.5px) scale(1.5, 2)");
    }

    #[test]
    fn test_keyframe_appends_user_transform() {
        let mut kf = Keyframe::new(0.0, TransformFrame::default(), EasingFunction::Linear);
        kf.user_transform = Some("rotate(45deg)".to_string());
        assert_eq!(
            kf.css_transform(),
            "translate(0px, 0px) scale(1, 1) rotate(45deg)"
        );
    }

    #[test]
    fn test_default_synthesis_omits_constant_properties() {
        let records = vec![record(0.0, 100.0, 100.0), record(1.0, 200.0, 200.0)];
        let differences = vec![difference(0.0, -50.0, 0.5), difference(1.0, 0.0, 1.0)];
        let frames = synthesize_default(
            &records,
            &differences,
            &EasingWindow::full(EasingFunction::Linear),
        );

        assert_eq!(frames.len(), 2);
        for frame in &frames {
            assert!(frame.clip_path.is_none(), "no radius, no clip-path");
            assert!(frame.opacity.is_none(), "constant opacity is omitted");
            assert!(frame.filter.is_none());
        }
        assert_eq!(frames[0].transform.translate_x, -50.0);
        assert_eq!(frames[1].transform.scale_x, 1.0);
    }

    #[test]
    fn test_default_synthesis_includes_varying_opacity() {
        let mut start = record(0.0, 100.0, 100.0);
        start.style.opacity = 0.0;
        let records = vec![start, record(1.0, 100.0, 100.0)];
        let differences = vec![difference(0.0, 0.0, 1.0), difference(1.0, 0.0, 1.0)];

        let frames = synthesize_default(
            &records,
            &differences,
            &EasingWindow::full(EasingFunction::Linear),
        );
        assert_eq!(frames[0].opacity, Some(0.0));
        assert_eq!(frames[1].opacity, Some(1.0));
    }

    #[test]
    fn test_radius_emitted_for_every_frame_once_any_offset_has_one() {
        let mut start = record(0.0, 100.0, 100.0);
        start.style.border_radius = "8px".to_string();
        let records = vec![start, record(1.0, 200.0, 100.0)];
        let differences = vec![difference(0.0, 0.0, 0.5), difference(1.0, 0.0, 1.0)];

        let frames = synthesize_default(
            &records,
            &differences,
            &EasingWindow::full(EasingFunction::Linear),
        );
        assert!(frames[0].clip_path.as_deref().unwrap().contains("round"));
        assert_eq!(frames[1].clip_path.as_deref(), Some("inset(0px)"));
    }

    #[test]
    fn test_window_maps_offsets_into_group_timeline() {
        let records = vec![record(0.0, 100.0, 100.0), record(1.0, 120.0, 100.0)];
        let differences = vec![difference(0.0, -20.0, 1.0), difference(1.0, 0.0, 1.0)];
        let window = EasingWindow::new(0.25, 0.75, EasingFunction::Linear);

        let frames = synthesize_default(&records, &differences, &window);
        assert!((frames[0].offset - 0.25).abs() < 1e-9);
        assert!((frames[1].offset - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_radius_px_to_axis_percentages() {
        let target = BoundingBox::new(0.0, 0.0, 200.0, 100.0);
        let clip = normalize_border_radius("10px", &target).unwrap();
        assert_eq!(clip, "inset(0px round 5% 5% 5% 5% / 10% 10% 10% 10%)");
    }

    #[test]
    fn test_normalize_radius_percent_passthrough() {
        let target = BoundingBox::new(0.0, 0.0, 200.0, 100.0);
        let clip = normalize_border_radius("50%", &target).unwrap();
        assert_eq!(clip, "inset(0px round 50% 50% 50% 50% / 50% 50% 50% 50%)");
    }

    #[test]
    fn test_normalize_radius_shorthand_expansion() {
        let target = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let clip = normalize_border_radius("10px 20px", &target).unwrap();
        assert_eq!(
            clip,
            "inset(0px round 10% 20% 10% 20% / 10% 20% 10% 20%)"
        );
    }

    #[test]
    fn test_normalize_radius_elliptical_degrades_to_none() {
        let target = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(normalize_border_radius("10px / 20px", &target), None);
    }

    #[test]
    fn test_normalize_radius_zero_is_none() {
        let target = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(normalize_border_radius("", &target), None);
        assert_eq!(normalize_border_radius("0px", &target), None);
        assert_eq!(normalize_border_radius("0 0 0 0", &target), None);
    }

    #[test]
    fn test_hidden_placement_is_parent_relative() {
        let mut element = record(1.0, 50.0, 40.0);
        element.bounds.left = 120.0;
        element.bounds.top = 80.0;
        let mut parent = record(1.0, 400.0, 300.0);
        parent.bounds.left = 100.0;
        parent.bounds.top = 50.0;

        let o = StyleOverride::hidden_placement(&element, Some(&parent));
        assert_eq!(o.position, Some(PositionMode::Absolute));
        assert_eq!(o.left, Some(20.0));
        assert_eq!(o.top, Some(30.0));
        assert_eq!(o.width, Some(50.0));
        assert_eq!(o.height, Some(40.0));
    }
}
