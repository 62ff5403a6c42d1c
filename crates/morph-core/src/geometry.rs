//! Geometry primitives shared by both execution contexts.
//!
//! Every box and every ratio the engine computes flows through this module.
//! The two guard functions, [`safe_ratio`] and [`safe_offset`], implement the
//! engine-wide numeric policy: a division that would produce `NaN` or an
//! infinity resolves to the neutral value instead (`1.0` for scales, `0.0`
//! for translations). Collapsed elements routinely produce zero-sized
//! reference boxes, so this path is ordinary, not exceptional.

use serde::{Deserialize, Serialize};

/// An element's layout box in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Create a bounding box from its components.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// The zero-sized box used for collapsed (absent) elements.
    pub fn collapsed() -> Self {
        Self::default()
    }

    /// True if the box covers no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Geometric center of the box.
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Width-to-height ratio, guarded against zero heights.
    pub fn aspect(&self) -> f64 {
        safe_ratio(self.width, self.height)
    }
}

/// Dimensions of the host viewport at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

impl WindowSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Divide, resolving any non-finite result to the neutral scale `1.0`.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    let ratio = numerator / denominator;
    if ratio.is_finite() { ratio } else { 1.0 }
}

/// Clamp a translation delta, resolving any non-finite value to `0.0`.
pub fn safe_offset(delta: f64) -> f64 {
    if delta.is_finite() { delta } else { 0.0 }
}
