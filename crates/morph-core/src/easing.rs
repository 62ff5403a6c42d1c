//! Easing functions and per-element timing windows.
//!
//! Easing is carried twice: symbolically (so the host's native timeline can
//! consume a CSS timing-function string via [`EasingFunction::to_css`]) and
//! numerically (so `evaluate` can place intermediate values when the engine
//! itself has to interpolate, e.g. while seeking). The bezier solver uses
//! Newton-Raphson iteration on the x component.

use serde::{Deserialize, Serialize};

/// Easing function for animation timing.
///
/// Maps a linear progress value in `[0, 1]` to an eased output value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EasingFunction {
    /// Linear interpolation (no easing).
    Linear,
    /// CSS `ease`: `cubic-bezier(0.25, 0.1, 0.25, 1.0)`.
    Ease,
    /// CSS `ease-in`: `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,
    /// CSS `ease-out`: `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,
    /// CSS `ease-in-out`: `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,
    /// Custom cubic bezier curve. x values must be in `[0, 1]`.
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },
}

impl Default for EasingFunction {
    fn default() -> Self {
        Self::Ease
    }
}

impl EasingFunction {
    /// Evaluate the easing function at progress `t` (clamped to `[0, 1]`).
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
            Self::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(*x1, *y1, *x2, *y2, t),
        }
    }

    /// Render the easing as a CSS timing-function string for the host timeline.
    pub fn to_css(&self) -> String {
        match self {
            Self::Linear => "linear".to_string(),
            Self::Ease => "ease".to_string(),
            Self::EaseIn => "ease-in".to_string(),
            Self::EaseOut => "ease-out".to_string(),
            Self::EaseInOut => "ease-in-out".to_string(),
            Self::CubicBezier { x1, y1, x2, y2 } => {
                format!("cubic-bezier({x1}, {y1}, {x2}, {y2})")
            }
        }
    }

    /// Create a custom cubic bezier easing function.
    ///
    /// # Panics
    /// Panics if `x1` or `x2` are outside `[0, 1]`.
    pub fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2),
            "Bezier x values must be in [0, 1]"
        );
        Self::CubicBezier { x1, y1, x2, y2 }
    }
}

/// The slice of the group timeline one element animates within.
///
/// `start` and `end` are normalized offsets of the total runtime. An element
/// whose window is `[0.2, 0.8]` begins moving once the group clock passes 20%
/// and holds its final frame after 80%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EasingWindow {
    pub start: f64,
    pub end: f64,
    pub easing: EasingFunction,
}

impl Default for EasingWindow {
    fn default() -> Self {
        Self::full(EasingFunction::default())
    }
}

impl EasingWindow {
    /// A window spanning the entire group runtime.
    pub fn full(easing: EasingFunction) -> Self {
        Self {
            start: 0.0,
            end: 1.0,
            easing,
        }
    }

    /// Create a window over a sub-range of the group runtime.
    ///
    /// Offsets are clamped to `[0, 1]` and reordered if reversed.
    pub fn new(start: f64, end: f64, easing: EasingFunction) -> Self {
        let start = start.clamp(0.0, 1.0);
        let end = end.clamp(0.0, 1.0);
        Self {
            start: start.min(end),
            end: start.max(end),
            easing,
        }
    }

    /// Normalized length of the window.
    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// Map an element-local offset in `[0, 1]` onto the group timeline.
    pub fn globalize(&self, local_offset: f64) -> f64 {
        self.start + local_offset.clamp(0.0, 1.0) * self.span()
    }

    /// The window's delay in milliseconds for a given total runtime.
    pub fn delay_ms(&self, total_runtime_ms: f64) -> f64 {
        self.start * total_runtime_ms
    }

    /// The window's active duration in milliseconds for a given total runtime.
    pub fn duration_ms(&self, total_runtime_ms: f64) -> f64 {
        self.span() * total_runtime_ms
    }
}

/// Evaluate a cubic bezier curve at time t.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, progress: f64) -> f64 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }
    let t = solve_bezier_x(x1, x2, progress);
    bezier_component(y1, y2, t)
}

/// Solve for t in the bezier x equation using Newton-Raphson iteration.
fn solve_bezier_x(x1: f64, x2: f64, target_x: f64) -> f64 {
    let mut t = target_x;
    for _ in 0..8 {
        let x = bezier_component(x1, x2, t) - target_x;
        if x.abs() < 1e-7 {
            break;
        }
        let dx = bezier_derivative(x1, x2, t);
        if dx.abs() < 1e-7 {
            break;
        }
        t -= x / dx;
        t = t.clamp(0.0, 1.0);
    }
    t
}

/// One bezier component: 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_component(p1: f64, p2: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    3.0 * mt2 * t * p1 + 3.0 * mt * t2 * p2 + t3
}

/// Derivative of the x component with respect to t.
#[inline]
fn bezier_derivative(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * p1 + 6.0 * mt * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.001;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_linear() {
        let ease = EasingFunction::Linear;
        assert!(approx_eq(ease.evaluate(0.0), 0.0));
        assert!(approx_eq(ease.evaluate(0.5), 0.5));
        assert!(approx_eq(ease.evaluate(1.0), 1.0));
    }

    #[test]
    fn test_ease_boundaries_and_shape() {
        let ease = EasingFunction::Ease;
        assert!(approx_eq(ease.evaluate(0.0), 0.0));
        assert!(approx_eq(ease.evaluate(1.0), 1.0));

        let early = ease.evaluate(0.25);
        let mid = ease.evaluate(0.5);
        let late = ease.evaluate(0.75);
        assert!(early < mid && mid < late, "curve must be monotonic");
        assert!(mid > 0.7 && mid < 0.9, "CSS ease mid-point should be ~0.8");
    }

    #[test]
    fn test_ease_in_out_symmetry() {
        let ease = EasingFunction::EaseInOut;
        assert!(approx_eq(ease.evaluate(0.5), 0.5));
        let early = ease.evaluate(0.25);
        let late = ease.evaluate(0.75);
        assert!(approx_eq(early + late, 1.0));
    }

    #[test]
    fn test_custom_bezier_linear_equivalent() {
        let linear = EasingFunction::CubicBezier {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
        };
        assert!(approx_eq(linear.evaluate(0.5), 0.5));
    }

    #[test]
    fn test_clamping() {
        let ease = EasingFunction::Ease;
        assert!(approx_eq(ease.evaluate(-0.5), 0.0));
        assert!(approx_eq(ease.evaluate(1.5), 1.0));
    }

    #[test]
    fn test_to_css() {
        assert_eq!(EasingFunction::Linear.to_css(), "linear");
        assert_eq!(EasingFunction::EaseInOut.to_css(), "ease-in-out");
        assert_eq!(
            EasingFunction::cubic_bezier(0.4, 0.0, 0.2, 1.0).to_css(),
            "cubic-bezier(0.4, 0, 0.2, 1)"
        );
    }

    #[test]
    #[should_panic(expected = "Bezier x values must be in [0, 1]")]
    fn test_invalid_bezier_x() {
        EasingFunction::cubic_bezier(-0.1, 0.0, 0.5, 1.0);
    }

    #[test]
    fn test_window_globalize() {
        let w = EasingWindow::new(0.2, 0.8, EasingFunction::Linear);
        assert!(approx_eq(w.globalize(0.0), 0.2));
        assert!(approx_eq(w.globalize(0.5), 0.5));
        assert!(approx_eq(w.globalize(1.0), 0.8));
    }

    #[test]
    fn test_window_reorders_reversed_bounds() {
        let w = EasingWindow::new(0.9, 0.1, EasingFunction::Linear);
        assert!(approx_eq(w.start, 0.1));
        assert!(approx_eq(w.end, 0.9));
    }

    #[test]
    fn test_window_timing() {
        let w = EasingWindow::new(0.25, 0.75, EasingFunction::Linear);
        assert!(approx_eq(w.delay_ms(1000.0), 250.0));
        assert!(approx_eq(w.duration_ms(1000.0), 500.0));
    }
}
