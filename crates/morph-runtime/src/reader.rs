//! The geometry/style reader contract.
//!
//! The engine never lays content out itself: it reads layout state the host
//! rendering engine already committed and writes transforms back. This trait
//! is that read seam. Implementations must be cheap to call many times per
//! frame: no additional layout beyond what the host performs for
//! hit-testing/painting, and reads must happen after the host has committed
//! layout for the prior mutation step (drive captures from a frame boundary,
//! never synchronously inside the mutating turn).

use morph_core::geometry::{BoundingBox, WindowSize};
use morph_core::snapshot::{ComputedStyle, ElementKind};

/// Read access to the host's committed layout and computed style.
pub trait GeometryReader {
    /// An opaque element handle. Cloning must be cheap, and handles must not
    /// borrow from the reader (they are captured into queued read tasks).
    type Handle: Clone + 'static;

    /// Direct children of an element, in DOM order.
    fn children(&self, handle: &Self::Handle) -> Vec<Self::Handle>;

    /// The element's layout box in viewport coordinates.
    fn bounding_box(&self, handle: &Self::Handle) -> BoundingBox;

    /// Current viewport dimensions.
    fn window_size(&self) -> WindowSize;

    /// The enumerated computed-style subset the engine consumes.
    fn computed_style(&self, handle: &Self::Handle) -> ComputedStyle;

    /// Whether the element is text-bearing, replaced media, or ordinary.
    fn element_kind(&self, handle: &Self::Handle) -> ElementKind;

    /// Intrinsic width/height ratio for replaced elements.
    fn media_ratio(&self, handle: &Self::Handle) -> Option<f64>;

    /// The element's identity marker, if one was assigned earlier.
    fn element_key(&self, handle: &Self::Handle) -> Option<String>;

    /// Attach an identity marker. The marker doubles as the cross-context
    /// correlation id and as the selector used to re-acquire the element
    /// after background computation completes.
    fn assign_key(&mut self, handle: &Self::Handle, key: &str);
}
