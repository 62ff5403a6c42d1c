//! Shared test doubles: an in-memory host tree and a mock animation backend.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use morph_core::geometry::{BoundingBox, WindowSize};
use morph_core::keyframes::{Keyframe, StyleOverride};
use morph_core::media::MediaMount;
use morph_core::snapshot::{ComputedStyle, ElementKind};

use crate::backend::{AnimationBackend, AnimationTiming, HostAnimation, NativePlayState};
use crate::reader::GeometryReader;

/// One element of the in-memory host tree.
#[derive(Debug, Clone)]
pub struct MockElement {
    pub bounds: BoundingBox,
    pub style: ComputedStyle,
    pub kind: ElementKind,
    pub media_ratio: Option<f64>,
    pub key: Option<String>,
    pub children: Vec<usize>,
    pub removed: bool,
}

/// A mutable fake rendering engine the snapshotter reads from.
#[derive(Debug)]
pub struct MockReader {
    pub elements: Vec<MockElement>,
    pub window: WindowSize,
    /// Number of bounding-box reads performed, for pipeline-count assertions.
    pub read_count: Cell<usize>,
}

impl MockReader {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            window: WindowSize::new(1280.0, 720.0),
            read_count: Cell::new(0),
        }
    }

    pub fn add_element(
        &mut self,
        parent: Option<usize>,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    ) -> usize {
        let index = self.elements.len();
        self.elements.push(MockElement {
            bounds: BoundingBox::new(left, top, width, height),
            style: ComputedStyle::default(),
            kind: ElementKind::Default,
            media_ratio: None,
            key: None,
            children: Vec::new(),
            removed: false,
        });
        if let Some(parent) = parent {
            self.elements[parent].children.push(index);
        }
        index
    }

    pub fn set_bounds(&mut self, index: usize, left: f64, top: f64, width: f64, height: f64) {
        self.elements[index].bounds = BoundingBox::new(left, top, width, height);
    }

    pub fn edit_style(&mut self, index: usize, edit: impl FnOnce(&mut ComputedStyle)) {
        edit(&mut self.elements[index].style);
    }

    pub fn hide(&mut self, index: usize) {
        self.elements[index].style.display = "none".to_string();
        self.elements[index].bounds = BoundingBox::collapsed();
    }

    pub fn remove_element(&mut self, index: usize) {
        self.elements[index].removed = true;
        for element in &mut self.elements {
            element.children.retain(|c| *c != index);
        }
    }
}

impl GeometryReader for MockReader {
    type Handle = usize;

    fn children(&self, handle: &usize) -> Vec<usize> {
        self.elements[*handle]
            .children
            .iter()
            .copied()
            .filter(|c| !self.elements[*c].removed)
            .collect()
    }

    fn bounding_box(&self, handle: &usize) -> BoundingBox {
        self.read_count.set(self.read_count.get() + 1);
        self.elements[*handle].bounds
    }

    fn window_size(&self) -> WindowSize {
        self.window
    }

    fn computed_style(&self, handle: &usize) -> ComputedStyle {
        self.elements[*handle].style.clone()
    }

    fn element_kind(&self, handle: &usize) -> ElementKind {
        self.elements[*handle].kind
    }

    fn media_ratio(&self, handle: &usize) -> Option<f64> {
        self.elements[*handle].media_ratio
    }

    fn element_key(&self, handle: &usize) -> Option<String> {
        self.elements[*handle].key.clone()
    }

    fn assign_key(&mut self, handle: &usize, key: &str) {
        self.elements[*handle].key = Some(key.to_string());
    }
}

/// An animation object that records timing writes instead of rendering.
#[derive(Debug, Clone)]
pub struct MockAnimation {
    pub duration_ms: f64,
    start_time: Option<f64>,
    current_time: f64,
    playback_rate: f64,
    state: NativePlayState,
}

impl MockAnimation {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            start_time: None,
            current_time: 0.0,
            playback_rate: 1.0,
            state: NativePlayState::Idle,
        }
    }
}

impl HostAnimation for MockAnimation {
    fn play(&mut self) {
        self.state = NativePlayState::Running;
    }

    fn pause(&mut self) {
        self.state = NativePlayState::Paused;
    }

    fn cancel(&mut self) {
        self.state = NativePlayState::Idle;
        self.current_time = 0.0;
    }

    fn finish(&mut self) {
        self.state = NativePlayState::Finished;
        self.current_time = self.duration_ms;
    }

    fn set_start_time(&mut self, ms: Option<f64>) {
        self.start_time = ms;
    }

    fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    fn set_current_time(&mut self, ms: f64) {
        self.current_time = ms;
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.playback_rate = rate;
    }

    fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    fn play_state(&self) -> NativePlayState {
        self.state
    }
}

/// A backend that records every host-side effect.
#[derive(Debug, Default)]
pub struct MockBackend {
    /// Keys that no longer resolve to live elements.
    pub missing: HashSet<String>,
    pub created: Vec<String>,
    pub overrides_applied: HashMap<String, StyleOverride>,
    pub overrides_reverted: Vec<String>,
    pub mounted: Vec<MediaMount>,
    pub unmounted: Vec<MediaMount>,
    pub restored: bool,
    /// Keyframes each animation was created with.
    pub bound_keyframes: HashMap<String, Vec<Keyframe>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnimationBackend for MockBackend {
    type Animation = MockAnimation;

    fn contains(&self, key: &str) -> bool {
        !self.missing.contains(key)
    }

    fn create_animation(
        &mut self,
        key: &str,
        keyframes: &[Keyframe],
        timing: &AnimationTiming,
    ) -> Option<MockAnimation> {
        if self.missing.contains(key) {
            return None;
        }
        self.created.push(key.to_string());
        self.bound_keyframes
            .insert(key.to_string(), keyframes.to_vec());
        Some(MockAnimation::new(timing.delay_ms + timing.duration_ms))
    }

    fn create_clock(&mut self, duration_ms: f64) -> MockAnimation {
        MockAnimation::new(duration_ms)
    }

    fn apply_override(&mut self, key: &str, style: &StyleOverride) {
        self.overrides_applied.insert(key.to_string(), style.clone());
    }

    fn revert_override(&mut self, key: &str) {
        self.overrides_reverted.push(key.to_string());
    }

    fn mount_media(
        &mut self,
        mount: &MediaMount,
        _wrapper_style: &StyleOverride,
        _placeholder_style: &StyleOverride,
    ) -> bool {
        if self.missing.contains(&mount.element) {
            return false;
        }
        self.mounted.push(mount.clone());
        true
    }

    fn unmount_media(&mut self, mount: &MediaMount) {
        self.unmounted.push(mount.clone());
    }

    fn restore_base_state(&mut self) {
        self.restored = true;
    }
}
