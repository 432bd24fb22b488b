//! Two-finger touch input. It produces the same pinch contract as the hand
//! tracker: a centroid pointer plus a scale ratio against the span at touch
//! start.

use glam::Vec2;

use crate::config::TouchConfig;
use crate::signals::PinchState;

/// Screen size in pixels, used to normalize touch points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Pixel position (origin top-left, y down) to normalized device
    /// coordinates (y up).
    pub fn to_ndc(&self, pixel: Vec2) -> Option<Vec2> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return None;
        }
        let ndc = Vec2::new(
            pixel.x / self.width * 2.0 - 1.0,
            -(pixel.y / self.height) * 2.0 + 1.0,
        );
        ndc.is_finite().then_some(ndc)
    }
}

/// What the tick loop should do after a touch event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEffect {
    /// A two-finger gesture began: publish the pinch and pick a random
    /// focusable entity.
    Began(PinchState),
    Moved(PinchState),
    /// Clear the pointer, reset scale and drop the forced selection.
    Ended,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct TouchTracker {
    config: TouchConfig,
    viewport: Viewport,
    base_span: Option<f32>,
}

impl TouchTracker {
    pub fn new(config: &TouchConfig, viewport: Viewport) -> Self {
        Self {
            config: config.clone(),
            viewport,
            base_span: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.base_span.is_some()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn touch_start(&mut self, touches: &[Vec2]) -> TouchEffect {
        let [first, second] = touches else {
            return TouchEffect::Ignored;
        };
        let Some(pointer) = self.centroid(*first, *second) else {
            return TouchEffect::Ignored;
        };
        self.base_span = Some(first.distance(*second));
        TouchEffect::Began(PinchState::pointing(pointer, self.config.initial_scale))
    }

    pub fn touch_move(&mut self, touches: &[Vec2]) -> TouchEffect {
        let [first, second] = touches else {
            return TouchEffect::Ignored;
        };
        let Some(base) = self.base_span.filter(|span| *span > 0.0) else {
            return TouchEffect::Ignored;
        };
        let Some(pointer) = self.centroid(*first, *second) else {
            return TouchEffect::Ignored;
        };
        let ratio = first.distance(*second) / base;
        let scale = if ratio.is_finite() {
            ratio.clamp(self.config.min_scale, self.config.max_scale)
        } else {
            self.config.min_scale
        };
        TouchEffect::Moved(PinchState::pointing(pointer, scale))
    }

    /// `remaining` is the number of fingers still down.
    pub fn touch_end(&mut self, remaining: usize) -> TouchEffect {
        if remaining >= 2 {
            return TouchEffect::Ignored;
        }
        self.base_span = None;
        TouchEffect::Ended
    }

    fn centroid(&self, first: Vec2, second: Vec2) -> Option<Vec2> {
        self.viewport.to_ndc((first + second) / 2.0)
    }
}
