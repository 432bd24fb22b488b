//! Thumb/index pinch: a closeness level, a hysteresis latch with a release
//! cooldown, and exponential smoothing of what an active pinch reports.

use glam::Vec2;
use log::debug;

use crate::config::GestureConfig;

/// Closeness of two fingertips: 0 at `open` distance or wider, 1 at `closed`
/// or tighter, linear in between.
pub fn pinch_level(thumb: Vec2, index: Vec2, open: f32, closed: f32) -> f32 {
    let span = open - closed;
    if !(span > 0.0) {
        return 0.0;
    }
    let level = (open - thumb.distance(index)) / span;
    if level.is_finite() {
        level.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Magnification for a pinch level, from 1 when open up to `max_scale` when
/// fully closed.
pub fn scale_for_level(level: f32, max_scale: f32) -> f32 {
    let max_scale = max_scale.max(1.0);
    (1.0 + level * (max_scale - 1.0)).clamp(1.0, max_scale)
}

/// Hysteresis latch. Starts at `start_level` or above, ends below
/// `end_level`, and will not restart until `cooldown_ms` after a release.
#[derive(Debug, Clone)]
pub struct PinchDetector {
    start_level: f32,
    end_level: f32,
    cooldown_ms: f64,
    active: bool,
    released_at: Option<f64>,
}

impl PinchDetector {
    pub fn new(start_level: f32, end_level: f32, cooldown_ms: f64) -> Self {
        Self {
            start_level,
            end_level,
            cooldown_ms,
            active: false,
            released_at: None,
        }
    }

    pub fn from_config(config: &GestureConfig) -> Self {
        Self::new(
            config.pinch_start_level,
            config.pinch_end_level,
            config.pinch_cooldown_ms,
        )
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cooling_down(&self, now_ms: f64) -> bool {
        self.released_at
            .is_some_and(|released| now_ms - released <= self.cooldown_ms)
    }

    /// Feed one frame; returns whether the pinch is active afterwards.
    pub fn update(&mut self, level: f32, not_fist: bool, now_ms: f64) -> bool {
        if !self.active && level >= self.start_level && not_fist && !self.cooling_down(now_ms) {
            debug!("pinch start at level {level:.2}");
            self.active = true;
        }
        if self.active && (level < self.end_level || !not_fist) {
            self.release(now_ms);
        }
        self.active
    }

    /// Force the latch open, e.g. when the hand leaves the frame.
    pub fn release(&mut self, now_ms: f64) {
        if self.active {
            debug!("pinch end at {now_ms:.0} ms");
            self.active = false;
            self.released_at = Some(now_ms);
        }
    }
}

/// Exponential smoothing of the pointer and scale an active pinch reports.
#[derive(Debug, Clone)]
pub struct PinchSmoother {
    pointer_weight: f32,
    scale_weight: f32,
    pointer: Option<Vec2>,
    scale: f32,
}

impl PinchSmoother {
    pub fn new(pointer_weight: f32, scale_weight: f32) -> Self {
        Self {
            pointer_weight,
            scale_weight,
            pointer: None,
            scale: 1.0,
        }
    }

    /// The first pointer after a reset is taken as-is; scale always eases
    /// up from 1.
    pub fn apply(&mut self, pointer: Vec2, scale: f32) -> (Vec2, f32) {
        let smoothed = match self.pointer {
            Some(previous) => previous + (pointer - previous) * self.pointer_weight,
            None => pointer,
        };
        self.pointer = Some(smoothed);
        self.scale += (scale - self.scale) * self.scale_weight;
        (smoothed, self.scale)
    }

    pub fn reset(&mut self) {
        self.pointer = None;
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_maps_distance_linearly() {
        let open = 0.12;
        let closed = 0.02;
        let origin = Vec2::ZERO;
        assert_eq!(pinch_level(origin, Vec2::new(0.2, 0.0), open, closed), 0.0);
        assert_eq!(pinch_level(origin, Vec2::new(0.01, 0.0), open, closed), 1.0);
        let mid = pinch_level(origin, Vec2::new(0.07, 0.0), open, closed);
        assert!((mid - 0.5).abs() < 1e-5);
    }

    #[test]
    fn scale_spans_one_to_the_configured_maximum() {
        assert_eq!(scale_for_level(0.0, 6.0), 1.0);
        assert_eq!(scale_for_level(1.0, 6.0), 6.0);
        assert_eq!(scale_for_level(3.0, 6.0), 6.0);
        assert_eq!(scale_for_level(0.5, 3.0), 2.0);
        assert_eq!(scale_for_level(1.0, 0.5), 1.0);
    }

    #[test]
    fn hysteresis_sequence() {
        let mut detector = PinchDetector::new(0.85, 0.80, 1500.0);
        let states: Vec<bool> = [0.5, 0.9, 0.82, 0.78]
            .iter()
            .enumerate()
            .map(|(frame, level)| detector.update(*level, true, frame as f64 * 16.0))
            .collect();
        assert_eq!(states, vec![false, true, true, false]);
    }

    #[test]
    fn cooldown_blocks_quick_retrigger() {
        let mut detector = PinchDetector::new(0.85, 0.80, 1500.0);
        assert!(detector.update(0.9, true, 0.0));
        assert!(!detector.update(0.7, true, 100.0));
        assert!(!detector.update(0.9, true, 200.0));
        assert!(!detector.update(0.9, true, 1600.0));
        assert!(detector.update(0.9, true, 1601.0));
    }

    #[test]
    fn fist_blocks_and_breaks_pinch() {
        let mut detector = PinchDetector::new(0.85, 0.80, 0.0);
        assert!(!detector.update(1.0, false, 0.0));
        assert!(detector.update(1.0, true, 10.0));
        assert!(!detector.update(1.0, false, 20.0));
    }

    #[test]
    fn smoother_eases_toward_samples() {
        let mut smoother = PinchSmoother::new(0.3, 0.25);
        let (pointer, scale) = smoother.apply(Vec2::new(0.5, 0.5), 5.0);
        assert_eq!(pointer, Vec2::new(0.5, 0.5));
        assert!((scale - 2.0).abs() < 1e-6);

        let (pointer, scale) = smoother.apply(Vec2::new(1.5, 0.5), 5.0);
        assert!((pointer.x - 0.8).abs() < 1e-6);
        assert!((scale - 2.75).abs() < 1e-6);

        smoother.reset();
        let (pointer, scale) = smoother.apply(Vec2::ZERO, 1.0);
        assert_eq!(pointer, Vec2::ZERO);
        assert_eq!(scale, 1.0);
    }
}
