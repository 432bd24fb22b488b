use glam::Vec2;

use super::debounce::SceneDebouncer;
use super::landmarks::{
    pointer_from_landmark, GestureLabel, GestureSample, INDEX_MCP, INDEX_TIP, THUMB_TIP, WRIST,
};
use super::pinch::{pinch_level, scale_for_level, PinchDetector, PinchSmoother};
use crate::config::{EngineConfig, GestureConfig, MotionConfig};
use crate::scene::SceneState;
use crate::signals::PinchState;

/// Everything one sample produces.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureOutput {
    /// Set on the frame a stable candidate is accepted.
    pub scene_command: Option<SceneState>,
    pub pinch: PinchState,
    /// Orbit step in radians per 60 Hz frame.
    pub rotation: f32,
    pub pinch_level: Option<f32>,
    /// Debug text for the status line, when debug output is enabled.
    pub status: Option<String>,
}

impl GestureOutput {
    fn neutral() -> Self {
        Self {
            scene_command: None,
            pinch: PinchState::released(),
            rotation: 0.0,
            pinch_level: None,
            status: None,
        }
    }
}

/// Turns raw tracker frames into debounced scene commands, a smoothed pinch
/// and a rotation signal.
#[derive(Debug, Clone)]
pub struct GesturePipeline {
    config: GestureConfig,
    debouncer: SceneDebouncer,
    detector: PinchDetector,
    smoother: PinchSmoother,
    max_scale: f32,
}

impl GesturePipeline {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            config: config.clone(),
            debouncer: SceneDebouncer::new(config.stable_frames),
            detector: PinchDetector::from_config(config),
            smoother: PinchSmoother::new(config.pointer_smoothing, config.scale_smoothing),
            max_scale: MotionConfig::default().max_scale_multiplier,
        }
    }

    /// Gesture tunables plus the focus scale ceiling from the motion group.
    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self::new(&config.gesture).with_max_scale(config.motion.max_scale_multiplier)
    }

    /// Cap the scale a fully closed pinch requests.
    pub fn with_max_scale(mut self, max_scale: f32) -> Self {
        self.max_scale = max_scale;
        self
    }

    pub fn pinch_active(&self) -> bool {
        self.detector.is_active()
    }

    pub fn process(&mut self, sample: &GestureSample) -> GestureOutput {
        let mut output = GestureOutput::neutral();

        let label = sample
            .classification
            .as_ref()
            .filter(|c| c.score > self.config.confidence_floor);
        let parsed = label.map(|c| GestureLabel::parse(&c.label));
        output.scene_command = self
            .debouncer
            .observe(parsed.and_then(GestureLabel::scene_candidate));
        if self.config.debug {
            if let Some(classification) = label {
                output.status = Some(format!("DETECTED: {}", classification.label));
            }
        }

        let points = (
            sample.landmark(WRIST),
            sample.landmark(THUMB_TIP),
            sample.landmark(INDEX_MCP),
            sample.landmark(INDEX_TIP),
        );
        let (Some(wrist), Some(thumb), Some(index_base), Some(index_tip)) = points else {
            self.lose_hand(sample.timestamp_ms);
            if self.config.debug {
                output.status = Some("AI READY: NO HAND".to_string());
            }
            return output;
        };

        output.rotation = self.rotation_step(wrist);

        let level = pinch_level(
            thumb,
            index_tip,
            self.config.pinch_open_distance,
            self.config.pinch_closed_distance,
        );
        output.pinch_level = Some(level);
        let fist = parsed == Some(GestureLabel::ClosedFist);
        let not_fist =
            index_tip.distance(index_base) > self.config.index_extension_floor && !fist;

        if self.detector.update(level, not_fist, sample.timestamp_ms) {
            let raw_scale = scale_for_level(level, self.max_scale);
            let (pointer, scale) = self
                .smoother
                .apply(pointer_from_landmark(index_tip), raw_scale);
            output.pinch = PinchState::pointing(pointer, scale);
            if self.config.debug {
                output.status = Some(format!("PINCH lvl={level:.2} scale={scale:.2}"));
            }
        } else {
            self.smoother.reset();
        }
        output
    }

    /// Horizontal wrist offset from frame centre, zeroed inside the noise floor.
    fn rotation_step(&self, wrist: Vec2) -> f32 {
        let speed = (0.5 - wrist.x) * self.config.rotation_gain;
        if speed.is_finite() && speed.abs() > self.config.rotation_noise_floor {
            speed
        } else {
            0.0
        }
    }

    fn lose_hand(&mut self, now_ms: f64) {
        self.debouncer.reset();
        self.detector.release(now_ms);
        self.smoother.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::landmarks::{Classification, HAND_POINTS};

    /// Open hand with the index finger extended and the thumb `gap` away
    /// from the index tip.
    fn hand(timestamp_ms: f64, wrist_x: f32, gap: f32, label: Option<(&str, f32)>) -> GestureSample {
        let mut landmarks = vec![Vec2::new(0.5, 0.6); HAND_POINTS];
        landmarks[WRIST] = Vec2::new(wrist_x, 0.8);
        landmarks[INDEX_MCP] = Vec2::new(0.5, 0.5);
        landmarks[INDEX_TIP] = Vec2::new(0.5, 0.3);
        landmarks[THUMB_TIP] = Vec2::new(0.5 + gap, 0.3);
        GestureSample {
            timestamp_ms,
            landmarks,
            classification: label.map(|(name, score)| Classification::new(name, score)),
        }
    }

    #[test]
    fn fist_held_emits_formed_once() {
        let mut pipeline = GesturePipeline::new(&GestureConfig::default());
        let commands: Vec<_> = (0..10)
            .map(|i| {
                pipeline
                    .process(&hand(i as f64 * 16.0, 0.5, 0.2, Some(("Closed_Fist", 0.9))))
                    .scene_command
            })
            .collect();
        assert_eq!(commands.iter().flatten().count(), 1);
        assert_eq!(commands[5], Some(SceneState::Formed));
    }

    #[test]
    fn low_confidence_never_emits() {
        let mut pipeline = GesturePipeline::new(&GestureConfig::default());
        for i in 0..20 {
            let out = pipeline.process(&hand(i as f64, 0.5, 0.2, Some(("Open_Palm", 0.3))));
            assert!(out.scene_command.is_none());
        }
    }

    #[test]
    fn tight_pinch_activates_with_smoothed_values() {
        let mut pipeline = GesturePipeline::new(&GestureConfig::default());
        let out = pipeline.process(&hand(0.0, 0.5, 0.01, None));
        assert!(out.pinch.active);
        let pointer = out.pinch.pointer.expect("pointer");
        assert!((pointer - Vec2::new(0.0, 0.4)).length() < 1e-5);
        // Raw scale is 6; the first smoothed step from 1 is 1 + 5 * 0.25.
        assert!((out.pinch.scale - 2.25).abs() < 1e-5);
        assert!(out.pinch.engaged());
    }

    #[test]
    fn fist_label_suppresses_pinch() {
        let mut pipeline = GesturePipeline::new(&GestureConfig::default());
        let out = pipeline.process(&hand(0.0, 0.5, 0.01, Some(("Closed_Fist", 0.9))));
        assert!(!out.pinch.active);
        assert_eq!(out.pinch, PinchState::released());
    }

    /// Thumb against an index finger curled back onto its knuckle.
    fn curled(timestamp_ms: f64) -> GestureSample {
        let mut sample = hand(timestamp_ms, 0.5, 0.01, Some(("None", 0.9)));
        sample.landmarks[INDEX_TIP] = Vec2::new(0.5, 0.45);
        sample.landmarks[THUMB_TIP] = Vec2::new(0.51, 0.45);
        sample
    }

    #[test]
    fn curled_index_never_starts_a_pinch() {
        let mut pipeline = GesturePipeline::new(&GestureConfig::default());
        for i in 0..20 {
            let out = pipeline.process(&curled(i as f64 * 16.0));
            assert_eq!(out.pinch_level, Some(1.0));
            assert!(!out.pinch.active, "frame {i} pinched with a curled index");
            assert!(out.scene_command.is_none());
        }
        assert!(!pipeline.pinch_active());
    }

    #[test]
    fn curling_the_index_ends_an_active_pinch() {
        let mut pipeline = GesturePipeline::new(&GestureConfig::default());
        assert!(pipeline.process(&hand(0.0, 0.5, 0.01, None)).pinch.active);
        assert!(pipeline.process(&hand(16.0, 0.5, 0.01, None)).pinch.active);

        let out = pipeline.process(&curled(33.0));
        assert_eq!(out.pinch, PinchState::released());
        assert!(!pipeline.pinch_active());

        // The curl counts as a release, so straightening inside the cooldown
        // does not restart the pinch.
        let out = pipeline.process(&hand(50.0, 0.5, 0.01, None));
        assert!(!out.pinch.active);
    }

    #[test]
    fn pinch_scale_respects_the_configured_ceiling() {
        let mut config = EngineConfig::default();
        config.motion.max_scale_multiplier = 3.0;
        let mut pipeline = GesturePipeline::from_engine_config(&config);
        let out = pipeline.process(&hand(0.0, 0.5, 0.01, None));
        // Raw scale is 3; the first smoothed step from 1 is 1 + 2 * 0.25.
        assert!((out.pinch.scale - 1.5).abs() < 1e-5);
    }

    #[test]
    fn losing_the_hand_resets_everything() {
        let mut config = GestureConfig::default();
        config.debug = true;
        let mut pipeline = GesturePipeline::new(&config);
        let out = pipeline.process(&hand(0.0, 0.2, 0.01, Some(("Closed_Fist", 0.9))));
        assert!(out.rotation > 0.0);

        let out = pipeline.process(&GestureSample::empty(16.0));
        assert_eq!(out.rotation, 0.0);
        assert_eq!(out.pinch, PinchState::released());
        assert_eq!(out.status.as_deref(), Some("AI READY: NO HAND"));
        assert!(!pipeline.pinch_active());
    }

    #[test]
    fn rotation_has_a_dead_zone() {
        let mut pipeline = GesturePipeline::new(&GestureConfig::default());
        assert_eq!(pipeline.process(&hand(0.0, 0.45, 0.2, None)).rotation, 0.0);
        let step = pipeline.process(&hand(16.0, 0.9, 0.2, None)).rotation;
        assert!((step - (-0.06)).abs() < 1e-6);
    }

    #[test]
    fn debug_status_reports_pinch() {
        let mut config = GestureConfig::default();
        config.debug = true;
        let mut pipeline = GesturePipeline::new(&config);
        let out = pipeline.process(&hand(0.0, 0.5, 0.01, None));
        assert_eq!(out.status.as_deref(), Some("PINCH lvl=1.00 scale=2.25"));
    }
}
