//! Session scripts: a list of synthetic hand poses replayed through the
//! gesture task, plus commands scheduled on specific ticks.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tree_engine::gesture::landmarks::{HAND_POINTS, INDEX_MCP, INDEX_TIP, THUMB_TIP, WRIST};
use tree_engine::gesture::{AcquisitionPlan, Classification, GestureSample, ReplayTracker};
use tree_engine::SceneState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandPose {
    /// Closed fist; asks for FORMED.
    Fist,
    /// Open palm; asks for CHAOS.
    Palm,
    /// Thumb on the index tip, unclassified.
    Pinch,
    /// Relaxed hand with no recognised gesture.
    Open,
    NoHand,
}

impl HandPose {
    fn label(self) -> Option<&'static str> {
        match self {
            HandPose::Fist => Some("Closed_Fist"),
            HandPose::Palm => Some("Open_Palm"),
            HandPose::Pinch | HandPose::Open => Some("None"),
            HandPose::NoHand => None,
        }
    }
}

/// A run of identical frames.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameStep {
    pub pose: HandPose,
    #[serde(default = "one")]
    pub frames: u32,
    /// Horizontal wrist position in image coordinates; 0.5 is centred.
    #[serde(default = "centre")]
    pub wrist_x: f32,
    /// Where the index tip points, in NDC.
    #[serde(default)]
    pub pointer: [f32; 2],
    #[serde(default = "confident")]
    pub score: f32,
}

fn one() -> u32 {
    1
}

fn centre() -> f32 {
    0.5
}

fn confident() -> f32 {
    0.9
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Toggle,
    SetScene { state: SceneState },
    SelectRandom,
    ClearSelection,
    ReplacePhoto,
    /// Multiply the orbit distance.
    Zoom { factor: f32 },
    /// Touch positions in viewport pixels.
    TouchStart { touches: Vec<[f32; 2]> },
    TouchMove { touches: Vec<[f32; 2]> },
    TouchEnd {
        #[serde(default)]
        remaining: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduledAction {
    pub tick: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackerOptions {
    pub camera_denied: bool,
    pub primary_missing: bool,
    pub fallback_missing: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionScript {
    /// Spacing of tracker timestamps.
    pub frame_interval_ms: f64,
    /// Uniform landmark noise in image units.
    pub jitter: f32,
    pub tracker: TrackerOptions,
    pub frames: Vec<FrameStep>,
    pub events: Vec<ScheduledAction>,
}

impl Default for SessionScript {
    fn default() -> Self {
        Self {
            frame_interval_ms: 33.0,
            jitter: 0.0,
            tracker: TrackerOptions::default(),
            frames: Vec::new(),
            events: Vec::new(),
        }
    }
}

impl SessionScript {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading session script {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing session script {}", path.display()))
    }

    /// Fist to gather, a wave to orbit, a pinch to focus, a palm to scatter,
    /// with a few touch and photo commands along the way.
    pub fn demo() -> Self {
        let step = |pose, frames| FrameStep {
            pose,
            frames,
            wrist_x: centre(),
            pointer: [0.0, 0.0],
            score: confident(),
        };
        let at = |tick, action| ScheduledAction { tick, action };
        Self {
            jitter: 0.002,
            frames: vec![
                step(HandPose::NoHand, 20),
                step(HandPose::Fist, 12),
                FrameStep {
                    wrist_x: 0.3,
                    ..step(HandPose::Open, 40)
                },
                FrameStep {
                    pointer: [0.15, 0.1],
                    ..step(HandPose::Pinch, 60)
                },
                step(HandPose::NoHand, 20),
                step(HandPose::Palm, 12),
                step(HandPose::NoHand, 30),
            ],
            events: vec![
                at(260, Action::ReplacePhoto),
                at(261, Action::ReplacePhoto),
                at(
                    300,
                    Action::TouchStart {
                        touches: vec![[900.0, 540.0], [1020.0, 540.0]],
                    },
                ),
                at(
                    320,
                    Action::TouchMove {
                        touches: vec![[840.0, 540.0], [1080.0, 540.0]],
                    },
                ),
                at(380, Action::TouchEnd { remaining: 0 }),
                at(400, Action::Zoom { factor: 0.8 }),
                at(450, Action::Toggle),
                at(520, Action::SetScene { state: SceneState::Chaos }),
            ],
            ..Self::default()
        }
    }

    /// Expand the frame steps into tracker samples. Jitter is drawn from a
    /// generator seeded with `seed`.
    pub fn samples(&self, seed: u64) -> Vec<GestureSample> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut samples = Vec::new();
        for step in &self.frames {
            for _ in 0..step.frames {
                let timestamp_ms = samples.len() as f64 * self.frame_interval_ms;
                samples.push(synthesize(step, timestamp_ms, self.jitter, &mut rng));
            }
        }
        samples
    }

    pub fn tracker(&self, plan: &AcquisitionPlan, seed: u64) -> ReplayTracker {
        let mut tracker = ReplayTracker::new(self.samples(seed));
        if self.tracker.primary_missing {
            tracker = tracker.with_unavailable_source(plan.primary.clone());
        }
        if self.tracker.fallback_missing {
            if let Some(fallback) = &plan.fallback {
                tracker = tracker.with_unavailable_source(fallback.clone());
            }
        }
        if self.tracker.camera_denied {
            tracker = tracker.with_camera_denied();
        }
        tracker
    }

    pub fn actions_at(&self, tick: u64) -> impl Iterator<Item = &Action> + '_ {
        self.events
            .iter()
            .filter(move |event| event.tick == tick)
            .map(|event| &event.action)
    }
}

/// Lay out a hand whose index tip sits under `step.pointer`.
fn synthesize<R: Rng>(step: &FrameStep, timestamp_ms: f64, jitter: f32, rng: &mut R) -> GestureSample {
    let Some(label) = step.pose.label() else {
        return GestureSample::empty(timestamp_ms);
    };

    let [x, y] = step.pointer;
    let tip = Vec2::new(1.0 - (x + 1.0) / 2.0, (1.0 - y) / 2.0);
    let (base, thumb) = match step.pose {
        // Curled index: the tip rests next to its knuckle.
        HandPose::Fist => (tip + Vec2::new(0.0, 0.03), tip + Vec2::new(0.06, 0.02)),
        HandPose::Pinch => (tip + Vec2::new(0.0, 0.2), tip + Vec2::new(0.01, 0.0)),
        _ => (tip + Vec2::new(0.0, 0.2), tip + Vec2::new(0.2, 0.05)),
    };

    let mut landmarks = vec![tip + Vec2::new(0.0, 0.25); HAND_POINTS];
    landmarks[WRIST] = Vec2::new(step.wrist_x, tip.y + 0.45);
    landmarks[INDEX_MCP] = base;
    landmarks[INDEX_TIP] = tip;
    landmarks[THUMB_TIP] = thumb;
    if jitter > 0.0 {
        for point in &mut landmarks {
            *point += Vec2::new(rng.gen_range(-jitter..=jitter), rng.gen_range(-jitter..=jitter));
        }
    }

    GestureSample {
        timestamp_ms,
        landmarks,
        classification: Some(Classification::new(label, step.score)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_engine::config::GestureConfig;
    use tree_engine::gesture::GesturePipeline;

    #[test]
    fn script_parses_tagged_events() {
        let script: SessionScript = serde_json::from_str(
            r#"{
                "frames": [{"pose": "fist", "frames": 3}, {"pose": "no_hand"}],
                "events": [
                    {"tick": 4, "action": "toggle"},
                    {"tick": 9, "action": "set_scene", "state": "FORMED"},
                    {"tick": 9, "action": "touch_end"},
                    {"tick": 12, "action": "zoom", "factor": 0.75}
                ],
                "tracker": {"primary_missing": true}
            }"#,
        )
        .expect("script parses");
        assert_eq!(script.frames[0].frames, 3);
        assert_eq!(script.frames[1].frames, 1);
        assert!(script.tracker.primary_missing);
        assert_eq!(script.frame_interval_ms, 33.0);
        assert_eq!(script.actions_at(4).collect::<Vec<_>>(), vec![&Action::Toggle]);
        assert_eq!(
            script.actions_at(9).collect::<Vec<_>>(),
            vec![
                &Action::SetScene {
                    state: SceneState::Formed
                },
                &Action::TouchEnd { remaining: 0 }
            ]
        );
        assert_eq!(
            script.actions_at(12).collect::<Vec<_>>(),
            vec![&Action::Zoom { factor: 0.75 }]
        );
        assert_eq!(script.samples(0).len(), 4);
    }

    #[test]
    fn synthesized_fist_reaches_formed() {
        let script = SessionScript {
            frames: vec![FrameStep {
                pose: HandPose::Fist,
                frames: 6,
                wrist_x: 0.5,
                pointer: [0.0, 0.0],
                score: 0.9,
            }],
            ..SessionScript::default()
        };
        let mut pipeline = GesturePipeline::new(&GestureConfig::default());
        let commands: Vec<_> = script
            .samples(1)
            .iter()
            .filter_map(|sample| pipeline.process(sample).scene_command)
            .collect();
        assert_eq!(commands, vec![SceneState::Formed]);
    }

    #[test]
    fn synthesized_pinch_points_where_asked() {
        let script = SessionScript {
            frames: vec![FrameStep {
                pose: HandPose::Pinch,
                frames: 1,
                wrist_x: 0.5,
                pointer: [0.4, -0.2],
                score: 0.9,
            }],
            ..SessionScript::default()
        };
        let mut pipeline = GesturePipeline::new(&GestureConfig::default());
        let output = pipeline.process(&script.samples(0)[0]);
        assert!(output.pinch.active);
        let pointer = output.pinch.pointer.expect("pointer");
        assert!((pointer - Vec2::new(0.4, -0.2)).length() < 1e-4);
    }

    #[test]
    fn demo_is_self_consistent() {
        let demo = SessionScript::demo();
        let samples = demo.samples(7);
        assert_eq!(samples.len(), 194);
        assert!(samples
            .windows(2)
            .all(|pair| pair[0].timestamp_ms < pair[1].timestamp_ms));
    }
}
