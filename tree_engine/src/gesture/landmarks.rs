//! One frame of hand-tracker output: normalized 2D keypoints (x right, y down,
//! both in `[0, 1]` of the camera frame) and the tracker's best label.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::scene::SceneState;

pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_TIP: usize = 8;
/// Keypoints per tracked hand.
pub const HAND_POINTS: usize = 21;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Labels the tracker reports that the pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureLabel {
    ClosedFist,
    OpenPalm,
    Other,
}

impl GestureLabel {
    pub fn parse(label: &str) -> Self {
        match label {
            "Closed_Fist" => GestureLabel::ClosedFist,
            "Open_Palm" => GestureLabel::OpenPalm,
            _ => GestureLabel::Other,
        }
    }

    /// Scene state this label asks for, if any.
    pub fn scene_candidate(self) -> Option<SceneState> {
        match self {
            GestureLabel::ClosedFist => Some(SceneState::Formed),
            GestureLabel::OpenPalm => Some(SceneState::Chaos),
            GestureLabel::Other => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureSample {
    /// Capture time in milliseconds on the tracker's clock.
    pub timestamp_ms: f64,
    /// Empty when no hand is in frame.
    #[serde(default)]
    pub landmarks: Vec<Vec2>,
    #[serde(default)]
    pub classification: Option<Classification>,
}

impl GestureSample {
    pub fn empty(timestamp_ms: f64) -> Self {
        Self {
            timestamp_ms,
            ..Self::default()
        }
    }

    pub fn has_hand(&self) -> bool {
        !self.landmarks.is_empty()
    }

    pub fn landmark(&self, idx: usize) -> Option<Vec2> {
        self.landmarks.get(idx).copied()
    }
}

/// Camera x is mirrored so moving the hand right moves the pointer right.
pub fn pointer_from_landmark(point: Vec2) -> Vec2 {
    Vec2::new((1.0 - point.x) * 2.0 - 1.0, -(point.y * 2.0 - 1.0))
}
