//! Latest-value channels between the input producers (gesture task, touch
//! handler) and the tick loop. Every slot is last-write-wins: producers never
//! wait on the consumer and the consumer only ever sees the newest value.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::scene::{CommandSource, SceneState};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinchState {
    pub active: bool,
    /// Normalized pointer (`[-1, 1]`, y up); `None` when nothing points.
    pub pointer: Option<Vec2>,
    pub scale: f32,
}

impl PinchState {
    pub fn released() -> Self {
        Self {
            active: false,
            pointer: None,
            scale: 1.0,
        }
    }

    pub fn pointing(pointer: Vec2, scale: f32) -> Self {
        Self {
            active: true,
            pointer: Some(pointer),
            scale,
        }
    }

    /// Whether this pinch asks the selected entity to come forward.
    pub fn engaged(&self) -> bool {
        self.pointer.is_some() && self.scale > 1.0
    }
}

impl Default for PinchState {
    fn default() -> Self {
        Self::released()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneCommand {
    pub seq: u64,
    pub state: SceneState,
    pub source: CommandSource,
}

/// Producer half. Cloning shares the same slots.
#[derive(Debug, Clone)]
pub struct SignalBus {
    scene: Arc<watch::Sender<Option<SceneCommand>>>,
    pinch: Arc<watch::Sender<PinchState>>,
    rotation: Arc<watch::Sender<f32>>,
    status: Arc<watch::Sender<String>>,
}

impl SignalBus {
    pub fn request_scene(&self, state: SceneState, source: CommandSource) {
        self.scene.send_modify(|slot| {
            let seq = slot.map_or(1, |previous| previous.seq + 1);
            *slot = Some(SceneCommand { seq, state, source });
        });
    }

    pub fn publish_pinch(&self, pinch: PinchState) {
        self.pinch.send_replace(pinch);
    }

    pub fn publish_rotation(&self, speed: f32) {
        self.rotation.send_replace(speed);
    }

    pub fn publish_status(&self, status: impl Into<String>) {
        self.status.send_replace(status.into());
    }
}

/// Consumer half, owned by the tick loop.
#[derive(Debug)]
pub struct SignalTap {
    scene: watch::Receiver<Option<SceneCommand>>,
    pinch: watch::Receiver<PinchState>,
    rotation: watch::Receiver<f32>,
    status: watch::Receiver<String>,
    last_scene_seq: u64,
}

impl SignalTap {
    /// The newest scene command, once. Commands overwritten before this is
    /// called are dropped.
    pub fn take_scene_command(&mut self) -> Option<SceneCommand> {
        let command = (*self.scene.borrow_and_update())?;
        if command.seq == self.last_scene_seq {
            return None;
        }
        self.last_scene_seq = command.seq;
        Some(command)
    }

    pub fn pinch(&self) -> PinchState {
        *self.pinch.borrow()
    }

    pub fn rotation(&self) -> f32 {
        *self.rotation.borrow()
    }

    pub fn status(&self) -> String {
        self.status.borrow().clone()
    }

    /// Wait until the status text changes; `None` once every producer is gone.
    pub async fn status_changed(&mut self) -> Option<String> {
        self.status.changed().await.ok()?;
        Some(self.status.borrow_and_update().clone())
    }
}

pub fn signal_channel() -> (SignalBus, SignalTap) {
    let (scene_tx, scene_rx) = watch::channel(None);
    let (pinch_tx, pinch_rx) = watch::channel(PinchState::released());
    let (rotation_tx, rotation_rx) = watch::channel(0.0);
    let (status_tx, status_rx) = watch::channel("INITIALIZING...".to_string());
    (
        SignalBus {
            scene: Arc::new(scene_tx),
            pinch: Arc::new(pinch_tx),
            rotation: Arc::new(rotation_tx),
            status: Arc::new(status_tx),
        },
        SignalTap {
            scene: scene_rx,
            pinch: pinch_rx,
            rotation: rotation_rx,
            status: status_rx,
            last_scene_seq: 0,
        },
    )
}
