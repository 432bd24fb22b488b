//! The hand-tracking task. It acquires a tracker (model first, with one
//! fallback source, then the camera), then runs every frame through a
//! [`GesturePipeline`] and publishes the results on the signal bus. Failures
//! end the task and surface as an `ERROR: ...` status; they never reach the
//! tick loop.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

use super::landmarks::GestureSample;
use super::pipeline::{GestureOutput, GesturePipeline};
use crate::config::EngineConfig;
use crate::scene::CommandSource;
use crate::signals::{PinchState, SignalBus};

pub const STATUS_DOWNLOADING: &str = "DOWNLOADING AI...";
pub const STATUS_REQUESTING_CAMERA: &str = "REQUESTING CAMERA...";
pub const STATUS_READY: &str = "AI READY: SHOW HAND";

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("MODEL UNAVAILABLE FROM {origin}: {reason}")]
    ModelUnavailable { origin: ModelSource, reason: String },
    #[error("CAMERA PERMISSION DENIED")]
    CameraDenied,
    #[error("CAMERA NOT OPEN")]
    CameraClosed,
    #[error("TRACKING FAILED: {0}")]
    Frame(String),
}

/// Where the recognition model is loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Local(String),
    Remote(String),
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Local(path) => write!(f, "local {path}"),
            ModelSource::Remote(url) => write!(f, "remote {url}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionPlan {
    pub primary: ModelSource,
    pub fallback: Option<ModelSource>,
}

impl Default for AcquisitionPlan {
    fn default() -> Self {
        Self {
            primary: ModelSource::Local("mediapipe/gesture_recognizer.task".to_string()),
            fallback: Some(ModelSource::Remote(
                "https://storage.googleapis.com/mediapipe-models/gesture_recognizer/gesture_recognizer/float16/1/gesture_recognizer.task"
                    .to_string(),
            )),
        }
    }
}

/// A source of per-frame hand landmarks. The task owns the tracker, so
/// dropping the task releases the camera.
#[async_trait]
pub trait HandTracker: Send {
    async fn load_model(&mut self, source: &ModelSource) -> Result<(), TrackerError>;
    async fn open_camera(&mut self) -> Result<(), TrackerError>;
    /// Next frame, or `Ok(None)` once the stream has ended.
    async fn next_frame(&mut self) -> Result<Option<GestureSample>, TrackerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskExit {
    StreamEnded { frames: u64 },
    Failed(String),
}

/// Handle to the running task. Dropping it cancels the task.
#[derive(Debug)]
pub struct GestureTask {
    handle: JoinHandle<TaskExit>,
}

impl GestureTask {
    /// Cancel without waiting; in-flight tracker work is abandoned.
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task. `None` when it was cancelled or panicked.
    pub async fn join(mut self) -> Option<TaskExit> {
        match (&mut self.handle).await {
            Ok(exit) => Some(exit),
            Err(err) => {
                if !err.is_cancelled() {
                    warn!("gesture task panicked: {err}");
                }
                None
            }
        }
    }
}

impl Drop for GestureTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn the tracker loop on the current tokio runtime.
pub fn spawn_gesture_task<T>(
    tracker: T,
    plan: AcquisitionPlan,
    config: &EngineConfig,
    bus: SignalBus,
) -> GestureTask
where
    T: HandTracker + 'static,
{
    let pipeline = GesturePipeline::from_engine_config(config);
    let handle = tokio::spawn(run_tracker(tracker, plan, pipeline, bus));
    GestureTask { handle }
}

async fn run_tracker<T: HandTracker>(
    mut tracker: T,
    plan: AcquisitionPlan,
    mut pipeline: GesturePipeline,
    bus: SignalBus,
) -> TaskExit {
    bus.publish_status(STATUS_DOWNLOADING);
    if let Err(err) = acquire_model(&mut tracker, &plan).await {
        return fail(&bus, err);
    }
    bus.publish_status(STATUS_REQUESTING_CAMERA);
    if let Err(err) = tracker.open_camera().await {
        return fail(&bus, err);
    }
    bus.publish_status(STATUS_READY);
    info!("gesture tracking started");

    let mut frames = 0u64;
    // The bus starts released, so an idle hand has nothing to publish.
    let mut published_pinch = PinchState::released();
    loop {
        match tracker.next_frame().await {
            Ok(Some(sample)) => {
                frames += 1;
                let output = pipeline.process(&sample);
                publish(&bus, output, &mut published_pinch);
            }
            Ok(None) => {
                info!("gesture stream ended after {frames} frames");
                bus.publish_rotation(0.0);
                if pipeline.pinch_active() || published_pinch.active {
                    bus.publish_pinch(PinchState::released());
                }
                return TaskExit::StreamEnded { frames };
            }
            Err(err) => return fail(&bus, err),
        }
    }
}

async fn acquire_model<T: HandTracker>(
    tracker: &mut T,
    plan: &AcquisitionPlan,
) -> Result<(), TrackerError> {
    match tracker.load_model(&plan.primary).await {
        Ok(()) => Ok(()),
        Err(err) => {
            let Some(fallback) = &plan.fallback else {
                return Err(err);
            };
            warn!("model load from {} failed ({err}); trying {fallback}", plan.primary);
            tracker.load_model(fallback).await
        }
    }
}

/// Pinch is only republished when it changes, so an idle hand does not
/// overwrite touch input every frame.
fn publish(bus: &SignalBus, output: GestureOutput, published_pinch: &mut PinchState) {
    if let Some(state) = output.scene_command {
        bus.request_scene(state, CommandSource::Gesture);
    }
    bus.publish_rotation(output.rotation);
    if *published_pinch != output.pinch {
        debug!("pinch -> {:?}", output.pinch);
        bus.publish_pinch(output.pinch);
        *published_pinch = output.pinch;
    }
    if let Some(status) = output.status {
        bus.publish_status(status);
    }
}

fn fail(bus: &SignalBus, err: TrackerError) -> TaskExit {
    let status = format!("ERROR: {err}");
    warn!("gesture tracking stopped: {err}");
    bus.publish_status(status.clone());
    TaskExit::Failed(status)
}

/// How a [`ReplayTracker`] spaces out its frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplayPacing {
    /// Hand out frames as fast as they are asked for.
    #[default]
    Immediate,
    /// Yield to the scheduler before each frame, so a tick loop sharing a
    /// single-threaded runtime interleaves with the replay.
    Yield,
    /// Sleep between frames like a live camera.
    Interval(Duration),
}

/// Plays back recorded samples.
#[derive(Debug, Clone, Default)]
pub struct ReplayTracker {
    samples: VecDeque<GestureSample>,
    pacing: ReplayPacing,
    unavailable: Vec<ModelSource>,
    camera_denied: bool,
    camera_open: bool,
    loaded: Option<ModelSource>,
}

impl ReplayTracker {
    pub fn new(samples: Vec<GestureSample>) -> Self {
        Self {
            samples: samples.into(),
            ..Self::default()
        }
    }

    pub fn with_pacing(mut self, pacing: ReplayPacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Make loading from `source` fail.
    pub fn with_unavailable_source(mut self, source: ModelSource) -> Self {
        self.unavailable.push(source);
        self
    }

    pub fn with_camera_denied(mut self) -> Self {
        self.camera_denied = true;
        self
    }

    pub fn loaded_source(&self) -> Option<&ModelSource> {
        self.loaded.as_ref()
    }
}

#[async_trait]
impl HandTracker for ReplayTracker {
    async fn load_model(&mut self, source: &ModelSource) -> Result<(), TrackerError> {
        if self.unavailable.contains(source) {
            return Err(TrackerError::ModelUnavailable {
                origin: source.clone(),
                reason: "not found".to_string(),
            });
        }
        self.loaded = Some(source.clone());
        Ok(())
    }

    async fn open_camera(&mut self) -> Result<(), TrackerError> {
        if self.camera_denied {
            return Err(TrackerError::CameraDenied);
        }
        self.camera_open = true;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<GestureSample>, TrackerError> {
        if !self.camera_open {
            return Err(TrackerError::CameraClosed);
        }
        match self.pacing {
            ReplayPacing::Immediate => {}
            ReplayPacing::Yield => tokio::task::yield_now().await,
            ReplayPacing::Interval(period) => tokio::time::sleep(period).await,
        }
        Ok(self.samples.pop_front())
    }
}
