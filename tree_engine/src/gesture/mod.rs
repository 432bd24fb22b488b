//! Hand-gesture input: landmark frames in, scene commands, pinch and
//! rotation signals out.

pub mod debounce;
pub mod landmarks;
pub mod pinch;
pub mod pipeline;
pub mod task;

pub use debounce::SceneDebouncer;
pub use landmarks::{Classification, GestureLabel, GestureSample};
pub use pinch::{pinch_level, PinchDetector, PinchSmoother};
pub use pipeline::{GestureOutput, GesturePipeline};
pub use task::{
    spawn_gesture_task, AcquisitionPlan, GestureTask, HandTracker, ModelSource, ReplayPacing,
    ReplayTracker, TaskExit, TrackerError,
};
