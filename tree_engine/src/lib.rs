//! Choreography and interaction engine for a field of animated entities that
//! gather into a tree (FORMED) or scatter (CHAOS), with hand-gesture and
//! touch driven selection and focus.

pub mod camera;
pub mod choreographer;
pub mod config;
pub mod focus;
pub mod gesture;
pub mod interpolate;
pub mod orientation;
pub mod picking;
pub mod pool;
pub mod scene;
pub mod signals;
pub mod touch;

pub use camera::{OrbitRig, PerspectiveCamera, Projector, Ray};
pub use choreographer::{Choreographer, FrameSnapshot};
pub use config::{ConfigError, EngineConfig};
pub use focus::{FocusBlend, FocusTarget, Pose};
pub use interpolate::{damp, Interpolator};
pub use picking::{pick, ColliderScene, RayCaster, RayHit};
pub use pool::{Entity, EntityClass, EntityPool, Placement};
pub use scene::{CommandSource, SceneState, SceneStateMachine};
pub use signals::{signal_channel, PinchState, SignalBus, SignalTap};
pub use touch::{TouchEffect, TouchTracker, Viewport};
