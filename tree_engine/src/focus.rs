//! Focus blending: each focusable entity owns an accumulator that damps toward
//! 1 while it is the engaged selection and toward 0 otherwise. The displayed
//! pose is the interpolated pose pulled toward the focal point by that amount.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::Projector;
use crate::config::MotionConfig;
use crate::interpolate::{EntityMotion, damp};
use crate::orientation::{look_at_euler, quat_from_euler};
use crate::pool::EntityPool;

/// Alpha at and above which the entity's orientation is held facing the viewer.
pub const LOCK_THRESHOLD: f32 = 0.5;

/// Transform handed to the renderer, in the pool's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

impl Pose {
    pub fn from_motion(motion: &EntityMotion) -> Self {
        Self {
            position: motion.position,
            rotation: motion.rotation,
            scale: motion.scale,
        }
    }

    /// Local-to-world matrix for a pool whose frame is translated by `origin`.
    pub fn world_matrix(&self, origin: Vec3) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            quat_from_euler(self.rotation),
            self.position + origin,
        )
    }
}

/// Where a focused entity is pulled to, and the point it turns to face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusTarget {
    pub point: Vec3,
    pub look_at: Vec3,
}

impl FocusTarget {
    /// `distance` units ahead of the camera, expressed in a pool frame whose
    /// origin sits at `origin` in world space.
    pub fn in_front_of(projector: &dyn Projector, distance: f32, origin: Vec3) -> Self {
        let eye = projector.eye();
        Self {
            point: eye + projector.forward() * distance - origin,
            look_at: eye - origin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FocusBlend {
    alphas: Vec<f32>,
    scales: Vec<f32>,
    target: Option<FocusTarget>,
}

impl FocusBlend {
    pub fn new(pool: &EntityPool) -> Self {
        Self {
            alphas: vec![0.0; pool.len()],
            scales: pool.entities().iter().map(|e| e.chaos().scale).collect(),
            target: None,
        }
    }

    pub fn alpha(&self, idx: usize) -> f32 {
        self.alphas.get(idx).copied().unwrap_or(0.0)
    }

    pub fn is_locked(&self, idx: usize) -> bool {
        self.alpha(idx) >= LOCK_THRESHOLD
    }

    pub fn target(&self) -> Option<&FocusTarget> {
        self.target.as_ref()
    }

    /// Replace the focal transform. The previous one is kept until this is
    /// called again, so a release decays toward the last place it aimed at.
    pub fn retarget(&mut self, target: FocusTarget) {
        self.target = Some(target);
    }

    /// Damp every focusable entity's accumulator and displayed scale.
    pub fn update(
        &mut self,
        pool: &EntityPool,
        selected: Option<usize>,
        engaged: bool,
        multiplier: f32,
        delta: f32,
        config: &MotionConfig,
    ) {
        if !(delta > 0.0) {
            return;
        }
        let multiplier = if multiplier.is_finite() {
            multiplier.clamp(1.0, config.max_scale_multiplier)
        } else {
            1.0
        };
        for &idx in pool.focusable() {
            let desired = if engaged && selected == Some(idx) { 1.0 } else { 0.0 };
            let alpha = damp(self.alphas[idx], desired, config.focus_rate, delta);
            self.alphas[idx] = alpha;

            let base = pool.entities()[idx].base_scale();
            let wanted = base * (1.0 + (multiplier - 1.0) * alpha);
            self.scales[idx] = damp(self.scales[idx], wanted, config.focus_scale_rate, delta);
        }
    }

    /// Displayed pose of one entity. For a locked entity the returned rotation
    /// faces the focal look-at point; callers feed it back into the
    /// interpolator so ambient motion resumes from there.
    pub fn compose(&self, pool: &EntityPool, idx: usize, motion: &EntityMotion) -> Pose {
        let mut pose = Pose::from_motion(motion);
        let Some(entity) = pool.get(idx) else {
            return pose;
        };
        if !entity.is_focusable() {
            return pose;
        }

        pose.scale = self.scales[idx];
        let alpha = self.alphas[idx];
        if let Some(target) = &self.target {
            pose.position = motion.position.lerp(target.point, alpha);
            if alpha >= LOCK_THRESHOLD {
                if let Some(rotation) = look_at_euler(pose.position, target.look_at) {
                    pose.rotation = rotation;
                }
            }
        }
        pose
    }
}
