//! Projection between world space and the normalized pointer plane
//! (`[-1, 1]` on both axes, y up), and the orbit rig that places the camera.

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::config::CameraConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        Some(Self {
            origin,
            direction: direction.try_normalize()?,
        })
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// World ↔ pointer-plane mapping supplied by whoever owns the camera.
pub trait Projector {
    /// Normalized device coordinates of a world point, or `None` when it sits
    /// behind the eye.
    fn project(&self, world: Vec3) -> Option<Vec2>;
    /// World-space ray from the eye through a pointer coordinate.
    fn ray_through(&self, pointer: Vec2) -> Option<Ray>;
    fn eye(&self) -> Vec3;
    /// Unit view direction.
    fn forward(&self) -> Vec3;
}

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    eye: Vec3,
    forward: Vec3,
    view_projection: Mat4,
    inverse_view_projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(
        eye: Vec3,
        target: Vec3,
        fov_degrees: f32,
        aspect_ratio: f32,
        near_clip: f32,
        far_clip: f32,
    ) -> Option<Self> {
        if !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
            return None;
        }
        let forward = (target - eye).try_normalize()?;
        let mut up = Vec3::Y;
        if forward.cross(up).length_squared() <= f32::EPSILON {
            up = Vec3::Z;
        }

        let near = near_clip.max(1e-4);
        let view = Mat4::look_at_rh(eye, target, up);
        let projection = Mat4::perspective_rh(
            fov_degrees.to_radians(),
            aspect_ratio,
            near,
            far_clip.max(near + 1.0),
        );
        let view_projection = projection * view;
        let inverse_view_projection = view_projection.inverse();
        if !inverse_view_projection.is_finite() {
            return None;
        }

        Some(Self {
            eye,
            forward,
            view_projection,
            inverse_view_projection,
        })
    }

    pub fn from_config(config: &CameraConfig) -> Option<Self> {
        Self::new(
            Vec3::from_array(config.position),
            Vec3::from_array(config.target),
            config.fov_degrees,
            config.aspect,
            config.near_clip,
            config.far_clip,
        )
    }

    fn unproject(&self, pointer: Vec2, depth: f32) -> Option<Vec3> {
        let world = self.inverse_view_projection * Vec4::new(pointer.x, pointer.y, depth, 1.0);
        if world.w.abs() <= f32::EPSILON {
            return None;
        }
        let point = world.truncate() / world.w;
        point.is_finite().then_some(point)
    }
}

impl Projector for PerspectiveCamera {
    fn project(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.view_projection * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !ndc.x.is_finite() || !ndc.y.is_finite() {
            return None;
        }
        Some(Vec2::new(ndc.x, ndc.y))
    }

    fn ray_through(&self, pointer: Vec2) -> Option<Ray> {
        if !pointer.is_finite() {
            return None;
        }
        let near = self.unproject(pointer, 0.0)?;
        let far = self.unproject(pointer, 1.0)?;
        Ray::new(self.eye, far - near)
    }

    fn eye(&self) -> Vec3 {
        self.eye
    }

    fn forward(&self) -> Vec3 {
        self.forward
    }
}

/// Spherical camera placement around a fixed target: azimuth about +Y, polar
/// angle measured from +Y.
#[derive(Debug, Clone)]
pub struct OrbitRig {
    config: CameraConfig,
    target: Vec3,
    distance: f32,
    polar: f32,
    azimuth: f32,
}

impl OrbitRig {
    pub fn new(config: &CameraConfig) -> Self {
        let target = Vec3::from_array(config.target);
        let offset = Vec3::from_array(config.position) - target;
        let distance = offset.length();
        let (polar, azimuth) = if distance > f32::EPSILON {
            ((offset.y / distance).clamp(-1.0, 1.0).acos(), offset.x.atan2(offset.z))
        } else {
            (PI / 2.0, 0.0)
        };

        let mut rig = Self {
            config: config.clone(),
            target,
            distance,
            polar,
            azimuth,
        };
        rig.clamp();
        rig
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    pub fn polar(&self) -> f32 {
        self.polar
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Apply one tick: `rotation_step` is the gesture rotation signal in
    /// radians per 60 Hz frame; auto-rotation runs at `auto_rotate_speed`
    /// revolutions per minute.
    pub fn advance(&mut self, rotation_step: f32, auto_rotate: bool, delta: f32) {
        if !(delta > 0.0) {
            return;
        }
        if rotation_step.is_finite() {
            self.azimuth += rotation_step * delta * 60.0;
        }
        if auto_rotate {
            self.azimuth += TAU / 60.0 * self.config.auto_rotate_speed * delta;
        }
        self.azimuth = self.azimuth.rem_euclid(TAU);
    }

    /// Multiply the orbit distance, clamped to the configured range.
    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.distance *= factor;
            self.clamp();
        }
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_azimuth, cos_azimuth) = self.azimuth.sin_cos();
        self.target
            + Vec3::new(
                sin_polar * sin_azimuth,
                cos_polar,
                sin_polar * cos_azimuth,
            ) * self.distance
    }

    pub fn camera(&self) -> Option<PerspectiveCamera> {
        PerspectiveCamera::new(
            self.eye(),
            self.target,
            self.config.fov_degrees,
            self.config.aspect,
            self.config.near_clip,
            self.config.far_clip,
        )
    }

    fn clamp(&mut self) {
        self.distance = self
            .distance
            .clamp(self.config.min_distance, self.config.max_distance);
        self.polar = self.polar.clamp(1e-3, self.config.max_polar_angle);
    }
}
