//! Dual-state interpolation: every tick each entity's current transform damps
//! toward its chaos or formed placement. All steps are exponential in the
//! elapsed time, so a huge `delta` lands on the target instead of past it.

use glam::Vec3;

use crate::config::MotionConfig;
use crate::orientation::look_at_euler;
use crate::pool::{Entity, EntityClass, EntityPool};
use crate::scene::SceneState;

/// `current + (target - current) * (1 - e^(-rate * delta))`.
pub fn damp(current: f32, target: f32, rate: f32, delta: f32) -> f32 {
    current + (target - current) * damp_factor(rate, delta)
}

pub fn damp_vec3(current: Vec3, target: Vec3, rate: f32, delta: f32) -> Vec3 {
    current + (target - current) * damp_factor(rate, delta)
}

/// Fraction of the remaining distance covered in `delta` seconds; always in `[0, 1]`.
pub fn damp_factor(rate: f32, delta: f32) -> f32 {
    if !(delta > 0.0) || !(rate > 0.0) {
        return 0.0;
    }
    (1.0 - (-rate * delta).exp()).clamp(0.0, 1.0)
}

/// Cubic ease-in-out used for the scene progress uniform.
pub fn cubic_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        0.5 * (2.0 * t - 2.0).powi(3) + 1.0
    }
}

/// Damping rate for an entity heading toward the given arrangement.
pub fn class_rate(entity: &Entity, state: SceneState, motion: &MotionConfig) -> f32 {
    match entity.class() {
        EntityClass::Foliage => motion.foliage_rate,
        EntityClass::Ornament => match state {
            SceneState::Formed => motion.ornament_formed_rate * entity.weight(),
            SceneState::Chaos => motion.ornament_chaos_rate,
        },
        EntityClass::Element => motion.element_rate,
        EntityClass::Light => motion.light_rate,
        // The star never leaves its perch; only its scale moves.
        EntityClass::TopStar => motion.star_scale_rate,
    }
}

/// Interpolated state of one entity before any focus blending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityMotion {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
    pub glow: f32,
}

#[derive(Debug, Clone)]
pub struct Interpolator {
    motions: Vec<EntityMotion>,
    progress: f32,
    elapsed: f32,
}

impl Interpolator {
    /// Everything starts at its chaos placement, matching the initial scene state.
    pub fn new(pool: &EntityPool) -> Self {
        let motions = pool
            .entities()
            .iter()
            .map(|entity| {
                let chaos = entity.chaos();
                EntityMotion {
                    position: chaos.position,
                    rotation: chaos.rotation,
                    scale: chaos.scale,
                    glow: 0.0,
                }
            })
            .collect();
        Self {
            motions,
            progress: 0.0,
            elapsed: 0.0,
        }
    }

    pub fn motions(&self) -> &[EntityMotion] {
        &self.motions
    }

    pub fn motion(&self, idx: usize) -> Option<&EntityMotion> {
        self.motions.get(idx)
    }

    /// Scene-wide progress toward FORMED in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn eased_progress(&self) -> f32 {
        cubic_in_out(self.progress)
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Store the orientation a focused entity was locked to so ambient spin
    /// resumes from it after release.
    pub fn hold_rotation(&mut self, idx: usize, rotation: Vec3) {
        if let Some(motion) = self.motions.get_mut(idx) {
            motion.rotation = rotation;
        }
    }

    /// Advance every entity by `delta` seconds. `locked(i)` reports entities
    /// whose orientation is currently held by the focus blend.
    pub fn advance<F>(
        &mut self,
        pool: &EntityPool,
        state: SceneState,
        delta: f32,
        config: &MotionConfig,
        locked: F,
    ) where
        F: Fn(usize) -> bool,
    {
        if !(delta > 0.0) || !delta.is_finite() {
            return;
        }
        self.elapsed += delta;
        let formed = state.is_formed();
        let target_progress = if formed { 1.0 } else { 0.0 };
        self.progress = damp(self.progress, target_progress, config.foliage_rate, delta);
        let time = self.elapsed;

        for (idx, (entity, motion)) in pool.entities().iter().zip(&mut self.motions).enumerate() {
            let target = entity.target(formed);
            let rate = class_rate(entity, state, config);
            let ambient = entity.motion();

            match entity.class() {
                EntityClass::Foliage => {
                    motion.position = damp_vec3(motion.position, target.position, rate, delta);
                }
                EntityClass::Ornament => {
                    motion.position = damp_vec3(motion.position, target.position, rate, delta);
                    if locked(idx) {
                        continue;
                    }
                    if formed {
                        let p = motion.position;
                        let outward = Vec3::new(p.x * 2.0, p.y + 0.5, p.z * 2.0);
                        if let Some(facing) = look_at_euler(p, outward) {
                            let speed = time * ambient.wobble_speed;
                            let wobble_x =
                                (speed + ambient.wobble_offset).sin() * config.wobble_amplitude;
                            let wobble_z = (speed * 0.8 + ambient.wobble_offset).cos()
                                * config.wobble_amplitude;
                            motion.rotation = facing + Vec3::new(wobble_x, 0.0, wobble_z);
                        }
                    } else {
                        motion.rotation += ambient.angular_velocity * delta;
                    }
                }
                EntityClass::Element => {
                    motion.position = damp_vec3(motion.position, target.position, rate, delta);
                    motion.rotation += ambient.angular_velocity * delta;
                }
                EntityClass::Light => {
                    motion.position = damp_vec3(motion.position, target.position, rate, delta);
                    motion.glow = if formed {
                        let wave =
                            ((time * ambient.twinkle_speed + ambient.twinkle_offset).sin() + 1.0) / 2.0;
                        3.0 + wave * 4.0
                    } else {
                        0.0
                    };
                }
                EntityClass::TopStar => {
                    motion.scale = damp(motion.scale, target.scale, rate, delta);
                    motion.rotation.y += config.star_spin * delta;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{AmbientMotion, Entity, Placement};

    fn two_entity_pool() -> EntityPool {
        EntityPool::from_entities(vec![
            Entity::new(
                EntityClass::Element,
                Placement::at(Vec3::new(5.0, 5.0, 5.0)),
                Placement::at(Vec3::ZERO),
            ),
            Entity::new(
                EntityClass::Light,
                Placement::at(Vec3::new(-5.0, 0.0, 0.0)),
                Placement::at(Vec3::new(10.0, 0.0, 0.0)),
            ),
        ])
    }

    #[test]
    fn damp_factor_is_bounded() {
        assert_eq!(damp_factor(1.5, 0.0), 0.0);
        assert_eq!(damp_factor(1.5, -1.0), 0.0);
        assert_eq!(damp_factor(1.5, f32::NAN), 0.0);
        let huge = damp_factor(1.5, 1.0e6);
        assert!(huge <= 1.0 && huge > 0.99);
        let small = damp_factor(2.0, 1.0 / 60.0);
        assert!(small > 0.0 && small < 0.05);
    }

    #[test]
    fn large_delta_never_overshoots() {
        let value = damp(0.0, 10.0, 3.0, 10_000.0);
        assert!(value <= 10.0 && value > 9.999);
    }

    #[test]
    fn zero_delta_is_a_no_op() {
        let pool = two_entity_pool();
        let mut interpolator = Interpolator::new(&pool);
        let before = interpolator.motions().to_vec();
        for _ in 0..100 {
            interpolator.advance(
                &pool,
                SceneState::Formed,
                0.0,
                &MotionConfig::default(),
                |_| false,
            );
        }
        assert_eq!(interpolator.motions(), before.as_slice());
        assert_eq!(interpolator.elapsed(), 0.0);
    }

    #[test]
    fn ornament_chaos_rate_ignores_weight() {
        let chaos = Placement::at(Vec3::ZERO);
        let ornament = Entity::new(EntityClass::Ornament, chaos, chaos).with_weight(2.0);
        let motion = MotionConfig::default();
        assert_eq!(class_rate(&ornament, SceneState::Chaos, &motion), 0.5);
        assert!((class_rate(&ornament, SceneState::Formed, &motion) - 1.6).abs() < 1e-6);
    }

    #[test]
    fn loose_ornament_spins_and_locked_one_holds() {
        let spin = AmbientMotion {
            angular_velocity: Vec3::new(0.5, 0.0, 0.0),
            ..AmbientMotion::default()
        };
        let place = Placement::at(Vec3::new(1.0, 0.0, 0.0));
        let pool = EntityPool::from_entities(vec![
            Entity::new(EntityClass::Ornament, place, place).with_motion(spin),
            Entity::new(EntityClass::Ornament, place, place).with_motion(spin),
        ]);
        let mut interpolator = Interpolator::new(&pool);
        interpolator.advance(
            &pool,
            SceneState::Chaos,
            1.0,
            &MotionConfig::default(),
            |idx| idx == 1,
        );
        assert!((interpolator.motions()[0].rotation.x - 0.5).abs() < 1e-6);
        assert_eq!(interpolator.motions()[1].rotation.x, 0.0);
    }

    #[test]
    fn star_scale_follows_state() {
        let perch = Placement::at(Vec3::new(0.0, 12.8, 0.0));
        let pool = EntityPool::from_entities(vec![Entity::new(
            EntityClass::TopStar,
            perch.with_scale(0.0),
            perch.with_scale(1.0),
        )]);
        let mut interpolator = Interpolator::new(&pool);
        for _ in 0..300 {
            interpolator.advance(
                &pool,
                SceneState::Formed,
                1.0 / 60.0,
                &MotionConfig::default(),
                |_| false,
            );
        }
        let star = interpolator.motions()[0];
        assert!((star.scale - 1.0).abs() < 1e-3);
        assert_eq!(star.position, perch.position);
        assert!(star.rotation.y > 0.0);
    }

    #[test]
    fn lights_glow_only_when_formed() {
        let pool = two_entity_pool();
        let mut interpolator = Interpolator::new(&pool);
        let motion = MotionConfig::default();
        interpolator.advance(&pool, SceneState::Chaos, 0.1, &motion, |_| false);
        assert_eq!(interpolator.motions()[1].glow, 0.0);
        interpolator.advance(&pool, SceneState::Formed, 0.1, &motion, |_| false);
        let glow = interpolator.motions()[1].glow;
        assert!((3.0..=7.0).contains(&glow));
    }

    #[test]
    fn progress_eases_toward_formed() {
        let pool = two_entity_pool();
        let mut interpolator = Interpolator::new(&pool);
        for _ in 0..600 {
            interpolator.advance(
                &pool,
                SceneState::Formed,
                1.0 / 60.0,
                &MotionConfig::default(),
                |_| false,
            );
        }
        assert!(interpolator.progress() > 0.99);
        assert!(interpolator.eased_progress() > 0.99);
        assert_eq!(cubic_in_out(0.5), 0.5);
    }
}
