//! Pointer → entity resolution. A ray through the pointer is tested against
//! the collider arena first; when nothing is hit, the focusable entity whose
//! projected centre lies closest to the pointer wins.

use glam::{Mat4, Vec2, Vec3};
use log::trace;

use crate::camera::{Projector, Ray};
use crate::focus::Pose;
use crate::pool::EntityPool;

/// One intersection: `part` indexes the pool's collider arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub part: usize,
    pub distance: f32,
}

/// Ray intersection over entity geometry. Hits may come back in any order.
pub trait RayCaster {
    fn cast(&self, ray: &Ray) -> Vec<RayHit>;
}

/// Tests rays against the pool's collider boxes placed at the given poses.
pub struct ColliderScene<'a> {
    pool: &'a EntityPool,
    poses: &'a [Pose],
    origin: Vec3,
}

impl<'a> ColliderScene<'a> {
    pub fn new(pool: &'a EntityPool, poses: &'a [Pose], origin: Vec3) -> Self {
        Self {
            pool,
            poses,
            origin,
        }
    }
}

impl RayCaster for ColliderScene<'_> {
    fn cast(&self, ray: &Ray) -> Vec<RayHit> {
        let mut hits = Vec::new();
        let mut current: Option<(usize, Mat4)> = None;
        for (part, collider) in self.pool.colliders().iter().enumerate() {
            let Some(pose) = self.poses.get(collider.owner) else {
                continue;
            };
            let inverse = match current {
                Some((owner, inverse)) if owner == collider.owner => inverse,
                _ => {
                    let world = pose.world_matrix(self.origin);
                    if world.determinant().abs() <= f32::EPSILON {
                        continue;
                    }
                    let inverse = world.inverse();
                    current = Some((collider.owner, inverse));
                    inverse
                }
            };
            // Direction stays unnormalized so the slab parameter is the world distance.
            let origin = inverse.transform_point3(ray.origin);
            let direction = inverse.transform_vector3(ray.direction);
            let min = collider.center - collider.half_extents;
            let max = collider.center + collider.half_extents;
            if let Some(distance) = slab_intersection(origin, direction, min, max) {
                hits.push(RayHit { part, distance });
            }
        }
        hits
    }
}

/// Entry distance of a ray into an axis-aligned box, or `None` on a miss or
/// when the box lies entirely behind the origin.
pub fn slab_intersection(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() <= f32::EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let mut t0 = (min[axis] - o) / d;
        let mut t1 = (max[axis] - o) / d;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return None;
        }
    }
    if t_far < 0.0 {
        return None;
    }
    Some(t_near.max(0.0))
}

/// Resolve a pointer to a focusable entity index. Returns `None` only when
/// the pool has nothing focusable or the pointer is not finite.
pub fn pick(
    pointer: Vec2,
    projector: &dyn Projector,
    caster: &dyn RayCaster,
    pool: &EntityPool,
    poses: &[Pose],
    origin: Vec3,
) -> Option<usize> {
    if !pointer.is_finite() || pool.focusable().is_empty() {
        return None;
    }
    if let Some(owner) = projector
        .ray_through(pointer)
        .and_then(|ray| nearest_hit_owner(&ray, caster, pool))
    {
        trace!("pointer {pointer} hit entity {owner}");
        return Some(owner);
    }
    nearest_projected(pointer, projector, pool, poses, origin)
}

fn nearest_hit_owner(ray: &Ray, caster: &dyn RayCaster, pool: &EntityPool) -> Option<usize> {
    let mut best: Option<RayHit> = None;
    for hit in caster.cast(ray) {
        if !hit.distance.is_finite() {
            continue;
        }
        if best.map_or(true, |b| hit.distance < b.distance) {
            best = Some(hit);
        }
    }
    let owner = pool.colliders().get(best?.part)?.owner;
    pool.get(owner)
        .filter(|entity| entity.is_focusable())
        .map(|_| owner)
}

/// Fallback: minimum projected distance, first in pool order on ties. A
/// centre that cannot be projected scores `f32::MAX` so some entity is
/// always chosen.
fn nearest_projected(
    pointer: Vec2,
    projector: &dyn Projector,
    pool: &EntityPool,
    poses: &[Pose],
    origin: Vec3,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for &idx in pool.focusable() {
        let score = world_center(pool, poses, idx, origin)
            .and_then(|center| projector.project(center))
            .map(|ndc| ndc.distance(pointer))
            .filter(|distance| distance.is_finite())
            .unwrap_or(f32::MAX);
        if best.map_or(true, |(_, best_score)| score < best_score) {
            best = Some((idx, score));
        }
    }
    trace!("pointer {pointer} fell back to {best:?}");
    best.map(|(idx, _)| idx)
}

/// Centre of the world-space box enclosing every collider part of `idx`;
/// entities without parts use their pose position.
pub fn world_center(pool: &EntityPool, poses: &[Pose], idx: usize, origin: Vec3) -> Option<Vec3> {
    let pose = poses.get(idx)?;
    let world = pose.world_matrix(origin);
    let mut bounds: Option<(Vec3, Vec3)> = None;
    for collider in pool.colliders_of(idx) {
        for corner in box_corners(collider.center, collider.half_extents) {
            let point = world.transform_point3(corner);
            bounds = Some(match bounds {
                Some((min, max)) => (min.min(point), max.max(point)),
                None => (point, point),
            });
        }
    }
    Some(match bounds {
        Some((min, max)) => (min + max) / 2.0,
        None => pose.position + origin,
    })
}

fn box_corners(center: Vec3, half: Vec3) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let sign = Vec3::new(
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        );
        *corner = center + half * sign;
    }
    corners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use crate::pool::{Entity, EntityClass, Placement};

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(Vec3::new(0.0, 0.0, 30.0), Vec3::ZERO, 45.0, 1.0, 0.1, 500.0)
            .expect("camera")
    }

    fn ornament(position: Vec3) -> Entity {
        let place = Placement::at(position);
        Entity::new(EntityClass::Ornament, place, place)
    }

    fn poses_of(pool: &EntityPool) -> Vec<Pose> {
        pool.entities()
            .iter()
            .map(|entity| Pose {
                position: entity.chaos().position,
                rotation: entity.chaos().rotation,
                scale: entity.chaos().scale,
            })
            .collect()
    }

    struct NoHits;

    impl RayCaster for NoHits {
        fn cast(&self, _ray: &Ray) -> Vec<RayHit> {
            Vec::new()
        }
    }

    #[test]
    fn slab_hits_and_misses() {
        let min = Vec3::splat(-1.0);
        let max = Vec3::splat(1.0);
        let hit = slab_intersection(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, min, max);
        assert_eq!(hit, Some(4.0));
        assert!(slab_intersection(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z, min, max).is_none());
        assert!(slab_intersection(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, min, max).is_none());
        assert_eq!(slab_intersection(Vec3::ZERO, Vec3::X, min, max), Some(0.0));
    }

    #[test]
    fn ray_picks_nearest_owner() {
        let pool = EntityPool::from_entities(vec![
            Entity::new(
                EntityClass::Light,
                Placement::at(Vec3::ZERO),
                Placement::at(Vec3::ZERO),
            ),
            ornament(Vec3::new(0.0, 0.0, -5.0)),
            ornament(Vec3::new(0.0, 0.0, 5.0)),
        ]);
        let poses = poses_of(&pool);
        let scene = ColliderScene::new(&pool, &poses, Vec3::ZERO);
        let picked = pick(Vec2::ZERO, &camera(), &scene, &pool, &poses, Vec3::ZERO);
        assert_eq!(picked, Some(2));
    }

    #[test]
    fn scaled_and_turned_parts_still_hit() {
        let place = Placement::at(Vec3::new(2.0, 0.0, 0.0))
            .with_rotation(Vec3::new(0.0, 0.4, 0.0))
            .with_scale(3.0);
        let pool = EntityPool::from_entities(vec![Entity::new(EntityClass::Ornament, place, place)]);
        let poses = poses_of(&pool);
        let scene = ColliderScene::new(&pool, &poses, Vec3::ZERO);
        let ray = Ray::new(Vec3::new(2.0, 0.0, 30.0), Vec3::NEG_Z).expect("ray");
        let hits = scene.cast(&ray);
        assert!(!hits.is_empty());
        for hit in &hits {
            assert!(hit.distance > 29.0 && hit.distance < 31.0, "{hit:?}");
        }
    }

    #[test]
    fn fallback_takes_closest_projection() {
        let pool = EntityPool::from_entities(vec![
            ornament(Vec3::new(-8.0, 0.0, 0.0)),
            ornament(Vec3::new(8.0, 0.0, 0.0)),
        ]);
        let poses = poses_of(&pool);
        let cam = camera();
        let pointer = cam.project(Vec3::new(7.0, 1.0, 0.0)).expect("visible");
        assert_eq!(pick(pointer, &cam, &NoHits, &pool, &poses, Vec3::ZERO), Some(1));
    }

    #[test]
    fn fallback_tie_goes_to_pool_order() {
        let pool = EntityPool::from_entities(vec![
            ornament(Vec3::new(-4.0, 0.0, 0.0)),
            ornament(Vec3::new(4.0, 0.0, 0.0)),
        ]);
        let poses = poses_of(&pool);
        assert_eq!(
            pick(Vec2::ZERO, &camera(), &NoHits, &pool, &poses, Vec3::ZERO),
            Some(0)
        );
    }

    #[test]
    fn entities_behind_the_camera_still_resolve() {
        let pool = EntityPool::from_entities(vec![ornament(Vec3::new(0.0, 0.0, 100.0))]);
        let poses = poses_of(&pool);
        assert_eq!(
            pick(Vec2::new(0.9, -0.9), &camera(), &NoHits, &pool, &poses, Vec3::ZERO),
            Some(0)
        );
    }

    #[test]
    fn nothing_focusable_or_bad_pointer_yields_none() {
        let pool = EntityPool::from_entities(vec![Entity::new(
            EntityClass::Element,
            Placement::at(Vec3::ZERO),
            Placement::at(Vec3::ZERO),
        )]);
        let poses = poses_of(&pool);
        assert!(pick(Vec2::ZERO, &camera(), &NoHits, &pool, &poses, Vec3::ZERO).is_none());

        let pool = EntityPool::from_entities(vec![ornament(Vec3::ZERO)]);
        let poses = poses_of(&pool);
        assert!(pick(Vec2::new(f32::NAN, 0.0), &camera(), &NoHits, &pool, &poses, Vec3::ZERO).is_none());
    }

    #[test]
    fn world_center_accounts_for_border_offset() {
        let pool = EntityPool::from_entities(vec![ornament(Vec3::new(1.0, 2.0, 3.0))]);
        let poses = poses_of(&pool);
        let center = world_center(&pool, &poses, 0, Vec3::new(0.0, -6.0, 0.0)).expect("center");
        // Parts span y in [-0.9, 0.6], so the box centre sits 0.15 below the pose.
        assert!((center - Vec3::new(1.0, -4.15, 3.0)).length() < 1e-5);
    }
}
