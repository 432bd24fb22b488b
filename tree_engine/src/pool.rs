//! The entity arena. Entities are created once, keep their chaos and formed
//! placements for the whole session, and are addressed by stable indices.
//! Pickable geometry lives in a separate collider arena whose parts point back
//! at their owning entity by index.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, TreeShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    Foliage,
    Ornament,
    Element,
    Light,
    TopStar,
}

impl EntityClass {
    pub const ALL: [EntityClass; 5] = [
        EntityClass::Foliage,
        EntityClass::Ornament,
        EntityClass::Element,
        EntityClass::Light,
        EntityClass::TopStar,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityClass::Foliage => "foliage",
            EntityClass::Ornament => "ornament",
            EntityClass::Element => "element",
            EntityClass::Light => "light",
            EntityClass::TopStar => "top_star",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    GiftBox,
    Bauble,
    CandyCane,
}

/// Position, Euler rotation and uniform scale in the pool's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

impl Placement {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

/// Per-entity ambient motion parameters drawn at creation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AmbientMotion {
    /// Radians per second around each local axis while loose.
    pub angular_velocity: Vec3,
    pub wobble_offset: f32,
    pub wobble_speed: f32,
    pub twinkle_speed: f32,
    pub twinkle_offset: f32,
}

#[derive(Debug, Clone)]
pub struct Entity {
    class: EntityClass,
    chaos: Placement,
    formed: Placement,
    base_scale: f32,
    big: bool,
    weight: f32,
    motion: AmbientMotion,
    visual_tag: u32,
    element_kind: Option<ElementKind>,
}

impl Entity {
    pub fn new(class: EntityClass, chaos: Placement, formed: Placement) -> Self {
        Self {
            class,
            chaos,
            formed,
            base_scale: formed.scale,
            big: false,
            weight: 1.0,
            motion: AmbientMotion::default(),
            visual_tag: 0,
            element_kind: None,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_motion(mut self, motion: AmbientMotion) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_visual_tag(mut self, tag: u32) -> Self {
        self.visual_tag = tag;
        self
    }

    pub fn class(&self) -> EntityClass {
        self.class
    }

    pub fn chaos(&self) -> &Placement {
        &self.chaos
    }

    pub fn formed(&self) -> &Placement {
        &self.formed
    }

    /// Placement the entity is pulled toward in the given arrangement.
    pub fn target(&self, formed: bool) -> &Placement {
        if formed { &self.formed } else { &self.chaos }
    }

    pub fn base_scale(&self) -> f32 {
        self.base_scale
    }

    pub fn is_big(&self) -> bool {
        self.big
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn motion(&self) -> &AmbientMotion {
        &self.motion
    }

    /// Opaque appearance reference owned by the renderer (photo slot, palette index).
    pub fn visual_tag(&self) -> u32 {
        self.visual_tag
    }

    pub fn element_kind(&self) -> Option<ElementKind> {
        self.element_kind
    }

    pub fn is_focusable(&self) -> bool {
        self.class == EntityClass::Ornament
    }
}

/// Axis-aligned box in the owning entity's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub owner: usize,
    pub center: Vec3,
    pub half_extents: Vec3,
}

const PART_THICKNESS: f32 = 0.005;

/// Front photo, front border, back photo, back border of a double-sided polaroid.
fn polaroid_parts(owner: usize) -> [Collider; 4] {
    let photo = Vec3::new(0.5, 0.5, PART_THICKNESS);
    let border = Vec3::new(0.6, 0.75, PART_THICKNESS);
    [
        Collider {
            owner,
            center: Vec3::new(0.0, 0.0, 0.015),
            half_extents: photo,
        },
        Collider {
            owner,
            center: Vec3::new(0.0, -0.15, 0.005),
            half_extents: border,
        },
        Collider {
            owner,
            center: Vec3::new(0.0, 0.0, -0.015),
            half_extents: photo,
        },
        Collider {
            owner,
            center: Vec3::new(0.0, -0.15, -0.005),
            half_extents: border,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct EntityPool {
    entities: Vec<Entity>,
    colliders: Vec<Collider>,
    focusable: Vec<usize>,
    photo_slots: u32,
    next_photo_slot: u32,
}

impl EntityPool {
    /// Wrap hand-built entities; ornaments get their polaroid colliders.
    pub fn from_entities(entities: Vec<Entity>) -> Self {
        let mut colliders = Vec::new();
        let mut focusable = Vec::new();
        for (idx, entity) in entities.iter().enumerate() {
            if entity.is_focusable() {
                focusable.push(idx);
                colliders.extend(polaroid_parts(idx));
            }
        }
        Self {
            entities,
            colliders,
            focusable,
            photo_slots: 1,
            next_photo_slot: 1,
        }
    }

    pub fn populate_seeded(config: &EngineConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self::populate(config, &mut rng)
    }

    pub fn populate_from_entropy(config: &EngineConfig) -> Self {
        let mut rng = ChaCha8Rng::from_entropy();
        Self::populate(config, &mut rng)
    }

    /// Build every category in a fixed order: foliage, ornaments, elements,
    /// lights, then the top star.
    pub fn populate<R: Rng>(config: &EngineConfig, rng: &mut R) -> Self {
        let shape = &config.tree;
        let counts = &config.counts;
        let mut entities = Vec::with_capacity(
            counts.foliage + counts.ornaments + counts.elements + counts.lights + 1,
        );

        for _ in 0..counts.foliage {
            entities.push(foliage(shape, rng));
        }
        let photo_slots = shape.photo_slots.max(1);
        for idx in 0..counts.ornaments {
            entities.push(ornament(shape, rng, idx as u32 % photo_slots));
        }
        for _ in 0..counts.elements {
            entities.push(element(shape, rng));
        }
        for _ in 0..counts.lights {
            entities.push(light(shape, rng));
        }
        if counts.top_star {
            entities.push(top_star(shape));
        }

        let mut pool = Self::from_entities(entities);
        pool.photo_slots = photo_slots;
        debug!(
            "populated pool: {} entities ({} focusable, {} colliders)",
            pool.len(),
            pool.focusable.len(),
            pool.colliders.len()
        );
        pool
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Entity> {
        self.entities.get(idx)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    /// Indices of entities that can be picked and focused, in pool order.
    pub fn focusable(&self) -> &[usize] {
        &self.focusable
    }

    pub fn count(&self, class: EntityClass) -> usize {
        self.entities.iter().filter(|e| e.class == class).count()
    }

    pub fn colliders_of(&self, owner: usize) -> impl Iterator<Item = &Collider> {
        self.colliders.iter().filter(move |c| c.owner == owner)
    }

    /// Next photo slot to receive a replacement image. Slot 0 holds the top
    /// photo and is never handed out; the cursor wraps back to 1.
    pub fn next_photo_slot(&mut self) -> Option<u32> {
        if self.photo_slots < 2 {
            return None;
        }
        let slot = self.next_photo_slot;
        self.next_photo_slot += 1;
        if self.next_photo_slot >= self.photo_slots {
            self.next_photo_slot = 1;
        }
        Some(slot)
    }
}

fn height_fraction(shape: &TreeShape, y: f32) -> f32 {
    (y + shape.height / 2.0) / shape.height
}

/// Uniform height, radius drawn inside the cone's cross-section.
pub fn cone_interior_point<R: Rng>(shape: &TreeShape, rng: &mut R) -> Vec3 {
    let y = rng.gen::<f32>() * shape.height - shape.height / 2.0;
    let max_radius = shape.radius * (1.0 - height_fraction(shape, y));
    let theta = rng.gen::<f32>() * TAU;
    let r = rng.gen::<f32>() * max_radius;
    Vec3::new(r * theta.cos(), y, r * theta.sin())
}

/// Point on the cone surface, with the radius scaled then pushed outward.
pub fn cone_surface_point<R: Rng>(
    shape: &TreeShape,
    rng: &mut R,
    radius_scale: f32,
    radius_offset: f32,
) -> Vec3 {
    let y = rng.gen::<f32>() * shape.height - shape.height / 2.0;
    let r = shape.radius * (1.0 - height_fraction(shape, y)) * radius_scale + radius_offset;
    let theta = rng.gen::<f32>() * TAU;
    Vec3::new(r * theta.cos(), y, r * theta.sin())
}

pub fn ball_point<R: Rng>(radius: f32, rng: &mut R) -> Vec3 {
    loop {
        let candidate = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        if candidate.length_squared() <= 1.0 {
            return candidate * radius;
        }
    }
}

pub fn cube_point<R: Rng>(side: f32, rng: &mut R) -> Vec3 {
    Vec3::new(
        (rng.gen::<f32>() - 0.5) * side,
        (rng.gen::<f32>() - 0.5) * side,
        (rng.gen::<f32>() - 0.5) * side,
    )
}

fn random_rotation<R: Rng>(rng: &mut R) -> Vec3 {
    Vec3::new(rng.gen::<f32>() * PI, rng.gen::<f32>() * PI, rng.gen::<f32>() * PI)
}

fn spin<R: Rng>(rng: &mut R, span: f32) -> Vec3 {
    Vec3::new(
        (rng.gen::<f32>() - 0.5) * span,
        (rng.gen::<f32>() - 0.5) * span,
        (rng.gen::<f32>() - 0.5) * span,
    )
}

fn foliage<R: Rng>(shape: &TreeShape, rng: &mut R) -> Entity {
    let chaos = Placement::at(ball_point(25.0, rng));
    let formed = Placement::at(cone_interior_point(shape, rng));
    let size = rng.gen::<f32>();
    Entity::new(EntityClass::Foliage, chaos, formed).with_visual_tag((size * 255.0) as u32)
}

fn ornament<R: Rng>(shape: &TreeShape, rng: &mut R, photo: u32) -> Entity {
    let chaos_position = cube_point(70.0, rng);
    let formed_position = cone_surface_point(shape, rng, 1.0, 0.5);
    let big = rng.gen::<f32>() < 0.2;
    let base_scale = if big { 2.2 } else { 0.8 + rng.gen::<f32>() * 0.6 };
    let weight = 0.8 + rng.gen::<f32>() * 1.2;
    let angular_velocity = spin(rng, 1.0);
    let chaos_rotation = random_rotation(rng);
    let motion = AmbientMotion {
        angular_velocity,
        wobble_offset: rng.gen::<f32>() * 10.0,
        wobble_speed: 0.5 + rng.gen::<f32>() * 0.5,
        ..AmbientMotion::default()
    };

    let mut entity = Entity::new(
        EntityClass::Ornament,
        Placement::at(chaos_position)
            .with_rotation(chaos_rotation)
            .with_scale(base_scale),
        Placement::at(formed_position).with_scale(base_scale),
    )
    .with_weight(weight)
    .with_motion(motion)
    .with_visual_tag(photo);
    entity.big = big;
    entity
}

fn element<R: Rng>(shape: &TreeShape, rng: &mut R) -> Entity {
    let chaos_position = cube_point(60.0, rng);
    let formed_position = cone_surface_point(shape, rng, 0.95, 0.0);
    let (kind, scale, palette) = match rng.gen_range(0..3) {
        0 => (ElementKind::GiftBox, 0.8 + rng.gen::<f32>() * 0.4, rng.gen_range(0..4)),
        1 => (ElementKind::Bauble, 0.6 + rng.gen::<f32>() * 0.4, rng.gen_range(0..4)),
        _ => (ElementKind::CandyCane, 0.7 + rng.gen::<f32>() * 0.3, rng.gen_range(0..2)),
    };
    let angular_velocity = spin(rng, 2.0);
    let chaos_rotation = random_rotation(rng);

    let mut entity = Entity::new(
        EntityClass::Element,
        Placement::at(chaos_position)
            .with_rotation(chaos_rotation)
            .with_scale(scale),
        Placement::at(formed_position).with_scale(scale),
    )
    .with_motion(AmbientMotion {
        angular_velocity,
        ..AmbientMotion::default()
    })
    .with_visual_tag(palette);
    entity.element_kind = Some(kind);
    entity
}

fn light<R: Rng>(shape: &TreeShape, rng: &mut R) -> Entity {
    let chaos_position = cube_point(60.0, rng);
    let formed_position = cone_surface_point(shape, rng, 1.0, 0.3);
    let palette = rng.gen_range(0..4);
    let motion = AmbientMotion {
        twinkle_speed: 2.0 + rng.gen::<f32>() * 3.0,
        twinkle_offset: rng.gen::<f32>() * 100.0,
        ..AmbientMotion::default()
    };
    Entity::new(
        EntityClass::Light,
        Placement::at(chaos_position).with_scale(0.15),
        Placement::at(formed_position).with_scale(0.15),
    )
    .with_motion(motion)
    .with_visual_tag(palette)
}

fn top_star(shape: &TreeShape) -> Entity {
    let position = Vec3::new(0.0, shape.height / 2.0 + 1.8, 0.0);
    Entity::new(
        EntityClass::TopStar,
        Placement::at(position).with_scale(0.0),
        Placement::at(position).with_scale(1.0),
    )
}
