//! The tick loop's owner. Each tick runs in a fixed order: apply the newest
//! scene command, advance the camera rig and the interpolator, resolve the
//! selection, then blend focus and compose the displayed poses.

use glam::{Vec2, Vec3};
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::camera::{OrbitRig, PerspectiveCamera, Projector};
use crate::config::{ConfigError, EngineConfig};
use crate::focus::{FocusBlend, FocusTarget, Pose};
use crate::interpolate::Interpolator;
use crate::picking::{pick, ColliderScene, RayCaster};
use crate::pool::EntityPool;
use crate::scene::{CommandSource, SceneState, SceneStateMachine};
use crate::signals::{signal_channel, PinchState, SignalBus, SignalTap};
use crate::touch::{TouchEffect, TouchTracker, Viewport};

/// What the renderer needs after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub tick: u64,
    pub elapsed: f32,
    pub scene: SceneState,
    pub progress: f32,
    pub eased_progress: f32,
    pub selected: Option<usize>,
    pub focus_alpha: f32,
    pub pinch: PinchState,
    pub rotation_speed: f32,
    pub camera_azimuth: f32,
    pub status: String,
    pub poses: Vec<Pose>,
}

pub struct Choreographer {
    config: EngineConfig,
    origin: Vec3,
    pool: EntityPool,
    interpolator: Interpolator,
    focus: FocusBlend,
    scene: SceneStateMachine,
    bus: SignalBus,
    tap: SignalTap,
    touch: TouchTracker,
    rig: OrbitRig,
    rng: ChaCha8Rng,
    poses: Vec<Pose>,
    selected: Option<usize>,
    forced_selection: Option<usize>,
    last_pointer: Option<Vec2>,
    ticks: u64,
}

impl Choreographer {
    /// Populate a pool from `seed` and wire everything up.
    pub fn seeded(config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = EntityPool::populate_seeded(&config, seed);
        Self::with_pool(config, pool, seed)
    }

    /// Drive an existing pool. `seed` feeds random selection.
    pub fn with_pool(config: EngineConfig, pool: EntityPool, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let (bus, tap) = signal_channel();
        let interpolator = Interpolator::new(&pool);
        let focus = FocusBlend::new(&pool);
        let poses = interpolator
            .motions()
            .iter()
            .enumerate()
            .map(|(idx, motion)| focus.compose(&pool, idx, motion))
            .collect();
        let touch = TouchTracker::new(&config.touch, Viewport::new(1920.0, 1080.0));
        let rig = OrbitRig::new(&config.camera);
        info!(
            "choreographer ready: {} entities, {} focusable",
            pool.len(),
            pool.focusable().len()
        );

        Ok(Self {
            origin: Vec3::from_array(config.tree.origin),
            config,
            pool,
            interpolator,
            focus,
            scene: SceneStateMachine::default(),
            bus,
            tap,
            touch,
            rig,
            rng: ChaCha8Rng::seed_from_u64(seed),
            poses,
            selected: None,
            forced_selection: None,
            last_pointer: None,
            ticks: 0,
        })
    }

    /// Producer handle for the gesture task and other input sources.
    pub fn signal_bus(&self) -> SignalBus {
        self.bus.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool(&self) -> &EntityPool {
        &self.pool
    }

    pub fn state(&self) -> SceneState {
        self.scene.state()
    }

    pub fn transitions(&self) -> u32 {
        self.scene.transitions()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn forced_selection(&self) -> Option<usize> {
        self.forced_selection
    }

    /// Displayed poses in the pool frame, indexed like the pool.
    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn interpolator(&self) -> &Interpolator {
        &self.interpolator
    }

    pub fn focus_alpha(&self, idx: usize) -> f32 {
        self.focus.alpha(idx)
    }

    pub fn pinch(&self) -> PinchState {
        self.tap.pinch()
    }

    pub fn rotation_speed(&self) -> f32 {
        self.tap.rotation()
    }

    pub fn status(&self) -> String {
        self.tap.status()
    }

    /// World-space origin of the pool frame.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn rig(&self) -> &OrbitRig {
        &self.rig
    }

    pub fn camera(&self) -> Option<PerspectiveCamera> {
        self.rig.camera()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance one frame with the built-in orbit camera and collider picking.
    pub fn tick(&mut self, delta: f32) {
        let delta = sanitize(delta);
        self.advance(delta);
        let camera = self.rig.camera();
        self.resolve(delta, camera.as_ref().map(|c| c as &dyn Projector), None);
    }

    /// Advance one frame with a camera and ray test supplied by the renderer.
    pub fn tick_with(
        &mut self,
        delta: f32,
        projector: &dyn Projector,
        caster: Option<&dyn RayCaster>,
    ) {
        let delta = sanitize(delta);
        self.advance(delta);
        self.resolve(delta, Some(projector), caster);
    }

    pub fn toggle_scene(&mut self) -> SceneState {
        self.scene.toggle(CommandSource::Manual)
    }

    pub fn set_scene(&mut self, state: SceneState, source: CommandSource) -> bool {
        self.scene.apply(state, source)
    }

    /// Force focus onto a uniformly random focusable entity.
    pub fn select_random(&mut self) -> Option<usize> {
        let focusable = self.pool.focusable();
        if focusable.is_empty() {
            return None;
        }
        let idx = focusable[self.rng.gen_range(0..focusable.len())];
        debug!("forced selection -> {idx}");
        self.forced_selection = Some(idx);
        Some(idx)
    }

    /// Scale the orbit distance; the rig clamps it to the configured range.
    pub fn zoom(&mut self, factor: f32) {
        self.rig.zoom(factor);
        debug!("orbit distance -> {:.1}", self.rig.distance());
    }

    pub fn clear_forced_selection(&mut self) {
        self.forced_selection = None;
    }

    /// Photo slot to bind the next replacement image to.
    pub fn next_photo_slot(&mut self) -> Option<u32> {
        self.pool.next_photo_slot()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.touch.set_viewport(viewport);
    }

    pub fn touch_start(&mut self, touches: &[Vec2]) -> TouchEffect {
        let effect = self.touch.touch_start(touches);
        self.apply_touch(effect);
        effect
    }

    pub fn touch_move(&mut self, touches: &[Vec2]) -> TouchEffect {
        let effect = self.touch.touch_move(touches);
        self.apply_touch(effect);
        effect
    }

    pub fn touch_end(&mut self, remaining: usize) -> TouchEffect {
        let effect = self.touch.touch_end(remaining);
        self.apply_touch(effect);
        effect
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            tick: self.ticks,
            elapsed: self.interpolator.elapsed(),
            scene: self.scene.state(),
            progress: self.interpolator.progress(),
            eased_progress: self.interpolator.eased_progress(),
            selected: self.selected,
            focus_alpha: self.selected.map_or(0.0, |idx| self.focus.alpha(idx)),
            pinch: self.tap.pinch(),
            rotation_speed: self.tap.rotation(),
            camera_azimuth: self.rig.azimuth(),
            status: self.tap.status(),
            poses: self.poses.clone(),
        }
    }

    fn apply_touch(&mut self, effect: TouchEffect) {
        match effect {
            TouchEffect::Began(pinch) => {
                self.bus.publish_pinch(pinch);
                self.select_random();
            }
            TouchEffect::Moved(pinch) => self.bus.publish_pinch(pinch),
            TouchEffect::Ended => {
                self.bus.publish_pinch(PinchState::released());
                self.clear_forced_selection();
            }
            TouchEffect::Ignored => {}
        }
    }

    fn advance(&mut self, delta: f32) {
        if let Some(command) = self.tap.take_scene_command() {
            self.scene.apply(command.state, command.source);
        }
        let state = self.scene.state();
        self.rig
            .advance(self.tap.rotation(), state == SceneState::Chaos, delta);

        let focus = &self.focus;
        self.interpolator.advance(
            &self.pool,
            state,
            delta,
            &self.config.motion,
            |idx| focus.is_locked(idx),
        );
    }

    fn resolve(
        &mut self,
        delta: f32,
        projector: Option<&dyn Projector>,
        caster: Option<&dyn RayCaster>,
    ) {
        let pinch = self.tap.pinch();
        self.selected = self.select(pinch.pointer, projector, caster);
        self.last_pointer = pinch.pointer;

        let engaged = self.forced_selection.is_some() || pinch.engaged();
        let multiplier = if pinch.pointer.is_some() {
            pinch.scale
        } else {
            self.config.touch.initial_scale
        };
        if engaged {
            if let Some(projector) = projector {
                self.focus.retarget(FocusTarget::in_front_of(
                    projector,
                    self.config.motion.focus_distance,
                    self.origin,
                ));
            }
        }
        self.focus.update(
            &self.pool,
            self.selected,
            engaged,
            multiplier,
            delta,
            &self.config.motion,
        );

        for (idx, motion) in self.interpolator.motions().iter().enumerate() {
            self.poses[idx] = self.focus.compose(&self.pool, idx, motion);
        }
        for &idx in self.pool.focusable() {
            if self.focus.is_locked(idx) {
                self.interpolator.hold_rotation(idx, self.poses[idx].rotation);
            }
        }
        self.ticks += 1;
    }

    /// A forced selection wins; otherwise re-pick only when the pointer moved
    /// or nothing is selected yet.
    fn select(
        &self,
        pointer: Option<Vec2>,
        projector: Option<&dyn Projector>,
        caster: Option<&dyn RayCaster>,
    ) -> Option<usize> {
        if let Some(forced) = self.forced_selection {
            return Some(forced);
        }
        let pointer = pointer?;
        if self.selected.is_some() && self.last_pointer == Some(pointer) {
            return self.selected;
        }
        let Some(projector) = projector else {
            return self.selected;
        };
        let colliders = ColliderScene::new(&self.pool, &self.poses, self.origin);
        let caster = caster.unwrap_or(&colliders);
        pick(pointer, projector, caster, &self.pool, &self.poses, self.origin)
    }
}

fn sanitize(delta: f32) -> f32 {
    if delta.is_finite() && delta > 0.0 {
        delta
    } else {
        0.0
    }
}
