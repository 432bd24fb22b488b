use serde::Serialize;
use tree_engine::gesture::TaskExit;
use tree_engine::{Choreographer, EntityClass, SceneState};

#[derive(Debug, Clone, Serialize)]
pub struct SelectionChange {
    pub tick: u64,
    pub index: Option<usize>,
    pub forced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub tick: u64,
    pub status: String,
}

/// Distance of displayed positions from the current scene's targets.
#[derive(Debug, Clone, Serialize)]
pub struct ClassConvergence {
    pub class: EntityClass,
    pub count: usize,
    pub mean_distance: f32,
    pub max_distance: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub ticks: u64,
    pub fps: u32,
    pub seed: u64,
    pub entities: usize,
    pub final_state: SceneState,
    pub transitions: u32,
    pub scene_sequence: Vec<SceneState>,
    pub selections: Vec<SelectionChange>,
    pub photo_slots: Vec<u32>,
    pub status: String,
    pub status_history: Vec<StatusChange>,
    pub gesture_exit: String,
    pub progress: f32,
    pub eased_progress: f32,
    pub camera_azimuth: f32,
    pub camera_distance: f32,
    pub convergence: Vec<ClassConvergence>,
}

/// Watches the engine after every tick and keeps only the changes.
#[derive(Debug, Default)]
pub struct SessionRecorder {
    last_state: SceneState,
    last_selected: Option<usize>,
    last_status: String,
    scene_sequence: Vec<SceneState>,
    selections: Vec<SelectionChange>,
    photo_slots: Vec<u32>,
    status_history: Vec<StatusChange>,
}

impl SessionRecorder {
    pub fn new(engine: &Choreographer) -> Self {
        let status = engine.status();
        Self {
            last_state: engine.state(),
            last_selected: engine.selected(),
            status_history: vec![StatusChange {
                tick: 0,
                status: status.clone(),
            }],
            last_status: status,
            ..Self::default()
        }
    }

    pub fn record_photo_slot(&mut self, slot: u32) {
        self.photo_slots.push(slot);
    }

    pub fn observe(&mut self, engine: &Choreographer) {
        let tick = engine.ticks();
        let state = engine.state();
        if state != self.last_state {
            self.scene_sequence.push(state);
            self.last_state = state;
        }

        let selected = engine.selected();
        if selected != self.last_selected {
            self.selections.push(SelectionChange {
                tick,
                index: selected,
                forced: selected.is_some() && selected == engine.forced_selection(),
            });
            self.last_selected = selected;
        }

        let status = engine.status();
        if status != self.last_status {
            self.status_history.push(StatusChange {
                tick,
                status: status.clone(),
            });
            self.last_status = status;
        }
    }

    pub fn finish(
        self,
        engine: &Choreographer,
        fps: u32,
        seed: u64,
        exit: Option<TaskExit>,
    ) -> SimReport {
        let gesture_exit = match exit {
            Some(TaskExit::StreamEnded { frames }) => format!("stream ended after {frames} frames"),
            Some(TaskExit::Failed(status)) => status,
            None => "stopped".to_string(),
        };
        let snapshot = engine.snapshot();
        SimReport {
            ticks: engine.ticks(),
            fps,
            seed,
            entities: engine.pool().len(),
            final_state: engine.state(),
            transitions: engine.transitions(),
            scene_sequence: self.scene_sequence,
            selections: self.selections,
            photo_slots: self.photo_slots,
            status: snapshot.status,
            status_history: self.status_history,
            gesture_exit,
            progress: snapshot.progress,
            eased_progress: snapshot.eased_progress,
            camera_azimuth: snapshot.camera_azimuth,
            camera_distance: engine.rig().distance(),
            convergence: convergence(engine),
        }
    }
}

fn convergence(engine: &Choreographer) -> Vec<ClassConvergence> {
    let formed = engine.state().is_formed();
    EntityClass::ALL
        .iter()
        .filter_map(|&class| {
            let distances: Vec<f32> = engine
                .pool()
                .entities()
                .iter()
                .zip(engine.poses())
                .filter(|(entity, _)| entity.class() == class)
                .map(|(entity, pose)| pose.position.distance(entity.target(formed).position))
                .collect();
            if distances.is_empty() {
                return None;
            }
            let max_distance = distances.iter().copied().fold(0.0, f32::max);
            Some(ClassConvergence {
                class,
                count: distances.len(),
                mean_distance: distances.iter().sum::<f32>() / distances.len() as f32,
                max_distance,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_engine::config::{EngineConfig, PoolCounts};
    use tree_engine::CommandSource;

    fn engine() -> Choreographer {
        let config = EngineConfig {
            counts: PoolCounts {
                foliage: 30,
                ornaments: 6,
                elements: 4,
                lights: 4,
                top_star: true,
            },
            ..EngineConfig::default()
        };
        Choreographer::seeded(config, 5).expect("engine")
    }

    #[test]
    fn recorder_keeps_only_changes() {
        let mut engine = engine();
        let mut recorder = SessionRecorder::new(&engine);
        for _ in 0..3 {
            engine.tick(1.0 / 60.0);
            recorder.observe(&engine);
        }
        engine.set_scene(SceneState::Formed, CommandSource::Manual);
        engine.tick(1.0 / 60.0);
        recorder.observe(&engine);
        engine.tick(1.0 / 60.0);
        recorder.observe(&engine);

        let report = recorder.finish(&engine, 60, 5, None);
        assert_eq!(report.scene_sequence, vec![SceneState::Formed]);
        assert_eq!(report.transitions, 1);
        assert_eq!(report.gesture_exit, "stopped");
        assert_eq!(report.status_history.len(), 1);
        assert!(report.selections.is_empty());
    }

    #[test]
    fn convergence_covers_every_populated_class() {
        let mut engine = engine();
        engine.toggle_scene();
        for _ in 0..1200 {
            engine.tick(1.0 / 30.0);
        }
        let report = SessionRecorder::new(&engine).finish(
            &engine,
            30,
            5,
            Some(TaskExit::StreamEnded { frames: 3 }),
        );
        assert_eq!(report.convergence.len(), 5);
        let foliage = &report.convergence[0];
        assert_eq!(foliage.class, EntityClass::Foliage);
        assert_eq!(foliage.count, 30);
        assert!(foliage.max_distance < 1e-2);
        assert_eq!(report.gesture_exit, "stream ended after 3 frames");
    }
}
