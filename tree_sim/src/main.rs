use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec2;
use log::info;
use tree_engine::config::EngineConfig;
use tree_engine::gesture::{spawn_gesture_task, AcquisitionPlan};
use tree_engine::{Choreographer, CommandSource};

mod cli;
mod report;
mod script;

use cli::SimSettings;
use report::{SessionRecorder, SimReport};
use script::{Action, SessionScript};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = cli::parse()?;
    let default_filter = if settings.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let report = run_session(&settings).await?;

    if let Some(path) = settings.report_json.as_ref() {
        write_report(path, &report)?;
        println!("Saved session report to {}", path.display());
    }
    print_summary(&report);
    Ok(())
}

async fn run_session(settings: &SimSettings) -> Result<SimReport> {
    let config = match settings.config.as_deref() {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let script = match settings.script.as_deref() {
        Some(path) => SessionScript::from_json_file(path)?,
        None => SessionScript::demo(),
    };

    let mut engine =
        Choreographer::seeded(config, settings.seed).context("building choreography engine")?;
    let plan = AcquisitionPlan::default();
    let tracker = script
        .tracker(&plan, settings.seed)
        .with_pacing(settings.replay_pacing());
    let task = spawn_gesture_task(tracker, plan, engine.config(), engine.signal_bus());
    info!(
        "running {} ticks at {} fps with {} scripted commands",
        settings.ticks,
        settings.fps,
        script.events.len()
    );

    let mut recorder = SessionRecorder::new(&engine);
    let mut clock = settings
        .realtime
        .then(|| tokio::time::interval(settings.frame_period()));
    let delta = settings.frame_delta();

    for tick in 0..settings.ticks {
        for action in script.actions_at(tick) {
            apply_action(&mut engine, &mut recorder, action);
        }
        engine.tick(delta);
        recorder.observe(&engine);

        match clock.as_mut() {
            Some(clock) => {
                clock.tick().await;
            }
            None => tokio::task::yield_now().await,
        }
    }

    let exit = if task.is_finished() {
        task.join().await
    } else {
        task.stop();
        None
    };
    Ok(recorder.finish(&engine, settings.fps, settings.seed, exit))
}

fn apply_action(engine: &mut Choreographer, recorder: &mut SessionRecorder, action: &Action) {
    match action {
        Action::Toggle => {
            engine.toggle_scene();
        }
        Action::SetScene { state } => {
            engine.set_scene(*state, CommandSource::Manual);
        }
        Action::SelectRandom => {
            engine.select_random();
        }
        Action::ClearSelection => engine.clear_forced_selection(),
        Action::Zoom { factor } => engine.zoom(*factor),
        Action::ReplacePhoto => {
            if let Some(slot) = engine.next_photo_slot() {
                recorder.record_photo_slot(slot);
            }
        }
        Action::TouchStart { touches } => {
            engine.touch_start(&to_points(touches));
        }
        Action::TouchMove { touches } => {
            engine.touch_move(&to_points(touches));
        }
        Action::TouchEnd { remaining } => {
            engine.touch_end(*remaining);
        }
    }
}

fn to_points(touches: &[[f32; 2]]) -> Vec<Vec2> {
    touches.iter().copied().map(Vec2::from_array).collect()
}

fn write_report(path: &Path, report: &SimReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("serializing session report")?;
    fs::write(path, json).with_context(|| format!("writing session report to {}", path.display()))
}

fn print_summary(report: &SimReport) {
    println!("Session summary:");
    println!(
        "  {} ticks at {} fps, {} entities (seed {})",
        report.ticks, report.fps, report.entities, report.seed
    );
    println!(
        "  final state {} after {} transition(s); progress {:.3}",
        report.final_state, report.transitions, report.progress
    );
    println!(
        "  camera azimuth {:.3} rad at distance {:.1}",
        report.camera_azimuth, report.camera_distance
    );
    let sequence: Vec<String> = report
        .scene_sequence
        .iter()
        .map(|state| state.to_string())
        .collect();
    if !sequence.is_empty() {
        println!("  scene sequence: {}", sequence.join(" -> "));
    }
    println!("  selection changes: {}", report.selections.len());
    if !report.photo_slots.is_empty() {
        println!("  photo slots replaced: {:?}", report.photo_slots);
    }
    println!("  gesture task: {}", report.gesture_exit);
    println!("  status: {}", report.status);
    for entry in &report.convergence {
        println!(
            "  {:?}: {} entities, mean {:.4}, max {:.4} from target",
            entry.class, entry.count, entry.mean_distance, entry.max_distance
        );
    }
}
