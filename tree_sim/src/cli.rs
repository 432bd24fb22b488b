use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Result};
use clap::Parser;
use tree_engine::gesture::ReplayPacing;

#[derive(Parser, Debug)]
#[command(
    about = "Headless driver that replays a scripted hand-tracking session through the tree engine",
    version
)]
pub struct Args {
    /// Engine configuration JSON; missing fields keep their defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Session script JSON (gesture frames and scheduled commands); runs the built-in demo when omitted
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Number of engine ticks to run
    #[arg(long, default_value_t = 600)]
    pub ticks: u64,

    /// Simulated frame rate; each tick advances 1/fps seconds
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Seed for entity placement, random selection and landmark jitter
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Path to write the session report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Pace ticks and replayed frames against the wall clock
    #[arg(long)]
    pub realtime: bool,

    /// Log per-gesture transitions (overridden by RUST_LOG)
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug)]
pub struct SimSettings {
    pub config: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub ticks: u64,
    pub fps: u32,
    pub seed: u64,
    pub report_json: Option<PathBuf>,
    pub realtime: bool,
    pub verbose: bool,
}

impl SimSettings {
    /// Seconds each tick advances the engine.
    pub fn frame_delta(&self) -> f32 {
        1.0 / self.fps as f32
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps))
    }

    /// Realtime runs space replayed frames like a live camera; otherwise the
    /// replay yields once per frame so it interleaves with the tick loop.
    pub fn replay_pacing(&self) -> ReplayPacing {
        if self.realtime {
            ReplayPacing::Interval(self.frame_period())
        } else {
            ReplayPacing::Yield
        }
    }
}

pub fn parse() -> Result<SimSettings> {
    let args = Args::parse();
    args.into_settings()
}

impl Args {
    fn into_settings(self) -> Result<SimSettings> {
        ensure!(self.ticks > 0, "--ticks must be at least 1");
        ensure!(
            (1..=1000).contains(&self.fps),
            "--fps must be between 1 and 1000 (got {})",
            self.fps
        );

        Ok(SimSettings {
            config: self.config,
            script: self.script,
            ticks: self.ticks,
            fps: self.fps,
            seed: self.seed,
            report_json: self.report_json,
            realtime: self.realtime,
            verbose: self.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["tree_sim"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn defaults_produce_a_sixty_hz_run() {
        let settings = args(&[]).into_settings().expect("defaults are valid");
        assert_eq!(settings.ticks, 600);
        assert_eq!(settings.seed, 7);
        assert!((settings.frame_delta() - 1.0 / 60.0).abs() < 1e-7);
        assert_eq!(settings.replay_pacing(), ReplayPacing::Yield);
    }

    #[test]
    fn realtime_paces_the_replay() {
        let settings = args(&["--realtime", "--fps", "30"])
            .into_settings()
            .expect("valid");
        assert_eq!(
            settings.replay_pacing(),
            ReplayPacing::Interval(Duration::from_secs_f64(1.0 / 30.0))
        );
    }

    #[test]
    fn zero_fps_is_rejected() {
        assert!(args(&["--fps", "0"]).into_settings().is_err());
        assert!(args(&["--ticks", "0"]).into_settings().is_err());
    }
}
