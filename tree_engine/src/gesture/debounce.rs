use log::debug;

use crate::scene::SceneState;

/// Stable-frame filter for discrete scene candidates. A candidate is emitted
/// once it has been seen on `stable_frames` consecutive observations, and
/// only once per streak.
#[derive(Debug, Clone)]
pub struct SceneDebouncer {
    stable_frames: u32,
    candidate: Option<SceneState>,
    streak: u32,
    emitted: bool,
}

impl SceneDebouncer {
    pub fn new(stable_frames: u32) -> Self {
        Self {
            stable_frames: stable_frames.max(1),
            candidate: None,
            streak: 0,
            emitted: false,
        }
    }

    pub fn candidate(&self) -> Option<SceneState> {
        self.candidate
    }

    /// Consecutive observations of the current candidate.
    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn reset(&mut self) {
        self.candidate = None;
        self.streak = 0;
        self.emitted = false;
    }

    /// Feed one frame's candidate (`None` for low confidence or no usable
    /// label) and return the state to command, if this frame completes a streak.
    pub fn observe(&mut self, candidate: Option<SceneState>) -> Option<SceneState> {
        // Suppression is per streak: after a gap the same state fires again.
        // The scene state machine drops commands for the state it is already
        // in, and a manual toggle between two fists still gets answered.
        let Some(candidate) = candidate else {
            self.reset();
            return None;
        };
        if self.candidate == Some(candidate) {
            self.streak = self.streak.saturating_add(1);
        } else {
            self.candidate = Some(candidate);
            self.streak = 1;
            self.emitted = false;
        }

        if self.streak >= self.stable_frames && !self.emitted {
            self.emitted = true;
            debug!("{candidate} held for {} frames", self.streak);
            return Some(candidate);
        }
        None
    }
}
