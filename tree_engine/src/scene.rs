use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};

/// Which arrangement every entity is pulled toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SceneState {
    #[default]
    Chaos,
    Formed,
}

impl SceneState {
    pub fn is_formed(self) -> bool {
        self == SceneState::Formed
    }

    pub fn toggled(self) -> Self {
        match self {
            SceneState::Chaos => SceneState::Formed,
            SceneState::Formed => SceneState::Chaos,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SceneState::Chaos => "CHAOS",
            SceneState::Formed => "FORMED",
        }
    }
}

impl fmt::Display for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Producer of a scene command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    Gesture,
    Touch,
    Manual,
}

/// The single authoritative scene value. It only moves when a command is
/// applied; nothing here reacts to time.
#[derive(Debug, Clone, Default)]
pub struct SceneStateMachine {
    state: SceneState,
    transitions: u32,
}

impl SceneStateMachine {
    pub fn new(initial: SceneState) -> Self {
        Self {
            state: initial,
            transitions: 0,
        }
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    /// Number of commands that actually changed the state.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Returns true when the command changed the state.
    pub fn apply(&mut self, requested: SceneState, source: CommandSource) -> bool {
        if requested == self.state {
            return false;
        }
        info!("scene {} -> {} ({source:?})", self.state, requested);
        self.state = requested;
        self.transitions += 1;
        true
    }

    pub fn toggle(&mut self, source: CommandSource) -> SceneState {
        let next = self.state.toggled();
        self.apply(next, source);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_chaos() {
        let machine = SceneStateMachine::default();
        assert_eq!(machine.state(), SceneState::Chaos);
        assert_eq!(machine.transitions(), 0);
    }

    #[test]
    fn repeated_command_is_not_a_transition() {
        let mut machine = SceneStateMachine::default();
        assert!(machine.apply(SceneState::Formed, CommandSource::Gesture));
        assert!(!machine.apply(SceneState::Formed, CommandSource::Touch));
        assert_eq!(machine.transitions(), 1);
    }

    #[test]
    fn toggle_flips_both_ways() {
        let mut machine = SceneStateMachine::new(SceneState::Formed);
        assert_eq!(machine.toggle(CommandSource::Manual), SceneState::Chaos);
        assert_eq!(machine.toggle(CommandSource::Manual), SceneState::Formed);
        assert_eq!(machine.transitions(), 2);
    }

    #[test]
    fn serializes_as_uppercase_names() {
        let json = serde_json::to_string(&SceneState::Formed).expect("serialize");
        assert_eq!(json, "\"FORMED\"");
        let back: SceneState = serde_json::from_str("\"CHAOS\"").expect("deserialize");
        assert_eq!(back, SceneState::Chaos);
    }
}
