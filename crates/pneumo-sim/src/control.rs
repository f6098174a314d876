//! Loop states and control commands.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Current state of the simulation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Not advancing; fresh or halted
    #[default]
    Stopped,
    /// Advancing in real time
    Running,
    /// Holding the current state
    Paused,
}

/// Control commands accepted by the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Pause,
    Stop,
    Reset,
}

impl LoopState {
    /// State after applying `command`.
    ///
    /// Reset is valid from anywhere and lands in `Stopped`; other illegal
    /// pairs are rejected and leave the state as it was.
    pub fn transition(self, command: Command) -> Result<Self> {
        match (self, command) {
            (Self::Stopped | Self::Paused, Command::Start) => Ok(Self::Running),
            (Self::Running, Command::Pause) => Ok(Self::Paused),
            (Self::Running | Self::Paused, Command::Stop) => Ok(Self::Stopped),
            (_, Command::Reset) => Ok(Self::Stopped),
            (from, command) => Err(Error::InvalidTransition { from, command }),
        }
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Pause => write!(f, "pause"),
            Self::Stop => write!(f, "stop"),
            Self::Reset => write!(f, "reset"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_pause_resume_stop() {
        let s = LoopState::Stopped.transition(Command::Start).unwrap();
        assert_eq!(s, LoopState::Running);
        let s = s.transition(Command::Pause).unwrap();
        assert_eq!(s, LoopState::Paused);
        let s = s.transition(Command::Start).unwrap();
        assert_eq!(s, LoopState::Running);
        let s = s.transition(Command::Stop).unwrap();
        assert_eq!(s, LoopState::Stopped);
    }

    #[test]
    fn reset_is_valid_everywhere() {
        for state in [LoopState::Stopped, LoopState::Running, LoopState::Paused] {
            assert_eq!(state.transition(Command::Reset), Ok(LoopState::Stopped));
        }
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let illegal = [
            (LoopState::Stopped, Command::Pause),
            (LoopState::Stopped, Command::Stop),
            (LoopState::Running, Command::Start),
            (LoopState::Paused, Command::Pause),
        ];
        for (from, command) in illegal {
            assert_eq!(
                from.transition(command),
                Err(Error::InvalidTransition { from, command })
            );
        }
    }
}
