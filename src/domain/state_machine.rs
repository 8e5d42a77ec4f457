use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    #[default]
    Idle,
    Moving,
}

/// What a transition request did to the motion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed(MotionState),
    Unchanged(MotionState),
}

impl Transition {
    pub fn state(self) -> MotionState {
        match self {
            Transition::Changed(state) | Transition::Unchanged(state) => state,
        }
    }

    pub fn changed(self) -> bool {
        matches!(self, Transition::Changed(_))
    }
}

impl MotionState {
    pub fn from_moving(moving: bool) -> Self {
        if moving {
            MotionState::Moving
        } else {
            MotionState::Idle
        }
    }

    pub fn is_moving(self) -> bool {
        self == MotionState::Moving
    }

    /// Idle -> Moving; idempotent.
    pub fn start(self) -> Transition {
        match self {
            MotionState::Idle => Transition::Changed(MotionState::Moving),
            MotionState::Moving => Transition::Unchanged(MotionState::Moving),
        }
    }

    /// Moving -> Idle; idempotent. Also used for arrival.
    pub fn stop(self) -> Transition {
        match self {
            MotionState::Moving => Transition::Changed(MotionState::Idle),
            MotionState::Idle => Transition::Unchanged(MotionState::Idle),
        }
    }

    pub fn toggle(self) -> Transition {
        match self {
            MotionState::Idle => self.start(),
            MotionState::Moving => self.stop(),
        }
    }

    pub fn status_label(self) -> &'static str {
        match self {
            MotionState::Idle => "inactive",
            MotionState::Moving => "active",
        }
    }

    pub fn toggle_label(self) -> &'static str {
        match self {
            MotionState::Idle => "Start moving",
            MotionState::Moving => "Stop moving",
        }
    }
}
