use serde::Serialize;
use std::fmt;

/// What the container engine knows about an environment's container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Absent,
    Stopped,
    Running,
}

impl ContainerState {
    pub fn from_flags(exists: bool, running: bool) -> Self {
        match (exists, running) {
            (_, true) => Self::Running,
            (true, false) => Self::Stopped,
            (false, false) => Self::Absent,
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::Stopped => "stopped",
            Self::Running => "running",
        })
    }
}

/// The step that brings a container from its current state to running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpAction {
    /// Ensure the image, create the container, run post-create commands.
    Create,
    /// Start the existing container.
    Start,
    /// Nothing to do before attaching.
    Reuse,
}

impl UpAction {
    pub fn for_state(state: ContainerState) -> Self {
        match state {
            ContainerState::Absent => Self::Create,
            ContainerState::Stopped => Self::Start,
            ContainerState::Running => Self::Reuse,
        }
    }

    /// Post-create commands run only when the container is first created.
    pub fn runs_post_create(self) -> bool {
        self == Self::Create
    }
}
