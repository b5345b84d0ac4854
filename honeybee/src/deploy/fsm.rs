//! Finite State Machine for the local deploy session

use serde::{Deserialize, Serialize};

/// Deploy session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployState {
    /// No session
    Idle,

    /// Working directory prepared, `up` being launched
    Starting,

    /// `up` is running and its output is streamed
    Running,

    /// Interrupt sent, draining output and tearing down
    Stopping,

    /// `up` exited on its own
    Crashed,
}

impl DeployState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployState::Idle => "idle",
            DeployState::Starting => "starting",
            DeployState::Running => "running",
            DeployState::Stopping => "stopping",
            DeployState::Crashed => "crashed",
        }
    }
}

impl std::fmt::Display for DeployState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deploy transition
#[derive(Debug, Clone)]
pub enum DeployTransition {
    /// Begin a new session
    Launch,

    /// `up` was spawned
    Launched,

    /// Preparing or spawning failed
    LaunchFailed(String),

    /// Stop requested
    Stop,

    /// Teardown finished
    Stopped,

    /// `up` exited without a stop request
    Exited(Option<i32>),

    /// Crash handled, back to idle
    Reset,
}

/// Deploy FSM
#[derive(Debug, Clone)]
pub struct DeployFsm {
    state: DeployState,
    error: Option<String>,
    last_exit_code: Option<i32>,
}

impl DeployFsm {
    /// Create a new FSM in idle state
    pub fn new() -> Self {
        Self {
            state: DeployState::Idle,
            error: None,
            last_exit_code: None,
        }
    }

    pub fn state(&self) -> DeployState {
        self.state
    }

    /// Error of the last failed launch
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Exit code of the last session that exited on its own
    pub fn last_exit_code(&self) -> Option<i32> {
        self.last_exit_code
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeployTransition) -> Result<DeployState, String> {
        let new_state = match (&self.state, &event) {
            (DeployState::Idle, DeployTransition::Launch) => {
                self.error = None;
                DeployState::Starting
            }

            (DeployState::Starting, DeployTransition::Launched) => {
                self.last_exit_code = None;
                DeployState::Running
            }
            (DeployState::Starting, DeployTransition::LaunchFailed(err)) => {
                self.error = Some(err.clone());
                DeployState::Idle
            }

            (DeployState::Running, DeployTransition::Stop) => DeployState::Stopping,
            (DeployState::Running, DeployTransition::Exited(code)) => {
                self.last_exit_code = *code;
                DeployState::Crashed
            }

            (DeployState::Stopping, DeployTransition::Stopped) => DeployState::Idle,

            (DeployState::Crashed, DeployTransition::Reset) => DeployState::Idle,

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(new_state)
    }

    /// A session occupies the slot in every state but idle
    pub fn is_active(&self) -> bool {
        self.state != DeployState::Idle
    }
}

impl Default for DeployFsm {
    fn default() -> Self {
        Self::new()
    }
}
