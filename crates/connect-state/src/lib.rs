//! # Connect State
//!
//! Lifecycle state machine for one supervised Autify Connect client.
//!
//! The machine is a pure function of `(state, context, event)`: it never
//! touches the OS, the network or a clock. Side effects and timers are
//! returned as [`Effect`] values for the owning actor to execute, and timer
//! expiry is fed back in as an epoch-tagged [`SupervisorEvent::Timeout`].

mod machine;

pub use machine::{StateMachine, StateTimeouts, SupervisorContext, SupervisorSnapshot};

use chrono::{DateTime, Utc};
use connect_common::{ConnectError, ProcessExit};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Supervisor lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupervisorState {
    /// Created, nothing launched yet
    Init,
    /// Client launched, waiting for it to report a connection
    Starting,
    /// Client connected
    Ready,
    /// Graceful shutdown requested through the debug server
    Terminating,
    /// Forced kill issued
    Killing,
    /// Tearing down the Access Point and pollers
    Cleanup,
    /// Terminal, no errors recorded
    Done,
    /// Terminal, errors recorded
    Failed,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorState::Init => "init",
            SupervisorState::Starting => "starting",
            SupervisorState::Ready => "ready",
            SupervisorState::Terminating => "terminating",
            SupervisorState::Killing => "killing",
            SupervisorState::Cleanup => "cleanup",
            SupervisorState::Done => "done",
            SupervisorState::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl SupervisorState {
    /// Check if the machine has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, SupervisorState::Done | SupervisorState::Failed)
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorEvent {
    /// Launch the client on the given debug server port.
    Spawn { port: u16 },
    /// Something failed before or while launching.
    Fail { error: ConnectError },
    /// The client reported it is connected.
    Ready,
    /// The client process exited.
    Exit { process_exit: ProcessExit },
    /// External shutdown request. Repeating it escalates.
    Terminate,
    /// Cleanup finished; `warnings` are best-effort failures that were swallowed.
    CleanupFinished { warnings: Vec<ConnectError> },
    /// A state timer fired. Ignored unless `epoch` is still current.
    Timeout { state: SupervisorState, epoch: u64 },
}

impl SupervisorEvent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            SupervisorEvent::Spawn { .. } => "SPAWN",
            SupervisorEvent::Fail { .. } => "FAIL",
            SupervisorEvent::Ready => "READY",
            SupervisorEvent::Exit { .. } => "EXIT",
            SupervisorEvent::Terminate => "TERMINATE",
            SupervisorEvent::CleanupFinished { .. } => "CLEANUP_FINISHED",
            SupervisorEvent::Timeout { .. } => "TIMEOUT",
        }
    }
}

/// Side effects requested by a transition, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Launch the client process.
    Spawn { port: u16 },
    /// Ask the client to shut down gracefully.
    RequestTerminate,
    /// Forcefully kill the client process.
    Kill,
    /// Stop pollers and release the Access Point.
    Cleanup,
    /// Arm the state timer, replacing any previous one.
    ScheduleTimeout {
        state: SupervisorState,
        after: Duration,
        epoch: u64,
    },
}

/// Represents a state transition with timestamp and reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from_state: SupervisorState,
    pub to_state: SupervisorState,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}
