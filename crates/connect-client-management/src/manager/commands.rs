//! Internal message types of the supervisor actor.
//!
//! Not exposed outside the manager module; external code goes through
//! [`ClientManager`](super::ClientManager).

use connect_common::{ConnectError, ConnectResult};
use tokio::sync::oneshot;

/// Commands sent by the facade.
pub(super) enum SupervisorCommand {
    /// Emit SPAWN with the chosen debug server port
    Start {
        port: u16,
        resp: oneshot::Sender<ConnectResult<()>>,
    },
    /// Preparation failed before SPAWN
    Fail { error: ConnectError },
    /// External shutdown request; repeating it escalates
    Terminate,
    /// Terminate unless already terminal or already requested by `exit`
    Exit { resp: oneshot::Sender<()> },
}

impl SupervisorCommand {
    /// Builds the command an OS signal turns into.
    pub(super) fn terminate() -> Self {
        SupervisorCommand::Terminate
    }
}

/// Results of effects run outside the actor task.
pub(super) enum OpCompleted {
    Spawned(ConnectResult<()>),
    CleanedUp(Vec<ConnectError>),
}
