//! Public option types of the manager.

use connect_state::StateTimeouts;

/// Where the Access Point comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPointSource {
    /// The one saved by `access-point set`.
    Static,
    /// Created for this run in an Autify for Web workspace, deleted on cleanup.
    Ephemeral { workspace_id: u64, user_agent: String },
}

/// Options for [`ClientManager::exit`](super::ClientManager::exit).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitOptions {
    /// Log failures and return `None` instead of an error.
    pub ignore_error: bool,
}

/// Settings for a manager over an arbitrary [`ClientControl`](crate::ClientControl).
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub access_point_name: String,
    pub timeouts: StateTimeouts,
    /// Fixed debug server port; a free port is chosen when unset.
    pub debug_server_port: Option<u16>,
    /// Turn SIGINT/SIGTERM into TERMINATE while the manager is running.
    pub forward_signals: bool,
}

impl ManagerOptions {
    pub fn new(access_point_name: impl Into<String>) -> Self {
        Self {
            access_point_name: access_point_name.into(),
            timeouts: StateTimeouts::default(),
            debug_server_port: None,
            forward_signals: false,
        }
    }
}
