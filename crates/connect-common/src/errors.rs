//! Error types for the Autify Connect client supervisor.
//!
//! Errors are split by how the supervisor treats them:
//!
//! - [`ConnectError::Spawn`] and [`ConnectError::Timeout`] are the only
//!   variants that escalate to callers of `start()` / `once_ready()`.
//! - [`ConnectError::HealthPoll`] and [`ConnectError::Cleanup`] are recovered
//!   locally and only ever logged.
//! - [`VersionMismatchWarning`] is not an error at all; it is surfaced as a
//!   value next to a successful result.

use std::fmt;
use thiserror::Error;

/// Result type for supervisor operations.
pub type ConnectResult<T> = std::result::Result<T, ConnectError>;

/// Main error type for supervisor operations.
///
/// `Clone` so that accumulated errors can be handed out in state snapshots
/// to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The client binary could not be launched.
    #[error("Failed to spawn Autify Connect Client: {reason}")]
    Spawn { reason: String },

    /// A state did not receive its qualifying event before its deadline.
    #[error("Autify Connect Manager faced timeout at {state} state.")]
    Timeout { state: String },

    /// Transient failure talking to the client's debug server.
    #[error("Health poll failed: {reason}")]
    HealthPoll { reason: String },

    /// Failure while tearing down resources during cleanup.
    #[error("Cleanup failed: {reason}")]
    Cleanup { reason: String },

    #[error("Access Point error: {reason}")]
    AccessPoint { reason: String },

    #[error("Installer error: {reason}")]
    Installer { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Failure writing client log output.
    #[error("Logging error: {reason}")]
    Logging { reason: String },

    #[error("Invalid state for {operation}: expected {expected}, got {actual}")]
    InvalidState {
        operation: String,
        expected: String,
        actual: String,
    },

    /// The supervisor actor is gone (its mailbox is closed).
    #[error("Supervisor unavailable: {context}")]
    ActorUnavailable { context: String },

    /// The machine reached a terminal state without passing through `target`.
    #[error("Autify Connect Manager finished in {actual} state without reaching {target} state.")]
    Unreached { target: String, actual: String },

    /// Several errors accumulated over one supervisor lifetime.
    #[error("{}", join_messages(.0))]
    Aggregate(Vec<ConnectError>),
}

fn join_messages(errors: &[ConnectError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConnectError {
    pub fn spawn(reason: impl Into<String>) -> Self {
        Self::Spawn {
            reason: reason.into(),
        }
    }

    pub fn timeout(state: impl Into<String>) -> Self {
        Self::Timeout {
            state: state.into(),
        }
    }

    pub fn health_poll(reason: impl Into<String>) -> Self {
        Self::HealthPoll {
            reason: reason.into(),
        }
    }

    pub fn cleanup(reason: impl Into<String>) -> Self {
        Self::Cleanup {
            reason: reason.into(),
        }
    }

    pub fn access_point(reason: impl Into<String>) -> Self {
        Self::AccessPoint {
            reason: reason.into(),
        }
    }

    pub fn installer(reason: impl Into<String>) -> Self {
        Self::Installer {
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub fn logging(reason: impl Into<String>) -> Self {
        Self::Logging {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(
        operation: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn actor_unavailable(context: impl Into<String>) -> Self {
        Self::ActorUnavailable {
            context: context.into(),
        }
    }

    pub fn unreached(target: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Unreached {
            target: target.into(),
            actual: actual.into(),
        }
    }

    /// Collapses a list of errors into one.
    ///
    /// A single error is returned as-is rather than wrapped.
    pub fn aggregate(mut errors: Vec<ConnectError>) -> Self {
        if errors.len() == 1 {
            if let Some(only) = errors.pop() {
                return only;
            }
        }
        Self::Aggregate(errors)
    }

    /// Returns true for errors that are re-thrown to public API callers.
    pub fn is_escalating(&self) -> bool {
        match self {
            Self::Spawn { .. } | Self::Timeout { .. } => true,
            Self::Aggregate(inner) => inner.iter().any(|e| e.is_escalating()),
            _ => false,
        }
    }

    /// State name carried by a timeout error.
    pub fn timeout_state(&self) -> Option<&str> {
        match self {
            Self::Timeout { state } => Some(state),
            _ => None,
        }
    }
}

// ==============================================================================
// Warnings
// ==============================================================================

/// Installed client version differs from the version this tool supports.
///
/// Execution continues; callers decide how loudly to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMismatchWarning {
    pub installed: String,
    pub supported: String,
}

impl VersionMismatchWarning {
    pub fn new(installed: impl Into<String>, supported: impl Into<String>) -> Self {
        Self {
            installed: installed.into(),
            supported: supported.into(),
        }
    }

    /// Compares two versions, returning a warning when they differ.
    ///
    /// A leading `v` is ignored on both sides.
    pub fn check(installed: &str, supported: &str) -> Option<Self> {
        let normalize = |v: &str| v.trim().trim_start_matches('v').to_string();
        if normalize(installed) == normalize(supported) {
            None
        } else {
            Some(Self::new(installed.trim(), supported.trim()))
        }
    }
}

impl fmt::Display for VersionMismatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Installed Autify Connect Client version {} does not match the supported version {}. \
             It may not work as expected.",
            self.installed, self.supported
        )
    }
}
