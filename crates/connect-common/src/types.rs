//! Core domain types shared by the supervisor crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of the supervised child process.
///
/// Captured at most once, from the child's termination event. A supervisor
/// that force-kills without observing the exit leaves this unset, and callers
/// must read a missing value as "exit status unknown".
///
/// # Example
/// ```
/// use connect_common::ProcessExit;
///
/// let exit = ProcessExit::with_code(0);
/// assert_eq!(exit.code, Some(0));
/// assert!(exit.signal.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessExit {
    /// Exit code, absent when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Name of the terminating signal (e.g. `SIGKILL`), if any.
    pub signal: Option<String>,
}

impl ProcessExit {
    /// Creates an exit record for a process that exited with `code`.
    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Creates an exit record for a process terminated by `signal`.
    pub fn with_signal(signal: impl Into<String>) -> Self {
        Self {
            code: None,
            signal: Some(signal.into()),
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "null".to_string());
        let signal = self.signal.as_deref().unwrap_or("null");
        write!(f, "code: {}, signal: {}", code, signal)
    }
}
