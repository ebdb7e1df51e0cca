//! Client process execution primitives.
//!
//! The client is always launched as
//! `<binary> --log-format json --experimental-debug-server-port <PORT> [--verbose] [extra...]`
//! with the Access Point key injected through [`ACCESS_POINT_KEY_ENV`].

use connect_common::{ConnectError, ConnectResult, ProcessExit};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::debug;

/// Environment variable carrying the Access Point key into the client.
pub const ACCESS_POINT_KEY_ENV: &str = "AUTIFY_CONNECT_KEY";

/// Everything needed to launch one client process.
#[derive(Debug, Clone)]
pub struct ClientCommand {
    pub executable: PathBuf,
    pub debug_server_port: u16,
    pub verbose: bool,
    /// User-supplied arguments appended after the fixed contract.
    pub extra_arguments: Option<String>,
    pub access_point_key: String,
}

impl ClientCommand {
    /// Argument list in launch order.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--log-format".to_string(),
            "json".to_string(),
            "--experimental-debug-server-port".to_string(),
            self.debug_server_port.to_string(),
        ];
        if self.verbose {
            args.push("--verbose".to_string());
        }
        if let Some(extra) = &self.extra_arguments {
            args.extend(extra.split_whitespace().map(str::to_string));
        }
        args
    }

    /// Builds the tokio command with piped stdout/stderr.
    ///
    /// The child inherits the current environment plus the key variable.
    pub fn build(&self) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(self.args())
            .env(ACCESS_POINT_KEY_ENV, &self.access_point_key)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Spawns the client.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Spawn`] if the OS refuses to launch the binary.
    pub fn spawn(&self) -> ConnectResult<Child> {
        debug!(
            executable = %self.executable.display(),
            args = ?self.args(),
            "Spawning Autify Connect Client"
        );
        self.build().spawn().map_err(|e| {
            ConnectError::spawn(format!("{}: {}", self.executable.display(), e))
        })
    }
}

/// Converts an OS exit status into a [`ProcessExit`].
pub fn process_exit_from_status(status: ExitStatus) -> ProcessExit {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(raw) = status.signal() {
            let name = nix::sys::signal::Signal::try_from(raw)
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|_| format!("SIG{}", raw));
            return ProcessExit {
                code: status.code(),
                signal: Some(name),
            };
        }
    }

    ProcessExit {
        code: status.code(),
        signal: None,
    }
}

/// Reads the version reported by `<binary> --version`.
///
/// The client prints its version on stderr; the trimmed text is returned.
///
/// # Errors
///
/// Fails if the binary cannot be run or prints nothing.
pub async fn read_client_version(executable: &Path) -> ConnectResult<String> {
    let output = Command::new(executable)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            ConnectError::installer(format!(
                "failed to run {} --version: {}",
                executable.display(),
                e
            ))
        })?;

    let version = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if version.is_empty() {
        return Err(ConnectError::installer(format!(
            "{} reported no version",
            executable.display()
        )));
    }
    Ok(version)
}
