//! Forced process termination.
//!
//! Graceful shutdown of the client goes through its debug server, so the only
//! OS-level primitive needed here is the forced kill.

use connect_common::{ConnectError, ConnectResult};

/// Force kill a process (SIGKILL on Unix, TerminateProcess on Windows).
///
/// Killing a process that no longer exists succeeds, so calling this twice
/// is a no-op the second time.
pub fn force_kill(pid: u32) -> ConnectResult<()> {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(ConnectError::spawn(format!(
                "failed to kill process {}: {}",
                pid, e
            ))),
        }
    }

    #[cfg(windows)]
    {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

        unsafe {
            let handle = match OpenProcess(PROCESS_TERMINATE, false, pid) {
                Ok(h) if !h.is_invalid() => h,
                // Already gone
                _ => return Ok(()),
            };

            let result = TerminateProcess(handle, 1);
            let _ = CloseHandle(handle);

            result.map_err(|e| {
                ConnectError::spawn(format!("TerminateProcess failed for {}: {}", pid, e))
            })
        }
    }
}
