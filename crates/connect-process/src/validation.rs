//! Validation utilities for client launch parameters.

use connect_common::{ConnectError, ConnectResult};
use std::path::Path;

/// Validate that the client executable exists and is a runnable file.
pub fn validate_executable(path: &Path) -> ConnectResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConnectError::installer("executable path cannot be empty"));
    }

    let metadata = std::fs::metadata(path).map_err(|e| {
        ConnectError::installer(format!(
            "Autify Connect Client is not installed at {}: {}",
            path.display(),
            e
        ))
    })?;

    if !metadata.is_file() {
        return Err(ConnectError::installer(format!(
            "{} is not a file",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ConnectError::installer(format!(
                "{} is not executable",
                path.display()
            )));
        }
    }

    Ok(())
}

/// Validate an explicitly requested debug server port.
pub fn validate_port(port: u16) -> ConnectResult<()> {
    if port == 0 {
        return Err(ConnectError::config(
            "debug server port must be between 1 and 65535",
        ));
    }
    Ok(())
}
