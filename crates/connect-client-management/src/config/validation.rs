use super::*;
use anyhow::{anyhow, Result};

/// Validate the complete configuration
pub fn validate_config(config: &ClientManagerConfig) -> Result<()> {
    validate_timeouts(&config.timeouts)?;

    if config.debug_server_port == Some(0) {
        return Err(anyhow!("Debug server port must be between 1 and 65535, got: 0"));
    }

    if config.ready_markers.iter().all(|m| m.trim().is_empty()) {
        return Err(anyhow!("At least one non-empty ready marker must be configured"));
    }

    if config.supported_version.trim().is_empty() {
        return Err(anyhow!("Supported client version cannot be empty"));
    }

    Ok(())
}

fn validate_timeouts(timeouts: &TimeoutConfig) -> Result<()> {
    let named = [
        ("starting", timeouts.starting),
        ("terminating", timeouts.terminating),
        ("killing", timeouts.killing),
        ("cleanup", timeouts.cleanup),
        ("status_poll_interval", timeouts.status_poll_interval),
        ("debug_server_request", timeouts.debug_server_request),
    ];

    for (name, value) in named {
        if value.is_zero() {
            return Err(anyhow!("Timeout '{}' must be greater than 0", name));
        }
    }

    Ok(())
}
