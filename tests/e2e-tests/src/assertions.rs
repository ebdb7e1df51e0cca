//! Custom assertions for E2E tests

use crate::connect_cli::AutifyConnectWrapper;
use std::path::Path;
use std::process::ExitStatus;

/// Assert that the supervisor passed through `state`
pub fn assert_state_visited(cli: &AutifyConnectWrapper, state: &str) -> Result<(), String> {
    let pattern = format!("to={}", state);
    if cli.has_log_matching("Supervisor state changed") && cli.has_log_matching(&pattern) {
        Ok(())
    } else {
        Err(format!(
            "Supervisor never entered '{}'. Logs:\n{:#?}",
            state,
            cli.get_logs()
        ))
    }
}

/// Assert that the supervisor never entered `state`
pub fn assert_state_not_visited(cli: &AutifyConnectWrapper, state: &str) -> Result<(), String> {
    let pattern = format!("to={}", state);
    if cli.has_log_matching(&pattern) {
        Err(format!(
            "Supervisor unexpectedly entered '{}'. Logs:\n{:#?}",
            state,
            cli.get_logs()
        ))
    } else {
        Ok(())
    }
}

/// Assert that any log line contains `pattern`
pub fn assert_log_contains(cli: &AutifyConnectWrapper, pattern: &str) -> Result<(), String> {
    if cli.has_log_matching(pattern) {
        Ok(())
    } else {
        Err(format!(
            "No log line contains '{}'. Logs:\n{:#?}",
            pattern,
            cli.get_logs()
        ))
    }
}

pub fn assert_exit_code(status: ExitStatus, expected: i32) -> Result<(), String> {
    match status.code() {
        Some(code) if code == expected => Ok(()),
        other => Err(format!(
            "Expected exit code {}, got {:?} ({})",
            expected, other, status
        )),
    }
}

/// Assert that a client log file under `cache_dir` contains `pattern`
pub fn assert_client_log_file_contains(cache_dir: &Path, pattern: &str) -> Result<(), String> {
    let entries = std::fs::read_dir(cache_dir)
        .map_err(|e| format!("Failed to read {}: {}", cache_dir.display(), e))?;

    let log_files: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| {
                    let name = name.to_string_lossy();
                    name.starts_with("autifyconnect-") && name.ends_with(".log")
                })
                .unwrap_or(false)
        })
        .collect();

    if log_files.is_empty() {
        return Err(format!("No client log file in {}", cache_dir.display()));
    }

    for path in &log_files {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        if content.contains(pattern) {
            return Ok(());
        }
    }

    Err(format!(
        "No client log file contains '{}': {:?}",
        pattern, log_files
    ))
}
