//! Log Collection
//!
//! With file logging on, client records go to a file under the cache
//! directory instead of the console.

#![cfg(unix)]

use e2e_tests::assertions::{assert_client_log_file_contains, assert_exit_code, assert_log_contains};
use e2e_tests::{TestConfigOptions, TestExecutor};
use nix::sys::signal::Signal;
use std::time::Duration;

#[test]
fn test_client_logs_to_file() {
    let executor = TestExecutor::new("client-log-file");
    let options = TestConfigOptions {
        file_logging: true,
        ..Default::default()
    };
    let cache_dir = executor.test_dir.join("cache");

    let result = executor.run_cli(options, |cli| {
        cli.wait_for_ready(Duration::from_secs(10))?;
        assert_log_contains(cli, "Client log will be written")?;

        cli.send_signal(Signal::SIGINT)?;
        let status = cli.wait_for_exit(Duration::from_secs(10))?;
        assert_exit_code(status, 0)?;

        assert_client_log_file_contains(&cache_dir, "Successfully connected!")?;
        assert_client_log_file_contains(&cache_dir, "Terminate requested")?;
        // Records went to the file, not the console
        if cli.count_log_matching("Disconnected from Autify Connect Server") != 0 {
            return Err("Client records leaked to the console".to_string());
        }
        Ok(())
    });

    if let Err(e) = result {
        panic!("Test failed: {}", e);
    }
}

#[test]
fn test_malformed_status_is_not_fatal() {
    let executor = TestExecutor::new("malformed-status");
    let options = TestConfigOptions {
        fake_args: vec!["--malformed-status".to_string()],
        ..Default::default()
    };

    let result = executor.run_cli(options, |cli| {
        cli.wait_for_ready(Duration::from_secs(10))?;
        // Let a few polls fail
        std::thread::sleep(Duration::from_millis(1000));

        cli.send_signal(Signal::SIGINT)?;
        let status = cli.wait_for_exit(Duration::from_secs(10))?;
        assert_exit_code(status, 0)
    });

    if let Err(e) = result {
        panic!("Test failed: {}", e);
    }
}
