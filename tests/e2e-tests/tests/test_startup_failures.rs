//! Startup Failures
//!
//! A client that never connects, and a client that is not installed. Both
//! end with a failed supervisor and a non-zero CLI exit code.

use e2e_tests::assertions::{assert_exit_code, assert_log_contains, assert_state_visited};
use e2e_tests::{TestConfigOptions, TestExecutor};
use std::time::Duration;

#[test]
fn test_starting_timeout() {
    println!("\n========================================");
    println!("TEST: Starting timeout");
    println!("========================================\n");

    let executor = TestExecutor::new("starting-timeout");
    let mut options = TestConfigOptions {
        fake_args: vec!["--never-ready".to_string()],
        ..Default::default()
    };
    options.timeouts.starting = Duration::from_millis(1000);

    let result = executor.run_cli(options, |cli| {
        let status = cli.wait_for_exit(Duration::from_secs(15))?;

        assert_log_contains(cli, "faced timeout at starting state")?;
        assert_state_visited(cli, "terminating")?;
        assert_state_visited(cli, "failed")?;
        assert_exit_code(status, 1)
    });

    if let Err(e) = result {
        panic!("Test failed: {}", e);
    }
}

#[test]
fn test_missing_client_binary() {
    let executor = TestExecutor::new("missing-client");
    let mut config = executor.manager_config(&TestConfigOptions::default());
    config.client_path = Some(executor.test_dir.join("not-installed"));

    let result = executor.run_cli_with_config(&config, |cli| {
        let status = cli.wait_for_exit(Duration::from_secs(10))?;

        assert_log_contains(cli, "Failed to start Autify Connect Client")?;
        assert_state_visited(cli, "cleanup")?;
        assert_state_visited(cli, "failed")?;
        assert_exit_code(status, 1)
    });

    if let Err(e) = result {
        panic!("Test failed: {}", e);
    }
}
