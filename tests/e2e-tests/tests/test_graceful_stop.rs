//! Graceful Stop
//!
//! SIGINT makes autify-connect ask the client to terminate through its debug
//! server. The client exits on its own and the CLI exits with its code.

#![cfg(unix)]

use e2e_tests::assertions::{
    assert_exit_code, assert_log_contains, assert_state_not_visited, assert_state_visited,
};
use e2e_tests::{TestConfigOptions, TestExecutor};
use nix::sys::signal::Signal;
use std::time::Duration;

#[test]
fn test_graceful_stop() {
    println!("\n========================================");
    println!("TEST: Graceful Stop");
    println!("========================================\n");

    let executor = TestExecutor::new("graceful-stop");

    let result = executor.run_cli(TestConfigOptions::default(), |cli| {
        println!("Step 1: Waiting for the client to connect...");
        cli.wait_for_ready(Duration::from_secs(10))?;
        assert_log_contains(cli, "Successfully connected!")?;
        assert_log_contains(cli, "Using static Access Point")?;
        println!("✓ Client is ready\n");

        println!("Step 2: Sending SIGINT...");
        cli.send_signal(Signal::SIGINT)?;

        let status = cli.wait_for_exit(Duration::from_secs(10))?;
        assert_exit_code(status, 0)?;
        println!("✓ autify-connect exited with code 0\n");

        println!("Step 3: Verifying the shutdown path...");
        assert_state_visited(cli, "terminating")?;
        assert_state_visited(cli, "cleanup")?;
        assert_state_visited(cli, "done")?;
        assert_state_not_visited(cli, "killing")?;
        assert_log_contains(cli, "Terminate requested")?;
        assert_log_contains(cli, "Autify Connect Client exited with code 0")?;
        Ok(())
    });

    if let Err(e) = result {
        panic!("Test failed: {}", e);
    }
}

#[test]
fn test_client_exit_code_is_propagated() {
    let executor = TestExecutor::new("exit-code-propagated");
    let options = TestConfigOptions {
        fake_args: vec!["--exit-code".to_string(), "3".to_string()],
        ..Default::default()
    };

    let result = executor.run_cli(options, |cli| {
        cli.wait_for_ready(Duration::from_secs(10))?;
        cli.send_signal(Signal::SIGTERM)?;

        let status = cli.wait_for_exit(Duration::from_secs(10))?;
        assert_exit_code(status, 3)?;
        assert_state_visited(cli, "done")
    });

    if let Err(e) = result {
        panic!("Test failed: {}", e);
    }
}

#[test]
fn test_client_exiting_on_its_own() {
    let executor = TestExecutor::new("client-exits-on-its-own");
    let options = TestConfigOptions {
        fake_args: vec!["--exit-after-ms".to_string(), "500".to_string()],
        ..Default::default()
    };

    let result = executor.run_cli(options, |cli| {
        cli.wait_for_ready(Duration::from_secs(10))?;

        let status = cli.wait_for_exit(Duration::from_secs(10))?;
        assert_exit_code(status, 0)?;
        // Exit came straight from ready; terminate was never needed
        assert_state_not_visited(cli, "terminating")?;
        assert_state_visited(cli, "done")
    });

    if let Err(e) = result {
        panic!("Test failed: {}", e);
    }
}
