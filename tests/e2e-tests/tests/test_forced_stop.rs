//! Forced Stop
//!
//! A client that ignores the terminate request is killed once the
//! terminating deadline passes, or right away on a second signal.

#![cfg(unix)]

use e2e_tests::assertions::{assert_exit_code, assert_log_contains, assert_state_visited};
use e2e_tests::{TestConfigOptions, TestExecutor};
use nix::sys::signal::Signal;
use std::time::{Duration, Instant};

fn stubborn_client() -> TestConfigOptions {
    TestConfigOptions {
        fake_args: vec!["--ignore-terminate".to_string()],
        ..Default::default()
    }
}

#[test]
fn test_terminating_timeout_kills_client() {
    println!("\n========================================");
    println!("TEST: Forced Stop after terminating timeout");
    println!("========================================\n");

    let executor = TestExecutor::new("forced-stop-timeout");

    let result = executor.run_cli(stubborn_client(), |cli| {
        cli.wait_for_ready(Duration::from_secs(10))?;

        println!("Step 1: Sending SIGTERM to a client that ignores terminate...");
        cli.send_signal(Signal::SIGTERM)?;
        let status = cli.wait_for_exit(Duration::from_secs(15))?;

        println!("Step 2: Verifying the escalation...");
        assert_log_contains(cli, "Terminate requested, ignoring")?;
        assert_state_visited(cli, "killing")?;
        assert_state_visited(cli, "done")?;
        // Killed by signal, so the CLI cannot report a client exit code
        assert_log_contains(cli, "Exit status of Autify Connect Client is unknown")?;
        assert_exit_code(status, 1)
    });

    if let Err(e) = result {
        panic!("Test failed: {}", e);
    }
}

#[test]
fn test_second_signal_escalates() {
    let executor = TestExecutor::new("forced-stop-second-signal");
    let mut options = stubborn_client();
    // Long enough that only the second signal can cause the kill
    options.timeouts.terminating = Duration::from_secs(30);

    let result = executor.run_cli(options, |cli| {
        cli.wait_for_ready(Duration::from_secs(10))?;

        let started = Instant::now();
        cli.send_signal(Signal::SIGINT)?;
        cli.wait_for_log("to=terminating", Duration::from_secs(5))?;
        cli.send_signal(Signal::SIGINT)?;

        let status = cli.wait_for_exit(Duration::from_secs(15))?;
        if started.elapsed() >= Duration::from_secs(30) {
            return Err("Second signal did not escalate".to_string());
        }
        assert_log_contains(cli, "terminate requested again")?;
        assert_state_visited(cli, "killing")?;
        assert_exit_code(status, 1)
    });

    if let Err(e) = result {
        panic!("Test failed: {}", e);
    }
}
