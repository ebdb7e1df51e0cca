//! autify-connect CLI wrapper for E2E testing

use connect_client_management::TimeoutConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Knobs for one test run.
#[derive(Debug, Clone)]
pub struct TestConfigOptions {
    /// Behavior flags passed through to fakeconnect, e.g. `--never-ready`
    pub fake_args: Vec<String>,
    pub file_logging: bool,
    pub timeouts: TimeoutConfig,
    /// Overrides the supported client version
    pub supported_version: Option<String>,
}

impl Default for TestConfigOptions {
    fn default() -> Self {
        // Short deadlines keep escalation scenarios fast
        let timeouts = TimeoutConfig {
            starting: Duration::from_millis(3000),
            terminating: Duration::from_millis(1500),
            killing: Duration::from_millis(1500),
            cleanup: Duration::from_millis(1500),
            status_poll_interval: Duration::from_millis(200),
            debug_server_request: Duration::from_millis(500),
        };
        Self {
            fake_args: Vec::new(),
            file_logging: false,
            timeouts,
            supported_version: None,
        }
    }
}

impl TestConfigOptions {
    pub(crate) fn fake_args(&self) -> Option<String> {
        if self.fake_args.is_empty() {
            None
        } else {
            Some(self.fake_args.join(" "))
        }
    }
}

/// Wrapper for running `autify-connect start` during tests
pub struct AutifyConnectWrapper {
    process: Option<Child>,
    config_path: PathBuf,
    log_output: Vec<String>,
    pub test_dir: PathBuf,
    log_file_path: Option<PathBuf>,
    exit_status: Option<ExitStatus>,
}

impl AutifyConnectWrapper {
    pub fn new(config_path: PathBuf, test_dir: PathBuf) -> Self {
        Self {
            process: None,
            config_path,
            log_output: Vec::new(),
            test_dir,
            log_file_path: None,
            exit_status: None,
        }
    }

    /// Start `autify-connect --config <file> start`
    pub fn start(&mut self, cli_path: &Path) -> Result<(), String> {
        if self.process.is_some() {
            return Err("autify-connect is already running".to_string());
        }

        println!("Starting autify-connect: {}", cli_path.display());
        println!("Config: {}", self.config_path.display());

        let log_file_path = self.test_dir.join("autify-connect.log");
        let log_file = fs::File::create(&log_file_path)
            .map_err(|e| format!("Failed to create log file: {}", e))?;
        let log_file_clone = log_file
            .try_clone()
            .map_err(|e| format!("Failed to clone log file: {}", e))?;

        let child = Command::new(cli_path)
            .arg("--config")
            .arg(&self.config_path)
            .arg("start")
            .current_dir(&self.test_dir)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("AUTIFY_CONNECT_ACCESS_POINT_NAME")
            .env_remove("AUTIFY_CONNECT_ACCESS_POINT_KEY")
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(log_file_clone))
            .spawn()
            .map_err(|e| format!("Failed to spawn autify-connect: {}", e))?;

        println!("autify-connect started with PID: {}", child.id());
        self.process = Some(child);
        self.log_file_path = Some(log_file_path);
        Ok(())
    }

    /// Wait until a log line contains `pattern`
    pub fn wait_for_log(&mut self, pattern: &str, timeout: Duration) -> Result<(), String> {
        let start = Instant::now();

        while start.elapsed() < timeout {
            self.collect_logs();
            if self.has_log_matching(pattern) {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(50));
        }

        Err(format!(
            "No log line matching '{}' within {:?}. Logs:\n{:#?}",
            pattern, timeout, self.log_output
        ))
    }

    /// Wait for the client to report it is connected
    pub fn wait_for_ready(&mut self, timeout: Duration) -> Result<(), String> {
        self.wait_for_log("Autify Connect Client is ready", timeout)
    }

    /// Send SIGINT/SIGTERM to autify-connect
    #[cfg(unix)]
    pub fn send_signal(&mut self, signal: nix::sys::signal::Signal) -> Result<(), String> {
        let child = self
            .process
            .as_ref()
            .ok_or_else(|| "autify-connect is not running".to_string())?;
        println!("Sending {} to autify-connect...", signal);
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(child.id() as i32), signal)
            .map_err(|e| format!("Failed to send {}: {}", signal, e))
    }

    /// Wait for autify-connect to exit on its own
    pub fn wait_for_exit(&mut self, timeout: Duration) -> Result<ExitStatus, String> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        let child = self
            .process
            .as_mut()
            .ok_or_else(|| "autify-connect is not running".to_string())?;

        let result = child.wait_timeout(timeout);
        self.collect_logs();
        match result {
            Ok(Some(status)) => {
                println!("autify-connect exited with status: {}", status);
                self.exit_status = Some(status);
                self.process = None;
                Ok(status)
            }
            Ok(None) => Err(format!(
                "autify-connect did not exit within {:?}. Logs:\n{:#?}",
                timeout, self.log_output
            )),
            Err(e) => Err(format!("Error waiting for autify-connect: {}", e)),
        }
    }

    /// Kill autify-connect if it is still running
    pub fn shutdown(&mut self) {
        if let Some(mut child) = self.process.take() {
            println!("autify-connect still running, killing it");
            child.kill().ok();
            child.wait().ok();
        }
        self.collect_logs();
    }

    fn collect_logs(&mut self) {
        if let Some(log_file_path) = &self.log_file_path {
            if let Ok(content) = fs::read_to_string(log_file_path) {
                let new_lines: Vec<String> = content.lines().map(|s| s.to_string()).collect();

                for (i, line) in new_lines.iter().enumerate() {
                    if i >= self.log_output.len() {
                        println!("[autify-connect] {}", line);
                    }
                }

                self.log_output = new_lines;
            }
        }
    }

    /// Get all collected logs
    pub fn get_logs(&self) -> &[String] {
        &self.log_output
    }

    /// Check if a log line exists matching the pattern
    pub fn has_log_matching(&self, pattern: &str) -> bool {
        self.log_output.iter().any(|line| line.contains(pattern))
    }

    /// Count log lines matching the pattern
    pub fn count_log_matching(&self, pattern: &str) -> usize {
        self.log_output
            .iter()
            .filter(|line| line.contains(pattern))
            .count()
    }
}

impl Drop for AutifyConnectWrapper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
