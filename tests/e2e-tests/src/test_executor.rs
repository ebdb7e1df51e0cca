use crate::connect_cli::{AutifyConnectWrapper, TestConfigOptions};
use crate::{
    cleanup_test_dir, create_manager_config, create_test_dir, get_autify_connect_path,
    get_fakeconnect_path, write_config_file,
};
use connect_client_management::ClientManagerConfig;
use std::path::PathBuf;

/// High-level test executor that manages the entire test lifecycle
pub struct TestExecutor {
    pub test_name: String,
    pub test_dir: PathBuf,
    pub fakeconnect_path: PathBuf,
}

impl TestExecutor {
    pub fn new(test_name: &str) -> Self {
        let test_dir = create_test_dir(test_name);
        let fakeconnect_path = get_fakeconnect_path();

        println!("=== Test Executor Setup ===");
        println!("Test: {}", test_name);
        println!("Test dir: {}", test_dir.display());
        println!("FAKECONNECT: {}", fakeconnect_path.display());
        println!("===========================\n");

        Self {
            test_name: test_name.to_string(),
            test_dir,
            fakeconnect_path,
        }
    }

    /// Config for driving `ClientManager` in-process
    pub fn manager_config(&self, options: &TestConfigOptions) -> ClientManagerConfig {
        create_manager_config(&self.test_dir, &self.fakeconnect_path, options)
    }

    /// Runs `autify-connect start` and hands it to `test_fn`.
    ///
    /// The CLI is killed afterwards if `test_fn` left it running.
    pub fn run_cli<F>(&self, options: TestConfigOptions, test_fn: F) -> Result<(), String>
    where
        F: FnOnce(&mut AutifyConnectWrapper) -> Result<(), String>,
    {
        let config = self.manager_config(&options);
        self.run_cli_with_config(&config, test_fn)
    }

    pub fn run_cli_with_config<F>(&self, config: &ClientManagerConfig, test_fn: F) -> Result<(), String>
    where
        F: FnOnce(&mut AutifyConnectWrapper) -> Result<(), String>,
    {
        let config_path = write_config_file(&self.test_dir, config)?;

        let mut cli = AutifyConnectWrapper::new(config_path, self.test_dir.clone());
        cli.start(&get_autify_connect_path())?;

        let result = test_fn(&mut cli);
        cli.shutdown();
        result
    }

    pub fn cleanup(&self) {
        cleanup_test_dir(&self.test_dir);
    }
}

impl Drop for TestExecutor {
    fn drop(&mut self) {
        // Keep the directory for debugging if the test panicked
        if !std::thread::panicking() {
            self.cleanup();
        } else {
            println!(
                "Test panicked, keeping test directory for debugging: {}",
                self.test_dir.display()
            );
        }
    }
}
