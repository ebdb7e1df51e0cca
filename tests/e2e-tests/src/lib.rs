// E2E Test Framework for the Autify Connect supervisor

pub mod assertions;
pub mod connect_cli;
pub mod test_executor;

pub use connect_cli::{AutifyConnectWrapper, TestConfigOptions};
pub use test_executor::TestExecutor;

use connect_access_point::{save_access_point, EnvFileConfigStore};
use connect_client_management::ClientManagerConfig;
use std::env;
use std::path::{Path, PathBuf};

/// Name of the static Access Point every test config carries.
pub const TEST_ACCESS_POINT_NAME: &str = "e2e-access-point";

fn target_binary(name: &str) -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current exe path")
        .parent()
        .expect("Failed to get parent dir")
        .to_path_buf();

    // If we're in deps/, go up one level
    if path.ends_with("deps") {
        path.pop();
    }

    path.push(format!("{}{}", name, env::consts::EXE_SUFFIX));

    if !path.exists() {
        panic!("{} binary not found at: {}", name, path.display());
    }

    path
}

/// Get the path to the autify-connect CLI binary
pub fn get_autify_connect_path() -> PathBuf {
    target_binary("autify-connect")
}

/// Get the path to the fakeconnect binary
pub fn get_fakeconnect_path() -> PathBuf {
    target_binary("fakeconnect")
}

/// Create a temporary test directory
pub fn create_test_dir(test_name: &str) -> PathBuf {
    // Use target/tmp instead of system temp to avoid path issues
    let workspace_root = env::current_exe()
        .expect("Failed to get current exe path")
        .parent()
        .expect("Failed to get parent")
        .parent()
        .expect("Failed to get parent")
        .parent()
        .expect("Failed to get workspace root")
        .to_path_buf();

    let temp_dir = workspace_root
        .join("target")
        .join("tmp")
        .join(format!("e2e-test-{}", test_name));

    if temp_dir.exists() {
        std::fs::remove_dir_all(&temp_dir).ok();
    }
    std::fs::create_dir_all(&temp_dir).expect("Failed to create test directory");
    temp_dir
}

/// Clean up test directory
pub fn cleanup_test_dir(dir: &Path) {
    if dir.exists() {
        std::fs::remove_dir_all(dir).ok();
    }
}

/// Builds a config that runs `fakeconnect` with a saved static Access Point.
pub fn create_manager_config(
    test_dir: &Path,
    fakeconnect_path: &Path,
    options: &TestConfigOptions,
) -> ClientManagerConfig {
    let mut config = ClientManagerConfig::new(test_dir.join("config"), test_dir.join("cache"));
    config.client_path = Some(fakeconnect_path.to_path_buf());
    config.extra_arguments = options.fake_args();
    config.file_logging = options.file_logging;
    config.timeouts = options.timeouts;
    if let Some(version) = &options.supported_version {
        config.supported_version = version.clone();
    }

    let store = EnvFileConfigStore::new(config.config_dir.clone()).without_env_override();
    save_access_point(&store, TEST_ACCESS_POINT_NAME, "e2e-key")
        .expect("Failed to save the test Access Point");

    config
}

/// Writes `config` as YAML under `test_dir` and returns its path.
pub fn write_config_file(test_dir: &Path, config: &ClientManagerConfig) -> Result<PathBuf, String> {
    let content =
        serde_yaml::to_string(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    let path = test_dir.join("config.yaml");
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    println!("Created config: {}", path.display());
    Ok(path)
}
