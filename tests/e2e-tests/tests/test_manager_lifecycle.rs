//! Manager Lifecycle
//!
//! Drives `ClientManager` in-process against fakeconnect.

use connect_client_management::{
    AccessPointSource, ClientManager, ConnectError, ExitOptions, SupervisorState,
};
use e2e_tests::{TestConfigOptions, TestExecutor, TEST_ACCESS_POINT_NAME};
use std::time::Duration;

async fn ready_manager(executor: &TestExecutor, options: &TestConfigOptions) -> ClientManager {
    let config = executor.manager_config(options);
    let manager = ClientManager::create(config, AccessPointSource::Static)
        .await
        .unwrap();
    manager.start().await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), manager.once_ready())
        .await
        .unwrap()
        .unwrap();
    manager
}

#[tokio::test]
async fn test_start_ready_exit() {
    let executor = TestExecutor::new("manager-start-ready-exit");
    let manager = ready_manager(&executor, &TestConfigOptions::default()).await;

    assert_eq!(manager.access_point_name(), TEST_ACCESS_POINT_NAME);
    assert_eq!(manager.state(), SupervisorState::Ready);
    assert!(manager.version_warning().is_none());

    let code = manager.exit(ExitOptions::default()).await.unwrap();
    assert_eq!(code, Some(0));
    assert_eq!(manager.state(), SupervisorState::Done);

    // Idempotent once settled
    assert_eq!(manager.exit(ExitOptions::default()).await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_version_mismatch_is_a_warning() {
    let executor = TestExecutor::new("manager-version-mismatch");
    let options = TestConfigOptions {
        supported_version: Some("v9.9.9".to_string()),
        ..Default::default()
    };
    let manager = ready_manager(&executor, &options).await;

    let warning = manager.version_warning().unwrap();
    assert_eq!(warning.installed, "v1.1.0");
    assert_eq!(warning.supported, "v9.9.9");

    assert_eq!(manager.exit(ExitOptions::default()).await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_unresponsive_client_is_killed() {
    let executor = TestExecutor::new("manager-unresponsive");
    let mut options = TestConfigOptions {
        fake_args: vec!["--never-ready".to_string(), "--ignore-terminate".to_string()],
        ..Default::default()
    };
    options.timeouts.starting = Duration::from_millis(1000);

    let config = executor.manager_config(&options);
    let manager = ClientManager::create(config, AccessPointSource::Static)
        .await
        .unwrap();
    manager.start().await.unwrap();

    let err = tokio::time::timeout(Duration::from_secs(15), manager.once_ready())
        .await
        .unwrap()
        .unwrap_err();
    assert!(err.is_escalating());

    let snapshot = manager.diagnostics();
    assert!(snapshot.has_visited(SupervisorState::Killing));
    assert_eq!(
        snapshot.errors.first().and_then(ConnectError::timeout_state),
        Some("starting")
    );
}

#[tokio::test]
async fn test_missing_static_access_point() {
    let executor = TestExecutor::new("manager-no-access-point");
    let mut config = executor.manager_config(&TestConfigOptions::default());
    config.config_dir = executor.test_dir.join("empty-config");

    // Environment overrides would mask the missing file
    if std::env::var_os("AUTIFY_CONNECT_ACCESS_POINT_NAME").is_some() {
        return;
    }

    let err = ClientManager::create(config, AccessPointSource::Static)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectError::AccessPoint { .. }));
}
