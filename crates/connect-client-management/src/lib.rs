//! # Connect Client Management
//!
//! Supervision of the Autify Connect client for the `autify connect` CLI.
//!
//! This crate provides:
//! - ClientManager - one supervised client, from launch to cleanup
//! - Configuration loading and validation
//! - The installed client lookup and version check
//! - OS signal forwarding while a client is running
//!
//! ```no_run
//! use connect_client_management::{AccessPointSource, ClientManager, ClientManagerConfig, ExitOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientManagerConfig::with_default_dirs()?;
//! let manager = ClientManager::create(config, AccessPointSource::Static).await?;
//! manager.start().await?;
//! manager.once_ready().await?;
//! let code = manager.exit(ExitOptions::default()).await?;
//! # let _ = code;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod installer;
pub mod manager;
pub mod process_handle;
mod signals;

// Re-export main types
pub use config::{ClientManagerConfig, TimeoutConfig, DEFAULT_READY_MARKER, SUPPORTED_CLIENT_VERSION};
pub use installer::{check_version, default_install_path, Installer, LocalInstaller};
pub use manager::{AccessPointSource, ClientManager, ExitOptions, ManagerOptions};
pub use process_handle::{
    choose_debug_server_port, ClientControl, ClientProcess, ClientProcessOptions, EventSink,
};

pub use connect_common::{ConnectError, ConnectResult, ProcessExit, VersionMismatchWarning};
pub use connect_state::{StateTimeouts, SupervisorSnapshot, SupervisorState};
