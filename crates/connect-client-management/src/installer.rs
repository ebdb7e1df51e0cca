//! Installed client lookup.
//!
//! Downloading and extracting the client is handled elsewhere; the
//! supervisor only needs to know where the binary is and which version it
//! reports.

use async_trait::async_trait;
use connect_common::{ConnectResult, VersionMismatchWarning};
use connect_process::{read_client_version, validate_executable};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Location and version of the installed client.
#[async_trait]
pub trait Installer: Send + Sync {
    fn install_path(&self) -> PathBuf;

    /// Version string reported by the binary at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the binary is missing, not executable, or prints no version.
    async fn install_version(&self, path: &Path) -> ConnectResult<String>;
}

/// `<cache_dir>/autifyconnect`, with `.exe` on Windows.
pub fn default_install_path(cache_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        cache_dir.join("autifyconnect.exe")
    } else {
        cache_dir.join("autifyconnect")
    }
}

/// Installer backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalInstaller {
    path: PathBuf,
}

impl LocalInstaller {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Installer for LocalInstaller {
    fn install_path(&self) -> PathBuf {
        self.path.clone()
    }

    async fn install_version(&self, path: &Path) -> ConnectResult<String> {
        validate_executable(path)?;
        let version = read_client_version(path).await?;
        debug!(path = %path.display(), version = %version, "Read installed client version");
        Ok(version)
    }
}

/// Compares `installed` with `supported`, logging a warning on mismatch.
pub fn check_version(installed: &str, supported: &str) -> Option<VersionMismatchWarning> {
    let warning = VersionMismatchWarning::check(installed, supported)?;
    warn!(
        version = %warning.installed,
        supported = %warning.supported,
        "Installed Autify Connect Client version doesn't match our supported version. \
         Consider running `autify connect client install` to install the supported version."
    );
    Some(warning)
}
