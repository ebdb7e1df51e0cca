//! Key/value configuration saved on this machine.
//!
//! Values live in `<config_dir>/config.env` as `KEY=VALUE` lines. Environment
//! variables with the same name take precedence over the file.

use crate::{AccessPoint, AccessPointError, AccessPointResult};
use std::path::PathBuf;

pub const ACCESS_POINT_NAME: &str = "AUTIFY_CONNECT_ACCESS_POINT_NAME";
pub const ACCESS_POINT_KEY: &str = "AUTIFY_CONNECT_ACCESS_POINT_KEY";
pub const WEB_ACCESS_TOKEN: &str = "AUTIFY_WEB_ACCESS_TOKEN";
pub const WEB_BASE_PATH: &str = "AUTIFY_WEB_BASE_PATH";
pub const CLI_USER_AGENT_SUFFIX: &str = "AUTIFY_CLI_USER_AGENT_SUFFIX";

const CONFIG_FILE_NAME: &str = "config.env";

/// Read/write access to saved configuration.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value`, or removes the key when `value` is `None`.
    fn set(&self, key: &str, value: Option<&str>) -> AccessPointResult<()>;
}

/// [`ConfigStore`] backed by `config.env`.
#[derive(Debug, Clone)]
pub struct EnvFileConfigStore {
    dir: PathBuf,
    env_override: bool,
}

impl EnvFileConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            env_override: true,
        }
    }

    /// Ignore environment variables and read the file only.
    pub fn without_env_override(mut self) -> Self {
        self.env_override = false;
        self
    }

    fn file_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    fn read_entries(&self) -> AccessPointResult<Vec<(String, String)>> {
        let path = self.file_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(parse_env(&content))
    }

    fn write_entries(&self, entries: &[(String, String)]) -> AccessPointResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let content: String = entries
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect();
        std::fs::write(self.file_path(), content)?;
        Ok(())
    }
}

impl ConfigStore for EnvFileConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        if self.env_override {
            if let Ok(value) = std::env::var(key) {
                return Some(value);
            }
        }
        self.read_entries()
            .ok()?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    fn set(&self, key: &str, value: Option<&str>) -> AccessPointResult<()> {
        let mut entries = self.read_entries()?;
        match value {
            Some(value) => match entries.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value.to_string(),
                None => entries.push((key.to_string(), value.to_string())),
            },
            None => entries.retain(|(k, _)| k != key),
        }
        self.write_entries(&entries)
    }
}

fn parse_env(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(v);
            (k.trim().to_string(), v.to_string())
        })
        .collect()
}

/// Reads the saved static Access Point.
///
/// # Errors
///
/// [`AccessPointError::NotConfigured`] if the name or key is missing.
pub fn load_static_access_point(store: &dyn ConfigStore) -> AccessPointResult<AccessPoint> {
    match (store.get(ACCESS_POINT_NAME), store.get(ACCESS_POINT_KEY)) {
        (Some(name), Some(key)) if !name.is_empty() && !key.is_empty() => {
            Ok(AccessPoint::new_static(name, key))
        }
        _ => Err(AccessPointError::NotConfigured),
    }
}

/// Saves a static Access Point. Surrounding whitespace is trimmed.
pub fn save_access_point(store: &dyn ConfigStore, name: &str, key: &str) -> AccessPointResult<()> {
    if name.trim().is_empty() {
        return Err(AccessPointError::Rejected(
            "Access Point name cannot be empty".to_string(),
        ));
    }
    if key.trim().is_empty() {
        return Err(AccessPointError::Rejected(
            "Access Point key cannot be empty".to_string(),
        ));
    }
    store.set(ACCESS_POINT_NAME, Some(name.trim()))?;
    store.set(ACCESS_POINT_KEY, Some(key.trim()))?;
    Ok(())
}
