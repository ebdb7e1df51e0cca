use anyhow::{Context, Result};
use connect_state::StateTimeouts;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod validation;

/// Client version this tool is tested against.
pub const SUPPORTED_CLIENT_VERSION: &str = "v1.1.0";

/// Default marker the client logs once it is connected.
pub const DEFAULT_READY_MARKER: &str = "Successfully connected";

/// Top-level client manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientManagerConfig {
    /// Directory holding `config.env`
    pub config_dir: PathBuf,
    /// Directory holding the installed client and log files
    pub cache_dir: PathBuf,
    /// Overrides the installed client location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_path: Option<PathBuf>,
    #[serde(default)]
    pub verbose: bool,
    /// Write client logs to a file under `cache_dir` instead of the console
    #[serde(default)]
    pub file_logging: bool,
    /// Fixed debug server port; a free port is chosen when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_server_port: Option<u16>,
    /// Appended to the client's arguments, split on whitespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_arguments: Option<String>,
    #[serde(default = "default_supported_version")]
    pub supported_version: String,
    #[serde(default = "default_ready_markers")]
    pub ready_markers: Vec<String>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Deadlines and intervals, all in milliseconds when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_starting", with = "duration_ms")]
    pub starting: Duration,
    #[serde(default = "default_terminating", with = "duration_ms")]
    pub terminating: Duration,
    #[serde(default = "default_killing", with = "duration_ms")]
    pub killing: Duration,
    #[serde(default = "default_cleanup", with = "duration_ms")]
    pub cleanup: Duration,
    #[serde(default = "default_status_poll_interval", with = "duration_ms")]
    pub status_poll_interval: Duration,
    #[serde(default = "default_debug_server_request", with = "duration_ms")]
    pub debug_server_request: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            starting: default_starting(),
            terminating: default_terminating(),
            killing: default_killing(),
            cleanup: default_cleanup(),
            status_poll_interval: default_status_poll_interval(),
            debug_server_request: default_debug_server_request(),
        }
    }
}

impl TimeoutConfig {
    /// The subset consumed by the state machine.
    pub fn state_timeouts(&self) -> StateTimeouts {
        StateTimeouts {
            starting: self.starting,
            terminating: self.terminating,
            killing: self.killing,
            cleanup: self.cleanup,
        }
    }
}

impl ClientManagerConfig {
    pub fn new(config_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            cache_dir: cache_dir.into(),
            client_path: None,
            verbose: false,
            file_logging: false,
            debug_server_port: None,
            extra_arguments: None,
            supported_version: default_supported_version(),
            ready_markers: default_ready_markers(),
            timeouts: TimeoutConfig::default(),
        }
    }

    /// Uses the platform config and cache directories (`.../autify`).
    pub fn with_default_dirs() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("Failed to locate the user config directory")?
            .join("autify");
        let cache_dir = dirs::cache_dir()
            .context("Failed to locate the user cache directory")?
            .join("autify");
        Ok(Self::new(config_dir, cache_dir))
    }

    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: ClientManagerConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Where the client binary is expected.
    pub fn client_path(&self) -> PathBuf {
        self.client_path
            .clone()
            .unwrap_or_else(|| crate::installer::default_install_path(&self.cache_dir))
    }
}

fn default_supported_version() -> String {
    SUPPORTED_CLIENT_VERSION.to_string()
}

fn default_ready_markers() -> Vec<String> {
    vec![DEFAULT_READY_MARKER.to_string()]
}

fn default_starting() -> Duration {
    Duration::from_millis(3000)
}

fn default_terminating() -> Duration {
    Duration::from_millis(3000)
}

fn default_killing() -> Duration {
    Duration::from_millis(2000)
}

fn default_cleanup() -> Duration {
    Duration::from_millis(2000)
}

fn default_status_poll_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_debug_server_request() -> Duration {
    Duration::from_millis(1000)
}

// Durations as integer milliseconds; strings with a unit are accepted on input.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Millis(millis) => Ok(Duration::from_millis(millis)),
            Raw::Text(s) => parse_duration(&s).map_err(serde::de::Error::custom),
        }
    }

    fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let invalid = || format!("Invalid duration: {}", s);
        // "ms" before "s"
        if let Some(num) = s.strip_suffix("ms") {
            num.trim().parse().map(Duration::from_millis).map_err(|_| invalid())
        } else if let Some(num) = s.strip_suffix('s') {
            num.trim().parse().map(Duration::from_secs).map_err(|_| invalid())
        } else if let Some(num) = s.strip_suffix('m') {
            num.trim()
                .parse::<u64>()
                .ok()
                .and_then(|mins| mins.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or_else(invalid)
        } else {
            Err(format!("Duration must be milliseconds or end with 'ms', 's' or 'm': {}", s))
        }
    }
}
