//! # Connect Access Point
//!
//! Access Points are the credentials the Autify Connect client authenticates
//! with. They come in two kinds:
//!
//! - **Static**: saved on this machine by `access-point set`, managed by the
//!   user, never deleted here.
//! - **Ephemeral**: created for a single run under a recognizable name prefix
//!   and deleted, best-effort, when the run is cleaned up.

pub mod api;
pub mod config_store;
pub mod provider;

use connect_common::ConnectError;
use std::fmt;
use thiserror::Error;

/// Name prefix of every ephemeral Access Point created by this tool.
pub const EPHEMERAL_NAME_PREFIX: &str = "autify-cli-";

/// Access Point errors.
#[derive(Error, Debug)]
pub enum AccessPointError {
    #[error("Access Point is not set. Run `autify connect access-point set` first.")]
    NotConfigured,

    #[error("Access Point API request failed: {operation} - {reason}")]
    Api { operation: String, reason: String },

    #[error("Config for {key} is not found.")]
    MissingConfig { key: String },

    #[error("Config store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Rejected(String),
}

impl AccessPointError {
    pub fn api(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for Access Point operations.
pub type AccessPointResult<T> = Result<T, AccessPointError>;

impl From<AccessPointError> for ConnectError {
    fn from(err: AccessPointError) -> Self {
        ConnectError::access_point(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPointKind {
    Static,
    Ephemeral,
}

impl fmt::Display for AccessPointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPointKind::Static => write!(f, "static"),
            AccessPointKind::Ephemeral => write!(f, "ephemeral"),
        }
    }
}

/// Credentials for one Access Point.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessPoint {
    pub kind: AccessPointKind,
    pub name: String,
    pub key: String,
}

// The key never shows up in logs.
impl fmt::Debug for AccessPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPoint")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("key", &"****")
            .finish()
    }
}

impl AccessPoint {
    pub fn new_static(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: AccessPointKind::Static,
            name: name.into(),
            key: key.into(),
        }
    }

    pub fn new_ephemeral(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: AccessPointKind::Ephemeral,
            name: name.into(),
            key: key.into(),
        }
    }

    /// True only for ephemeral Access Points still carrying the prefix.
    pub fn is_deletable(&self) -> bool {
        self.kind == AccessPointKind::Ephemeral && self.name.starts_with(EPHEMERAL_NAME_PREFIX)
    }
}

/// A fresh ephemeral Access Point name.
pub fn generate_ephemeral_name() -> String {
    format!("{}{}", EPHEMERAL_NAME_PREFIX, uuid::Uuid::new_v4())
}

// Re-export main types
pub use api::{user_agent, AccessPointApi, CreatedAccessPoint, WebAccessPointApi};
pub use config_store::{
    load_static_access_point, save_access_point, ConfigStore, EnvFileConfigStore,
};
pub use provider::{AccessPointProvider, ReleaseOutcome};
