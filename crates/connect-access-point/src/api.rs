//! Remote Access Point API

use crate::config_store::{ConfigStore, CLI_USER_AGENT_SUFFIX, WEB_ACCESS_TOKEN, WEB_BASE_PATH};
use crate::{AccessPointError, AccessPointResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Base path used when `AUTIFY_WEB_BASE_PATH` is not configured.
pub const DEFAULT_WEB_BASE_PATH: &str = "https://app.autify.com/api/v1/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `base` plus the optional `AUTIFY_CLI_USER_AGENT_SUFFIX`.
pub fn user_agent(base: &str, store: &dyn ConfigStore) -> String {
    match store.get(CLI_USER_AGENT_SUFFIX) {
        Some(suffix) if !suffix.trim().is_empty() => format!("{} {}", base, suffix.trim()),
        _ => base.to_string(),
    }
}

/// Body returned by the create call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedAccessPoint {
    pub name: String,
    pub key: String,
}

/// Create/delete of Access Points on the remote platform.
#[async_trait]
pub trait AccessPointApi: Send + Sync {
    async fn create_access_point(
        &self,
        workspace_id: u64,
        name: &str,
    ) -> AccessPointResult<CreatedAccessPoint>;

    async fn delete_access_point(&self, workspace_id: u64, name: &str) -> AccessPointResult<()>;
}

/// [`AccessPointApi`] over the Autify for Web REST API.
#[derive(Debug, Clone)]
pub struct WebAccessPointApi {
    client: reqwest::Client,
    base_path: String,
    access_token: String,
}

impl WebAccessPointApi {
    pub fn new(
        access_token: impl Into<String>,
        base_path: Option<String>,
        user_agent: &str,
    ) -> AccessPointResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AccessPointError::api("build client", e.to_string()))?;

        Ok(Self {
            client,
            base_path: base_path.unwrap_or_else(|| DEFAULT_WEB_BASE_PATH.to_string()),
            access_token: access_token.into(),
        })
    }

    /// Builds the client from `AUTIFY_WEB_ACCESS_TOKEN` / `AUTIFY_WEB_BASE_PATH`.
    pub fn from_config(store: &dyn ConfigStore, user_agent: &str) -> AccessPointResult<Self> {
        let token = store
            .get(WEB_ACCESS_TOKEN)
            .ok_or_else(|| AccessPointError::MissingConfig {
                key: WEB_ACCESS_TOKEN.to_string(),
            })?;
        Self::new(token, store.get(WEB_BASE_PATH), user_agent)
    }

    fn access_points_url(&self, workspace_id: u64) -> String {
        format!(
            "{}/projects/{}/autify_connect/access_points",
            self.base_path.trim_end_matches('/'),
            workspace_id
        )
    }
}

#[async_trait]
impl AccessPointApi for WebAccessPointApi {
    async fn create_access_point(
        &self,
        workspace_id: u64,
        name: &str,
    ) -> AccessPointResult<CreatedAccessPoint> {
        let url = self.access_points_url(workspace_id);
        debug!(url = %url, name = %name, "Creating Access Point");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AccessPointError::api("create", e.to_string()))?;

        response
            .json::<CreatedAccessPoint>()
            .await
            .map_err(|e| AccessPointError::api("create", format!("invalid response: {}", e)))
    }

    async fn delete_access_point(&self, workspace_id: u64, name: &str) -> AccessPointResult<()> {
        let url = self.access_points_url(workspace_id);
        debug!(url = %url, name = %name, "Deleting Access Point");

        self.client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AccessPointError::api("delete", e.to_string()))?;
        Ok(())
    }
}
