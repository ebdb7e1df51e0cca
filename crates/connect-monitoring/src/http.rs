// Debug server HTTP client

use crate::{HealthCheckError, HealthCheckResult, HealthState, HealthStatus};
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Default bound on every debug server request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Deserialize)]
struct RawStatusResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the loopback debug server exposed by the Autify Connect client.
#[derive(Clone)]
pub struct DebugServerClient {
    port: u16,
    request_timeout: Duration,
    client: Client<HttpConnector, Empty<Bytes>>,
}

impl std::fmt::Debug for DebugServerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugServerClient")
            .field("port", &self.port)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl DebugServerClient {
    pub fn new(port: u16) -> Self {
        Self::with_timeout(port, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(port: u16, request_timeout: Duration) -> Self {
        Self {
            port,
            request_timeout,
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `GET /status`.
    ///
    /// # Errors
    ///
    /// Fails on timeout, connection failure, a non-2xx status, or a body
    /// that lacks a non-empty `status` or `message`.
    pub async fn request_status(&self) -> HealthCheckResult<HealthStatus> {
        let endpoint = "GET /status";
        let body = self.request(Method::GET, "/status").await?;

        let invalid = || HealthCheckError::InvalidResponse {
            endpoint: endpoint.to_string(),
            response: String::from_utf8_lossy(&body).to_string(),
        };

        let raw: RawStatusResponse = serde_json::from_slice(&body).map_err(|_| invalid())?;
        let (status, message) = match (raw.status, raw.message) {
            (Some(s), Some(m)) if !s.is_empty() && !m.is_empty() => (s, m),
            _ => return Err(invalid()),
        };
        let state = match status.as_str() {
            "starting" => HealthState::Starting,
            "ready" => HealthState::Ready,
            "reconnecting" => HealthState::Reconnecting,
            _ => return Err(invalid()),
        };

        Ok(HealthStatus { state, message })
    }

    /// `POST /terminate`. The response body is ignored.
    pub async fn request_terminate(&self) -> HealthCheckResult<()> {
        self.request(Method::POST, "/terminate").await.map(|_| ())
    }

    async fn request(&self, method: Method, path: &str) -> HealthCheckResult<Bytes> {
        let endpoint = format!("{} {}", method, path);
        let uri = format!("http://127.0.0.1:{}{}", self.port, path);

        let request = Request::builder()
            .method(method)
            .uri(&uri)
            .body(Empty::<Bytes>::new())
            .map_err(|e| HealthCheckError::ConnectionFailed {
                endpoint: endpoint.clone(),
                reason: format!("failed to build request: {}", e),
            })?;

        let exchange = async {
            let response = self.client.request(request).await.map_err(|e| {
                HealthCheckError::ConnectionFailed {
                    endpoint: endpoint.clone(),
                    reason: e.to_string(),
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(HealthCheckError::UnexpectedStatus {
                    endpoint: endpoint.clone(),
                    status: status.as_u16(),
                });
            }

            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| HealthCheckError::ConnectionFailed {
                    endpoint: endpoint.clone(),
                    reason: format!("failed to read body: {}", e),
                })?
                .to_bytes();
            Ok(body)
        };

        let outcome = timeout(self.request_timeout, exchange).await;
        match outcome {
            Ok(result) => {
                debug!(endpoint = %endpoint, ok = result.is_ok(), "Debug server request finished");
                result
            }
            Err(_) => Err(HealthCheckError::Timeout { endpoint }),
        }
    }
}
