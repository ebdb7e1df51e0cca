//! Client process handle
//!
//! [`ClientControl`] is the set of side effects the supervisor drives:
//! spawn, graceful terminate, forced kill and cleanup. [`ClientProcess`] is
//! the real implementation on top of the OS and the client's debug server.

use crate::installer::{check_version, Installer};
use async_trait::async_trait;
use connect_access_point::{AccessPoint, AccessPointProvider, ReleaseOutcome};
use connect_common::{ConnectError, ConnectResult, ProcessExit, VersionMismatchWarning};
use connect_log_collection::{
    spawn_stderr_passthrough, FileOutputWriter, LogWatcher, OutputWriter, ReadyListener,
    ReadyMarkers, TracingOutputWriter,
};
use connect_monitoring::{
    DebugServerClient, HealthCheckError, HealthListener, HealthState, HealthStatus, StatusPoller,
};
use connect_process::{force_kill, process_exit_from_status, ClientCommand};
use connect_state::SupervisorEvent;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// Posts events into a supervisor's event intake.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<SupervisorEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<SupervisorEvent>) -> Self {
        Self { tx }
    }

    /// Returns false if the supervisor is gone.
    pub async fn send(&self, event: SupervisorEvent) -> bool {
        let name = event.name();
        if self.tx.send(event).await.is_err() {
            debug!(event = name, "Supervisor gone, dropping event");
            return false;
        }
        true
    }
}

#[async_trait]
impl ReadyListener for EventSink {
    async fn on_ready(&self, message: &str) {
        info!(message = %message, "Client reported a connection");
        self.send(SupervisorEvent::Ready).await;
    }
}

#[async_trait]
impl HealthListener for EventSink {
    async fn on_status(&self, status: HealthStatus) {
        match status.state {
            HealthState::Ready => {
                self.send(SupervisorEvent::Ready).await;
            }
            HealthState::Starting | HealthState::Reconnecting => {
                info!(state = %status.state, message = %status.message, "Client status");
            }
        }
    }

    async fn on_error(&self, error: HealthCheckError) {
        // The poller has already logged it; never escalated.
        debug!(error = %error, "Health poll error");
    }
}

/// Side effects the supervisor drives.
#[async_trait]
pub trait ClientControl: Send + Sync {
    /// Checks run before launching, such as reading the installed version.
    async fn prepare(&self) -> ConnectResult<()> {
        Ok(())
    }

    /// Launch the client. Readiness and exit are reported through `events`.
    async fn spawn(&self, port: u16, events: EventSink) -> ConnectResult<()>;

    /// Ask the client to shut down.
    async fn terminate(&self) -> ConnectResult<()>;

    /// Forcefully end the client. A no-op once it has exited.
    async fn kill(&self) -> ConnectResult<()>;

    /// Stop pollers and release the Access Point.
    ///
    /// Never fails; best-effort failures are returned as warnings.
    async fn cleanup(&self) -> Vec<ConnectError>;

    fn version_warning(&self) -> Option<VersionMismatchWarning> {
        None
    }
}

/// Launch settings for [`ClientProcess`].
#[derive(Debug, Clone)]
pub struct ClientProcessOptions {
    pub verbose: bool,
    pub extra_arguments: Option<String>,
    pub supported_version: String,
    pub ready_markers: ReadyMarkers,
    /// Write client logs here instead of the console.
    pub log_file: Option<PathBuf>,
    pub status_poll_interval: Duration,
    pub debug_server_request_timeout: Duration,
}

#[derive(Default)]
struct Running {
    pid: Option<u32>,
    debug_client: Option<DebugServerClient>,
    poller: Option<StatusPoller>,
    tasks: Vec<JoinHandle<()>>,
}

/// The Autify Connect client as an OS process.
pub struct ClientProcess {
    options: ClientProcessOptions,
    installer: Arc<dyn Installer>,
    access_point: AccessPoint,
    provider: Arc<AccessPointProvider>,
    running: Mutex<Running>,
    exited: Arc<AtomicBool>,
    version: Mutex<Option<String>>,
    version_warning: Mutex<Option<VersionMismatchWarning>>,
    cancel_token: CancellationToken,
}

impl ClientProcess {
    pub fn new(
        options: ClientProcessOptions,
        installer: Arc<dyn Installer>,
        access_point: AccessPoint,
        provider: Arc<AccessPointProvider>,
    ) -> Self {
        Self {
            options,
            installer,
            access_point,
            provider,
            running: Mutex::new(Running::default()),
            exited: Arc::new(AtomicBool::new(false)),
            version: Mutex::new(None),
            version_warning: Mutex::new(None),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Version read by [`ClientControl::prepare`].
    pub fn version(&self) -> Option<String> {
        self.version.lock().clone()
    }

    fn output_writer(&self) -> ConnectResult<Box<dyn OutputWriter>> {
        match &self.options.log_file {
            Some(path) => Ok(Box::new(FileOutputWriter::new(path.clone())?)),
            None => Ok(Box::new(TracingOutputWriter)),
        }
    }

    fn spawn_exit_monitor(
        &self,
        mut child: tokio::process::Child,
        events: EventSink,
    ) -> JoinHandle<()> {
        let exited = Arc::clone(&self.exited);
        let task = async move {
            let process_exit = match child.wait().await {
                Ok(status) => process_exit_from_status(status),
                Err(e) => {
                    warn!(error = %e, "Failed to wait for Autify Connect Client");
                    ProcessExit {
                        code: None,
                        signal: None,
                    }
                }
            };
            exited.store(true, Ordering::SeqCst);
            info!(exit = %process_exit, "Autify Connect Client exited");
            events.send(SupervisorEvent::Exit { process_exit }).await;
        };
        tokio::spawn(task.instrument(tracing::Span::current()))
    }
}

#[async_trait]
impl ClientControl for ClientProcess {
    async fn prepare(&self) -> ConnectResult<()> {
        let path = self.installer.install_path();
        let version = self.installer.install_version(&path).await?;
        *self.version_warning.lock() = check_version(&version, &self.options.supported_version);
        *self.version.lock() = Some(version);
        Ok(())
    }

    async fn spawn(&self, port: u16, events: EventSink) -> ConnectResult<()> {
        let path = self.installer.install_path();
        let version = self.version.lock().clone().unwrap_or_else(|| "unknown".to_string());

        info!(
            access_point = %self.access_point.name,
            debug_server_port = port,
            path = %path.display(),
            version = %version,
            "Starting Autify Connect Client"
        );

        let output = self.output_writer()?;
        let mut child = ClientCommand {
            executable: path,
            debug_server_port: port,
            verbose: self.options.verbose,
            extra_arguments: self.options.extra_arguments.clone(),
            access_point_key: self.access_point.key.clone(),
        }
        .spawn()?;

        let pid = child.id();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConnectError::spawn("client stdout is not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConnectError::spawn("client stderr is not piped"))?;

        let listener: Arc<EventSink> = Arc::new(events.clone());
        let watcher = LogWatcher::new(
            self.options.ready_markers.clone(),
            output,
            listener.clone(),
        );
        let watcher_task = watcher.spawn(stdout, self.cancel_token.child_token());
        let stderr_task = spawn_stderr_passthrough(stderr, self.cancel_token.child_token());
        let exit_task = self.spawn_exit_monitor(child, events);

        let debug_client =
            DebugServerClient::with_timeout(port, self.options.debug_server_request_timeout);
        let poller = StatusPoller::new(
            debug_client.clone(),
            self.options.status_poll_interval,
            listener,
        );
        poller.start();

        let mut running = self.running.lock();
        running.pid = pid;
        running.debug_client = Some(debug_client);
        running.poller = Some(poller);
        running.tasks.push(tokio::spawn(async move {
            let lines = watcher_task.await.unwrap_or(0);
            debug!(lines, "Client stdout watcher finished");
        }));
        running.tasks.push(stderr_task);
        running.tasks.push(exit_task);

        debug!(pid = ?pid, "Autify Connect Client spawned");
        Ok(())
    }

    async fn terminate(&self) -> ConnectResult<()> {
        let debug_client = self.running.lock().debug_client.clone();
        match debug_client {
            Some(client) => {
                debug!(port = client.port(), "Requesting graceful termination");
                client.request_terminate().await?;
                Ok(())
            }
            None => {
                debug!("No debug server to request termination from");
                Ok(())
            }
        }
    }

    async fn kill(&self) -> ConnectResult<()> {
        if self.exited.load(Ordering::SeqCst) {
            debug!("Autify Connect Client already exited, nothing to kill");
            return Ok(());
        }
        let pid = self.running.lock().pid;
        match pid {
            Some(pid) => {
                warn!(pid, "Killing Autify Connect Client");
                force_kill(pid)
            }
            None => Ok(()),
        }
    }

    async fn cleanup(&self) -> Vec<ConnectError> {
        let mut warnings = Vec::new();

        let poller = self.running.lock().poller.take();
        if let Some(poller) = poller {
            poller.stop();
        }

        match self.provider.release(&self.access_point).await {
            ReleaseOutcome::Deleted => {
                debug!(access_point = %self.access_point.name, "Access Point released");
            }
            ReleaseOutcome::Skipped(reason) => {
                debug!(access_point = %self.access_point.name, reason = %reason, "Access Point kept");
            }
            ReleaseOutcome::Failed(reason) => {
                warnings.push(ConnectError::cleanup(format!(
                    "failed to delete Access Point {}: {}",
                    self.access_point.name, reason
                )));
            }
        }

        warnings
    }

    fn version_warning(&self) -> Option<VersionMismatchWarning> {
        self.version_warning.lock().clone()
    }
}

impl Drop for ClientProcess {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        let mut running = self.running.lock();
        if let Some(poller) = running.poller.take() {
            poller.stop();
        }
        for task in running.tasks.drain(..) {
            task.abort();
        }
    }
}

/// The configured port, or a free loopback port.
pub fn choose_debug_server_port(configured: Option<u16>) -> ConnectResult<u16> {
    if let Some(port) = configured {
        connect_process::validate_port(port)?;
        return Ok(port);
    }
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| ConnectError::spawn(format!("failed to find a free port: {}", e)))?;
    let port = listener
        .local_addr()
        .map_err(|e| ConnectError::spawn(format!("failed to find a free port: {}", e)))?
        .port();
    Ok(port)
}
