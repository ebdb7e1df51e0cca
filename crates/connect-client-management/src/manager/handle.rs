//! ClientManager handle - public API over the supervisor actor.
//!
//! Commands go to the actor over a channel; waiters observe the snapshots
//! the actor publishes and never poll.

use super::commands::SupervisorCommand;
use super::types::ExitOptions;
use crate::process_handle::{choose_debug_server_port, ClientControl};
use connect_common::{ConnectError, ConnectResult, VersionMismatchWarning};
use connect_state::{SupervisorSnapshot, SupervisorState};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn, Instrument, Span};

pub(super) struct Shared {
    pub access_point_name: String,
    pub debug_server_port: Option<u16>,
    pub control: Arc<dyn ClientControl>,
    pub span: Span,
}

/// Handle to one supervised Autify Connect client.
///
/// Cheap to clone. When the last clone is dropped while the client is still
/// running, the supervisor terminates it on its own.
#[derive(Clone)]
pub struct ClientManager {
    pub(super) cmd_tx: mpsc::Sender<SupervisorCommand>,
    pub(super) snapshot_rx: watch::Receiver<SupervisorSnapshot>,
    pub(super) shared: Arc<Shared>,
}

impl std::fmt::Debug for ClientManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientManager")
            .field("access_point_name", &self.shared.access_point_name)
            .field("state", &self.state())
            .finish()
    }
}

impl ClientManager {
    fn map_send_err(context: &str) -> ConnectError {
        ConnectError::actor_unavailable(format!("{}: actor unavailable (channel closed)", context))
    }

    fn map_recv_err(context: &str) -> ConnectError {
        ConnectError::actor_unavailable(format!("{}: actor dropped response", context))
    }

    async fn send(&self, cmd: SupervisorCommand, context: &str) -> ConnectResult<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| Self::map_send_err(context))
    }

    /// Launches the client.
    ///
    /// Valid only once, from `init`. If preparation or spawning fails, the
    /// failure is recorded first, so cleanup still runs, and then returned.
    pub async fn start(&self) -> ConnectResult<()> {
        async {
            debug!("start");
            let state = self.state();
            if state != SupervisorState::Init {
                return Err(ConnectError::invalid_state("start", "init", state.to_string()));
            }

            let prepared = match self.shared.control.prepare().await {
                Ok(()) => choose_debug_server_port(self.shared.debug_server_port),
                Err(e) => Err(e),
            };
            let port = match prepared {
                Ok(port) => port,
                Err(e) => {
                    self.send(SupervisorCommand::Fail { error: e.clone() }, "start")
                        .await?;
                    return Err(e);
                }
            };

            let (tx, rx) = oneshot::channel();
            self.send(SupervisorCommand::Start { port, resp: tx }, "start")
                .await?;
            rx.await.map_err(|_| Self::map_recv_err("start"))?
        }
        .instrument(self.shared.span.clone())
        .await
    }

    /// Resolves once the client is connected.
    ///
    /// # Errors
    ///
    /// If the supervisor finishes without ever reaching `ready`: the
    /// timeout/spawn errors if any, otherwise every recorded error, otherwise
    /// [`ConnectError::Unreached`].
    pub async fn once_ready(&self) -> ConnectResult<()> {
        async {
            debug!("onceReady");
            let snapshot = self
                .wait_for(|s| s.has_visited(SupervisorState::Ready) || s.state.is_terminal())
                .await?;
            if snapshot.has_visited(SupervisorState::Ready) {
                return Ok(());
            }
            Err(Self::unreached(&snapshot, SupervisorState::Ready))
        }
        .instrument(self.shared.span.clone())
        .await
    }

    /// Resolves once shutdown has begun, or the supervisor has finished.
    pub async fn once_terminating(&self) -> ConnectResult<()> {
        async {
            debug!("onceTerminating");
            let snapshot = self
                .wait_for(|s| s.has_visited(SupervisorState::Terminating) || s.state.is_terminal())
                .await?;
            Self::escalate(&snapshot)
        }
        .instrument(self.shared.span.clone())
        .await
    }

    /// Resolves with the client's exit code once the supervisor has settled.
    ///
    /// `None` means the exit status could not be captured, which is logged
    /// rather than treated as an error.
    pub async fn once_done(&self) -> ConnectResult<Option<i32>> {
        async {
            debug!("onceDone");
            let snapshot = self.wait_for(|s| s.settled).await?;
            Self::escalate(&snapshot)?;
            Ok(Self::report_exit(&snapshot))
        }
        .instrument(self.shared.span.clone())
        .await
    }

    /// Terminates the client and waits for the supervisor to settle.
    ///
    /// Idempotent: once settled, the captured exit code is returned again
    /// without driving any further transitions. A call made while an earlier
    /// one is still waiting sends TERMINATE again and so escalates.
    pub async fn exit(&self, options: ExitOptions) -> ConnectResult<Option<i32>> {
        let result = async {
            debug!("exit");
            let snapshot = self.diagnostics();
            if snapshot.settled {
                debug!("Already exited.");
                return Ok(snapshot.process_exit.and_then(|p| p.code));
            }

            let (tx, rx) = oneshot::channel();
            self.send(SupervisorCommand::Exit { resp: tx }, "exit").await?;
            rx.await.map_err(|_| Self::map_recv_err("exit"))?;
            self.once_done().await
        }
        .instrument(self.shared.span.clone())
        .await;

        match result {
            Err(e) if options.ignore_error => {
                warn!(parent: &self.shared.span, error = %e, "Ignoring exit error");
                Ok(None)
            }
            other => other,
        }
    }

    /// Sends TERMINATE. Repeating it escalates towards a forced kill.
    pub async fn terminate(&self) -> ConnectResult<()> {
        self.send(SupervisorCommand::Terminate, "terminate").await
    }

    pub fn access_point_name(&self) -> &str {
        &self.shared.access_point_name
    }

    /// Set after a successful start when the installed client version is
    /// not the supported one.
    pub fn version_warning(&self) -> Option<VersionMismatchWarning> {
        self.shared.control.version_warning()
    }

    pub fn state(&self) -> SupervisorState {
        self.snapshot_rx.borrow().state
    }

    /// Current state, transition history, errors and process exit.
    pub fn diagnostics(&self) -> SupervisorSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    async fn wait_for(
        &self,
        predicate: impl FnMut(&SupervisorSnapshot) -> bool,
    ) -> ConnectResult<SupervisorSnapshot> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| Self::map_recv_err("wait"))?
            .clone();
        Ok(snapshot)
    }

    fn escalate(snapshot: &SupervisorSnapshot) -> ConnectResult<()> {
        if snapshot.state == SupervisorState::Failed {
            warn!(errors = ?snapshot.errors, "Autify Connect Manager failed");
        }
        match snapshot.escalating_error() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn unreached(snapshot: &SupervisorSnapshot, target: SupervisorState) -> ConnectError {
        if snapshot.state == SupervisorState::Failed {
            warn!(errors = ?snapshot.errors, "Autify Connect Manager failed");
        }
        if let Some(error) = snapshot.escalating_error() {
            return error;
        }
        if !snapshot.errors.is_empty() {
            return ConnectError::aggregate(snapshot.errors.clone());
        }
        ConnectError::unreached(target.to_string(), snapshot.state.to_string())
    }

    fn report_exit(snapshot: &SupervisorSnapshot) -> Option<i32> {
        match &snapshot.process_exit {
            Some(process_exit) => {
                info!(exit = %process_exit, "Autify Connect Client exited");
                process_exit.code
            }
            None => {
                warn!("Autify Connect Client exited but unable to capture the exit status");
                None
            }
        }
    }
}
