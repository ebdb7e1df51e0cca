//! OS signal forwarding scoped to one manager.
//!
//! Each SIGINT/SIGTERM (Ctrl+C on Windows) becomes one message on the
//! manager's command channel. Forwarding stops when the token is cancelled,
//! which the supervisor does on reaching a terminal state. The forwarder
//! holds only a weak sender, so it never keeps a manager alive.
//!
//! Tokio cannot uninstall its OS-level handler once a signal kind has been
//! registered. After forwarding stops, SIGINT/SIGTERM no longer reach any
//! manager but they also no longer terminate the process with the default
//! action; an embedding program that needs that must handle the signals
//! itself.

use connect_common::{ConnectError, ConnectResult};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, Instrument};

pub(crate) fn spawn_signal_forwarder<T: Send + 'static>(
    tx: mpsc::WeakSender<T>,
    message: fn() -> T,
    cancel_token: CancellationToken,
) -> ConnectResult<JoinHandle<()>> {
    let mut signals = Signals::register()?;

    let task = async move {
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                name = signals.recv() => {
                    info!(signal = name, "Received signal, terminating Autify Connect Client");
                    let Some(tx) = tx.upgrade() else { break };
                    if tx.send(message()).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Signal forwarding stopped");
    };

    Ok(tokio::spawn(task.instrument(tracing::Span::current())))
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn register() -> ConnectResult<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let register = |kind: SignalKind, name: &str| {
            signal(kind).map_err(|e| {
                ConnectError::config(format!("failed to register {} handler: {}", name, e))
            })
        };
        Ok(Self {
            interrupt: register(SignalKind::interrupt(), "SIGINT")?,
            terminate: register(SignalKind::terminate(), "SIGTERM")?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(windows)]
struct Signals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl Signals {
    fn register() -> ConnectResult<Self> {
        let ctrl_c = tokio::signal::windows::ctrl_c().map_err(|e| {
            ConnectError::config(format!("failed to register Ctrl+C handler: {}", e))
        })?;
        Ok(Self { ctrl_c })
    }

    async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "CTRL_C"
    }
}
