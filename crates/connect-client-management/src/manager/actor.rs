//! SupervisorActor - single task that owns the state machine
//!
//! All state changes go through this task, one message at a time:
//! - commands from the facade (start, terminate, exit)
//! - client events (ready, exit, timer expiry) posted through [`EventSink`]
//! - completions of effects that run on their own tasks (spawn, cleanup)
//!
//! After every message the current snapshot is published on a watch
//! channel, which is what the facade's waiters observe.

use super::commands::{OpCompleted, SupervisorCommand};
use crate::process_handle::{ClientControl, EventSink};
use connect_common::{ConnectError, ConnectResult};
use connect_state::{Effect, StateMachine, SupervisorEvent, SupervisorSnapshot, SupervisorState};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};

pub(super) struct SupervisorActor {
    machine: StateMachine,
    control: Arc<dyn ClientControl>,
    events_tx: mpsc::Sender<SupervisorEvent>,
    completed_tx: mpsc::Sender<OpCompleted>,
    snapshot_tx: watch::Sender<SupervisorSnapshot>,
    /// Responder of the `start` call whose spawn is still running
    pending_start: Option<oneshot::Sender<ConnectResult<()>>>,
    /// The single armed state timer
    timer: Option<JoinHandle<()>>,
    /// Cancelled on terminal state to stop signal forwarding
    signal_guard: CancellationToken,
    span: Span,
}

impl SupervisorActor {
    pub(super) fn new(
        machine: StateMachine,
        control: Arc<dyn ClientControl>,
        events_tx: mpsc::Sender<SupervisorEvent>,
        completed_tx: mpsc::Sender<OpCompleted>,
        snapshot_tx: watch::Sender<SupervisorSnapshot>,
        signal_guard: CancellationToken,
        span: Span,
    ) -> Self {
        Self {
            machine,
            control,
            events_tx,
            completed_tx,
            snapshot_tx,
            pending_start: None,
            timer: None,
            signal_guard,
            span,
        }
    }

    /// Main event loop.
    ///
    /// Completions are served first so that spawn results and cleanup
    /// reports are never starved, then client events, then commands.
    ///
    /// When every facade handle is dropped the actor sends itself TERMINATE
    /// and keeps running until the machine has settled.
    pub(super) async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<SupervisorCommand>,
        mut events_rx: mpsc::Receiver<SupervisorEvent>,
        mut completed_rx: mpsc::Receiver<OpCompleted>,
    ) {
        let mut cmd_closed = false;

        loop {
            if cmd_closed && self.is_settled() {
                debug!("Command channel closed and supervisor settled; actor exiting");
                break;
            }

            tokio::select! {
                biased;

                Some(completed) = completed_rx.recv() => {
                    self.handle_op_completed(completed);
                }

                Some(event) = events_rx.recv() => {
                    self.dispatch(event);
                }

                maybe_cmd = cmd_rx.recv(), if !cmd_closed => {
                    match maybe_cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => {
                            cmd_closed = true;
                            if !self.machine.state().is_terminal() {
                                info!(state = %self.machine.state(), "Manager dropped, terminating Autify Connect Client");
                                self.dispatch(SupervisorEvent::Terminate);
                            }
                        }
                    }
                }
            }
        }

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.signal_guard.cancel();
    }

    fn is_settled(&self) -> bool {
        self.machine.state().is_terminal() && !self.machine.context().cleanup_in_flight
    }

    fn handle_command(&mut self, cmd: SupervisorCommand) {
        match cmd {
            SupervisorCommand::Start { port, resp } => {
                let state = self.machine.state();
                if state != SupervisorState::Init || self.pending_start.is_some() {
                    let _ = resp.send(Err(ConnectError::invalid_state(
                        "start",
                        "init",
                        state.to_string(),
                    )));
                    return;
                }
                self.pending_start = Some(resp);
                self.dispatch(SupervisorEvent::Spawn { port });
            }
            SupervisorCommand::Fail { error } => {
                self.dispatch(SupervisorEvent::Fail { error });
            }
            SupervisorCommand::Terminate => {
                self.dispatch(SupervisorEvent::Terminate);
            }
            SupervisorCommand::Exit { resp } => {
                if self.machine.state().is_terminal() {
                    debug!("Already exited");
                } else {
                    self.dispatch(SupervisorEvent::Terminate);
                }
                let _ = resp.send(());
            }
        }
    }

    fn handle_op_completed(&mut self, completed: OpCompleted) {
        match completed {
            OpCompleted::Spawned(result) => {
                if let Err(e) = &result {
                    error!(error = %e, "Failed to spawn Autify Connect Client");
                    self.dispatch(SupervisorEvent::Fail { error: e.clone() });
                }
                if let Some(resp) = self.pending_start.take() {
                    let _ = resp.send(result);
                }
            }
            OpCompleted::CleanedUp(warnings) => {
                self.dispatch(SupervisorEvent::CleanupFinished { warnings });
            }
        }
    }

    /// Feeds one event to the machine, runs its effects and publishes.
    fn dispatch(&mut self, event: SupervisorEvent) {
        let epoch = self.machine.epoch();
        let effects = self.machine.handle(event);

        // A new epoch invalidates whatever timer was armed
        if self.machine.epoch() != epoch {
            if let Some(timer) = self.timer.take() {
                timer.abort();
            }
        }

        for effect in effects {
            self.execute(effect);
        }
        self.publish();
    }

    fn execute(&mut self, effect: Effect) {
        let control = Arc::clone(&self.control);
        match effect {
            Effect::Spawn { port } => {
                let events = EventSink::new(self.events_tx.clone());
                let completed = self.completed_tx.clone();
                self.run_effect(async move {
                    let result = control.spawn(port, events).await;
                    let _ = completed.send(OpCompleted::Spawned(result)).await;
                });
            }
            Effect::RequestTerminate => {
                self.run_effect(async move {
                    debug!("terminate");
                    if let Err(e) = control.terminate().await {
                        warn!(error = %e, "Ignoring terminate error");
                    }
                });
            }
            Effect::Kill => {
                self.run_effect(async move {
                    debug!("kill");
                    if let Err(e) = control.kill().await {
                        warn!(error = %e, "Ignoring kill error");
                    }
                });
            }
            Effect::Cleanup => {
                let completed = self.completed_tx.clone();
                self.run_effect(async move {
                    debug!("cleanup start");
                    let warnings = control.cleanup().await;
                    for warning in &warnings {
                        warn!(error = %warning, "Ignoring cleanup error");
                    }
                    debug!("cleanup done");
                    let _ = completed.send(OpCompleted::CleanedUp(warnings)).await;
                });
            }
            Effect::ScheduleTimeout {
                state,
                after,
                epoch,
            } => {
                if let Some(timer) = self.timer.take() {
                    timer.abort();
                }
                let events = self.events_tx.clone();
                let task = async move {
                    tokio::time::sleep(after).await;
                    let _ = events.send(SupervisorEvent::Timeout { state, epoch }).await;
                };
                self.timer = Some(tokio::spawn(task.instrument(self.span.clone())));
            }
        }
    }

    fn run_effect(&self, task: impl Future<Output = ()> + Send + 'static) {
        tokio::spawn(task.instrument(self.span.clone()));
    }

    fn publish(&mut self) {
        let snapshot = self.machine.snapshot();
        if snapshot.state.is_terminal() && !self.signal_guard.is_cancelled() {
            self.signal_guard.cancel();
        }
        self.snapshot_tx.send_replace(snapshot);
    }
}
