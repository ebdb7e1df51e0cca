use crate::{Effect, StateTransition, SupervisorEvent, SupervisorState};
use chrono::Utc;
use connect_common::{ConnectError, ProcessExit};
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_HISTORY: usize = 100;

/// Per-state deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTimeouts {
    pub starting: Duration,
    pub terminating: Duration,
    pub killing: Duration,
    pub cleanup: Duration,
}

impl Default for StateTimeouts {
    fn default() -> Self {
        Self {
            starting: Duration::from_millis(3000),
            terminating: Duration::from_millis(3000),
            killing: Duration::from_millis(2000),
            cleanup: Duration::from_millis(2000),
        }
    }
}

impl StateTimeouts {
    fn for_state(&self, state: SupervisorState) -> Option<Duration> {
        match state {
            SupervisorState::Starting => Some(self.starting),
            SupervisorState::Terminating => Some(self.terminating),
            SupervisorState::Killing => Some(self.killing),
            SupervisorState::Cleanup => Some(self.cleanup),
            _ => None,
        }
    }
}

/// Mutable record threaded through transitions.
#[derive(Debug, Clone, Default)]
pub struct SupervisorContext {
    /// Errors that decide between `done` and `failed`, in arrival order.
    pub errors: Vec<ConnectError>,
    /// Best-effort cleanup failures. Logged, never escalated.
    pub cleanup_warnings: Vec<ConnectError>,
    /// Set at most once, from the first observed exit.
    pub process_exit: Option<ProcessExit>,
    /// Cleanup has been requested at least once.
    pub cleanup_started: bool,
    /// A cleanup effect is running and has not reported back.
    pub cleanup_in_flight: bool,
}

/// Point-in-time copy of the machine, handed out to waiters.
#[derive(Debug, Clone)]
pub struct SupervisorSnapshot {
    pub state: SupervisorState,
    pub errors: Vec<ConnectError>,
    pub cleanup_warnings: Vec<ConnectError>,
    pub process_exit: Option<ProcessExit>,
    pub history: Vec<StateTransition>,
    /// Terminal, and no cleanup is still running.
    pub settled: bool,
}

impl SupervisorSnapshot {
    /// Returns true if the machine has ever entered `state`.
    pub fn has_visited(&self, state: SupervisorState) -> bool {
        self.state == state || self.history.iter().any(|t| t.to_state == state)
    }

    /// Errors that must be re-thrown to public callers, aggregated.
    pub fn escalating_error(&self) -> Option<ConnectError> {
        let escalating: Vec<ConnectError> = self
            .errors
            .iter()
            .filter(|e| e.is_escalating())
            .cloned()
            .collect();
        if escalating.is_empty() {
            None
        } else {
            Some(ConnectError::aggregate(escalating))
        }
    }
}

/// Supervisor lifecycle state machine.
///
/// Every state entry advances the epoch. A [`SupervisorEvent::Timeout`]
/// carrying an older epoch, or a different state, is dropped.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: SupervisorState,
    epoch: u64,
    timeouts: StateTimeouts,
    context: SupervisorContext,
    history: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new(timeouts: StateTimeouts) -> Self {
        Self {
            state: SupervisorState::Init,
            epoch: 0,
            timeouts,
            context: SupervisorContext::default(),
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn context(&self) -> &SupervisorContext {
        &self.context
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn snapshot(&self) -> SupervisorSnapshot {
        SupervisorSnapshot {
            state: self.state,
            errors: self.context.errors.clone(),
            cleanup_warnings: self.context.cleanup_warnings.clone(),
            process_exit: self.context.process_exit.clone(),
            history: self.history.clone(),
            settled: self.state.is_terminal() && !self.context.cleanup_in_flight,
        }
    }

    /// Applies one event and returns the effects to execute.
    pub fn handle(&mut self, event: SupervisorEvent) -> Vec<Effect> {
        use crate::SupervisorEvent as E;
        use crate::SupervisorState as S;

        let mut effects = Vec::new();
        let event_name = event.name();

        match (self.state, event) {
            (S::Init, E::Spawn { port }) => {
                self.enter(S::Starting, format!("spawn on port {}", port), &mut effects);
                effects.push(Effect::Spawn { port });
            }
            (S::Init, E::Fail { error }) | (S::Starting, E::Fail { error }) => {
                let reason = error.to_string();
                self.context.errors.push(error);
                self.enter(S::Cleanup, reason, &mut effects);
            }
            (S::Init, E::Terminate) => {
                self.enter(S::Cleanup, "terminated before spawn".to_string(), &mut effects);
            }

            (S::Starting, E::Ready) => {
                self.enter(S::Ready, "client connected".to_string(), &mut effects);
            }
            (S::Starting, E::Terminate) | (S::Ready, E::Terminate) => {
                self.enter(S::Terminating, "terminate requested".to_string(), &mut effects);
            }
            (S::Terminating, E::Terminate) => {
                self.enter(S::Killing, "terminate requested again".to_string(), &mut effects);
            }
            (S::Killing, E::Terminate) => {
                self.enter(S::Cleanup, "terminate requested while killing".to_string(), &mut effects);
            }

            (
                from @ (S::Starting | S::Ready | S::Terminating | S::Killing),
                E::Exit { process_exit },
            ) => {
                let reason = format!("client exited in {} ({})", from, process_exit);
                self.record_exit(process_exit);
                self.enter(S::Cleanup, reason, &mut effects);
            }
            (S::Cleanup, E::Exit { process_exit }) => {
                self.record_exit(process_exit);
            }

            (S::Cleanup, E::CleanupFinished { warnings }) => {
                self.finish_cleanup(warnings);
                if self.context.errors.is_empty() {
                    self.enter(S::Done, "cleanup finished".to_string(), &mut effects);
                } else {
                    self.enter(S::Failed, "cleanup finished with errors".to_string(), &mut effects);
                }
            }
            (S::Done | S::Failed, E::CleanupFinished { warnings }) => {
                self.finish_cleanup(warnings);
            }

            (current, E::Timeout { state, epoch }) if state == current && epoch == self.epoch => {
                self.on_timeout(current, &mut effects);
            }
            (current, E::Timeout { state, epoch }) => {
                debug!(
                    current = %current,
                    timer_state = %state,
                    timer_epoch = epoch,
                    current_epoch = self.epoch,
                    "Ignoring stale timer"
                );
            }

            (current, _) => {
                debug!(state = %current, event = event_name, "Event ignored in current state");
            }
        }

        effects
    }

    fn on_timeout(&mut self, current: SupervisorState, effects: &mut Vec<Effect>) {
        use crate::SupervisorState as S;

        match current {
            S::Starting => {
                self.context.errors.push(ConnectError::timeout(S::Starting.to_string()));
                self.enter(S::Terminating, "starting timed out".to_string(), effects);
            }
            S::Terminating => {
                self.enter(S::Killing, "terminating timed out".to_string(), effects);
            }
            S::Killing => {
                self.context.errors.push(ConnectError::timeout(S::Killing.to_string()));
                self.enter(S::Failed, "killing timed out".to_string(), effects);
            }
            S::Cleanup => {
                self.context.errors.push(ConnectError::timeout(S::Cleanup.to_string()));
                // The cleanup task is abandoned; waiters must not wait on it.
                self.context.cleanup_in_flight = false;
                self.enter(S::Failed, "cleanup timed out".to_string(), effects);
            }
            other => {
                debug!(state = %other, "Timer fired in a state without a deadline");
            }
        }
    }

    fn record_exit(&mut self, process_exit: ProcessExit) {
        if self.context.process_exit.is_none() {
            self.context.process_exit = Some(process_exit);
        } else {
            debug!(%process_exit, "Process exit already captured, ignoring");
        }
    }

    fn finish_cleanup(&mut self, warnings: Vec<ConnectError>) {
        for warning in &warnings {
            warn!(error = %warning, "Cleanup step failed");
        }
        self.context.cleanup_warnings.extend(warnings);
        self.context.cleanup_in_flight = false;
    }

    fn request_cleanup(&mut self, effects: &mut Vec<Effect>) {
        self.context.cleanup_started = true;
        self.context.cleanup_in_flight = true;
        effects.push(Effect::Cleanup);
    }

    /// Moves to `to`, arms its timer and pushes its entry actions.
    fn enter(&mut self, to: SupervisorState, reason: String, effects: &mut Vec<Effect>) {
        use crate::SupervisorState as S;

        let from = self.state;
        self.state = to;
        self.epoch += 1;

        info!(from = %from, to = %to, reason = %reason, "Supervisor state changed");

        self.history.push(StateTransition {
            from_state: from,
            to_state: to,
            timestamp: Utc::now(),
            reason,
        });
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }

        if let Some(after) = self.timeouts.for_state(to) {
            effects.push(Effect::ScheduleTimeout {
                state: to,
                after,
                epoch: self.epoch,
            });
        }

        match to {
            S::Terminating => effects.push(Effect::RequestTerminate),
            S::Killing => effects.push(Effect::Kill),
            S::Cleanup => self.request_cleanup(effects),
            S::Failed => {
                // Guardrail: nothing may outlive a failed supervisor.
                effects.push(Effect::Kill);
                if !self.context.cleanup_started {
                    self.request_cleanup(effects);
                }
            }
            _ => {}
        }
    }
}
