//! Status poller - fixed-interval `/status` checks in the background
//!
//! Each tick issues one bounded request on its own task, so a slow debug
//! server never delays the next tick. Results are reported to a
//! [`HealthListener`]; failures are never fatal to the poller.

use crate::http::DebugServerClient;
use crate::{HealthCheckError, HealthStatus};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// Receives poll outcomes.
#[async_trait]
pub trait HealthListener: Send + Sync {
    async fn on_status(&self, status: HealthStatus);
    async fn on_error(&self, error: HealthCheckError);
}

/// Counters kept across polls.
#[derive(Debug, Clone, Default)]
pub struct PollerStats {
    pub polls: u64,
    pub consecutive_failures: u32,
    pub last_status: Option<HealthStatus>,
    pub last_error: Option<String>,
}

/// Background poller of the client's debug server.
///
/// Starts at most once and stops at most once; a stopped poller never
/// restarts.
pub struct StatusPoller {
    client: DebugServerClient,
    period: Duration,
    listener: Arc<dyn HealthListener>,
    stats: Arc<Mutex<PollerStats>>,
    cancel_token: CancellationToken,
    task_handle: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl StatusPoller {
    pub fn new(
        client: DebugServerClient,
        period: Duration,
        listener: Arc<dyn HealthListener>,
    ) -> Self {
        Self {
            client,
            period,
            listener,
            stats: Arc::new(Mutex::new(PollerStats::default())),
            cancel_token: CancellationToken::new(),
            task_handle: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    /// Start polling in the current span.
    pub fn start(&self) {
        if self.stopped.load(Ordering::SeqCst) {
            warn!(port = self.client.port(), "Status poller already stopped, not restarting");
            return;
        }

        let mut handle = self.task_handle.lock();
        if handle.is_some() {
            warn!(port = self.client.port(), "Status poller already started");
            return;
        }

        let task = Self::run_poll_loop(
            self.client.clone(),
            self.period,
            Arc::clone(&self.listener),
            Arc::clone(&self.stats),
            self.cancel_token.clone(),
        );
        *handle = Some(tokio::spawn(task.instrument(tracing::Span::current())));

        info!(
            port = self.client.port(),
            interval = ?self.period,
            "Status poller started"
        );
    }

    /// Stop polling. Returns true only for the call that actually stopped it.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.cancel_token.cancel();
        if let Some(task) = self.task_handle.lock().take() {
            task.abort();
        }
        debug!(port = self.client.port(), "Status poller stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst) && self.task_handle.lock().is_some()
    }

    pub fn stats(&self) -> PollerStats {
        self.stats.lock().clone()
    }

    async fn run_poll_loop(
        client: DebugServerClient,
        period: Duration,
        listener: Arc<dyn HealthListener>,
        stats: Arc<Mutex<PollerStats>>,
        cancel_token: CancellationToken,
    ) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    let client = client.clone();
                    let listener = Arc::clone(&listener);
                    let stats = Arc::clone(&stats);
                    in_flight.spawn(
                        async move { Self::poll_once(&client, listener.as_ref(), &stats).await }
                            .instrument(tracing::Span::current()),
                    );
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }

        in_flight.abort_all();
    }

    async fn poll_once(
        client: &DebugServerClient,
        listener: &dyn HealthListener,
        stats: &Mutex<PollerStats>,
    ) {
        match client.request_status().await {
            Ok(status) => {
                {
                    let mut stats = stats.lock();
                    stats.polls += 1;
                    stats.consecutive_failures = 0;
                    stats.last_status = Some(status.clone());
                }
                debug!(state = %status.state, message = %status.message, "Debug server status");
                listener.on_status(status).await;
            }
            Err(e) => {
                {
                    let mut stats = stats.lock();
                    stats.polls += 1;
                    stats.consecutive_failures += 1;
                    stats.last_error = Some(e.to_string());
                }
                warn!(error = %e, "Ignoring debug server error");
                listener.on_error(e).await;
            }
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
