//! Client Manager - actor-based supervision of one Autify Connect client
//!
//! This module follows an actor-style design:
//! - A single task owns the [`StateMachine`](connect_state::StateMachine)
//! - Message enums carry facade commands and effect completions to it
//! - [`ClientManager`] is the public handle; it sends commands over a channel
//!   and waits on published snapshots
//!
//! ## Actor Lifecycle
//!
//! The actor keeps running after reaching `done` or `failed` so that late
//! callers still observe the final snapshot. It stops once every handle is
//! dropped and the machine has settled. Dropping every handle while the
//! client is still running sends TERMINATE, so the client is never orphaned.
//!
//! ## Event Intake
//!
//! | Channel | Capacity | Producers |
//! |---------|----------|-----------|
//! | Commands | 32 | `ClientManager`, signal forwarder |
//! | Events | 64 | log watcher, status poller, exit monitor, state timers |
//! | Completions | 32 | spawn and cleanup effect tasks |
//!
//! The actor serves them with a biased `select!` in the order completions,
//! events, commands. Every event is applied to the machine in arrival order,
//! one at a time.
//!
//! ## Signals
//!
//! Managers created with [`ClientManager::create`] forward SIGINT/SIGTERM as
//! TERMINATE until they reach a terminal state. A second signal escalates
//! from `terminating` to `killing`.

mod actor;
mod commands;
mod handle;
mod types;


pub use handle::ClientManager;
pub use types::{AccessPointSource, ExitOptions, ManagerOptions};

use crate::config::ClientManagerConfig;
use crate::installer::LocalInstaller;
use crate::process_handle::{ClientControl, ClientProcess, ClientProcessOptions};
use crate::signals::spawn_signal_forwarder;
use actor::SupervisorActor;
use commands::SupervisorCommand;
use connect_access_point::{AccessPointProvider, ConfigStore, EnvFileConfigStore, WebAccessPointApi};
use connect_common::{ConnectError, ConnectResult};
use connect_log_collection::{client_log_file_path, ReadyMarkers};
use connect_state::StateMachine;
use handle::Shared;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument, Span};

/// Numbers managers within this process for log correlation.
static MANAGER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

const COMMAND_CHANNEL_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 64;
const COMPLETION_CHANNEL_CAPACITY: usize = 32;

impl ClientManager {
    /// Creates a manager for the installed client.
    ///
    /// Obtains the Access Point first: the saved one for
    /// [`AccessPointSource::Static`], or a freshly created one for
    /// [`AccessPointSource::Ephemeral`]. The client is not launched until
    /// [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Invalid configuration, or no usable Access Point.
    pub async fn create(
        config: ClientManagerConfig,
        source: AccessPointSource,
    ) -> ConnectResult<Self> {
        config
            .validate()
            .map_err(|e| ConnectError::config(format!("{:#}", e)))?;

        let span = manager_span();
        Self::create_in_span(config, source).instrument(span).await
    }

    async fn create_in_span(
        config: ClientManagerConfig,
        source: AccessPointSource,
    ) -> ConnectResult<Self> {
        let store: Arc<dyn ConfigStore> =
            Arc::new(EnvFileConfigStore::new(config.config_dir.clone()));
        let provider = match &source {
            AccessPointSource::Static => AccessPointProvider::from_store(Arc::clone(&store)),
            AccessPointSource::Ephemeral {
                workspace_id,
                user_agent,
            } => {
                let api = WebAccessPointApi::from_config(store.as_ref(), user_agent)?;
                AccessPointProvider::ephemeral(Arc::new(api), *workspace_id)
            }
        };
        let provider = Arc::new(provider);
        let access_point = provider.obtain().await?;

        let log_file = if config.file_logging {
            let path = client_log_file_path(&config.cache_dir);
            info!(path = %path.display(), "Client log will be written");
            Some(path)
        } else {
            None
        };

        let options = ClientProcessOptions {
            verbose: config.verbose,
            extra_arguments: config.extra_arguments.clone(),
            supported_version: config.supported_version.clone(),
            ready_markers: ReadyMarkers::new(config.ready_markers.clone()),
            log_file,
            status_poll_interval: config.timeouts.status_poll_interval,
            debug_server_request_timeout: config.timeouts.debug_server_request,
        };
        let installer = Arc::new(LocalInstaller::new(config.client_path()));
        let manager_options = ManagerOptions {
            access_point_name: access_point.name.clone(),
            timeouts: config.timeouts.state_timeouts(),
            debug_server_port: config.debug_server_port,
            forward_signals: true,
        };
        let control = ClientProcess::new(options, installer, access_point, provider);

        Ok(Self::launch(Arc::new(control), manager_options, Span::current()))
    }

    /// Creates a manager over any [`ClientControl`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_control(control: Arc<dyn ClientControl>, options: ManagerOptions) -> Self {
        Self::launch(control, options, manager_span())
    }

    fn launch(control: Arc<dyn ClientControl>, options: ManagerOptions, span: Span) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (completed_tx, completed_rx) = mpsc::channel(COMPLETION_CHANNEL_CAPACITY);

        let machine = StateMachine::new(options.timeouts);
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());

        let signal_guard = CancellationToken::new();
        if options.forward_signals {
            let _enter = span.enter();
            if let Err(e) = spawn_signal_forwarder(
                cmd_tx.downgrade(),
                SupervisorCommand::terminate,
                signal_guard.clone(),
            ) {
                warn!(error = %e, "Signal forwarding disabled");
            }
        }

        let actor = SupervisorActor::new(
            machine,
            Arc::clone(&control),
            events_tx,
            completed_tx,
            snapshot_tx,
            signal_guard,
            span.clone(),
        );
        tokio::spawn(
            actor
                .run(cmd_rx, events_rx, completed_rx)
                .instrument(span.clone()),
        );

        Self {
            cmd_tx,
            snapshot_rx,
            shared: Arc::new(Shared {
                access_point_name: options.access_point_name,
                debug_server_port: options.debug_server_port,
                control,
                span,
            }),
        }
    }
}

fn manager_span() -> Span {
    let manager_id = MANAGER_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    tracing::info_span!("connect_manager", manager_id)
}
