//! Access Point provider
//!
//! Hands out the Access Point a run authenticates with and, for ephemeral
//! ones, deletes it again during cleanup.

use crate::api::AccessPointApi;
use crate::config_store::{load_static_access_point, ConfigStore};
use crate::{generate_ephemeral_name, AccessPoint, AccessPointKind, AccessPointResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What [`AccessPointProvider::release`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Deleted,
    Skipped(String),
    /// Deletion was attempted and failed. Never propagated as an error.
    Failed(String),
}

enum Source {
    Static(Arc<dyn ConfigStore>),
    Ephemeral {
        api: Arc<dyn AccessPointApi>,
        workspace_id: u64,
    },
}

pub struct AccessPointProvider {
    source: Source,
    released: AtomicBool,
}

impl std::fmt::Debug for AccessPointProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.source {
            Source::Static(_) => AccessPointKind::Static,
            Source::Ephemeral { .. } => AccessPointKind::Ephemeral,
        };
        f.debug_struct("AccessPointProvider")
            .field("kind", &kind)
            .field("released", &self.released.load(Ordering::SeqCst))
            .finish()
    }
}

impl AccessPointProvider {
    /// Provider of the Access Point saved by `access-point set`.
    pub fn from_store(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            source: Source::Static(store),
            released: AtomicBool::new(false),
        }
    }

    /// Provider that creates a fresh Access Point in `workspace_id`.
    pub fn ephemeral(api: Arc<dyn AccessPointApi>, workspace_id: u64) -> Self {
        Self {
            source: Source::Ephemeral { api, workspace_id },
            released: AtomicBool::new(false),
        }
    }

    /// # Errors
    ///
    /// Static: nothing saved. Ephemeral: the create call failed.
    pub async fn obtain(&self) -> AccessPointResult<AccessPoint> {
        match &self.source {
            Source::Static(store) => {
                let ap = load_static_access_point(store.as_ref())?;
                info!(access_point = %ap.name, "Using static Access Point");
                Ok(ap)
            }
            Source::Ephemeral { api, workspace_id } => {
                let name = generate_ephemeral_name();
                let created = api.create_access_point(*workspace_id, &name).await?;
                info!(
                    access_point = %created.name,
                    workspace_id = workspace_id,
                    "Created ephemeral Access Point"
                );
                Ok(AccessPoint::new_ephemeral(created.name, created.key))
            }
        }
    }

    /// Best-effort deletion, attempted at most once per provider.
    pub async fn release(&self, access_point: &AccessPoint) -> ReleaseOutcome {
        let (api, workspace_id) = match &self.source {
            Source::Static(_) => {
                return ReleaseOutcome::Skipped("static Access Point".to_string());
            }
            Source::Ephemeral { api, workspace_id } => (api, *workspace_id),
        };

        if !access_point.is_deletable() {
            debug!(access_point = %access_point.name, "Not deleting Access Point without ephemeral prefix");
            return ReleaseOutcome::Skipped(format!(
                "{} is not an ephemeral Access Point",
                access_point.name
            ));
        }

        if self.released.swap(true, Ordering::SeqCst) {
            return ReleaseOutcome::Skipped("already released".to_string());
        }

        match api.delete_access_point(workspace_id, &access_point.name).await {
            Ok(()) => {
                info!(access_point = %access_point.name, "Deleted ephemeral Access Point");
                ReleaseOutcome::Deleted
            }
            Err(e) => {
                warn!(
                    access_point = %access_point.name,
                    error = %e,
                    "Failed to delete ephemeral Access Point"
                );
                ReleaseOutcome::Failed(e.to_string())
            }
        }
    }
}
