//! Periodic metadata comparison.
//!
//! Native notifications can be lost (network filesystems, rename-based saves,
//! upstream coalescing by the OS). The poll loop re-stats the file on a fixed
//! interval and reports what the notification channel may have missed.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::event::NetAction;
use crate::fs::MetadataProvider;
use crate::identity::IdentityTracker;

/// Samples the watched file once per tick.
pub struct Poller {
    path: PathBuf,
    metadata: Arc<dyn MetadataProvider>,
}

impl Poller {
    pub fn new(path: PathBuf, metadata: Arc<dyn MetadataProvider>) -> Self {
        Self { path, metadata }
    }

    /// Take one sample and compare it against the tracked identity.
    ///
    /// A sample is already a single observation, so the result goes straight
    /// to reconciliation without coalescing. Nothing is reported until an
    /// identity has been established.
    pub async fn sample(&self, identity: &mut IdentityTracker) -> Option<NetAction> {
        match self.metadata.stat(&self.path).await {
            Ok(stat) => {
                if identity.differs(&stat) {
                    debug!("Poll found new mtime for {}", self.path.display());
                    identity.confirm(&stat);
                    Some(NetAction::Modified)
                } else {
                    None
                }
            }
            Err(e) if e.is_not_found() => {
                if identity.is_established() {
                    debug!("Poll found {} missing", self.path.display());
                    identity.clear();
                    Some(NetAction::Deleted)
                } else {
                    None
                }
            }
            Err(e) => {
                warn!("Poll could not stat {}: {e}", self.path.display());
                None
            }
        }
    }
}
