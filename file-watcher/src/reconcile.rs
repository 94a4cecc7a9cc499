//! Applies net actions: reloads, deduplicates, and notifies the caller.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::FsError;
use crate::event::{ChangeEvent, NetAction};
use crate::fs::{ContentReader, MetadataProvider};
use crate::identity::IdentityTracker;

/// Callback receiving reconciled changes.
pub type ChangeCallback = Box<dyn FnMut(ChangeEvent) + Send + 'static>;

/// What a reconciliation step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The callback was invoked.
    Delivered(ChangeEvent),

    /// Content matched what was last delivered; no callback.
    Suppressed,

    /// The file could not be read; nothing changed.
    Skipped,
}

/// Turns net actions into at most one callback each.
pub struct Reconciler {
    path: PathBuf,
    metadata: Arc<dyn MetadataProvider>,
    reader: Arc<dyn ContentReader>,
    last_delivered: Option<Vec<u8>>,
    on_change: ChangeCallback,
}

impl Reconciler {
    /// Create a reconciler. `baseline` is the content the caller already shows.
    pub fn new(
        path: PathBuf,
        metadata: Arc<dyn MetadataProvider>,
        reader: Arc<dyn ContentReader>,
        baseline: Option<Vec<u8>>,
        on_change: ChangeCallback,
    ) -> Self {
        Self {
            path,
            metadata,
            reader,
            last_delivered: baseline,
            on_change,
        }
    }

    pub async fn apply(&mut self, action: NetAction, identity: &mut IdentityTracker) -> Outcome {
        match action {
            NetAction::Deleted => {
                info!("Watched file deleted: {}", self.path.display());
                identity.clear();
                // A recreation with the same bytes must still reach the caller.
                self.last_delivered = None;
                self.deliver(ChangeEvent::Deleted)
            }
            NetAction::Modified => self.reload(identity).await,
        }
    }

    async fn reload(&mut self, identity: &mut IdentityTracker) -> Outcome {
        let stat = match self.metadata.stat(&self.path).await {
            Ok(stat) => stat,
            Err(e) => {
                self.log_read_failure(identity, &e);
                return Outcome::Skipped;
            }
        };

        let content = match self.reader.read(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                self.log_read_failure(identity, &e);
                return Outcome::Skipped;
            }
        };

        identity.confirm(&stat);

        if self.last_delivered.as_deref() == Some(content.as_slice()) {
            debug!("Content unchanged, suppressing reload of {}", self.path.display());
            return Outcome::Suppressed;
        }

        self.last_delivered = Some(content);
        self.deliver(ChangeEvent::Modified)
    }

    fn deliver(&mut self, event: ChangeEvent) -> Outcome {
        (self.on_change)(event);
        Outcome::Delivered(event)
    }

    fn log_read_failure(&self, identity: &IdentityTracker, err: &FsError) {
        if identity.is_established() {
            warn!("Reload of {} failed: {err}", self.path.display());
        } else {
            debug!("Ignoring transient read failure: {err}");
        }
    }
}
