//! Native change notifications.

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::event::{RawEvent, RawEventKind};

/// Where a provider delivers raw notifications.
///
/// Sending never blocks, so it is safe from a backend's callback thread.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<RawEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<RawEvent>) -> Self {
        Self { tx }
    }

    /// Deliver one notification. Returns false once the session is gone.
    pub fn send(&self, kind: RawEventKind) -> bool {
        self.tx.send(RawEvent::new(kind)).is_ok()
    }
}

/// An active registration with a notification provider.
pub trait Subscription: Send {
    /// Stop delivering events. Consumes the subscription so it runs once.
    fn unsubscribe(self: Box<Self>);
}

/// Delivers raw change notifications for a single file.
///
/// Providers may deliver several notifications per change, or none at all.
pub trait NotificationProvider: Send + Sync {
    fn subscribe(&self, path: &Path, sink: EventSink) -> Result<Box<dyn Subscription>>;
}

/// Provider backed by the platform's recommended `notify` watcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyProvider;

impl NotificationProvider for NotifyProvider {
    fn subscribe(&self, path: &Path, sink: EventSink) -> Result<Box<dyn Subscription>> {
        let target = path.canonicalize().map_err(notify::Error::io)?;

        // Editors that save by rename replace the inode, which drops a watch
        // on the file itself. Watch the parent and filter by path instead.
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                notify::Error::generic(&format!("{} has no parent directory", target.display()))
            })?;

        let filter = target.clone();
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if let Some(kind) = RawEventKind::from_notify(&event, &filter) {
                        if !sink.send(kind) {
                            debug!("Dropping notification for stopped session: {kind:?}");
                        }
                    }
                }
                Err(e) => {
                    error!("Watch error: {e}");
                }
            },
        )?;

        watcher.watch(&parent, RecursiveMode::NonRecursive)?;
        debug!(
            "Registered notifications for {} via {}",
            target.display(),
            parent.display()
        );

        Ok(Box::new(NotifySubscription { watcher, parent }))
    }
}

struct NotifySubscription {
    watcher: RecommendedWatcher,
    parent: PathBuf,
}

impl Subscription for NotifySubscription {
    fn unsubscribe(mut self: Box<Self>) {
        if let Err(e) = self.watcher.unwatch(&self.parent) {
            warn!("Failed to unwatch {}: {e}", self.parent.display());
        }
    }
}
