//! Watch session lifecycle.
//!
//! A [`FileWatcher`] binds at most one file at a time. Each binding is a
//! [`WatchSession`]: a notification subscription plus one driver task that
//! owns the coalescer, the poll interval, the identity, and the reconciler.
//! Every state change and every callback happens on that task, so callbacks
//! are never concurrent with each other.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::coalesce::Coalescer;
use crate::config::WatchConfig;
use crate::error::{Result, WatchError};
use crate::event::{ChangeEvent, NetAction, RawEvent, classify};
use crate::fs::{ContentReader, MetadataProvider, TokioFs};
use crate::identity::{FileIdentity, IdentityTracker};
use crate::notifier::{EventSink, NotificationProvider, NotifyProvider, Subscription};
use crate::poll::Poller;
use crate::reconcile::{ChangeCallback, Outcome, Reconciler};

/// Lifecycle state of the current binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session has been started.
    Idle,

    /// Testing that the file can be stat'ed and read.
    Starting,

    /// Notifications and polling are running.
    Active,

    /// The last start failed; `error` says why.
    Error,

    /// The session was stopped.
    Stopped,
}

/// Externally visible health of the watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchStatus {
    /// Lifecycle state of the binding.
    pub state: SessionState,

    /// True while notifications or polling are running for `path`.
    pub is_watching: bool,

    /// Human-readable problem, for display. Also set while the session runs
    /// degraded or after the watched file was deleted.
    pub error: Option<String>,

    /// Path of the current binding, if any.
    pub path: Option<PathBuf>,

    /// Last confirmed fingerprint; `None` after the file was deleted.
    pub identity: Option<FileIdentity>,

    /// When the callback last fired.
    pub last_change: Option<DateTime<Utc>>,
}

impl WatchStatus {
    fn with_state(state: SessionState, path: Option<PathBuf>) -> Self {
        Self {
            state,
            is_watching: state == SessionState::Active,
            error: None,
            path,
            identity: None,
            last_change: None,
        }
    }

    fn idle() -> Self {
        Self::with_state(SessionState::Idle, None)
    }

    fn starting(path: &Path) -> Self {
        Self::with_state(SessionState::Starting, Some(path.to_path_buf()))
    }

    fn failed(path: &Path, err: &WatchError) -> Self {
        Self {
            error: Some(err.to_string()),
            ..Self::with_state(SessionState::Error, Some(path.to_path_buf()))
        }
    }

    fn stopped() -> Self {
        Self::with_state(SessionState::Stopped, None)
    }
}

impl Default for WatchStatus {
    fn default() -> Self {
        Self::idle()
    }
}

/// Watches a single file and reports reloads to a callback.
pub struct FileWatcher {
    config: WatchConfig,
    metadata: Arc<dyn MetadataProvider>,
    reader: Arc<dyn ContentReader>,
    notifier: Arc<dyn NotificationProvider>,
    status: Arc<watch::Sender<WatchStatus>>,
    session: Option<WatchSession>,
}

impl FileWatcher {
    /// Create a watcher on the real filesystem.
    pub fn new(config: WatchConfig) -> Self {
        Self::with_providers(
            config,
            Arc::new(TokioFs),
            Arc::new(TokioFs),
            Arc::new(NotifyProvider),
        )
    }

    /// Create a watcher with explicit collaborators.
    pub fn with_providers(
        config: WatchConfig,
        metadata: Arc<dyn MetadataProvider>,
        reader: Arc<dyn ContentReader>,
        notifier: Arc<dyn NotificationProvider>,
    ) -> Self {
        let (status, _) = watch::channel(WatchStatus::idle());

        Self {
            config,
            metadata,
            reader,
            notifier,
            status: Arc::new(status),
            session: None,
        }
    }

    /// Config used for every session this watcher starts.
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Start watching `path`, stopping any previous session first.
    ///
    /// Failures are also recorded in [`WatchStatus::error`].
    pub async fn start_watching<F>(&mut self, path: impl Into<PathBuf>, on_change: F) -> Result<()>
    where
        F: FnMut(ChangeEvent) + Send + 'static,
    {
        self.stop_watching().await;

        let path = path.into();
        info!("Starting watch on {}", path.display());
        self.status.send_replace(WatchStatus::starting(&path));

        match self.open(&path, Box::new(on_change)).await {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to watch {}: {e}", path.display());
                self.status.send_replace(WatchStatus::failed(&path, &e));
                Err(e)
            }
        }
    }

    /// Stop the current session. Safe to call at any time.
    ///
    /// When this returns the coalescing timer and poll interval are gone and
    /// the notification subscription has been released.
    pub async fn stop_watching(&mut self) {
        match self.session.take() {
            Some(session) => {
                info!("Stopping watch on {}", session.path.display());
                session.stop().await;
                self.status.send_replace(WatchStatus::stopped());
            }
            None => {
                self.status.send_if_modified(|status| {
                    if status.state == SessionState::Error {
                        *status = WatchStatus::idle();
                        true
                    } else {
                        false
                    }
                });
            }
        }
    }

    /// Current health. Pure read.
    pub fn status(&self) -> WatchStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status transition.
    pub fn subscribe_status(&self) -> watch::Receiver<WatchStatus> {
        self.status.subscribe()
    }

    async fn open(&self, path: &Path, on_change: ChangeCallback) -> Result<WatchSession> {
        self.config.validate()?;

        let stat = self.metadata.stat(path).await?;
        if !stat.is_file {
            return Err(WatchError::NotAFile(path.display().to_string()));
        }
        let baseline = self.reader.read(path).await?;

        let mut identity = IdentityTracker::new();
        identity.confirm(&stat);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(event_tx);
        let (subscription, degraded) = match self.notifier.subscribe(path, sink) {
            Ok(subscription) => (Some(subscription), None),
            Err(e) if self.config.poll_only_fallback => {
                warn!("Falling back to polling for {}: {e}", path.display());
                (None, Some(format!("file notifications unavailable, polling only: {e}")))
            }
            Err(e) => return Err(e),
        };

        self.status.send_replace(WatchStatus {
            error: degraded.clone(),
            identity: identity.current(),
            ..WatchStatus::with_state(SessionState::Active, Some(path.to_path_buf()))
        });

        let driver = SessionDriver {
            path: path.to_path_buf(),
            identity,
            coalescer: Coalescer::new(self.config.coalesce_window),
            poller: Poller::new(path.to_path_buf(), self.metadata.clone()),
            reconciler: Reconciler::new(
                path.to_path_buf(),
                self.metadata.clone(),
                self.reader.clone(),
                Some(baseline),
                on_change,
            ),
            status: self.status.clone(),
            degraded,
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(driver.run(event_rx, shutdown_rx, self.config.poll_interval));

        Ok(WatchSession {
            path: path.to_path_buf(),
            shutdown: Some(shutdown_tx),
            task: Some(task),
            subscription,
        })
    }
}

/// One active binding of a path.
struct WatchSession {
    path: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    subscription: Option<Box<dyn Subscription>>,
}

impl WatchSession {
    async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Watch driver for {} failed: {e}", self.path.display());
            }
        }
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.unsubscribe();
    }
}

/// State owned by the session task.
struct SessionDriver {
    path: PathBuf,
    identity: IdentityTracker,
    coalescer: Coalescer,
    poller: Poller,
    reconciler: Reconciler,
    status: Arc<watch::Sender<WatchStatus>>,
    /// Standing notice when running without native notifications.
    degraded: Option<String>,
}

impl SessionDriver {
    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<RawEvent>,
        mut shutdown: oneshot::Receiver<()>,
        poll_interval: Duration,
    ) {
        let mut poll = time::interval_at(Instant::now() + poll_interval, poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut channel_open = true;

        loop {
            let flush_at = self.coalescer.deadline();
            let flush = time::sleep_until(flush_at.unwrap_or_else(Instant::now));

            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                event = events.recv(), if channel_open => match event {
                    Some(event) => self.ingest(event),
                    None => {
                        debug!("Notification channel closed for {}", self.path.display());
                        channel_open = false;
                    }
                },

                _ = flush, if flush_at.is_some() => {
                    if let Some(action) = self.coalescer.flush() {
                        self.reconcile(action).await;
                    }
                }

                _ = poll.tick() => {
                    if let Some(action) = self.poller.sample(&mut self.identity).await {
                        self.reconcile(action).await;
                    }
                }
            }
        }

        debug!("Watch driver for {} exited", self.path.display());
    }

    fn ingest(&mut self, event: RawEvent) {
        let kind = classify(&event);
        debug!("Queued {kind} event for {}", self.path.display());
        self.coalescer.push(kind, event.at);
    }

    async fn reconcile(&mut self, action: NetAction) {
        let outcome = self.reconciler.apply(action, &mut self.identity).await;
        let identity = self.identity.current();
        let error = match outcome {
            Outcome::Delivered(ChangeEvent::Deleted) => {
                Some(Some(format!("file was deleted: {}", self.path.display())))
            }
            Outcome::Delivered(ChangeEvent::Modified) => Some(self.degraded.clone()),
            Outcome::Suppressed | Outcome::Skipped => None,
        };

        self.status.send_modify(|status| {
            status.identity = identity;
            if let Outcome::Delivered(_) = outcome {
                status.last_change = Some(Utc::now());
            }
            if let Some(error) = error {
                status.error = error;
            }
        });
    }
}
