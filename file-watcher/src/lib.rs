//! # File Watcher
//!
//! This crate keeps the Curio viewer's copy of a single file in sync with the
//! file on disk. It merges two unreliable detection channels into one
//! de-duplicated stream of reload signals.
//!
//! ## Features
//!
//! - **Native Notifications**: platform file events via `notify`
//! - **Coalescing**: bursts collapse into one action after a quiet window
//! - **Poll Backstop**: periodic re-stat catches events the OS dropped
//! - **Deduplication**: identical content never triggers a second reload
//! - **Health Status**: a watch channel reports session state and errors
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         FileWatcher                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  NotifyProvider ──► classify ──► Coalescer ──┐                  │
//! │                                              ├─► Reconciler ──► │
//! │  Poller (interval) ──────────────────────────┘    on_change     │
//! │                                                                 │
//! │  IdentityTracker (mtime)            WatchStatus (watch channel) │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod coalesce;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod fs;
pub mod identity;
pub mod notifier;
pub mod poll;
pub mod reconcile;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::WatchConfig;
pub use document::{display_name, read_document};
pub use error::{FsError, Result, WatchError};
pub use event::{ChangeEvent, RawEvent, RawEventKind};
pub use fs::{ContentReader, FileStat, MetadataProvider, TokioFs};
pub use identity::FileIdentity;
pub use notifier::{EventSink, NotificationProvider, NotifyProvider, Subscription};
pub use session::{FileWatcher, SessionState, WatchStatus};
