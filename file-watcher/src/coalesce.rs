//! Trailing-debounce coalescing of classified events into one net action.

use std::mem;
use std::time::Duration;

use tokio::time::Instant;

use crate::event::{ChangeKind, NetAction};

/// Buffers classified events until the window has been quiet for `window`.
#[derive(Debug)]
pub struct Coalescer {
    window: Duration,
    queue: Vec<ChangeKind>,
    deadline: Option<Instant>,
}

impl Coalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            queue: Vec::new(),
            deadline: None,
        }
    }

    /// Buffer an event and push the flush deadline out to `now + window`.
    pub fn push(&mut self, kind: ChangeKind, now: Instant) {
        self.queue.push(kind);
        self.deadline = Some(now + self.window);
    }

    /// When the pending window fires, if anything is buffered.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take the buffered events and resolve them to one action.
    ///
    /// The queue is swapped out before resolving, so anything pushed afterwards
    /// starts the next window.
    pub fn flush(&mut self) -> Option<NetAction> {
        self.deadline = None;
        let events = mem::take(&mut self.queue);
        if events.is_empty() {
            None
        } else {
            Some(resolve(&events))
        }
    }
}

/// Resolve a burst to its net effect.
///
/// Deleted wins only when no creation follows the last deletion; everything
/// else (plain edits, creations, delete-then-recreate) is a modification.
pub fn resolve(events: &[ChangeKind]) -> NetAction {
    let mut saw_delete = false;
    let mut recreated_after_delete = false;

    for kind in events {
        match kind {
            ChangeKind::Deleted => {
                saw_delete = true;
                recreated_after_delete = false;
            }
            ChangeKind::Created if saw_delete => recreated_after_delete = true,
            ChangeKind::Created | ChangeKind::Modified => {}
        }
    }

    if saw_delete && !recreated_after_delete {
        NetAction::Deleted
    } else {
        NetAction::Modified
    }
}
