//! Change events: raw notifications, their classification, and what callers see.

use std::path::Path;

use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::warn;

/// Kind reported by the native notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawEventKind {
    /// File was created (or renamed onto the watched path).
    Created,

    /// File content or metadata changed.
    Modified,

    /// File was removed (or renamed away from the watched path).
    Deleted,

    /// The backend could not say what happened.
    Unknown,
}

impl RawEventKind {
    /// Map a notify event to a kind for `target`.
    ///
    /// Returns `None` when the event does not concern `target` or carries no
    /// change (plain opens and reads).
    pub fn from_notify(event: &notify::Event, target: &Path) -> Option<Self> {
        let position = event.paths.iter().position(|p| p == target)?;

        let kind = match event.kind {
            notify::EventKind::Create(_) => Self::Created,
            notify::EventKind::Remove(_) => Self::Deleted,
            notify::EventKind::Modify(ModifyKind::Name(rename)) => match rename {
                RenameMode::From => Self::Deleted,
                RenameMode::To => Self::Created,
                // paths are [from, to]
                RenameMode::Both if position == 0 => Self::Deleted,
                RenameMode::Both => Self::Created,
                _ => Self::Unknown,
            },
            notify::EventKind::Modify(_) => Self::Modified,
            notify::EventKind::Access(AccessKind::Close(AccessMode::Write)) => Self::Modified,
            notify::EventKind::Access(_) => return None,
            notify::EventKind::Any | notify::EventKind::Other => Self::Unknown,
        };

        Some(kind)
    }
}

/// One low-level notification, alive only inside a coalescing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// What the backend reported.
    pub kind: RawEventKind,

    /// When the notification arrived.
    pub at: Instant,
}

impl RawEvent {
    /// Create an event stamped with the current time.
    pub fn new(kind: RawEventKind) -> Self {
        Self {
            kind,
            at: Instant::now(),
        }
    }
}

/// Classified kind of change fed to the coalescer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Created => write!(f, "created"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// Classify a raw notification.
///
/// An unknown kind becomes `Modified` so a potential change is never dropped.
pub fn classify(event: &RawEvent) -> ChangeKind {
    match event.kind {
        RawEventKind::Created => ChangeKind::Created,
        RawEventKind::Modified => ChangeKind::Modified,
        RawEventKind::Deleted => ChangeKind::Deleted,
        RawEventKind::Unknown => {
            warn!("Unrecognized file notification, treating as modified");
            ChangeKind::Modified
        }
    }
}

/// The single decided outcome of a batch of events or a poll sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetAction {
    Modified,
    Deleted,
}

/// Event delivered to the `on_change` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// The file content changed and should be reloaded.
    Modified,

    /// The file is gone.
    Deleted,
}

impl From<NetAction> for ChangeEvent {
    fn from(action: NetAction) -> Self {
        match action {
            NetAction::Modified => Self::Modified,
            NetAction::Deleted => Self::Deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tracing_test::traced_test;

    fn notify_event(kind: notify::EventKind, paths: &[&str]) -> notify::Event {
        paths
            .iter()
            .fold(notify::Event::new(kind), |event, p| event.add_path(PathBuf::from(p)))
    }

    #[test]
    fn test_notify_mapping() {
        let target = Path::new("/docs/readme.md");

        let cases = [
            (notify::EventKind::Create(CreateKind::File), Some(RawEventKind::Created)),
            (notify::EventKind::Remove(RemoveKind::File), Some(RawEventKind::Deleted)),
            (
                notify::EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                Some(RawEventKind::Modified),
            ),
            (
                notify::EventKind::Access(AccessKind::Close(AccessMode::Write)),
                Some(RawEventKind::Modified),
            ),
            (notify::EventKind::Access(AccessKind::Read), None),
            (notify::EventKind::Any, Some(RawEventKind::Unknown)),
        ];

        for (kind, expected) in cases {
            let event = notify_event(kind, &["/docs/readme.md"]);
            assert_eq!(RawEventKind::from_notify(&event, target), expected, "{kind:?}");
        }
    }

    #[test]
    fn test_notify_ignores_other_paths() {
        let event = notify_event(
            notify::EventKind::Modify(ModifyKind::Any),
            &["/docs/other.md"],
        );
        assert_eq!(
            RawEventKind::from_notify(&event, Path::new("/docs/readme.md")),
            None
        );
    }

    #[test]
    fn test_atomic_save_rename() {
        let target = Path::new("/docs/readme.md");
        let rename = notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both));

        let onto = notify_event(rename, &["/docs/.readme.md.swp", "/docs/readme.md"]);
        assert_eq!(
            RawEventKind::from_notify(&onto, target),
            Some(RawEventKind::Created)
        );

        let away = notify_event(rename, &["/docs/readme.md", "/docs/readme.md.bak"]);
        assert_eq!(
            RawEventKind::from_notify(&away, target),
            Some(RawEventKind::Deleted)
        );
    }

    #[test]
    #[traced_test]
    fn test_unknown_classifies_as_modified() {
        let kind = classify(&RawEvent::new(RawEventKind::Unknown));

        assert_eq!(kind, ChangeKind::Modified);
        assert!(logs_contain("Unrecognized file notification"));
    }

    #[test]
    fn test_change_event_wire_format() {
        assert_eq!(
            serde_json::to_string(&ChangeEvent::Modified).unwrap(),
            r#"{"type":"modified"}"#
        );
        assert_eq!(
            serde_json::to_string(&ChangeEvent::Deleted).unwrap(),
            r#"{"type":"deleted"}"#
        );
    }
}
