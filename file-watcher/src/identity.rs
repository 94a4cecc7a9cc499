//! Last-confirmed fingerprint of the watched file.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::fs::FileStat;

/// Fingerprint used to detect that the file changed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    /// Modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
}

impl From<&FileStat> for FileIdentity {
    fn from(stat: &FileStat) -> Self {
        Self {
            modified: stat.modified,
        }
    }
}

/// Holds the identity owned by the active session.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    current: Option<FileIdentity>,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<FileIdentity> {
        self.current
    }

    pub fn is_established(&self) -> bool {
        self.current.is_some()
    }

    /// Record `stat` as the confirmed state of the file.
    pub fn confirm(&mut self, stat: &FileStat) {
        self.current = Some(FileIdentity::from(stat));
    }

    /// Forget the identity after the file disappeared.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Whether `stat` carries a different fingerprint than the tracked one.
    ///
    /// Always false when nothing is tracked yet.
    pub fn differs(&self, stat: &FileStat) -> bool {
        self.current
            .is_some_and(|identity| identity.modified != stat.modified)
    }
}
