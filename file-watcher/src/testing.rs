//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::error::{FsError, Result};
use crate::event::RawEventKind;
use crate::fs::{ContentReader, FileStat, MetadataProvider};
use crate::notifier::{EventSink, NotificationProvider, Subscription};

pub fn mtime(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[derive(Debug, Clone, Default)]
struct Entry {
    modified: u64,
    content: Vec<u8>,
    deny_stat: bool,
    deny_read: bool,
}

/// A filesystem holding a handful of files in memory.
#[derive(Debug, Default)]
pub struct FakeFs {
    files: Mutex<HashMap<PathBuf, Entry>>,
}

impl FakeFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_file(path: &str, modified: u64, content: &str) -> Arc<Self> {
        let fs = Self::new();
        fs.write(path, modified, content);
        fs
    }

    pub fn write(&self, path: &str, modified: u64, content: &str) {
        self.files.lock().unwrap().insert(
            PathBuf::from(path),
            Entry {
                modified,
                content: content.as_bytes().to_vec(),
                ..Entry::default()
            },
        );
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(Path::new(path));
    }

    pub fn deny_stat(&self, path: &str) {
        self.update(path, |entry| entry.deny_stat = true);
    }

    pub fn deny_read(&self, path: &str) {
        self.update(path, |entry| entry.deny_read = true);
    }

    pub fn stat_now(&self, path: &str) -> FileStat {
        let files = self.files.lock().unwrap();
        let entry = &files[Path::new(path)];
        Self::stat_of(entry)
    }

    fn update(&self, path: &str, f: impl FnOnce(&mut Entry)) {
        let mut files = self.files.lock().unwrap();
        f(files.get_mut(Path::new(path)).unwrap());
    }

    fn stat_of(entry: &Entry) -> FileStat {
        FileStat {
            modified: Some(mtime(entry.modified)),
            len: entry.content.len() as u64,
            is_file: true,
        }
    }
}

#[async_trait]
impl MetadataProvider for FakeFs {
    async fn stat(&self, path: &Path) -> std::result::Result<FileStat, FsError> {
        match self.files.lock().unwrap().get(path) {
            None => Err(FsError::NotFound(path.to_path_buf())),
            Some(entry) if entry.deny_stat => Err(FsError::PermissionDenied(path.to_path_buf())),
            Some(entry) => Ok(Self::stat_of(entry)),
        }
    }
}

#[async_trait]
impl ContentReader for FakeFs {
    async fn read(&self, path: &Path) -> std::result::Result<Vec<u8>, FsError> {
        match self.files.lock().unwrap().get(path) {
            None => Err(FsError::NotFound(path.to_path_buf())),
            Some(entry) if entry.deny_read => Err(FsError::PermissionDenied(path.to_path_buf())),
            Some(entry) => Ok(entry.content.clone()),
        }
    }
}

/// Notification provider driven by the test.
#[derive(Debug, Default)]
pub struct FakeNotifier {
    sink: Mutex<Option<EventSink>>,
    fail: Mutex<bool>,
    subscribes: AtomicUsize,
    unsubscribes: Arc<AtomicUsize>,
}

impl FakeNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let notifier = Self::new();
        *notifier.fail.lock().unwrap() = true;
        notifier
    }

    /// Deliver a notification to the most recent subscriber.
    pub fn emit(&self, kind: RawEventKind) -> bool {
        self.sink
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|sink| sink.send(kind))
    }

    pub fn subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribes(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

impl NotificationProvider for FakeNotifier {
    fn subscribe(&self, _path: &Path, sink: EventSink) -> Result<Box<dyn Subscription>> {
        if *self.fail.lock().unwrap() {
            return Err(notify::Error::generic("inotify limit reached").into());
        }
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(Box::new(FakeSubscription {
            unsubscribes: self.unsubscribes.clone(),
        }))
    }
}

struct FakeSubscription {
    unsubscribes: Arc<AtomicUsize>,
}

impl Subscription for FakeSubscription {
    fn unsubscribe(self: Box<Self>) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
    }
}
