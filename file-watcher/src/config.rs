//! Configuration types for file watching.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};

/// Default trailing window for coalescing native events.
pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(100);

/// Default interval of the metadata poll loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Longest accepted window or interval.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for a watch session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period after the last native event before the buffer is flushed.
    #[serde(rename = "coalesce_window_ms", with = "millis")]
    pub coalesce_window: Duration,

    /// How often the poll loop re-stats the file.
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,

    /// Keep the session alive on poll alone when native registration fails.
    pub poll_only_fallback: bool,
}

impl WatchConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            coalesce_window: DEFAULT_COALESCE_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_only_fallback: false,
        }
    }

    /// Set the coalescing window.
    pub fn with_coalesce_window(mut self, window: Duration) -> Self {
        self.coalesce_window = window;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Degrade to poll-only operation instead of failing on registration errors.
    pub fn poll_only_fallback(mut self) -> Self {
        self.poll_only_fallback = true;
        self
    }

    /// Check the durations before a session is started with them.
    ///
    /// The poll interval must be non-zero. A zero coalesce window is allowed
    /// and flushes on the next turn of the driver loop.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(WatchError::Config("poll interval must be non-zero".to_string()));
        }
        if self.poll_interval > MAX_DURATION {
            return Err(WatchError::Config(format!(
                "poll interval of {}ms exceeds {}ms",
                self.poll_interval.as_millis(),
                MAX_DURATION.as_millis()
            )));
        }
        if self.coalesce_window > MAX_DURATION {
            return Err(WatchError::Config(format!(
                "coalesce window of {}ms exceeds {}ms",
                self.coalesce_window.as_millis(),
                MAX_DURATION.as_millis()
            )));
        }
        Ok(())
    }

    /// Parse a config from JSON, filling omitted fields with defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
