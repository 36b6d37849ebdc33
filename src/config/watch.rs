//! `[watch]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How `watch` mode notices source changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchBackend {
    /// Filesystem events, falling back to polling if the watcher can't start (default).
    #[default]
    Auto,
    /// Filesystem events only; failing to start the watcher is an error.
    Event,
    /// Rescan modification times on a fixed interval.
    Poll,
}

/// `[watch]` section in site.toml.
///
/// # Example
/// ```toml
/// [watch]
/// backend = "poll"
/// debounce_ms = 1500
/// poll_interval_ms = 500
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    #[serde(default = "defaults::watch::backend")]
    #[educe(Default = defaults::watch::backend())]
    pub backend: WatchBackend,

    /// Minimum gap between two event-triggered rebuilds (>= 1000).
    #[serde(default = "defaults::watch::debounce_ms")]
    #[educe(Default = defaults::watch::debounce_ms())]
    pub debounce_ms: u64,

    /// Rescan interval of the polling backend.
    #[serde(default = "defaults::watch::poll_interval_ms")]
    #[educe(Default = defaults::watch::poll_interval_ms())]
    pub poll_interval_ms: u64,
}

impl WatchConfig {
    #[inline]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[inline]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
