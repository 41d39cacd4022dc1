//! Runtime configuration for query contexts and live queries.

use serde::Deserialize;
use std::time::Duration;

/// Default identity column used by fingerprints, watermarks and eager loads
pub const DEFAULT_ID_COLUMN: &str = "id";

/// Default delay between two poll ticks
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Integer identity column present on every polled table
    pub id_column: String,
    /// Delay between poll ticks for `watch`/`stream_new`
    pub poll_interval_ms: u64,
    /// Whether `watch` delivers the current result set at subscribe time
    pub deliver_immediately: bool,
}

impl LiveConfig {
    /// Parse a configuration from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            deliver_immediately: true,
        }
    }
}
