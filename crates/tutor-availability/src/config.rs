//! Engine configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Shortest free block worth offering to a student.
pub const DEFAULT_MIN_BLOCK_MINUTES: i64 = 45;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// Free blocks shorter than this many minutes are dropped from results.
    pub min_block_minutes: i64,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            min_block_minutes: DEFAULT_MIN_BLOCK_MINUTES,
        }
    }
}

impl AvailabilityConfig {
    pub fn min_block(&self) -> Duration {
        Duration::minutes(self.min_block_minutes.max(0))
    }
}
