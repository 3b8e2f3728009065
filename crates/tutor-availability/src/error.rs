//! Error types for availability computation.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AvailabilityError {
    /// The query window is inverted. Reported to callers as a message, never raised.
    #[error("start_date must be before end_date (got {start} > {end})")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A stored record whose end does not come after its start.
    #[error("Invalid time block: {start} is not before {end}")]
    InvalidBlock {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Record store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, AvailabilityError>;
